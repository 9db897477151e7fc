//! Land-use merge contract.
//!
//! A land-use service reads parcel ids, areas and centroids and answers with
//! one category per id. Merging keeps every geometric field untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ParcelError, Result};
use crate::models::{ParcelDocument, ParcelRecord, SiteDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LandUse {
    Residential,
    Commercial,
    Public,
    Green,
}

/// Parcel record plus its assigned category, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedParcel {
    #[serde(flatten)]
    pub parcel: ParcelRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_use: Option<LandUse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandUsePlan {
    pub site: SiteDescriptor,
    pub parcels: Vec<PlannedParcel>,
}

#[derive(Deserialize)]
struct AssignmentEntry {
    id: String,
    land_use: LandUse,
}

#[derive(Deserialize)]
struct AssignmentDocument {
    parcels: Vec<AssignmentEntry>,
}

/// Read `parcels[].{id, land_use}` from a service response; other fields
/// are ignored.
pub fn read_assignments(path: impl AsRef<Path>) -> Result<BTreeMap<String, LandUse>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ParcelError::io(path, e))?;
    let doc: AssignmentDocument =
        serde_json::from_str(&text).map_err(|e| ParcelError::json(path, e))?;
    Ok(doc
        .parcels
        .into_iter()
        .map(|entry| (entry.id, entry.land_use))
        .collect())
}

impl LandUsePlan {
    /// Attach categories to a parcel document. An assignment naming a parcel
    /// that is not in the document is an error.
    pub fn merge(document: ParcelDocument, assignments: &BTreeMap<String, LandUse>) -> Result<Self> {
        if let Some(unknown) = assignments
            .keys()
            .find(|id| !document.parcels.iter().any(|p| &p.id == *id))
        {
            return Err(ParcelError::UnknownParcel(unknown.clone()));
        }

        let parcels = document
            .parcels
            .into_iter()
            .map(|parcel| PlannedParcel {
                land_use: assignments.get(&parcel.id).copied(),
                parcel,
            })
            .collect();

        Ok(Self {
            site: document.site,
            parcels,
        })
    }

    /// Number of parcels per category.
    pub fn summary(&self) -> BTreeMap<LandUse, usize> {
        let mut counts = BTreeMap::new();
        for land_use in self.parcels.iter().filter_map(|p| p.land_use) {
            *counts.entry(land_use).or_insert(0) += 1;
        }
        counts
    }
}
