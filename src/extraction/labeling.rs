use image::Luma;
use imageproc::region_labelling::connected_components;

use crate::config::Connectivity;
use crate::grid::{BooleanGrid, LabelGrid};
use crate::models::ParcelCandidate;

/// Assigns a positive label to each connected foreground region.
pub trait Labeler: Send + Sync {
    /// Returns the label grid and the number of labels. Labels are
    /// `1..=count`, all present; background stays 0.
    fn label(&self, grid: &BooleanGrid) -> (LabelGrid, u32);

    fn name(&self) -> &str;
}

/// Connected-component labelling backed by `imageproc`, renumbered so labels
/// follow raster-scan order of each region's first pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentLabeler {
    pub connectivity: Connectivity,
}

impl ComponentLabeler {
    pub fn new(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }
}

impl Labeler for ComponentLabeler {
    fn label(&self, grid: &BooleanGrid) -> (LabelGrid, u32) {
        let labeled = connected_components(grid.as_image(), self.connectivity.into(), Luma([0u8]));
        renumber_in_scan_order(labeled)
    }

    fn name(&self) -> &str {
        match self.connectivity {
            Connectivity::Four => "Components (4-connected)",
            Connectivity::Eight => "Components (8-connected)",
        }
    }
}

/// Relabel so the first label met in raster order is 1, the next new one 2,
/// and so on.
pub fn renumber_in_scan_order(mut labels: LabelGrid) -> (LabelGrid, u32) {
    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0);
    let mut mapping = vec![0u32; max_label as usize + 1];
    let mut next = 0u32;

    for pixel in labels.pixels_mut() {
        let old = pixel[0] as usize;
        if old == 0 {
            continue;
        }
        if mapping[old] == 0 {
            next += 1;
            mapping[old] = next;
        }
        pixel[0] = mapping[old];
    }

    (labels, next)
}

/// Pixel count, bounding extent and coordinate sums for labels `1..=count`,
/// in ascending label order.
pub fn collect_candidates(labels: &LabelGrid, count: u32) -> Vec<ParcelCandidate> {
    let mut regions: Vec<Option<ParcelCandidate>> = vec![None; count as usize + 1];

    for (x, y, label) in labels.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 || label_val > count {
            continue;
        }
        match &mut regions[label_val as usize] {
            Some(region) => region.include(x, y),
            slot => *slot = Some(ParcelCandidate::new(label_val, x, y)),
        }
    }

    regions.into_iter().flatten().collect()
}
