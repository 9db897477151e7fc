use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ParcelError, Result};
use crate::models::SiteDescriptor;

/// Adjacency rule used when labelling parcel candidates.
///
/// `Eight` is the default and should stay fixed across a dataset: switching
/// rules can merge or split diagonally touching regions and renumber parcels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

impl From<Connectivity> for imageproc::region_labelling::Connectivity {
    fn from(value: Connectivity) -> Self {
        match value {
            Connectivity::Four => imageproc::region_labelling::Connectivity::Four,
            Connectivity::Eight => imageproc::region_labelling::Connectivity::Eight,
        }
    }
}

/// Settings for the display-only road overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadOverlayConfig {
    /// Side of the square kernel used to grow the site mask so the
    /// boundary road is kept.
    pub mask_expand_kernel: u32,
    pub dilate_iterations: u32,
    pub min_area_px: f64,
}

impl Default for RoadOverlayConfig {
    fn default() -> Self {
        Self {
            mask_expand_kernel: 30,
            dilate_iterations: 4,
            min_area_px: 500.0,
        }
    }
}

/// Every tunable of one extraction run. Immutable once validated and shared
/// by reference between site runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Canonical working resolution (width, height) both rasters are resized to
    pub working_size: (u32, u32),
    /// Mask luminance at or above this is inside the site
    pub mask_threshold: u8,
    /// Condition luminance strictly below this is road
    pub road_threshold: u8,
    /// Side of the square structuring element (odd)
    pub kernel_size: u32,
    pub dilate_iterations: u32,
    pub erode_iterations: u32,
    pub min_parcel_area_px: u32,
    /// Douglas-Peucker tolerance in pixels
    pub simplify_epsilon: f64,
    pub site: SiteDescriptor,
    pub connectivity: Connectivity,
    pub roads: RoadOverlayConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            working_size: (1024, 1024),
            mask_threshold: 128,
            road_threshold: 220,
            kernel_size: 3,
            dilate_iterations: 2,
            erode_iterations: 1,
            min_parcel_area_px: 1500,
            simplify_epsilon: 2.0,
            site: SiteDescriptor::default(),
            connectivity: Connectivity::Eight,
            roads: RoadOverlayConfig::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ParcelError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| ParcelError::json(path, e))
    }

    /// Kernel radius in pixels (3x3 -> 1)
    pub fn kernel_radius(&self) -> u32 {
        self.kernel_size / 2
    }

    /// Total Chebyshev reach of `iterations` passes of the structuring element.
    pub fn reach(&self, iterations: u32) -> u32 {
        self.kernel_radius().saturating_mul(iterations)
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.working_size;
        if width == 0 || height == 0 {
            return invalid(format!("working size must be non-zero, got {width}x{height}"));
        }
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return invalid(format!(
                "kernel size must be a positive odd number, got {}",
                self.kernel_size
            ));
        }
        for (name, iterations) in [
            ("dilation", self.dilate_iterations),
            ("erosion", self.erode_iterations),
            ("road overlay dilation", self.roads.dilate_iterations),
        ] {
            if self.reach(iterations) > u8::MAX as u32 {
                return invalid(format!(
                    "{name} reaches {} pixels, limit is {}",
                    self.reach(iterations),
                    u8::MAX
                ));
            }
        }
        if self.roads.mask_expand_kernel == 0 || self.roads.mask_expand_kernel / 2 > u8::MAX as u32 {
            return invalid(format!(
                "road overlay mask kernel must be between 1 and 511, got {}",
                self.roads.mask_expand_kernel
            ));
        }
        if !self.roads.min_area_px.is_finite() || self.roads.min_area_px < 0.0 {
            return invalid(format!(
                "road overlay minimum area must be a non-negative number, got {}",
                self.roads.min_area_px
            ));
        }
        if self.min_parcel_area_px == 0 {
            return invalid("minimum parcel area must be at least 1 pixel".to_string());
        }
        if !self.simplify_epsilon.is_finite() || self.simplify_epsilon < 0.0 {
            return invalid(format!(
                "simplification epsilon must be a non-negative number, got {}",
                self.simplify_epsilon
            ));
        }
        let SiteDescriptor { width_m, height_m } = self.site;
        if !(width_m.is_finite() && width_m > 0.0 && height_m.is_finite() && height_m > 0.0) {
            return invalid(format!(
                "site extent must be positive, got {width_m} x {height_m} m"
            ));
        }
        Ok(())
    }
}

fn invalid(message: String) -> Result<()> {
    Err(ParcelError::InvalidConfig(message))
}
