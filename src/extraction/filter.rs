use crate::models::ParcelCandidate;

/// Why a candidate did not survive the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooSmall,
    TouchesBorder,
}

/// Check one candidate against the area threshold and the raster border.
pub fn check_candidate(
    candidate: &ParcelCandidate,
    min_area_px: u32,
    width: u32,
    height: u32,
) -> Result<(), Rejection> {
    if candidate.area() < min_area_px {
        return Err(Rejection::TooSmall);
    }
    if candidate.touches_border(width, height) {
        return Err(Rejection::TouchesBorder);
    }
    Ok(())
}

/// Result of filtering one run's candidates.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Survivors in ascending label order
    pub kept: Vec<ParcelCandidate>,
    pub too_small: u32,
    pub touching_border: u32,
}

/// Keep candidates that are large enough and clear of the raster border.
pub fn filter_parcels(
    candidates: Vec<ParcelCandidate>,
    min_area_px: u32,
    width: u32,
    height: u32,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    for candidate in candidates {
        match check_candidate(&candidate, min_area_px, width, height) {
            Ok(()) => outcome.kept.push(candidate),
            Err(Rejection::TooSmall) => outcome.too_small += 1,
            Err(Rejection::TouchesBorder) => outcome.touching_border += 1,
        }
    }
    outcome.kept.sort_by_key(|c| c.label);
    outcome
}
