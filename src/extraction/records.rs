use crate::models::{ParcelCandidate, ParcelRecord, PolygonRing};

/// Build the output record for one vectorized label.
pub fn build_record(
    candidate: &ParcelCandidate,
    polygon: PolygonRing,
    width_px: u32,
    height_px: u32,
) -> ParcelRecord {
    let (mean_x, mean_y) = candidate.mean_position();
    let cx = (mean_x / width_px as f64).clamp(0.0, 1.0);
    let cy = (1.0 - mean_y / height_px as f64).clamp(0.0, 1.0);

    ParcelRecord {
        id: ParcelRecord::id_for_label(candidate.label),
        area_px: candidate.area(),
        centroid_norm: [cx, cy],
        polygon,
    }
}
