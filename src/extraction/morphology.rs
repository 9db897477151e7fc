use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::config::ExtractionConfig;
use crate::grid::{BooleanGrid, RasterGrid, ensure_same_dimensions};
use crate::error::Result;

/// Grow `grid` by `reach` pixels in the Chebyshev sense, the same as
/// `reach` passes of a 3x3 square structuring element.
pub fn dilate_square(grid: &BooleanGrid, reach: u8) -> BooleanGrid {
    if reach == 0 {
        return grid.clone();
    }
    BooleanGrid::from_image(dilate(grid.as_image(), Norm::LInf, reach))
}

/// Shrink `grid` by `reach` pixels.
///
/// Computed as the complement of the dilated complement, so pixels beyond
/// the raster edge never count as outside and do not erode the frame.
pub fn erode_square(grid: &BooleanGrid, reach: u8) -> BooleanGrid {
    if reach == 0 {
        return grid.clone();
    }
    dilate_square(&grid.complement(), reach).complement()
}

fn reach_u8(reach: u32) -> u8 {
    // validate() bounds every reach to u8
    reach.min(u8::MAX as u32) as u8
}

/// Raw road mask: dark pixels, plus everything outside the site.
pub fn build_road_mask(
    intensity: &RasterGrid,
    site_mask: &BooleanGrid,
    road_threshold: u8,
) -> Result<BooleanGrid> {
    ensure_same_dimensions("road mask", site_mask.dimensions(), intensity.dimensions())?;
    let (width, height) = intensity.dimensions();
    Ok(BooleanGrid::from_fn(width, height, |x, y| {
        intensity.get_pixel(x, y)[0] < road_threshold || !site_mask.get(x, y)
    }))
}

/// Thicken the raw road mask by the configured dilation.
pub fn thicken_roads(road: &BooleanGrid, config: &ExtractionConfig) -> BooleanGrid {
    dilate_square(road, reach_u8(config.reach(config.dilate_iterations)))
}

/// Buildable region: inside the site and off the thickened road, optionally
/// eroded to widen the gap between neighbouring parcels.
pub fn extract_candidates(
    site_mask: &BooleanGrid,
    dilated_road: &BooleanGrid,
    config: &ExtractionConfig,
) -> Result<BooleanGrid> {
    let candidate = site_mask.and_not(dilated_road, "candidate region")?;
    Ok(erode_square(
        &candidate,
        reach_u8(config.reach(config.erode_iterations)),
    ))
}
