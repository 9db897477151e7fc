use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::extraction::morphology::dilate_square;
use crate::extraction::vectorize::{ContourTracer, CoordinateMapper, PolygonSimplifier, simplify_boundary};
use crate::grid::{BooleanGrid, RasterGrid, ensure_same_dimensions};
use crate::models::{PolygonRing, shoelace_area};

/// Road footprint for display: dark pixels within a grown site mask,
/// thickened and vectorized. Never used for parcel geometry.
pub fn extract_road_polygons(
    intensity: &RasterGrid,
    site_mask: &BooleanGrid,
    config: &ExtractionConfig,
    tracer: &dyn ContourTracer,
    simplifier: &dyn PolygonSimplifier,
) -> Result<Vec<PolygonRing>> {
    ensure_same_dimensions("road overlay", site_mask.dimensions(), intensity.dimensions())?;
    let (width, height) = intensity.dimensions();

    let expand = (config.roads.mask_expand_kernel / 2).min(u8::MAX as u32) as u8;
    let expanded_mask = dilate_square(site_mask, expand);

    let road = BooleanGrid::from_fn(width, height, |x, y| {
        expanded_mask.get(x, y) && intensity.get_pixel(x, y)[0] < config.road_threshold
    });
    let reach = config.reach(config.roads.dilate_iterations).min(u8::MAX as u32) as u8;
    let road_inside = dilate_square(&road, reach).and(&expanded_mask, "road overlay")?;

    let mapper = CoordinateMapper::new(width, height, config.site);
    let polygons: Vec<PolygonRing> = tracer
        .outer_boundaries(road_inside.as_image())
        .into_iter()
        .filter(|boundary| shoelace_area(boundary).abs() >= config.roads.min_area_px)
        .filter_map(|boundary| simplify_boundary(vec![boundary], simplifier, config.simplify_epsilon))
        .map(|ring| mapper.ring_to_metric(&ring))
        .collect();

    debug!(polygons = polygons.len(), "road overlay extracted");
    Ok(polygons)
}
