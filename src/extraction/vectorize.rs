//! Boundary tracing, polyline simplification and the pixel-to-metric mapping.
//!
//! Tracing and simplification sit behind [`ContourTracer`] and
//! [`PolygonSimplifier`] so either can be replaced without touching the
//! stage orchestration.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};

use crate::grid::LabelGrid;
use crate::models::{ParcelCandidate, PolygonRing, SiteDescriptor, shoelace_area};

/// Pixel-space polyline vertex (x right, y down).
pub type PixelPoint = [f64; 2];

/// Extracts outer boundaries from a binary silhouette.
pub trait ContourTracer: Send + Sync {
    /// One ordered point sequence per outer boundary; holes are ignored.
    fn outer_boundaries(&self, silhouette: &GrayImage) -> Vec<Vec<PixelPoint>>;

    fn name(&self) -> &str;
}

/// Border following via `imageproc::contours::find_contours`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BorderFollowingTracer;

impl ContourTracer for BorderFollowingTracer {
    fn outer_boundaries(&self, silhouette: &GrayImage) -> Vec<Vec<PixelPoint>> {
        find_contours::<i32>(silhouette)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer)
            .map(|contour| {
                contour
                    .points
                    .iter()
                    .map(|p| [p.x as f64, p.y as f64])
                    .collect()
            })
            .collect()
    }

    fn name(&self) -> &str {
        "Border Following"
    }
}

/// Reduces a closed polyline under a deviation bound.
pub trait PolygonSimplifier: Send + Sync {
    /// Every dropped vertex lies within `epsilon` of the segment joining the
    /// retained vertices around it.
    fn simplify_closed(&self, ring: &[PixelPoint], epsilon: f64) -> Vec<PixelPoint>;

    fn name(&self) -> &str;
}

/// Ramer-Douglas-Peucker with segment (not infinite line) distances.
#[derive(Debug, Clone, Copy, Default)]
pub struct DouglasPeucker;

impl PolygonSimplifier for DouglasPeucker {
    fn simplify_closed(&self, ring: &[PixelPoint], epsilon: f64) -> Vec<PixelPoint> {
        if ring.len() < 3 {
            return ring.to_vec();
        }

        // Split the ring at the vertex farthest from the first one and
        // simplify both halves as open chains.
        let start = ring[0];
        let split = ring
            .iter()
            .enumerate()
            .fold((0, 0.0), |(best, best_d), (i, p)| {
                let d = distance(start, *p);
                if d > best_d { (i, d) } else { (best, best_d) }
            })
            .0;
        if split == 0 {
            return vec![start];
        }

        let mut back: Vec<PixelPoint> = ring[split..].to_vec();
        back.push(start);

        let mut out = simplify_open(&ring[..=split], epsilon);
        out.pop();
        let mut tail = simplify_open(&back, epsilon);
        tail.pop();
        out.extend(tail);
        out
    }

    fn name(&self) -> &str {
        "Douglas-Peucker"
    }
}

/// Open-chain Douglas-Peucker; both endpoints are always kept.
pub fn simplify_open(points: &[PixelPoint], epsilon: f64) -> Vec<PixelPoint> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    let mut stack = vec![(0usize, n - 1)];

    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let mut max_idx = first;
        let mut max_dist = 0.0;
        for i in (first + 1)..last {
            let d = segment_distance(points[i], points[first], points[last]);
            if d > max_dist {
                max_idx = i;
                max_dist = d;
            }
        }
        if max_dist > epsilon {
            keep[max_idx] = true;
            stack.push((first, max_idx));
            stack.push((max_idx, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

fn distance(a: PixelPoint, b: PixelPoint) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Distance from `p` to the closest point of segment `a`-`b`.
pub fn segment_distance(p: PixelPoint, a: PixelPoint, b: PixelPoint) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(p, a);
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, [a[0] + t * dx, a[1] + t * dy])
}

/// Fixed linear mapping between the working raster and site metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    pub width_px: u32,
    pub height_px: u32,
    pub site: SiteDescriptor,
}

impl CoordinateMapper {
    pub fn new(width_px: u32, height_px: u32, site: SiteDescriptor) -> Self {
        Self {
            width_px,
            height_px,
            site,
        }
    }

    /// Pixel rows grow downward, metric y grows upward.
    pub fn to_metric(&self, p: PixelPoint) -> [f64; 2] {
        let (w, h) = (self.width_px as f64, self.height_px as f64);
        [
            p[0] / w * self.site.width_m,
            (h - p[1]) / h * self.site.height_m,
        ]
    }

    pub fn to_pixel(&self, m: [f64; 2]) -> PixelPoint {
        let (w, h) = (self.width_px as f64, self.height_px as f64);
        [
            m[0] / self.site.width_m * w,
            h - m[1] / self.site.height_m * h,
        ]
    }

    pub fn ring_to_metric(&self, ring: &[PixelPoint]) -> PolygonRing {
        PolygonRing(ring.iter().map(|p| self.to_metric(*p)).collect())
    }
}

/// Binary image of one label, cropped to its bounding extent plus a one pixel
/// background margin. Returns the image and the pixel position of its origin.
pub fn silhouette(labels: &LabelGrid, candidate: &ParcelCandidate) -> (GrayImage, (i64, i64)) {
    let origin = (candidate.min_x as i64 - 1, candidate.min_y as i64 - 1);
    let (width, height) = labels.dimensions();
    let image = GrayImage::from_fn(candidate.width() + 2, candidate.height() + 2, |cx, cy| {
        let x = origin.0 + cx as i64;
        let y = origin.1 + cy as i64;
        let inside = x >= 0
            && y >= 0
            && (x as u32) < width
            && (y as u32) < height
            && labels.get_pixel(x as u32, y as u32)[0] == candidate.label;
        Luma([if inside { 255 } else { 0 }])
    });
    (image, origin)
}

/// Drop consecutive repeats, including a closing vertex equal to the first.
pub fn dedup_ring(mut ring: Vec<PixelPoint>) -> Vec<PixelPoint> {
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

fn distinct_vertices(ring: &[PixelPoint]) -> usize {
    let mut sorted = ring.to_vec();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    sorted.dedup();
    sorted.len()
}

/// Largest-area ring among several traced boundaries; the first wins ties.
pub fn largest_boundary(boundaries: Vec<Vec<PixelPoint>>) -> Option<Vec<PixelPoint>> {
    let mut best: Option<(f64, Vec<PixelPoint>)> = None;
    for boundary in boundaries {
        let area = shoelace_area(&boundary).abs();
        if best.as_ref().is_none_or(|(best_area, _)| area > *best_area) {
            best = Some((area, boundary));
        }
    }
    best.map(|(_, boundary)| boundary)
}

/// Trace and simplify a boundary, returning pixel-space vertices, or `None`
/// when fewer than three distinct vertices survive.
pub fn simplify_boundary(
    boundaries: Vec<Vec<PixelPoint>>,
    simplifier: &dyn PolygonSimplifier,
    epsilon: f64,
) -> Option<Vec<PixelPoint>> {
    let boundary = dedup_ring(largest_boundary(boundaries)?);
    let simplified = dedup_ring(simplifier.simplify_closed(&boundary, epsilon));
    (distinct_vertices(&simplified) >= 3).then_some(simplified)
}

/// Vectorize one surviving label into a metric ring.
pub fn vectorize_candidate(
    labels: &LabelGrid,
    candidate: &ParcelCandidate,
    tracer: &dyn ContourTracer,
    simplifier: &dyn PolygonSimplifier,
    epsilon: f64,
    mapper: &CoordinateMapper,
) -> Option<PolygonRing> {
    let (image, (ox, oy)) = silhouette(labels, candidate);
    let boundaries: Vec<Vec<PixelPoint>> = tracer
        .outer_boundaries(&image)
        .into_iter()
        .map(|boundary| {
            boundary
                .into_iter()
                .map(|p| [p[0] + ox as f64, p[1] + oy as f64])
                .collect::<Vec<_>>()
        })
        .collect();
    let ring = simplify_boundary(boundaries, simplifier, epsilon)?;
    Some(mapper.ring_to_metric(&ring))
}
