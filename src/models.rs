use serde::{Deserialize, Serialize};

/// Metric extent the pixel grid is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    pub width_m: f64,
    pub height_m: f64,
}

impl Default for SiteDescriptor {
    fn default() -> Self {
        Self {
            width_m: 1000.0,
            height_m: 1000.0,
        }
    }
}

/// One labelled region with the statistics the filter and the record builder
/// need. Only lives between labelling and vectorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelCandidate {
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
    pub sum_x: u64,
    pub sum_y: u64,
}

impl ParcelCandidate {
    pub fn new(label: u32, x: u32, y: u32) -> Self {
        Self {
            label,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            pixel_count: 1,
            sum_x: x as u64,
            sum_y: y as u64,
        }
    }

    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.pixel_count += 1;
        self.sum_x += x as u64;
        self.sum_y += y as u64;
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u32 {
        self.pixel_count
    }

    /// Mean pixel position (x, y)
    pub fn mean_position(&self) -> (f64, f64) {
        let n = self.pixel_count as f64;
        (self.sum_x as f64 / n, self.sum_y as f64 / n)
    }

    /// Whether the bounding extent reaches row 0, column 0, the last row or
    /// the last column of a `width` x `height` raster.
    pub fn touches_border(&self, width: u32, height: u32) -> bool {
        self.min_x == 0
            || self.min_y == 0
            || self.max_x + 1 >= width
            || self.max_y + 1 >= height
    }
}

/// Closed simple ring of at least three distinct vertices. The closing edge
/// is implicit; the first vertex is not repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolygonRing(pub Vec<[f64; 2]>);

impl PolygonRing {
    pub fn points(&self) -> &[[f64; 2]] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Absolute shoelace area in the ring's own units.
    pub fn area(&self) -> f64 {
        shoelace_area(&self.0).abs()
    }
}

/// Signed shoelace area of a closed ring.
pub fn shoelace_area(points: &[[f64; 2]]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        twice += a[0] * b[1] - b[0] * a[1];
    }
    twice / 2.0
}

/// Output unit for one parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    pub id: String,
    pub area_px: u32,
    pub centroid_norm: [f64; 2],
    pub polygon: PolygonRing,
}

impl ParcelRecord {
    /// `P` followed by the label id zero-padded to three digits.
    pub fn id_for_label(label: u32) -> String {
        format!("P{label:03}")
    }
}

/// Per-site output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelDocument {
    pub site: SiteDescriptor,
    pub parcels: Vec<ParcelRecord>,
}

impl ParcelDocument {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}

/// Display-only road overlay for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadDocument {
    pub site: SiteDescriptor,
    pub roads: Vec<PolygonRing>,
}

/// Counters describing what happened to each label of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub raw_labels: u32,
    pub too_small: u32,
    pub touching_border: u32,
    pub degenerate: u32,
    pub emitted: u32,
}
