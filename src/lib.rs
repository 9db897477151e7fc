pub mod config;
pub mod error;
pub mod extraction;
pub mod grid;
pub mod landuse;
pub mod models;
pub mod pipeline;

pub use config::{Connectivity, ExtractionConfig, RoadOverlayConfig};
pub use error::{ParcelError, Result};
pub use extraction::loader::{SiteLayout, SiteRasters};
pub use extraction::{Extraction, ParcelExtractor};
pub use grid::{BooleanGrid, LabelGrid, RasterGrid};
pub use landuse::{LandUse, LandUsePlan};
pub use models::{
    ExtractionReport, ParcelCandidate, ParcelDocument, ParcelRecord, PolygonRing, RoadDocument,
    SiteDescriptor,
};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext, SiteOutcome, SiteReport};
