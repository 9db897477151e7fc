#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from parcelize for tests
pub use parcelize::{
    BooleanGrid, Connectivity, ExtractionConfig, ExtractionReport, ParcelDocument, ParcelError,
    ParcelExtractor, ParcelRecord, Pipeline, SiteDescriptor, SiteLayout,
};
