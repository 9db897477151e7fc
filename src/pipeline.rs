use image::GrayImage;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::error::{ParcelError, Result};
use crate::extraction::loader::{self, SiteLayout};
use crate::extraction::{Extraction, ParcelExtractor};
use crate::models::{ExtractionReport, RoadDocument};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Context shared by every site run of a batch
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    /// Write an intermediate grid to `NN_<stage>/<site_id>.png` when debug
    /// mode is on.
    pub fn save_stage(
        &self,
        site_id: &str,
        stage_index: usize,
        stage_name: &str,
        image: &GrayImage,
    ) -> Result<()> {
        let Some(debug_config) = self.debug.as_ref().filter(|d| d.enabled) else {
            return Ok(());
        };

        let step_dir_name = format!(
            "{:02}_{}",
            stage_index,
            stage_name.to_lowercase().replace(' ', "_")
        );
        let step_dir = debug_config.output_dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir).map_err(|e| ParcelError::io(&step_dir, e))?;

        let output_path = step_dir.join(format!("{site_id}.png"));
        image
            .save(&output_path)
            .map_err(|source| ParcelError::ImageWrite {
                path: output_path.clone(),
                source,
            })?;
        debug!(site = site_id, path = %output_path.display(), "saved debug grid");
        Ok(())
    }
}

/// What one successful site run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub report: ExtractionReport,
    pub parcels_path: PathBuf,
    pub roads_path: Option<PathBuf>,
}

/// Result of one site in a batch.
#[derive(Debug)]
pub struct SiteOutcome {
    pub site_id: String,
    pub result: Result<SiteReport>,
}

/// Batch driver: load, extract and write one document per site.
pub struct Pipeline {
    layout: SiteLayout,
    extractor: ParcelExtractor,
    context: PipelineContext,
    with_roads: bool,
}

impl Pipeline {
    /// Fails fast on an invalid configuration, before any site is touched.
    pub fn new(layout: SiteLayout, config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            layout,
            extractor: ParcelExtractor::new(config),
            context: PipelineContext::default(),
            with_roads: false,
        })
    }

    /// Swap in a customised extractor (different labeler, tracer or
    /// simplifier). Its configuration is validated again.
    pub fn with_extractor(mut self, extractor: ParcelExtractor) -> Result<Self> {
        extractor.config().validate()?;
        self.extractor = extractor;
        Ok(self)
    }

    /// Also write the display-only road overlay for every site.
    pub fn with_roads(mut self, with_roads: bool) -> Self {
        self.with_roads = with_roads;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let mut entries =
                std::fs::read_dir(&output_dir).map_err(|e| ParcelError::io(&output_dir, e))?;
            if entries.next().is_some() {
                return Err(ParcelError::InvalidConfig(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir).map_err(|e| ParcelError::io(&output_dir, e))?;
        }

        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });
        Ok(self)
    }

    /// Run every site found in the roads directory.
    pub fn run_all(&self) -> Result<Vec<SiteOutcome>> {
        let ids = self.layout.discover_site_ids()?;
        info!(sites = ids.len(), roads_dir = %self.layout.roads_dir.display(), "discovered sites");
        Ok(self.run_batch(&ids))
    }

    /// Run sites in parallel. A failing site is reported in its outcome and
    /// never stops the others; outcomes come back in input order.
    pub fn run_batch(&self, site_ids: &[String]) -> Vec<SiteOutcome> {
        site_ids
            .par_iter()
            .map(|site_id| {
                let result = self.run_site(site_id);
                if let Err(err) = &result {
                    warn!(site = %site_id, error = %err, "site failed");
                }
                SiteOutcome {
                    site_id: site_id.clone(),
                    result,
                }
            })
            .collect()
    }

    /// Load, extract and write one site's documents.
    pub fn run_site(&self, site_id: &str) -> Result<SiteReport> {
        let config = self.extractor.config();
        let rasters = loader::load_site(&self.layout, site_id, config)?;
        let Extraction { document, report } = self.extractor.extract(site_id, &rasters, &self.context)?;

        let parcels_path = self.layout.parcels_path(site_id);
        let text = document
            .to_json_pretty()
            .map_err(|e| ParcelError::json(&parcels_path, e))?;
        write_document(&parcels_path, &text)?;

        let roads_path = if self.with_roads {
            let roads = self.extractor.extract_roads(&rasters)?;
            let path = self.layout.roads_path(site_id);
            let doc = RoadDocument {
                site: config.site,
                roads,
            };
            let mut text =
                serde_json::to_string_pretty(&doc).map_err(|e| ParcelError::json(&path, e))?;
            text.push('\n');
            write_document(&path, &text)?;
            Some(path)
        } else {
            None
        };

        info!(site = site_id, path = %parcels_path.display(), parcels = report.emitted, "saved parcels");
        Ok(SiteReport {
            report,
            parcels_path,
            roads_path,
        })
    }
}

fn write_document(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ParcelError::io(parent, e))?;
    }
    std::fs::write(path, text).map_err(|e| ParcelError::io(path, e))
}
