pub mod filter;
pub mod labeling;
pub mod loader;
pub mod morphology;
pub mod records;
pub mod roads;
pub mod vectorize;

use image::{GrayImage, Luma};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::grid::{LabelGrid, ensure_same_dimensions};
use crate::models::{ExtractionReport, ParcelDocument, ParcelRecord, PolygonRing};
use crate::pipeline::PipelineContext;
use labeling::{ComponentLabeler, Labeler};
use loader::SiteRasters;
use vectorize::{BorderFollowingTracer, ContourTracer, CoordinateMapper, DouglasPeucker, PolygonSimplifier};

/// Parcels and diagnostics of one site run.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub document: ParcelDocument,
    pub report: ExtractionReport,
}

/// Runs stages 2 to 7 on a pair of working-resolution rasters.
///
/// Labelling, tracing and simplification are pluggable; the defaults are
/// `imageproc` components labelling with the configured connectivity,
/// `imageproc` border following and Douglas-Peucker.
pub struct ParcelExtractor {
    config: ExtractionConfig,
    labeler: Box<dyn Labeler>,
    tracer: Box<dyn ContourTracer>,
    simplifier: Box<dyn PolygonSimplifier>,
}

impl ParcelExtractor {
    /// The configuration is expected to be validated already.
    pub fn new(config: ExtractionConfig) -> Self {
        let labeler = ComponentLabeler::new(config.connectivity);
        Self {
            config,
            labeler: Box::new(labeler),
            tracer: Box::new(BorderFollowingTracer),
            simplifier: Box::new(DouglasPeucker),
        }
    }

    pub fn with_labeler(mut self, labeler: Box<dyn Labeler>) -> Self {
        self.labeler = labeler;
        self
    }

    pub fn with_tracer(mut self, tracer: Box<dyn ContourTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_simplifier(mut self, simplifier: Box<dyn PolygonSimplifier>) -> Self {
        self.simplifier = simplifier;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the parcel document of one site.
    pub fn extract(
        &self,
        site_id: &str,
        rasters: &SiteRasters,
        context: &PipelineContext,
    ) -> Result<Extraction> {
        let config = &self.config;
        debug!(
            site = site_id,
            labeler = self.labeler.name(),
            tracer = self.tracer.name(),
            simplifier = self.simplifier.name(),
            "starting extraction"
        );
        let SiteRasters {
            intensity,
            site_mask,
        } = rasters;
        ensure_same_dimensions("loader", config.working_size, intensity.dimensions())?;
        ensure_same_dimensions("loader", config.working_size, site_mask.dimensions())?;
        let (width, height) = intensity.dimensions();

        // Stage 2: road mask
        let road = morphology::build_road_mask(intensity, site_mask, config.road_threshold)?;
        context.save_stage(site_id, 1, "road mask", road.as_image())?;
        let dilated_road = morphology::thicken_roads(&road, config);
        drop(road);
        context.save_stage(site_id, 2, "dilated road", dilated_road.as_image())?;

        // Stage 3: candidate region
        let candidate = morphology::extract_candidates(site_mask, &dilated_road, config)?;
        drop(dilated_road);
        context.save_stage(site_id, 3, "candidate region", candidate.as_image())?;

        // Stage 4: labelling
        let (labels, count) = self.labeler.label(&candidate);
        drop(candidate);
        context.save_stage(site_id, 4, "labels", &visualize_labels(&labels))?;
        debug!(site = site_id, labels = count, "labelled candidate region");

        // Stage 5: filter
        let candidates = labeling::collect_candidates(&labels, count);
        let outcome = filter::filter_parcels(candidates, config.min_parcel_area_px, width, height);
        debug!(
            site = site_id,
            kept = outcome.kept.len(),
            too_small = outcome.too_small,
            touching_border = outcome.touching_border,
            "filtered candidates"
        );

        // Stages 6 and 7: vectorize and build records, in label order
        let mapper = CoordinateMapper::new(width, height, config.site);
        let vectorized: Vec<(u32, Option<ParcelRecord>)> = outcome
            .kept
            .par_iter()
            .map(|candidate| {
                let record = vectorize::vectorize_candidate(
                    &labels,
                    candidate,
                    self.tracer.as_ref(),
                    self.simplifier.as_ref(),
                    config.simplify_epsilon,
                    &mapper,
                )
                .map(|polygon| records::build_record(candidate, polygon, width, height));
                (candidate.label, record)
            })
            .collect();

        let mut parcels = Vec::with_capacity(vectorized.len());
        let mut degenerate = 0;
        for (label, record) in vectorized {
            match record {
                Some(record) => parcels.push(record),
                None => {
                    degenerate += 1;
                    debug!(site = site_id, label, "dropped degenerate parcel outline");
                }
            }
        }

        let report = ExtractionReport {
            raw_labels: count,
            too_small: outcome.too_small,
            touching_border: outcome.touching_border,
            degenerate,
            emitted: parcels.len() as u32,
        };
        info!(
            site = site_id,
            raw = report.raw_labels,
            too_small = report.too_small,
            touching_border = report.touching_border,
            degenerate = report.degenerate,
            parcels = report.emitted,
            "extracted parcels"
        );

        Ok(Extraction {
            document: ParcelDocument {
                site: config.site,
                parcels,
            },
            report,
        })
    }

    /// Display-only road polygons for the same rasters.
    pub fn extract_roads(&self, rasters: &SiteRasters) -> Result<Vec<PolygonRing>> {
        roads::extract_road_polygons(
            &rasters.intensity,
            &rasters.site_mask,
            &self.config,
            self.tracer.as_ref(),
            self.simplifier.as_ref(),
        )
    }
}

/// Spread labels over visible gray levels for debug output.
fn visualize_labels(labels: &LabelGrid) -> GrayImage {
    let (width, height) = labels.dimensions();
    GrayImage::from_fn(width, height, |x, y| match labels.get_pixel(x, y)[0] {
        0 => Luma([0]),
        label => Luma([64 + (label.wrapping_mul(37) % 192) as u8]),
    })
}
