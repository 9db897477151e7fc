mod common;

use common::*;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use parcelize::RoadDocument;
use parcelize::extraction::loader::{load_site, prepare_rasters, rec601_luma};
use parcelize::extraction::vectorize::{ContourTracer, PixelPoint};

fn read_document(path: &std::path::Path) -> anyhow::Result<ParcelDocument> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

#[test]
fn batch_writes_one_document_per_site() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    write_site(&layout, "002", &grid_condition(), &square_mask());
    write_site(&layout, "001", &split_condition(), &square_mask());

    let pipeline = Pipeline::new(layout.clone(), test_config())?;
    let outcomes = pipeline.run_all()?;

    let ids: Vec<&str> = outcomes.iter().map(|o| o.site_id.as_str()).collect();
    assert_eq!(ids, vec!["001", "002"]);

    let first = outcomes[0].result.as_ref().expect("site 001 failed");
    assert_eq!(first.parcels_path, layout.parcels_path("001"));
    assert_eq!(first.report.emitted, 2);
    assert!(first.roads_path.is_none());

    let written = read_document(&layout.parcels_path("001"))?;
    let in_memory = extract(&split_condition(), &square_mask(), &test_config()).document;
    assert_eq!(written, in_memory);

    let second = read_document(&layout.parcels_path("002"))?;
    assert_eq!(second.parcels.len(), 9);
    Ok(())
}

#[test]
fn failing_sites_do_not_stop_siblings() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    write_site(&layout, "001", &split_condition(), &square_mask());
    write_site(&layout, "003", &blank_condition(), &square_mask());
    // 002 has no mask, 003's condition raster is garbage
    blank_condition().save_with_format(layout.condition_path("002"), image::ImageFormat::Png)?;
    std::fs::write(layout.condition_path("003"), b"definitely not a png")?;

    let pipeline = Pipeline::new(layout.clone(), test_config())?;
    let outcomes = pipeline.run_all()?;
    assert_eq!(outcomes.len(), 3);

    assert!(outcomes[0].result.is_ok());
    assert!(matches!(
        &outcomes[1].result,
        Err(ParcelError::MissingInput { site_id, .. }) if site_id == "002"
    ));
    assert!(matches!(
        &outcomes[2].result,
        Err(ParcelError::UnreadableImage { .. })
    ));

    assert!(layout.parcels_path("001").is_file());
    assert!(!layout.parcels_path("002").exists());
    assert!(!layout.parcels_path("003").exists());
    Ok(())
}

#[test]
fn explicit_site_list_is_processed_in_order() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    write_site(&layout, "010", &split_condition(), &square_mask());

    let pipeline = Pipeline::new(layout, test_config())?;
    let outcomes = pipeline.run_batch(&["999".to_string(), "010".to_string()]);

    assert_eq!(outcomes[0].site_id, "999");
    assert!(matches!(outcomes[0].result, Err(ParcelError::MissingInput { .. })));
    assert_eq!(outcomes[1].site_id, "010");
    assert!(outcomes[1].result.is_ok());
    Ok(())
}

#[test]
fn repeated_runs_write_identical_bytes() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    write_site(&layout, "001", &grid_condition(), &square_mask());

    let pipeline = Pipeline::new(layout.clone(), test_config())?;
    pipeline.run_site("001")?;
    let first = std::fs::read(layout.parcels_path("001"))?;
    pipeline.run_site("001")?;
    let second = std::fs::read(layout.parcels_path("001"))?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn road_overlay_is_written_on_request() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    write_site(&layout, "001", &split_condition(), &square_mask());

    let pipeline = Pipeline::new(layout.clone(), test_config())?.with_roads(true);
    let report = pipeline.run_site("001")?;

    let roads_path = report.roads_path.expect("roads path missing");
    assert_eq!(roads_path, layout.roads_path("001"));
    let roads: RoadDocument = serde_json::from_str(&std::fs::read_to_string(&roads_path)?)?;
    assert_eq!(roads.roads.len(), 1);
    assert!(roads.roads[0].len() >= 3);

    // The overlay leaves parcel geometry alone
    let parcels = read_document(&layout.parcels_path("001"))?;
    assert_eq!(parcels, extract(&split_condition(), &square_mask(), &test_config()).document);
    Ok(())
}

#[test]
fn debug_mode_dumps_stage_grids() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    write_site(&layout, "001", &split_condition(), &square_mask());
    let debug_dir = dir.path().join("debug");

    let pipeline = Pipeline::new(layout, test_config())?.with_debug(debug_dir.clone())?;
    pipeline.run_site("001")?;

    for stage in ["01_road_mask", "02_dilated_road", "03_candidate_region", "04_labels"] {
        assert!(debug_dir.join(stage).join("001.png").is_file(), "missing {stage}");
    }
    Ok(())
}

#[test]
fn debug_directory_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    let result = Pipeline::new(layout_in(dir.path()), test_config())?
        .with_debug(dir.path().to_path_buf());
    assert!(matches!(result, Err(ParcelError::InvalidConfig(_))));
    Ok(())
}

#[test]
fn invalid_config_fails_before_any_site() {
    let config = ExtractionConfig {
        kernel_size: 0,
        ..test_config()
    };
    let result = Pipeline::new(layout_in(std::path::Path::new("does-not-exist")), config);
    assert!(matches!(result, Err(ParcelError::InvalidConfig(_))));
}

#[test]
fn loader_resizes_to_working_resolution() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    let condition = GrayImage::from_pixel(400, 300, Luma([255]));
    let mask = GrayImage::from_fn(400, 300, |x, y| {
        Luma([if (40..360).contains(&x) && (30..270).contains(&y) { 200 } else { 10 }])
    });
    write_site(&layout, "big", &condition, &mask);

    let rasters = load_site(&layout, "big", &test_config())?;
    assert_eq!(rasters.intensity.dimensions(), (SIZE, SIZE));
    assert_eq!(rasters.site_mask.dimensions(), (SIZE, SIZE));
    assert!(rasters.site_mask.get(100, 100));
    assert!(!rasters.site_mask.get(5, 5));
    assert!(!rasters.site_mask.get(195, 195));
    Ok(())
}

#[test]
fn mask_threshold_is_inclusive() {
    let config = test_config();
    let mask = GrayImage::from_fn(SIZE, SIZE, |x, _| Luma([if x < 100 { 128 } else { 127 }]));
    let rasters = prepare_rasters(
        &DynamicImage::ImageLuma8(blank_condition()),
        &DynamicImage::ImageLuma8(mask),
        &config,
    );
    assert!(rasters.site_mask.get(99, 0));
    assert!(!rasters.site_mask.get(100, 0));
}

#[test]
fn discover_ignores_other_files() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    write_site(&layout, "b7", &blank_condition(), &square_mask());
    write_site(&layout, "a1", &blank_condition(), &square_mask());
    std::fs::write(layout.roads_dir.join("notes.txt"), "ignore me")?;
    std::fs::write(layout.roads_dir.join("c3_mask.png"), "wrong dir")?;

    assert_eq!(layout.discover_site_ids()?, vec!["a1".to_string(), "b7".to_string()]);
    Ok(())
}

#[test]
fn colour_conditions_use_rec601_luma() {
    let config = test_config();
    // Pale magenta: 223 with Rec.601 weights (not a road), 215 with Rec.709
    let condition = RgbImage::from_fn(SIZE, SIZE, |x, _| {
        if x < 100 { Rgb([255, 200, 255]) } else { Rgb([17, 17, 17]) }
    });
    let rasters = prepare_rasters(
        &DynamicImage::ImageRgb8(condition),
        &DynamicImage::ImageLuma8(square_mask()),
        &config,
    );

    assert_eq!(rec601_luma(255, 200, 255), 223);
    assert_eq!(rasters.intensity.get_pixel(10, 10)[0], 223);
    assert!(rasters.intensity.get_pixel(10, 10)[0] >= config.road_threshold);
    assert_eq!(rasters.intensity.get_pixel(150, 10)[0], 17);
    assert_eq!(rec601_luma(255, 255, 255), 255);
    assert_eq!(rec601_luma(0, 0, 0), 0);
}

struct NoBoundaries;

impl ContourTracer for NoBoundaries {
    fn outer_boundaries(&self, _silhouette: &GrayImage) -> Vec<Vec<PixelPoint>> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "None"
    }
}

#[test]
fn pipeline_runs_with_a_custom_extractor() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let layout = layout_in(dir.path());
    write_site(&layout, "001", &split_condition(), &square_mask());

    let extractor = ParcelExtractor::new(test_config()).with_tracer(Box::new(NoBoundaries));
    let pipeline = Pipeline::new(layout.clone(), test_config())?.with_extractor(extractor)?;
    let report = pipeline.run_site("001")?.report;

    assert_eq!(report.raw_labels, 2);
    assert_eq!(report.degenerate, 2);
    assert_eq!(report.emitted, 0);
    assert!(read_document(&layout.parcels_path("001"))?.parcels.is_empty());
    Ok(())
}

#[test]
fn custom_extractor_config_is_validated() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let bad = ExtractionConfig {
        kernel_size: 4,
        ..test_config()
    };
    let result = Pipeline::new(layout_in(dir.path()), test_config())?
        .with_extractor(ParcelExtractor::new(bad));
    assert!(matches!(result, Err(ParcelError::InvalidConfig(_))));
    Ok(())
}
