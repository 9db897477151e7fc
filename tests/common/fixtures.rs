use image::{DynamicImage, GrayImage, Luma};
use parcelize::extraction::loader::prepare_rasters;
use parcelize::{Extraction, ExtractionConfig, ParcelExtractor, PipelineContext, SiteLayout};
use std::path::Path;

/// Working resolution of every synthetic site
pub const SIZE: u32 = 200;

/// Inclusive pixel range of the square site mask
pub const MASK_LO: u32 = 20;
pub const MASK_HI: u32 = 179;

pub const ROAD: u8 = 0;
pub const BACKGROUND: u8 = 255;

/// Config matching the synthetic rasters: 200x200 working size and a
/// minimum area suited to that resolution.
pub fn test_config() -> ExtractionConfig {
    ExtractionConfig {
        working_size: (SIZE, SIZE),
        min_parcel_area_px: 500,
        ..Default::default()
    }
}

/// All-white condition raster (no roads)
pub fn blank_condition() -> GrayImage {
    GrayImage::from_pixel(SIZE, SIZE, Luma([BACKGROUND]))
}

/// Mask that is inside on the inclusive rectangle [x0, x1] x [y0, y1].
pub fn rect_mask(x0: u32, x1: u32, y0: u32, y1: u32) -> GrayImage {
    GrayImage::from_fn(SIZE, SIZE, |x, y| {
        let inside = (x0..=x1).contains(&x) && (y0..=y1).contains(&y);
        Luma([if inside { 255 } else { 0 }])
    })
}

pub fn square_mask() -> GrayImage {
    rect_mask(MASK_LO, MASK_HI, MASK_LO, MASK_HI)
}

/// Paint a dark vertical band over columns [x0, x1].
pub fn draw_vertical_road(image: &mut GrayImage, x0: u32, x1: u32) {
    for y in 0..image.height() {
        for x in x0..=x1 {
            image.put_pixel(x, y, Luma([ROAD]));
        }
    }
}

/// Paint a dark horizontal band over rows [y0, y1].
pub fn draw_horizontal_road(image: &mut GrayImage, y0: u32, y1: u32) {
    for x in 0..image.width() {
        for y in y0..=y1 {
            image.put_pixel(x, y, Luma([ROAD]));
        }
    }
}

/// Condition raster with one two-pixel road splitting the square mask.
pub fn split_condition() -> GrayImage {
    let mut condition = blank_condition();
    draw_vertical_road(&mut condition, 99, 100);
    condition
}

/// Condition raster with two vertical and two horizontal roads cutting the
/// square mask into a 3x3 grid.
pub fn grid_condition() -> GrayImage {
    let mut condition = blank_condition();
    for (a, b) in [(72, 73), (126, 127)] {
        draw_vertical_road(&mut condition, a, b);
        draw_horizontal_road(&mut condition, a, b);
    }
    condition
}

/// Run stages 2-7 in memory.
pub fn extract(condition: &GrayImage, mask: &GrayImage, config: &ExtractionConfig) -> Extraction {
    extract_with(ParcelExtractor::new(config.clone()), condition, mask)
}

pub fn extract_with(extractor: ParcelExtractor, condition: &GrayImage, mask: &GrayImage) -> Extraction {
    let rasters = prepare_rasters(
        &DynamicImage::ImageLuma8(condition.clone()),
        &DynamicImage::ImageLuma8(mask.clone()),
        extractor.config(),
    );
    extractor
        .extract("test", &rasters, &PipelineContext::default())
        .expect("extraction failed")
}

/// `root/roads`, `root/masks`, `root/out`
pub fn layout_in(root: &Path) -> SiteLayout {
    SiteLayout {
        roads_dir: root.join("roads"),
        masks_dir: root.join("masks"),
        output_dir: root.join("out"),
    }
}

/// Write a site's rasters as PNGs following the layout's naming.
pub fn write_site(layout: &SiteLayout, site_id: &str, condition: &GrayImage, mask: &GrayImage) {
    std::fs::create_dir_all(&layout.roads_dir).expect("Failed to create roads dir");
    std::fs::create_dir_all(&layout.masks_dir).expect("Failed to create masks dir");
    condition
        .save_with_format(layout.condition_path(site_id), image::ImageFormat::Png)
        .expect("Failed to save condition image");
    mask.save_with_format(layout.mask_path(site_id), image::ImageFormat::Png)
        .expect("Failed to save mask image");
}
