use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageReader, Luma};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::{ParcelError, Result};
use crate::grid::{BooleanGrid, RasterGrid};

const CONDITION_SUFFIX: &str = "_condition.png";
const MASK_SUFFIX: &str = "_mask.png";

/// Where a batch reads its rasters from and writes its documents to.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub roads_dir: PathBuf,
    pub masks_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl SiteLayout {
    /// Conventional `input/roads`, `input/masks`, `result/parcels` layout
    /// under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            roads_dir: root.join("input").join("roads"),
            masks_dir: root.join("input").join("masks"),
            output_dir: root.join("result").join("parcels"),
        }
    }

    pub fn condition_path(&self, site_id: &str) -> PathBuf {
        self.roads_dir.join(format!("{site_id}{CONDITION_SUFFIX}"))
    }

    pub fn mask_path(&self, site_id: &str) -> PathBuf {
        self.masks_dir.join(format!("{site_id}{MASK_SUFFIX}"))
    }

    pub fn parcels_path(&self, site_id: &str) -> PathBuf {
        self.output_dir.join(format!("{site_id}_parcels.json"))
    }

    pub fn roads_path(&self, site_id: &str) -> PathBuf {
        self.output_dir.join(format!("{site_id}_roads.json"))
    }

    /// Every site id with a condition raster, sorted ascending.
    pub fn discover_site_ids(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.roads_dir)
            .map_err(|e| ParcelError::io(&self.roads_dir, e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ParcelError::io(&self.roads_dir, e))?;
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|n| n.strip_suffix(CONDITION_SUFFIX)) {
                if !id.is_empty() {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// The two working-resolution grids of one site.
#[derive(Debug, Clone)]
pub struct SiteRasters {
    pub intensity: RasterGrid,
    pub site_mask: BooleanGrid,
}

/// Locate, decode and resize both rasters of `site_id`.
pub fn load_site(layout: &SiteLayout, site_id: &str, config: &ExtractionConfig) -> Result<SiteRasters> {
    let condition_path = layout.condition_path(site_id);
    let mask_path = layout.mask_path(site_id);
    for path in [&condition_path, &mask_path] {
        if !path.is_file() {
            return Err(ParcelError::MissingInput {
                site_id: site_id.to_string(),
                path: path.clone(),
            });
        }
    }

    let condition = decode(&condition_path)?;
    let mask = decode(&mask_path)?;
    debug!(
        site = site_id,
        condition = ?(condition.width(), condition.height()),
        mask = ?(mask.width(), mask.height()),
        "decoded rasters"
    );

    Ok(prepare_rasters(&condition, &mask, config))
}

/// Bring a decoded condition/mask pair to the working resolution.
///
/// Both rasters are reduced to Rec.601 luma. The condition raster is
/// resampled with a triangle filter; the mask uses nearest-neighbour so its
/// edges stay hard.
pub fn prepare_rasters(
    condition: &DynamicImage,
    mask: &DynamicImage,
    config: &ExtractionConfig,
) -> SiteRasters {
    let (width, height) = config.working_size;
    let intensity = resize_gray(luma_601(condition), width, height, FilterType::Triangle);
    let mask = resize_gray(luma_601(mask), width, height, FilterType::Nearest);

    SiteRasters {
        intensity,
        site_mask: BooleanGrid::threshold_at_least(&mask, config.mask_threshold),
    }
}

/// Gray level with 0.299/0.587/0.114 weights in 16-bit fixed point, rounded.
/// `DynamicImage::to_luma8` weights with Rec.709 instead, which moves pale
/// greens and magentas across the road threshold. Alpha is ignored.
pub fn rec601_luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

fn luma_601(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([rec601_luma(r, g, b)])
    })
}

fn resize_gray(image: GrayImage, width: u32, height: u32, filter: FilterType) -> GrayImage {
    if image.dimensions() == (width, height) {
        return image;
    }
    imageops::resize(&image, width, height, filter)
}

fn decode(path: &Path) -> Result<DynamicImage> {
    let unreadable = |source| ParcelError::UnreadableImage {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)
        .map_err(|e| ParcelError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| ParcelError::io(path, e))?
        .decode()
        .map_err(unreadable)
}
