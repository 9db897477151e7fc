use image::{GrayImage, ImageBuffer, Luma};

use crate::error::{ParcelError, Result};

/// Grayscale intensity raster, 0 (black) to 255 (white).
pub type RasterGrid = GrayImage;

/// Per-pixel component labels; 0 is background.
pub type LabelGrid = ImageBuffer<Luma<u32>, Vec<u32>>;

const INSIDE: u8 = 255;
const OUTSIDE: u8 = 0;

/// Binary raster stored as a 0/255 luma image so it can be handed straight
/// to `imageproc` morphology, labelling and contour tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanGrid {
    image: GrayImage,
}

impl BooleanGrid {
    /// All-outside grid of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self {
            image: GrayImage::from_fn(width, height, |x, y| {
                Luma([if f(x, y) { INSIDE } else { OUTSIDE }])
            }),
        }
    }

    /// Interpret any non-zero pixel as inside.
    pub fn from_image(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_fn(width, height, |x, y| image.get_pixel(x, y)[0] != 0)
    }

    /// Pixels with intensity at or above `threshold` are inside.
    pub fn threshold_at_least(raster: &RasterGrid, threshold: u8) -> Self {
        let (width, height) = raster.dimensions();
        Self::from_fn(width, height, |x, y| raster.get_pixel(x, y)[0] >= threshold)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] != OUTSIDE
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.image
            .put_pixel(x, y, Luma([if value { INSIDE } else { OUTSIDE }]));
    }

    pub fn count(&self) -> usize {
        self.image.pixels().filter(|p| p[0] != OUTSIDE).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn complement(&self) -> Self {
        let (width, height) = self.dimensions();
        Self::from_fn(width, height, |x, y| !self.get(x, y))
    }

    /// `self AND NOT other`
    pub fn and_not(&self, other: &BooleanGrid, stage: &'static str) -> Result<Self> {
        ensure_same_dimensions(stage, self.dimensions(), other.dimensions())?;
        let (width, height) = self.dimensions();
        Ok(Self::from_fn(width, height, |x, y| {
            self.get(x, y) && !other.get(x, y)
        }))
    }

    pub fn and(&self, other: &BooleanGrid, stage: &'static str) -> Result<Self> {
        ensure_same_dimensions(stage, self.dimensions(), other.dimensions())?;
        let (width, height) = self.dimensions();
        Ok(Self::from_fn(width, height, |x, y| {
            self.get(x, y) && other.get(x, y)
        }))
    }
}

pub(crate) fn ensure_same_dimensions(
    stage: &'static str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<()> {
    if expected != actual {
        return Err(ParcelError::DimensionMismatch {
            stage,
            expected,
            actual,
        });
    }
    Ok(())
}
