use crate::harvester::{HarvestError, Result};
use image::imageops::FilterType;
use image::error::ImageFormatHint;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};

/// Resizes downloaded images in place to fixed dimensions
#[derive(Debug, Clone, Copy)]
pub struct Resizer {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl Resizer {
    /// Exact resize to `width`×`height`; aspect ratio is not preserved
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::CatmullRom,
        }
    }

    /// Decode `path`, resize it and overwrite the file.
    ///
    /// The output format follows the file extension. Without a recognised
    /// extension the decoded format is kept. Returns the original dimensions.
    pub fn resize_file(&self, path: &Path) -> Result<(u32, u32)> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let decoded_format = reader.format();
        let img = reader.decode()?;
        let original = (img.width(), img.height());

        let resized = img.resize_exact(self.width, self.height, self.filter);

        let format = ImageFormat::from_path(path)
            .ok()
            .or(decoded_format)
            .ok_or_else(|| ImageError::Unsupported(ImageFormatHint::Unknown.into()))?;

        encodable_for(resized, format).save_with_format(path, format)?;
        Ok(original)
    }

    /// Same as [`Self::resize_file`], off the async runtime
    pub async fn resize_file_blocking(&self, path: PathBuf) -> Result<(u32, u32)> {
        let resizer = *self;
        tokio::task::spawn_blocking(move || resizer.resize_file(&path))
            .await
            .map_err(|e| HarvestError::Io(std::io::Error::other(e)))?
    }
}

/// JPEG has no alpha channel
fn encodable_for(img: DynamicImage, format: ImageFormat) -> DynamicImage {
    match format {
        ImageFormat::Jpeg if img.color().has_alpha() => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    }
}
