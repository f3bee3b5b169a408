use std::{io::Cursor, sync::Arc};

use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, ImageReader, Limits};

use crate::{
    constants::MAX_IMAGE_DIMENSION,
    entities::image::ImageKind,
    errors::AppError,
    repositories::media::ImageResizer,
};

/// Resizes with the `image` crate: scale to cover the target box, then crop
/// the centre. Smaller sources are upscaled.
#[derive(Debug, Clone, Default)]
pub struct ImageCrateResizer;

impl ImageCrateResizer {
    pub fn new() -> Self {
        ImageCrateResizer
    }
}

/// CPU-bound; call from `spawn_blocking`.
pub fn resize_to_fill(data: &[u8], kind: ImageKind, width: u32, height: u32) -> Result<Vec<u8>, AppError> {
    if width == 0 || height == 0 || width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(AppError::GenerationFailed(format!("Invalid target size {width}x{height}")));
    }

    let format = kind.image_format();
    let mut reader = ImageReader::with_format(Cursor::new(data), format);
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    reader.limits(limits);

    let img = reader
        .decode()
        .map_err(|e| AppError::GenerationFailed(format!("Decode failed: {e}")))?;

    let resized = img.resize_to_fill(width, height, FilterType::Lanczos3);
    let resized = match kind {
        ImageKind::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        ImageKind::Png => resized,
    };

    let mut buf = Cursor::new(Vec::new());
    resized
        .write_to(&mut buf, format)
        .map_err(|e| AppError::GenerationFailed(format!("Encode failed: {e}")))?;

    Ok(buf.into_inner())
}

#[async_trait]
impl ImageResizer for ImageCrateResizer {
    async fn resize(&self, source: Arc<[u8]>, kind: ImageKind, width: u32, height: u32) -> Result<Vec<u8>, AppError> {
        tokio::task::spawn_blocking(move || resize_to_fill(&source, kind, width, height))
            .await
            .map_err(|e| AppError::GenerationFailed(format!("Resize task failed: {e}")))?
    }
}
