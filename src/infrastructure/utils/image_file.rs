use std::{io::{self, Cursor}, path::Path, sync::Arc};
use tokio::fs;

use derive_more::Display;
use image::ImageReader;

use crate::{
    constants::{ALLOWED_IMAGE_EXTENSIONS, MAX_IMAGE_DIMENSION},
    entities::image::{ImageKind, UploadedImage},
    errors::AppError,
};

/// Validates an uploaded image file for extension, content, size and
/// dimensions, and loads it into memory.
///
/// - `original_filename`: The filename from TempFile::file_name
/// - `file_path`: The path from TempFile::file.path()
/// - `max_size`: Max size in bytes
pub async fn read_image_upload(
    original_filename: Option<&str>,
    file_path: &Path,
    max_size: usize,
) -> Result<UploadedImage, ImageFileError> {
    let file_name = original_filename.ok_or(ImageFileError::InvalidExtension)?;
    extension_kind(file_name)?;

    let metadata = fs::metadata(file_path)
        .await
        .map_err(ImageFileError::IoError)?;
    if metadata.len() == 0 {
        return Err(ImageFileError::EmptyFile);
    }
    if metadata.len() > max_size as u64 {
        return Err(ImageFileError::FileTooLarge);
    }

    let bytes = fs::read(file_path)
        .await
        .map_err(ImageFileError::IoError)?;

    inspect_image_bytes(file_name, bytes, max_size)
}

/// Same checks as `read_image_upload`, for bytes already in memory.
pub fn inspect_image_bytes(
    file_name: &str,
    bytes: Vec<u8>,
    max_size: usize,
) -> Result<UploadedImage, ImageFileError> {
    let claimed = extension_kind(file_name)?;

    if bytes.is_empty() {
        return Err(ImageFileError::EmptyFile);
    }
    if bytes.len() > max_size {
        return Err(ImageFileError::FileTooLarge);
    }

    // Content sniffing must agree with the extension family
    let sniffed = infer::get(&bytes)
        .and_then(|kind| ImageKind::from_mime(kind.mime_type()))
        .ok_or(ImageFileError::InvalidType)?;
    if sniffed != claimed {
        return Err(ImageFileError::InvalidType);
    }

    let (width, height) = ImageReader::with_format(Cursor::new(&bytes), sniffed.image_format())
        .into_dimensions()
        .map_err(|e| ImageFileError::InvalidImage(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(ImageFileError::InvalidImage("image has no pixels".into()));
    }
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ImageFileError::DimensionsTooLarge);
    }

    Ok(UploadedImage {
        file_name: file_name.to_string(),
        kind: sniffed,
        width,
        height,
        bytes: Arc::from(bytes),
    })
}

fn extension_kind(file_name: &str) -> Result<ImageKind, ImageFileError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase());

    match ext.as_deref() {
        Some(e) if ALLOWED_IMAGE_EXTENSIONS.contains(&e) => {
            ImageKind::from_extension(e).ok_or(ImageFileError::InvalidExtension)
        }
        _ => Err(ImageFileError::InvalidExtension),
    }
}

/// All errors related to image upload handling.
#[derive(Debug, Display)]
pub enum ImageFileError {
    #[display("Incorrect file type. Allowed types: jpg png")]
    InvalidExtension,

    #[display("Incorrect file type. Allowed types: jpg png")]
    InvalidType,

    #[display("The submitted file is empty.")]
    EmptyFile,

    #[display("File size exceeds maximum allowed.")]
    FileTooLarge,

    #[display("Image dimensions exceed 8192 px.")]
    DimensionsTooLarge,

    #[display("Upload a valid image. {_0}")]
    InvalidImage(String),

    #[display("Failed to read file: {_0}")]
    IoError(io::Error),
}

impl From<ImageFileError> for AppError {
    fn from(err: ImageFileError) -> Self {
        match err {
            ImageFileError::IoError(e) => AppError::InternalError(format!("Failed to read upload: {}", e)),
            other => AppError::invalid_field("file", other.to_string()),
        }
    }
}
