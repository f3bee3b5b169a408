use std::sync::Arc;

use async_trait::async_trait;

use crate::{entities::image::ImageKind, errors::AppError};

/// Where original uploads and generated variants are written.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Resize primitive. Targets are filled completely: upscaling and centre
/// cropping are both allowed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageResizer: Send + Sync {
    async fn resize(
        &self,
        source: Arc<[u8]>,
        kind: ImageKind,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, AppError>;
}
