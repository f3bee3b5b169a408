use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;

use crate::{errors::AppError, repositories::media::MediaStorage};

/// Stores media as plain files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalMediaStorage { root: root.into() }
    }

    /// Keys are relative paths; anything escaping the root is refused.
    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));

        if !safe {
            return Err(AppError::InternalError(format!("Refusing media key {key:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::InternalError(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to write {}: {}", path.display(), e)))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::InternalError(format!("Failed to delete {}: {}", path.display(), e))),
        }
    }
}
