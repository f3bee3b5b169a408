use url::Url;

use crate::errors::AppError;

/// Builds the absolute links handed back to clients.
#[derive(Debug, Clone)]
pub struct PublicUrls {
    base: Url,
}

impl PublicUrls {
    pub fn new(base: &str) -> Result<Self, AppError> {
        let mut base = Url::parse(base)
            .map_err(|e| AppError::InternalError(format!("Invalid public base URL: {}", e)))?;

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(PublicUrls { base })
    }

    fn join(&self, path: &str) -> String {
        self.base
            .join(path)
            .map(String::from)
            .unwrap_or_else(|_| format!("{}{}", self.base, path))
    }

    /// Public display page of a derived image.
    pub fn image_page(&self, slug: &str) -> String {
        self.join(&format!("i/{}/", slug))
    }

    /// Direct link to a stored file.
    pub fn media(&self, file_key: &str) -> String {
        self.join(&format!("media/{}", file_key))
    }
}
