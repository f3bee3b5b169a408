use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::use_cases::expiry::{MAX_EXPIRE_SECONDS, MIN_EXPIRE_SECONDS};

// ───── Upload Input ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            ImageKind::Png => image::ImageFormat::Png,
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// An upload that already passed type and size checks.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone, Validate)]
pub struct TimedVariantRequest {
    pub size: u32,

    #[validate(range(
        min = MIN_EXPIRE_SECONDS,
        max = MAX_EXPIRE_SECONDS,
        message = "Ensure this value is between 300 and 30000."
    ))]
    pub expire_time: i64,
}

// ───── Database Models ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SourceImage {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub file_key: String,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DerivedImage {
    pub id: Uuid,
    pub source_image_id: Uuid,
    pub variant_type: String,
    pub file_key: String,
    pub slug: String,
    pub expire_duration: Option<i32>,
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DerivedImageInsert {
    pub id: Uuid,
    pub source_image_id: Uuid,
    pub variant_type: String,
    pub file_key: String,
    pub slug: String,
    pub expire_duration: Option<i32>,
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<DerivedImageInsert> for DerivedImage {
    fn from(insert: DerivedImageInsert) -> Self {
        DerivedImage {
            id: insert.id,
            source_image_id: insert.source_image_id,
            variant_type: insert.variant_type,
            file_key: insert.file_key,
            slug: insert.slug,
            expire_duration: insert.expire_duration,
            expire_at: insert.expire_at,
            created_at: insert.created_at,
        }
    }
}

// ───── API Response Models ──────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub file: String,
    pub width: i32,
    pub height: i32,
    pub thumbnails: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct DerivedImageResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub variant_type: String,
    pub image_url: String,
    pub expire_duration: Option<i32>,
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SourceImageResponse {
    pub id: Uuid,
    pub file: String,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
    pub thumbnails: Vec<DerivedImageResponse>,
}

/// What the public display page needs for one slug.
#[derive(Debug, Serialize)]
pub struct DisplayedImage {
    pub slug: String,
    pub variant_type: String,
    pub media_url: String,
    pub expired: bool,
    pub expire_at: Option<DateTime<Utc>>,
}
