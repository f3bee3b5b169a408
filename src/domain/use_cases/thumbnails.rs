use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::image::{DerivedImage, DerivedImageInsert, ImageKind, SourceImage, TimedVariantRequest, UploadedImage},
    errors::AppError,
    repositories::{
        image::ImageRepository,
        media::{ImageResizer, MediaStorage},
    },
    use_cases::{expiry::assign_expire_timestamp, permissions::PermissionSet, slug::SlugGenerator},
};

pub const MAX_INSERT_ATTEMPTS: usize = 3;

pub const TIMED_PERMISSION_DENIED: &str =
    "Your profile type does not have permission to create time limited or this type of thumbnail";

/// One output of the pipeline: the stored label and the target box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSpec {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl VariantSpec {
    pub fn sized(width: u32, height: u32) -> Self {
        VariantSpec {
            label: format!("{width}x{height}"),
            width,
            height,
        }
    }
}

pub fn source_file_key(profile_id: &Uuid, source_id: &Uuid, kind: ImageKind) -> String {
    format!("profile_{}/{}.{}", profile_id, source_id, kind.extension())
}

pub fn derived_file_key(profile_id: &Uuid, derived_id: &Uuid, kind: ImageKind) -> String {
    format!("profile_{}/thumbnails/{}.{}", profile_id, derived_id, kind.extension())
}

/// Variants a plain upload is entitled to, in generation order. Labels that
/// would repeat (a custom size of 200 next to the 200px flag) appear once.
pub fn plan_standard_variants(permissions: &PermissionSet, width: u32, height: u32) -> Vec<VariantSpec> {
    let mut specs = Vec::new();

    if permissions.allow_200px {
        specs.push(VariantSpec::sized(200, 200));
    }
    if permissions.allow_400px {
        specs.push(VariantSpec::sized(400, 400));
    }
    if permissions.allow_original_size_link {
        specs.push(VariantSpec::sized(width, height));
    }
    if permissions.custom_sizes_enabled() {
        specs.extend(permissions.custom_sizes.iter().map(|&size| VariantSpec::sized(size, size)));
    }

    let mut seen = BTreeSet::new();
    specs.retain(|spec| seen.insert(spec.label.clone()));
    specs
}

/// Checks a timed request in order: expiry range, time-limited flag, then the
/// size gate. The variant is labelled with the raw requested size.
pub fn authorize_timed_variant(
    permissions: &PermissionSet,
    request: &TimedVariantRequest,
) -> Result<VariantSpec, AppError> {
    request.validate()?;

    if !permissions.allow_time_limited_link {
        return Err(AppError::PermissionDenied(TIMED_PERMISSION_DENIED.to_string()));
    }

    let size_allowed = match request.size {
        200 => permissions.allow_200px,
        400 => permissions.allow_400px,
        size => permissions.custom_sizes.contains(&size),
    };
    if !size_allowed {
        return Err(AppError::PermissionDenied(TIMED_PERMISSION_DENIED.to_string()));
    }

    Ok(VariantSpec {
        label: request.size.to_string(),
        width: request.size,
        height: request.size,
    })
}

pub struct ThumbnailPipeline<R, Z, S>
where
    R: ImageRepository + ?Sized,
    Z: ImageResizer + ?Sized,
    S: MediaStorage + ?Sized,
{
    pub image_repo: Arc<R>,
    pub resizer: Arc<Z>,
    pub storage: Arc<S>,
    pub slugs: SlugGenerator,
}

impl<R, Z, S> ThumbnailPipeline<R, Z, S>
where
    R: ImageRepository + ?Sized,
    Z: ImageResizer + ?Sized,
    S: MediaStorage + ?Sized,
{
    pub fn new(image_repo: Arc<R>, resizer: Arc<Z>, storage: Arc<S>) -> Self {
        ThumbnailPipeline {
            image_repo,
            resizer,
            storage,
            slugs: SlugGenerator::new(),
        }
    }

    pub fn with_slug_generator(mut self, slugs: SlugGenerator) -> Self {
        self.slugs = slugs;
        self
    }

    /// Generates every non-expiring variant the permissions allow. Either the
    /// whole set is persisted or nothing is.
    pub async fn create_standard_variants(
        &self,
        source: &SourceImage,
        image: &UploadedImage,
        permissions: &PermissionSet,
        now: DateTime<Utc>,
    ) -> Result<Vec<DerivedImage>, AppError> {
        let specs = plan_standard_variants(permissions, image.width, image.height);
        self.generate(source, image, &specs, None, now).await
    }

    pub async fn create_timed_variant(
        &self,
        source: &SourceImage,
        image: &UploadedImage,
        permissions: &PermissionSet,
        request: &TimedVariantRequest,
        now: DateTime<Utc>,
    ) -> Result<DerivedImage, AppError> {
        let spec = authorize_timed_variant(permissions, request)?;
        let expire_duration = i32::try_from(request.expire_time)
            .map_err(|_| AppError::invalid_field("expire_time", "Ensure this value is between 300 and 30000."))?;

        self.generate(source, image, std::slice::from_ref(&spec), Some(expire_duration), now)
            .await?
            .pop()
            .ok_or_else(|| AppError::InternalError("timed variant was not persisted".into()))
    }

    async fn generate(
        &self,
        source: &SourceImage,
        image: &UploadedImage,
        specs: &[VariantSpec],
        expire_duration: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DerivedImage>, AppError> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        let encoded = try_join_all(specs.iter().map(|spec| {
            self.resizer.resize(Arc::clone(&image.bytes), image.kind, spec.width, spec.height)
        }))
        .await
        .map_err(|e| match e {
            AppError::GenerationFailed(_) => e,
            other => AppError::GenerationFailed(other.to_string()),
        })?;

        let mut rows: Vec<DerivedImageInsert> = specs
            .iter()
            .map(|spec| {
                let id = Uuid::new_v4();
                let mut row = DerivedImageInsert {
                    id,
                    source_image_id: source.id,
                    variant_type: spec.label.clone(),
                    file_key: derived_file_key(&source.profile_id, &id, image.kind),
                    slug: String::new(),
                    expire_duration,
                    expire_at: None,
                    created_at: now,
                };
                assign_expire_timestamp(&mut row);
                row
            })
            .collect();

        let mut saved: Vec<String> = Vec::with_capacity(rows.len());
        for (row, bytes) in rows.iter().zip(encoded.iter()) {
            if let Err(e) = self.storage.save(&row.file_key, bytes).await {
                self.remove_files(&saved).await;
                return Err(e);
            }
            saved.push(row.file_key.clone());
        }

        if let Err(e) = self.persist(&mut rows).await {
            self.remove_files(&saved).await;
            return Err(e);
        }

        tracing::info!(
            "Generated {} thumbnail(s) for source image {}",
            rows.len(),
            source.id
        );
        Ok(rows.into_iter().map(DerivedImage::from).collect())
    }

    /// Assigns fresh slugs and inserts the batch, retrying when the insert
    /// loses a slug race to another request.
    async fn persist(&self, rows: &mut [DerivedImageInsert]) -> Result<(), AppError> {
        let mut attempt = 1;
        loop {
            let mut reserved = HashSet::with_capacity(rows.len());
            for row in rows.iter_mut() {
                let slug = self
                    .slugs
                    .generate_unique_slug(self.image_repo.as_ref(), &reserved)
                    .await?;
                reserved.insert(slug.clone());
                row.slug = slug;
            }

            match self.image_repo.insert_derived_images(rows).await {
                Ok(()) => return Ok(()),
                Err(AppError::SlugCollision) if attempt < MAX_INSERT_ATTEMPTS => {
                    tracing::warn!("Slug collision on insert attempt {}, retrying", attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn remove_files(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!("Failed to remove orphaned file {}: {}", key, e);
            }
        }
    }
}
