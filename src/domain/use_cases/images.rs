use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        image::{
            DerivedImage, DerivedImageResponse, DisplayedImage, SourceImage, SourceImageResponse,
            TimedVariantRequest, UploadResponse, UploadedImage,
        },
        profile::Profile,
    },
    errors::AppError,
    repositories::{
        image::ImageRepository,
        media::{ImageResizer, MediaStorage},
        profile::ProfileRepository,
    },
    use_cases::{
        expiry::is_expired,
        permissions::{PermissionResolver, PermissionSet},
        thumbnails::{authorize_timed_variant, source_file_key, ThumbnailPipeline, TIMED_PERMISSION_DENIED},
    },
    utils::public_url::PublicUrls,
};

const ITEM_NOT_FOUND: &str = "Item not found";

pub struct ImageHandler<R, P, Z, S>
where
    R: ImageRepository + ?Sized,
    P: ProfileRepository + ?Sized,
    Z: ImageResizer + ?Sized,
    S: MediaStorage + ?Sized,
{
    pub image_repo: Arc<R>,
    pub profile_repo: Arc<P>,
    pub storage: Arc<S>,
    pub permissions: PermissionResolver<P>,
    pub pipeline: ThumbnailPipeline<R, Z, S>,
    pub urls: PublicUrls,
}

impl<R, P, Z, S> ImageHandler<R, P, Z, S>
where
    R: ImageRepository + ?Sized,
    P: ProfileRepository + ?Sized,
    Z: ImageResizer + ?Sized,
    S: MediaStorage + ?Sized,
{
    pub fn new(
        image_repo: Arc<R>,
        profile_repo: Arc<P>,
        resizer: Arc<Z>,
        storage: Arc<S>,
        urls: PublicUrls,
    ) -> Self {
        ImageHandler {
            permissions: PermissionResolver::new(Arc::clone(&profile_repo)),
            pipeline: ThumbnailPipeline::new(Arc::clone(&image_repo), resizer, Arc::clone(&storage)),
            image_repo,
            profile_repo,
            storage,
            urls,
        }
    }

    /// Resolves the caller's profile, creating an empty one on first contact
    pub async fn profile_for_user(&self, user_id: &Uuid) -> Result<Profile, AppError> {
        self.profile_repo.get_or_create_profile(user_id).await
    }

    /// Stores an upload and generates every variant its owner may have.
    /// A profile without an account type keeps the source but gets no thumbnails.
    pub async fn upload(&self, profile: &Profile, image: UploadedImage) -> Result<UploadResponse, AppError> {
        let permissions = match self.permissions.resolve(profile).await {
            Ok(permissions) => permissions,
            Err(AppError::NoPermissions) => {
                tracing::info!("Profile {} has no account type, skipping thumbnails", profile.id);
                PermissionSet::none()
            }
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        let source = self.store_source(profile, &image, now).await?;

        match self
            .pipeline
            .create_standard_variants(&source, &image, &permissions, now)
            .await
        {
            Ok(variants) => Ok(self.upload_response(&source, &variants)),
            Err(e) => {
                self.discard_source(&source).await;
                Err(e)
            }
        }
    }

    /// Stores an upload and generates a single expiring variant. Field and
    /// permission checks happen before anything is written.
    pub async fn upload_timed(
        &self,
        profile: &Profile,
        image: UploadedImage,
        request: TimedVariantRequest,
    ) -> Result<UploadResponse, AppError> {
        request.validate()?;

        let permissions = self.permissions.resolve(profile).await.map_err(|e| match e {
            AppError::NoPermissions => AppError::PermissionDenied(TIMED_PERMISSION_DENIED.to_string()),
            other => other,
        })?;
        authorize_timed_variant(&permissions, &request)?;

        let now = Utc::now();
        let source = self.store_source(profile, &image, now).await?;

        match self
            .pipeline
            .create_timed_variant(&source, &image, &permissions, &request, now)
            .await
        {
            Ok(variant) => Ok(self.upload_response(&source, std::slice::from_ref(&variant))),
            Err(e) => {
                self.discard_source(&source).await;
                Err(e)
            }
        }
    }

    /// Lists the caller's own source images with their thumbnails
    pub async fn list(&self, profile: &Profile) -> Result<Vec<SourceImageResponse>, AppError> {
        let sources = self.image_repo.list_source_images(&profile.id).await?;
        let ids: Vec<Uuid> = sources.iter().map(|s| s.id).collect();
        let derived = self.image_repo.list_derived_images(&ids).await?;

        let mut by_source: HashMap<Uuid, Vec<DerivedImage>> = HashMap::new();
        for image in derived {
            by_source.entry(image.source_image_id).or_default().push(image);
        }

        Ok(sources
            .iter()
            .map(|source| {
                let thumbnails = by_source.remove(&source.id).unwrap_or_default();
                self.source_response(source, &thumbnails)
            })
            .collect())
    }

    /// Retrieves one source image. Unknown and foreign ids look the same.
    pub async fn get(&self, profile: &Profile, id: &Uuid) -> Result<SourceImageResponse, AppError> {
        let source = self
            .image_repo
            .get_source_image(&profile.id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(ITEM_NOT_FOUND.to_string()))?;

        let derived = self.image_repo.list_derived_images(std::slice::from_ref(&source.id)).await?;
        Ok(self.source_response(&source, &derived))
    }

    /// Deletes a source image that no longer has thumbnails
    pub async fn delete(&self, profile: &Profile, id: &Uuid) -> Result<(), AppError> {
        let source = self
            .image_repo
            .get_source_image(&profile.id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(ITEM_NOT_FOUND.to_string()))?;

        self.image_repo.delete_source_image(&profile.id, id).await?;

        if let Err(e) = self.storage.delete(&source.file_key).await {
            tracing::warn!("Source image {} deleted but file removal failed: {}", source.id, e);
        }
        Ok(())
    }

    /// Resolves a public slug for the display page
    pub async fn display(&self, slug: &str, now: DateTime<Utc>) -> Result<DisplayedImage, AppError> {
        let image = self
            .image_repo
            .get_derived_image_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(ITEM_NOT_FOUND.to_string()))?;

        Ok(DisplayedImage {
            expired: is_expired(&image, now),
            media_url: self.urls.media(&image.file_key),
            slug: image.slug,
            variant_type: image.variant_type,
            expire_at: image.expire_at,
        })
    }

    async fn store_source(
        &self,
        profile: &Profile,
        image: &UploadedImage,
        now: DateTime<Utc>,
    ) -> Result<SourceImage, AppError> {
        let id = Uuid::new_v4();
        let source = SourceImage {
            id,
            profile_id: profile.id,
            file_key: source_file_key(&profile.id, &id, image.kind),
            width: dimension(image.width)?,
            height: dimension(image.height)?,
            created_at: now,
        };

        self.storage.save(&source.file_key, &image.bytes).await?;

        if let Err(e) = self.image_repo.insert_source_image(&source).await {
            if let Err(cleanup) = self.storage.delete(&source.file_key).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", source.file_key, cleanup);
            }
            return Err(e);
        }

        tracing::info!("Stored source image {} ({}) for profile {}", source.id, image.file_name, profile.id);
        Ok(source)
    }

    async fn discard_source(&self, source: &SourceImage) {
        if let Err(e) = self.image_repo.delete_source_image(&source.profile_id, &source.id).await {
            tracing::warn!("Failed to roll back source image {}: {}", source.id, e);
        }
        if let Err(e) = self.storage.delete(&source.file_key).await {
            tracing::warn!("Failed to remove file {}: {}", source.file_key, e);
        }
    }

    fn upload_response(&self, source: &SourceImage, variants: &[DerivedImage]) -> UploadResponse {
        let thumbnails: BTreeMap<String, String> = variants
            .iter()
            .map(|v| (v.variant_type.clone(), self.urls.image_page(&v.slug)))
            .collect();

        UploadResponse {
            id: source.id,
            file: self.urls.media(&source.file_key),
            width: source.width,
            height: source.height,
            thumbnails,
        }
    }

    fn source_response(&self, source: &SourceImage, derived: &[DerivedImage]) -> SourceImageResponse {
        SourceImageResponse {
            id: source.id,
            file: self.urls.media(&source.file_key),
            width: source.width,
            height: source.height,
            created_at: source.created_at,
            thumbnails: derived
                .iter()
                .map(|d| DerivedImageResponse {
                    id: d.id,
                    variant_type: d.variant_type.clone(),
                    image_url: self.urls.image_page(&d.slug),
                    expire_duration: d.expire_duration,
                    expire_at: d.expire_at,
                    created_at: d.created_at,
                })
                .collect(),
        }
    }
}

fn dimension(value: u32) -> Result<i32, AppError> {
    i32::try_from(value).map_err(|_| AppError::invalid_field("file", "Image dimensions are too large"))
}
