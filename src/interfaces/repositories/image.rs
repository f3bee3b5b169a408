use async_trait::async_trait;
use uuid::Uuid;
use std::borrow::Cow;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    entities::image::{DerivedImage, DerivedImageInsert, SourceImage},
    errors::AppError,
    repositories::sqlx_repo::SqlxImageRepo,
};

const DERIVED_SLUG_CONSTRAINT: &str = "derived_images_slug_key";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn insert_source_image(&self, image: &SourceImage) -> Result<(), AppError>;
    async fn get_source_image(&self, profile_id: &Uuid, id: &Uuid) -> Result<Option<SourceImage>, AppError>;
    async fn list_source_images(&self, profile_id: &Uuid) -> Result<Vec<SourceImage>, AppError>;
    async fn delete_source_image(&self, profile_id: &Uuid, id: &Uuid) -> Result<(), AppError>;
    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;
    /// Inserts the whole batch or nothing.
    async fn insert_derived_images(&self, images: &[DerivedImageInsert]) -> Result<(), AppError>;
    async fn list_derived_images(&self, source_ids: &[Uuid]) -> Result<Vec<DerivedImage>, AppError>;
    async fn get_derived_image_by_slug(&self, slug: &str) -> Result<Option<DerivedImage>, AppError>;
}

impl SqlxImageRepo {
    pub fn new(pool: PgPool) -> Self {
        SqlxImageRepo { pool }
    }
}

#[async_trait]
impl ImageRepository for SqlxImageRepo {
    async fn insert_source_image(&self, image: &SourceImage) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO source_images (id, profile_id, file_key, width, height, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)"#
        )
        .bind(image.id)
        .bind(image.profile_id)
        .bind(&image.file_key)
        .bind(image.width)
        .bind(image.height)
        .bind(image.created_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(AppError::from)
    }

    async fn get_source_image(&self, profile_id: &Uuid, id: &Uuid) -> Result<Option<SourceImage>, AppError> {
        sqlx::query_as::<_, SourceImage>(
            "SELECT * FROM source_images WHERE id = $1 AND profile_id = $2"
        )
        .bind(id)
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_source_images(&self, profile_id: &Uuid) -> Result<Vec<SourceImage>, AppError> {
        sqlx::query_as::<_, SourceImage>(
            "SELECT * FROM source_images WHERE profile_id = $1 ORDER BY created_at, id"
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn delete_source_image(&self, profile_id: &Uuid, id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM source_images WHERE id = $1 AND profile_id = $2"
        )
        .bind(id)
        .bind(profile_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            match e {
                sqlx::Error::Database(db_err) if db_err.code() == Some(Cow::Borrowed("23503")) => {
                    AppError::Conflict("Image still has generated thumbnails".to_string())
                }
                _ => AppError::from(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item not found".to_string()));
        }

        Ok(())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM derived_images WHERE slug = $1)"
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(exists)
    }

    async fn insert_derived_images(&self, images: &[DerivedImageInsert]) -> Result<(), AppError> {
        if images.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO derived_images (id, source_image_id, variant_type, file_key, slug, expire_duration, expire_at, created_at) "
        );
        builder.push_values(images, |mut row, image| {
            row.push_bind(image.id)
                .push_bind(image.source_image_id)
                .push_bind(&image.variant_type)
                .push_bind(&image.file_key)
                .push_bind(&image.slug)
                .push_bind(image.expire_duration)
                .push_bind(image.expire_at)
                .push_bind(image.created_at);
        });

        builder.build()
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.constraint() == Some(DERIVED_SLUG_CONSTRAINT) {
                        return AppError::SlugCollision;
                    }
                }
                AppError::from(e)
            })?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_derived_images(&self, source_ids: &[Uuid]) -> Result<Vec<DerivedImage>, AppError> {
        if source_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, DerivedImage>(
            "SELECT * FROM derived_images WHERE source_image_id = ANY($1) ORDER BY created_at, id"
        )
        .bind(source_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn get_derived_image_by_slug(&self, slug: &str) -> Result<Option<DerivedImage>, AppError> {
        sqlx::query_as::<_, DerivedImage>("SELECT * FROM derived_images WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }
}
