use async_trait::async_trait;
use uuid::Uuid;
use std::borrow::Cow;
use sqlx::PgPool;

use crate::{
    entities::{account_type::AccountType, profile::Profile},
    errors::AppError,
    repositories::sqlx_repo::SqlxProfileRepo,
};

const ACCOUNT_TYPE_SELECT: &str = r#"
    SELECT
        a.id, a.name, a.allow_200px, a.allow_400px, a.allow_original_size_link,
        a.allow_custom_size, a.allow_time_limited_link, a.created_at,
        COALESCE(ARRAY_AGG(s.size ORDER BY s.size) FILTER (WHERE s.size IS NOT NULL), '{}') AS custom_sizes
    FROM account_types a
    LEFT JOIN account_type_custom_sizes s ON s.account_type_id = a.id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;
    /// Returns the profile for an identity, creating an empty one on first use.
    async fn get_or_create_profile(&self, user_id: &Uuid) -> Result<Profile, AppError>;
    async fn get_account_type(&self, id: &Uuid) -> Result<Option<AccountType>, AppError>;
    async fn list_account_types(&self) -> Result<Vec<AccountType>, AppError>;
    async fn create_account_type(&self, account_type: &AccountType) -> Result<(), AppError>;
    async fn set_account_type(&self, profile_id: &Uuid, account_type_id: Option<Uuid>) -> Result<Profile, AppError>;
}

impl SqlxProfileRepo {
    pub fn new(pool: PgPool) -> Self {
        SqlxProfileRepo { pool }
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(AppError::from)
    }

    async fn get_or_create_profile(&self, user_id: &Uuid) -> Result<Profile, AppError> {
        let fresh = Profile::new(*user_id);

        sqlx::query(
            r#"INSERT INTO profiles (id, user_id, account_type_id, created_at)
            VALUES ($1, $2, NULL, $3)
            ON CONFLICT (user_id) DO NOTHING"#
        )
        .bind(fresh.id)
        .bind(fresh.user_id)
        .bind(fresh.created_at)
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn get_account_type(&self, id: &Uuid) -> Result<Option<AccountType>, AppError> {
        let query = format!("{ACCOUNT_TYPE_SELECT} WHERE a.id = $1 GROUP BY a.id");

        sqlx::query_as::<_, AccountType>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn list_account_types(&self) -> Result<Vec<AccountType>, AppError> {
        let query = format!("{ACCOUNT_TYPE_SELECT} GROUP BY a.id ORDER BY a.name");

        sqlx::query_as::<_, AccountType>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn create_account_type(&self, account_type: &AccountType) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO account_types (
                id,
                name,
                allow_200px,
                allow_400px,
                allow_original_size_link,
                allow_custom_size,
                allow_time_limited_link,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#
        )
        .bind(account_type.id)
        .bind(&account_type.name)
        .bind(account_type.allow_200px)
        .bind(account_type.allow_400px)
        .bind(account_type.allow_original_size_link)
        .bind(account_type.allow_custom_size)
        .bind(account_type.allow_time_limited_link)
        .bind(account_type.created_at)
        .execute(&mut *tx)
        .await?;

        if !account_type.custom_sizes.is_empty() {
            sqlx::query(
                r#"INSERT INTO account_type_custom_sizes (account_type_id, size)
                SELECT $1, UNNEST($2::INTEGER[])"#
            )
            .bind(account_type.id)
            .bind(&account_type.custom_sizes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_account_type(&self, profile_id: &Uuid, account_type_id: Option<Uuid>) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET account_type_id = $2 WHERE id = $1 RETURNING *"
        )
        .bind(profile_id)
        .bind(account_type_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            match e {
                sqlx::Error::Database(db_err) if db_err.code() == Some(Cow::Borrowed("23503")) => {
                    AppError::NotFound("Account type not found".to_string())
                }
                _ => AppError::from(e)
            }
        })?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }
}
