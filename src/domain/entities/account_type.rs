use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::{AppError, FieldError};

pub const MAX_CUSTOM_SIZE: u32 = 4096;

/// Named bundle of generation permissions, referenced by profiles.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AccountType {
    pub id: Uuid,
    pub name: String,
    pub allow_200px: bool,
    pub allow_400px: bool,
    pub allow_original_size_link: bool,
    pub allow_custom_size: bool,
    pub allow_time_limited_link: bool,
    pub custom_sizes: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewAccountType {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,

    #[serde(default)]
    pub allow_200px: bool,

    #[serde(default)]
    pub allow_400px: bool,

    #[serde(default)]
    pub allow_original_size_link: bool,

    #[serde(default)]
    pub allow_custom_size: bool,

    #[serde(default)]
    pub allow_time_limited_link: bool,

    #[serde(default)]
    #[validate(custom(function = "validate_custom_sizes"))]
    pub custom_sizes: Vec<u32>,
}

fn validate_custom_sizes(sizes: &Vec<u32>) -> Result<(), ValidationError> {
    if sizes.iter().any(|&size| size == 0 || size > MAX_CUSTOM_SIZE) {
        let mut err = ValidationError::new("custom_size_range");
        err.message = Some(format!("Custom sizes must be between 1 and {} px", MAX_CUSTOM_SIZE).into());
        return Err(err);
    }

    let unique: BTreeSet<&u32> = sizes.iter().collect();
    if unique.len() != sizes.len() {
        let mut err = ValidationError::new("custom_size_duplicate");
        err.message = Some("Custom sizes must be unique".into());
        return Err(err);
    }
    Ok(())
}

impl NewAccountType {
    /// Field validation plus the cross-field rule that custom sizes sit
    /// behind the original-size permission.
    pub fn validate_all(&self) -> Result<(), AppError> {
        self.validate()?;

        if self.allow_custom_size && !self.allow_original_size_link {
            return Err(AppError::ValidationError(vec![FieldError::new(
                "allow_custom_size",
                "Custom sizes require allow_original_size_link",
            )]));
        }
        Ok(())
    }

    pub fn prepare_for_insert(&self) -> AccountType {
        let mut custom_sizes: Vec<i32> = self.custom_sizes.iter().map(|&s| s as i32).collect();
        custom_sizes.sort_unstable();

        AccountType {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            allow_200px: self.allow_200px,
            allow_400px: self.allow_400px,
            allow_original_size_link: self.allow_original_size_link,
            allow_custom_size: self.allow_custom_size,
            allow_time_limited_link: self.allow_time_limited_link,
            custom_sizes,
            created_at: Utc::now(),
        }
    }
}
