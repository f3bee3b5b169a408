use std::sync::Arc;

use uuid::Uuid;

use crate::{
    entities::{
        account_type::{AccountType, NewAccountType},
        profile::{AssignAccountTypeRequest, Profile},
    },
    errors::AppError,
    repositories::profile::ProfileRepository,
};

pub struct AccountTypeHandler<P>
where
    P: ProfileRepository + ?Sized,
{
    pub profile_repo: Arc<P>,
}

impl<P> AccountTypeHandler<P>
where
    P: ProfileRepository + ?Sized,
{
    pub fn new(profile_repo: Arc<P>) -> Self {
        AccountTypeHandler { profile_repo }
    }

    /// Creates a new account type after validating its size set
    pub async fn create_account_type(&self, request: NewAccountType) -> Result<AccountType, AppError> {
        request.validate_all()?;

        let account_type = request.prepare_for_insert();
        self.profile_repo
            .create_account_type(&account_type)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::Conflict("Account type already exists".to_string()),
                other => other,
            })?;

        tracing::info!("Account type '{}' created", account_type.name);
        Ok(account_type)
    }

    pub async fn list_account_types(&self) -> Result<Vec<AccountType>, AppError> {
        self.profile_repo.list_account_types().await
    }

    /// Links a profile to an account type, or clears the link with `null`.
    /// The profile is provisioned if the identity has not been seen yet.
    pub async fn assign_account_type(
        &self,
        user_id: &Uuid,
        request: AssignAccountTypeRequest,
    ) -> Result<Profile, AppError> {
        if let Some(type_id) = request.account_type_id {
            self.profile_repo
                .get_account_type(&type_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Account type not found".to_string()))?;
        }

        let profile = self.profile_repo.get_or_create_profile(user_id).await?;
        self.profile_repo
            .set_account_type(&profile.id, request.account_type_id)
            .await
    }
}
