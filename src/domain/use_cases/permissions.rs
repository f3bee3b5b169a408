use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    entities::{account_type::AccountType, profile::Profile},
    errors::AppError,
    repositories::profile::ProfileRepository,
};

/// Capabilities a profile holds, copied out of its account type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    pub allow_200px: bool,
    pub allow_400px: bool,
    pub allow_original_size_link: bool,
    pub allow_custom_size: bool,
    pub allow_time_limited_link: bool,
    pub custom_sizes: BTreeSet<u32>,
}

impl PermissionSet {
    /// The empty set: nothing may be generated.
    pub fn none() -> Self {
        PermissionSet::default()
    }

    /// Custom sizes ride on the original-size permission and only apply when
    /// the account type actually lists some.
    pub fn custom_sizes_enabled(&self) -> bool {
        self.allow_original_size_link && !self.custom_sizes.is_empty()
    }
}

impl From<&AccountType> for PermissionSet {
    fn from(account_type: &AccountType) -> Self {
        PermissionSet {
            allow_200px: account_type.allow_200px,
            allow_400px: account_type.allow_400px,
            allow_original_size_link: account_type.allow_original_size_link,
            allow_custom_size: account_type.allow_custom_size,
            allow_time_limited_link: account_type.allow_time_limited_link,
            custom_sizes: account_type
                .custom_sizes
                .iter()
                .filter_map(|&size| u32::try_from(size).ok())
                .collect(),
        }
    }
}

pub struct PermissionResolver<P>
where
    P: ProfileRepository + ?Sized,
{
    pub profile_repo: Arc<P>,
}

impl<P> PermissionResolver<P>
where
    P: ProfileRepository + ?Sized,
{
    pub fn new(profile_repo: Arc<P>) -> Self {
        PermissionResolver { profile_repo }
    }

    /// Looks up the profile's account type. Fails with `NoPermissions` when
    /// the profile has none, or when the referenced row is gone.
    pub async fn resolve(&self, profile: &Profile) -> Result<PermissionSet, AppError> {
        let account_type_id = profile.account_type_id.ok_or(AppError::NoPermissions)?;

        let account_type = self
            .profile_repo
            .get_account_type(&account_type_id)
            .await?
            .ok_or(AppError::NoPermissions)?;

        Ok(PermissionSet::from(&account_type))
    }
}
