use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One-to-one with an external identity. A profile without an account type
/// may not generate any thumbnails.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_type_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: Uuid) -> Self {
        Profile {
            id: Uuid::new_v4(),
            user_id,
            account_type_id: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignAccountTypeRequest {
    pub account_type_id: Option<Uuid>,
}
