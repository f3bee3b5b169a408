use chrono::{DateTime, Duration, Utc};

use crate::entities::image::{DerivedImage, DerivedImageInsert};

pub const MIN_EXPIRE_SECONDS: i64 = 300;
pub const MAX_EXPIRE_SECONDS: i64 = 30_000;

pub fn compute_expire_timestamp(
    expire_duration: Option<i32>,
    created_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    expire_duration.map(|seconds| created_at + Duration::seconds(i64::from(seconds)))
}

/// Fills `expire_at` from `expire_duration` once. An already set timestamp is
/// never touched again.
pub fn assign_expire_timestamp(image: &mut DerivedImageInsert) {
    if image.expire_at.is_some() {
        return;
    }
    image.expire_at = compute_expire_timestamp(image.expire_duration, image.created_at);
}

/// Display-time check only; expired rows are still listed and served.
pub fn is_expired(image: &DerivedImage, now: DateTime<Utc>) -> bool {
    match image.expire_at {
        Some(expire_at) => now > expire_at,
        None => false,
    }
}
