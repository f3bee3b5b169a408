use std::collections::HashSet;

use rand::{distributions::Alphanumeric, Rng};

use crate::{errors::AppError, repositories::image::ImageRepository};

pub const SLUG_LENGTH: usize = 15;
pub const MAX_SLUG_ATTEMPTS: usize = 32;

fn random_alphanumeric(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Produces public slugs that are checked against the store before use.
#[derive(Clone)]
pub struct SlugGenerator {
    length: usize,
    max_attempts: usize,
    source: fn(usize) -> String,
}

impl Default for SlugGenerator {
    fn default() -> Self {
        SlugGenerator {
            length: SLUG_LENGTH,
            max_attempts: MAX_SLUG_ATTEMPTS,
            source: random_alphanumeric,
        }
    }
}

impl SlugGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps the randomness source. Used to force collisions in tests.
    pub fn with_source(mut self, source: fn(usize) -> String) -> Self {
        self.source = source;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Draws candidates until one is free both in the store and in `reserved`
    /// (slugs already handed out to the batch being built).
    pub async fn generate_unique_slug<R>(
        &self,
        repo: &R,
        reserved: &HashSet<String>,
    ) -> Result<String, AppError>
    where
        R: ImageRepository + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = (self.source)(self.length);

            if reserved.contains(&candidate) || repo.slug_exists(&candidate).await? {
                tracing::debug!("Slug collision on attempt {}", attempt);
                continue;
            }

            return Ok(candidate);
        }

        tracing::error!("Slug generation exhausted after {} attempts", self.max_attempts);
        Err(AppError::InternalError(format!(
            "could not allocate a unique slug after {} attempts",
            self.max_attempts
        )))
    }
}
