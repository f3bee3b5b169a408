use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;

pub use domain::{entities, use_cases};
pub use interfaces::{handlers, repositories, middlewares, routes};
pub use infrastructure::{auth, db, media, utils};

use auth::jwt::JwtService;
use errors::AppError;
use media::{local_storage::LocalMediaStorage, resizer::ImageCrateResizer};
use repositories::{
    image::ImageRepository,
    media::{ImageResizer, MediaStorage},
    profile::ProfileRepository,
    sqlx_repo::{SqlxImageRepo, SqlxProfileRepo},
    token::TokenServiceRepository,
};
use use_cases::{account_types::AccountTypeHandler, images::ImageHandler};
use utils::public_url::PublicUrls;

pub type AppImageHandler =
    ImageHandler<dyn ImageRepository, dyn ProfileRepository, dyn ImageResizer, dyn MediaStorage>;
pub type AppAccountTypeHandler = AccountTypeHandler<dyn ProfileRepository>;

pub struct AppState {
    pub image_handler: AppImageHandler,
    pub account_type_handler: AppAccountTypeHandler,
    pub token_service: Arc<dyn TokenServiceRepository>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: &settings::AppConfig, pool: sqlx::PgPool) -> Result<Self, AppError> {
        let image_repo = Arc::new(SqlxImageRepo::new(pool.clone()));
        let profile_repo = Arc::new(SqlxProfileRepo::new(pool));
        let resizer = Arc::new(ImageCrateResizer::new());
        let storage = Arc::new(LocalMediaStorage::new(&config.media_root));

        Self::from_parts(config, image_repo, profile_repo, resizer, storage)
    }

    /// Wires the use cases over arbitrary repository implementations.
    pub fn from_parts(
        config: &settings::AppConfig,
        image_repo: Arc<dyn ImageRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        resizer: Arc<dyn ImageResizer>,
        storage: Arc<dyn MediaStorage>,
    ) -> Result<Self, AppError> {
        let urls = PublicUrls::new(&config.public_base_url)?;

        Ok(AppState {
            image_handler: ImageHandler::new(image_repo, Arc::clone(&profile_repo), resizer, storage, urls),
            account_type_handler: AccountTypeHandler::new(profile_repo),
            token_service: Arc::new(JwtService::new(config)),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}
