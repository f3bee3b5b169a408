pub mod image;
pub mod media;
pub mod profile;
pub mod sqlx_repo;
pub mod token;
