pub mod account_type;
pub mod image;
pub mod profile;
pub mod token;
