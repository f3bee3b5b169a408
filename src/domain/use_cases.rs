pub mod account_types;
pub mod expiry;
pub mod extractors;
pub mod images;
pub mod permissions;
pub mod slug;
pub mod thumbnails;
