pub mod account_types;
pub mod display;
pub mod home;
pub mod images;
pub mod system;
