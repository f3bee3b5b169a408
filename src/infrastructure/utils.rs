pub mod image_file;
pub mod public_url;
