use actix_multipart::{form::MultipartFormConfig, MultipartError};
use actix_web::{
    error::{JsonPayloadError, PayloadError},
    web,
};

use crate::{
    errors::{AppError, FieldError},
    utils::image_file::ImageFileError,
};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        json_payload_error(err).into()
    }));

    cfg.app_data(web::PathConfig::default().error_handler(|_err, _req| {
        AppError::NotFound("Item not found".to_string()).into()
    }));
}

/// Multipart limits follow the configured upload size; parse failures
/// come back in the usual validation shape.
pub fn multipart_config(max_upload_bytes: usize) -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(max_upload_bytes.saturating_add(64 * 1024))
        .memory_limit(64 * 1024)
        .error_handler(|err, _req| multipart_error(err).into())
}

fn multipart_error(err: MultipartError) -> AppError {
    match err {
        // Only the file part is large enough to trip the limits
        MultipartError::Payload(PayloadError::Overflow) => ImageFileError::FileTooLarge.into(),
        other => AppError::ValidationError(vec![FieldError::new(
            "non_field_errors",
            format!("Invalid multipart payload: {}", other),
        )]),
    }
}

fn json_payload_error(err: JsonPayloadError) -> AppError {
    match err {
        JsonPayloadError::Deserialize(e) => AppError::ValidationError(vec![FieldError::new(
            "non_field_errors",
            format!("JSON error: {}", e),
        )]),
        other => AppError::ValidationError(vec![FieldError::new(
            "non_field_errors",
            format!("JSON payload error: {}", other),
        )]),
    }
}
