use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::image::{TimedVariantRequest, UploadResponse, UploadedImage},
    errors::{AppError, FieldError},
    use_cases::extractors::CurrentProfile,
    utils::image_file::read_image_upload,
    AppState,
};

const NO_FILE_SUBMITTED: &str = "No file was submitted.";
const FIELD_REQUIRED: &str = "This field is required.";
const INVALID_INTEGER: &str = "A valid integer is required.";

#[derive(Debug, MultipartForm)]
pub struct UploadForm {
    pub file: Option<TempFile>,
}

#[derive(Debug, MultipartForm)]
pub struct TimedUploadForm {
    pub file: Option<TempFile>,
    #[multipart(rename = "type")]
    pub variant_type: Option<Text<String>>,
    pub expire_time: Option<Text<String>>,
}

async fn read_file_field(file: Option<TempFile>, max_size: usize) -> Result<UploadedImage, AppError> {
    let file = file.ok_or_else(|| AppError::invalid_field("file", NO_FILE_SUBMITTED))?;
    let image = read_image_upload(file.file_name.as_deref(), file.file.path(), max_size).await?;
    Ok(image)
}

fn parse_integer<T: std::str::FromStr>(
    field: &str,
    value: Option<Text<String>>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match value {
        None => {
            errors.push(FieldError::new(field, FIELD_REQUIRED));
            None
        }
        Some(text) => match text.into_inner().trim().parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                errors.push(FieldError::new(field, INVALID_INTEGER));
                None
            }
        },
    }
}

/// Runs the upload on its own task so a dropped connection cannot stop it
/// between writing the source and its thumbnails.
async fn run_detached<F>(work: F) -> Result<UploadResponse, AppError>
where
    F: std::future::Future<Output = Result<UploadResponse, AppError>> + Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| AppError::InternalError(format!("Upload task failed: {}", e)))?
}

#[instrument(skip(state, profile, form))]
pub async fn upload_image(
    state: web::Data<AppState>,
    profile: CurrentProfile,
    form: MultipartForm<UploadForm>,
) -> Result<impl Responder, AppError> {
    let form = form.into_inner();
    let image = read_file_field(form.file, state.max_upload_bytes).await?;
    let CurrentProfile(profile) = profile;

    let response = run_detached(async move {
        state.image_handler.upload(&profile, image).await
    })
    .await?;

    Ok(HttpResponse::Created().json(response))
}

#[instrument(skip(state, profile, form))]
pub async fn upload_timed_image(
    state: web::Data<AppState>,
    profile: CurrentProfile,
    form: MultipartForm<TimedUploadForm>,
) -> Result<impl Responder, AppError> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.file.is_none() {
        errors.push(FieldError::new("file", NO_FILE_SUBMITTED));
    }
    let size = parse_integer::<u32>("type", form.variant_type, &mut errors);
    let expire_time = parse_integer::<i64>("expire_time", form.expire_time, &mut errors);

    let request = match (size, expire_time) {
        (Some(size), Some(expire_time)) if errors.is_empty() => TimedVariantRequest { size, expire_time },
        _ => {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            return Err(AppError::ValidationError(errors));
        }
    };
    let image = read_file_field(form.file, state.max_upload_bytes).await?;
    let CurrentProfile(profile) = profile;

    let response = run_detached(async move {
        state.image_handler.upload_timed(&profile, image, request).await
    })
    .await?;

    Ok(HttpResponse::Created().json(response))
}

#[instrument(skip(state, profile))]
pub async fn list_images(
    state: web::Data<AppState>,
    profile: CurrentProfile,
) -> Result<impl Responder, AppError> {
    let images = state.image_handler.list(&profile.0).await?;
    Ok(HttpResponse::Ok().json(images))
}

#[instrument(skip(state, profile))]
pub async fn get_image(
    state: web::Data<AppState>,
    profile: CurrentProfile,
    image_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let image = state.image_handler.get(&profile.0, &image_id).await?;
    Ok(HttpResponse::Ok().json(image))
}

#[instrument(skip(state, profile))]
pub async fn delete_image(
    state: web::Data<AppState>,
    profile: CurrentProfile,
    image_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    state.image_handler.delete(&profile.0, &image_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
