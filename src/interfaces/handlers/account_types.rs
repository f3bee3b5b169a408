use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{account_type::NewAccountType, profile::AssignAccountTypeRequest},
    errors::AppError,
    use_cases::extractors::AdminClaims,
    AppState,
};

#[instrument(skip(_claims, state, data))]
pub async fn create_account_type(
    _claims: AdminClaims,
    state: web::Data<AppState>,
    data: web::Json<NewAccountType>,
) -> Result<impl Responder, AppError> {
    let account_type = state
        .account_type_handler
        .create_account_type(data.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(account_type))
}

#[instrument(skip(_claims, state))]
pub async fn list_account_types(
    _claims: AdminClaims,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let account_types = state.account_type_handler.list_account_types().await?;
    Ok(HttpResponse::Ok().json(account_types))
}

#[instrument(skip(_claims, state, data))]
pub async fn assign_account_type(
    _claims: AdminClaims,
    user_id: web::Path<Uuid>,
    state: web::Data<AppState>,
    data: web::Json<AssignAccountTypeRequest>,
) -> Result<impl Responder, AppError> {
    let profile = state
        .account_type_handler
        .assign_account_type(&user_id, data.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(profile))
}
