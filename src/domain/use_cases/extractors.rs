use actix_web::{web, FromRequest, HttpRequest, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use uuid::Uuid;

use crate::{
    entities::{profile::Profile, token::Claims},
    errors::AuthError,
    AppState,
};

/// Extractor for admin claims.
/// Returns 403 if the user is not an admin, 401 if not authenticated.
#[derive(Debug)]
pub struct AdminClaims(pub Claims);

impl FromRequest for AdminClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) if claims.admin => {
                ready(Ok(AdminClaims(claims.clone())))
            }
            Some(_) => {
                ready(Err(AuthError::Forbidden("Admin access required".into()).into()))
            }
            None => {
                ready(Err(AuthError::MissingCredentials.into()))
            }
        }
    }
}

/// The caller's profile, provisioned on first use.
/// Usage: add `profile: CurrentProfile` to a handler signature.
#[derive(Debug)]
pub struct CurrentProfile(pub Profile);

impl FromRequest for CurrentProfile {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let claims = claims.ok_or(AuthError::MissingCredentials)?;
            let state = state.ok_or(AuthError::MissingJwtService)?;
            let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;

            let profile = state
                .image_handler
                .profile_for_user(&user_id)
                .await
                .map_err(actix_web::Error::from)?;

            Ok(CurrentProfile(profile))
        })
    }
}
