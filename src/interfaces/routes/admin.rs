use actix_web::web;

use crate::handlers::account_types::{assign_account_type, create_account_type, list_account_types};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(
                web::resource("/account-types")
                    .route(web::post().to(create_account_type))
                    .route(web::get().to(list_account_types))
            )
            .route("/profiles/{user_id}/account-type", web::put().to(assign_account_type))
    );
}
