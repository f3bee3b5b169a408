use actix_web::web;

use crate::handlers::images::{delete_image, get_image, list_images, upload_image, upload_timed_image};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/images")
            .service(
                web::resource("")
                    .route(web::post().to(upload_image))
                    .route(web::get().to(list_images))
            )
            .route("/timed", web::post().to(upload_timed_image))
            .service(
                web::resource("/{image_id}")
                    .route(web::get().to(get_image))
                    .route(web::delete().to(delete_image))
            )
    );
}
