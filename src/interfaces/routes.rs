use actix_web::web;

use crate::handlers::{home::home, system::health_check};

mod admin;
mod display;
mod images;
mod json_error;

pub use json_error::multipart_config;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);
    cfg.service(health_check);

    cfg.service(
        web::scope("/api/v1")
            .configure(images::config_routes)
            .configure(admin::config_routes)
    );

    cfg.configure(display::config_routes);
    cfg.configure(json_error::config_routes);
}
