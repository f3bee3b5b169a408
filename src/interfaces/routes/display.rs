use actix_web::web;

use crate::handlers::display::display_image;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/i/{slug}", web::get().to(display_image));
}
