use actix_web::{http::header::ContentType, web, HttpResponse, Responder};
use ammonia::clean_text;
use chrono::Utc;
use tracing::instrument;

use crate::{entities::image::DisplayedImage, errors::AppError, AppState};

pub fn render_page(image: &DisplayedImage) -> String {
    let notice = if image.expired {
        r#"<p class="expired">This link has expired.</p>"#.to_string()
    } else {
        match image.expire_at {
            Some(at) => format!(r#"<p class="expires">Expires at {}</p>"#, at.to_rfc3339()),
            None => String::new(),
        }
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{slug}</title></head>
<body data-expired="{expired}">
{notice}
<img src="{src}" alt="{variant}">
</body>
</html>
"#,
        slug = clean_text(&image.slug),
        expired = image.expired,
        notice = notice,
        src = clean_text(&image.media_url),
        variant = clean_text(&image.variant_type),
    )
}

/// Public page for a slug. Expired links still render, flagged as expired.
#[instrument(skip(state))]
pub async fn display_image(
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let image = state.image_handler.display(&slug, Utc::now()).await?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(render_page(&image)))
}
