use actix_web::{HttpResponse, get, web};
use rust_embed::RustEmbed;

use crate::error::AppError;

#[derive(RustEmbed)]
#[folder = "frontend/"]
struct FrontendAssets;

#[get("/{asset:.*}")]
pub async fn serve_asset(path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let requested = path.into_inner();
    let requested = match requested.trim_start_matches('/') {
        "" => "index.html",
        other => other,
    };

    let asset = FrontendAssets::get(requested)
        .ok_or_else(|| AppError::NotFound("Not found".into()))?;
    let mime = mime_guess::from_path(requested).first_or_octet_stream();

    Ok(HttpResponse::Ok()
        .content_type(mime.as_ref())
        .body(asset.data.into_owned()))
}
