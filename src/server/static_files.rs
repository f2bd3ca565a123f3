use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
};
use rust_embed::RustEmbed;

/// Frontend bundle embedded at compile time.
#[derive(RustEmbed)]
#[folder = "web/dist"]
struct Assets;

/// Service for everything that is not an `/api` route. Unknown paths fall
/// back to `index.html` so client-side routing keeps working.
pub fn serve_static() -> MethodRouter {
    get(static_handler)
}

async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    match Assets::get(path) {
        Some(content) => asset_response(path, content),
        None => match Assets::get("index.html") {
            Some(content) => asset_response("index.html", content),
            None => (StatusCode::NOT_FOUND, "not found").into_response(),
        },
    }
}

fn asset_response(path: &str, content: rust_embed::EmbeddedFile) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        content.data.into_owned(),
    )
        .into_response()
}
