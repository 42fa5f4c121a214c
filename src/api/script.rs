use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "src/api/assets/"]
struct Assets;

/// GET /track.js — The embeddable tracking script.
///
/// Immutable per release, so browsers may cache it for a day.
pub async fn serve_tracker() -> impl IntoResponse {
    serve_file("track.js")
}

fn serve_file(path: &str) -> axum::response::Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (
                        header::CACHE_CONTROL,
                        "public, max-age=86400".to_string(),
                    ),
                ],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
