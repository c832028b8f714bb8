//! Defines routes for video records and media uploads.
//!
//! ## Structure
//! - **Health**
//!   - `GET  /healthz`: liveness
//!   - `GET  /readyz`: readiness (SQLite + scratch dir)
//!
//! - **Videos**
//!   - `POST /api/videos`: create a draft record
//!   - `GET  /api/videos`: list the caller's videos
//!   - `GET  /api/videos/{video_id}`: fetch one video, URL signed on read
//!
//! - **Uploads** (multipart, bearer auth, owner only)
//!   - `POST /api/thumbnail_upload/{video_id}`: `thumbnail` field, jpeg/png, 10 MiB cap
//!   - `POST /api/video_upload/{video_id}`: `video` field, mp4, capped at `max_video_bytes`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        thumbnail_handlers::{MAX_THUMBNAIL_BYTES, upload_thumbnail},
        video_handlers::{create_video, get_video, list_videos, upload_video},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router for all API routes.
///
/// The router carries shared state (`AppState`) to all handlers. Each upload
/// route gets its own body limit.
pub fn routes(max_video_bytes: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Video records
        .route("/api/videos", post(create_video).get(list_videos))
        .route("/api/videos/{video_id}", get(get_video))
        // Uploads
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(MAX_THUMBNAIL_BYTES)),
        )
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(DefaultBodyLimit::max(max_video_bytes)),
        )
}
