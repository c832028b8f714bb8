//! Thumbnail upload handler.
//!
//! Thumbnails are small, so the field is read into memory and embedded into
//! the record as a data URL; nothing touches the filesystem.

use crate::{
    errors::AppError,
    handlers::video_handlers::parse_video_id,
    models::video::VideoView,
    services::media_type::UploadKind,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::HeaderMap,
};

/// Ceiling for a thumbnail request body: 10 MiB.
pub const MAX_THUMBNAIL_BYTES: usize = 10 << 20;

/// POST `/api/thumbnail_upload/{video_id}`: attach a jpeg/png thumbnail to an owned video.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<VideoView>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = state.auth.authenticate(&headers)?;
    let video = state.uploads.owned_video(video_id, user_id).await?;

    let kind = UploadKind::Thumbnail;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(kind.field_name()) {
            continue;
        }
        let media_type = kind.validate(field.content_type())?;
        let data = field.bytes().await?;
        upload = Some((media_type, data));
        break;
    }

    let (media_type, data) = upload
        .ok_or_else(|| AppError::bad_request("missing `thumbnail` file in form data"))?;

    let video = state
        .uploads
        .attach_thumbnail(video, &media_type, &data)
        .await?;

    Ok(Json(state.uploads.resolve(video).await?))
}
