//! HTTP handlers for video records and video uploads.
//!
//! Upload bodies are streamed to scratch storage and never buffered in
//! memory; the pipeline itself lives in `UploadService`.

use crate::{
    errors::AppError,
    models::video::{Video, VideoView},
    services::{media_type::UploadKind, staging},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures::future::try_join_all;
use serde::Deserialize;
use uuid::Uuid;

/// Request body for `POST /api/videos`.
#[derive(Debug, Deserialize)]
pub struct CreateVideoReq {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST `/api/videos`: create a draft record owned by the caller.
pub async fn create_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateVideoReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = state.auth.authenticate(&headers)?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let video = Video::new(user_id, title.to_string(), payload.description);
    state.videos.create_video(&video).await?;
    tracing::info!(video_id = %video.id, %user_id, "video created");

    let view = state.uploads.resolve(video).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET `/api/videos/{video_id}`: the caller's video, with its URL signed at read time.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<VideoView>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = state.auth.authenticate(&headers)?;
    let video = state.uploads.owned_video(video_id, user_id).await?;

    Ok(Json(state.uploads.resolve(video).await?))
}

/// GET `/api/videos`: all of the caller's videos, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<VideoView>>, AppError> {
    let user_id = state.auth.authenticate(&headers)?;
    let videos = state.videos.list_videos_for_user(user_id).await?;

    let views = try_join_all(videos.into_iter().map(|v| state.uploads.resolve(v))).await?;
    Ok(Json(views))
}

/// POST `/api/video_upload/{video_id}`: upload an mp4 for an owned video.
///
/// The body limit is applied by the router; exceeding it aborts the upload
/// while the field is being staged.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<VideoView>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = state.auth.authenticate(&headers)?;
    let video = state.uploads.owned_video(video_id, user_id).await?;

    let kind = UploadKind::Video;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(kind.field_name()) {
            continue;
        }
        let media_type = kind.validate(field.content_type())?;
        let extension = file_extension(field.file_name());
        let staged = staging::stage(&state.scratch_dir, ".mp4", field).await?;
        upload = Some((staged, media_type, extension));
        break;
    }

    let (staged, media_type, extension) = upload
        .ok_or_else(|| AppError::bad_request("missing `video` file in form data"))?;

    tracing::info!(%video_id, %user_id, bytes = staged.len(), "video upload staged");

    let video = state
        .uploads
        .publish_video(video, staged, &media_type, &extension)
        .await?;

    Ok(Json(state.uploads.resolve(video).await?))
}

pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("invalid video ID `{}`", raw)))
}

/// Extension of the uploaded filename including the dot, or empty.
///
/// Only short alphanumeric extensions are kept so the object key stays clean.
fn file_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_includes_the_dot() {
        assert_eq!(file_extension(Some("holiday.mp4")), ".mp4");
        assert_eq!(file_extension(Some("dir/clip.final.MP4")), ".MP4");
    }

    #[test]
    fn odd_or_missing_extensions_are_dropped() {
        assert_eq!(file_extension(None), "");
        assert_eq!(file_extension(Some("noext")), "");
        assert_eq!(file_extension(Some("weird.m p4")), "");
        assert_eq!(file_extension(Some(".hidden")), "");
    }

    #[test]
    fn video_id_must_be_a_uuid() {
        assert!(parse_video_id("not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_video_id(&id.to_string()).unwrap(), id);
    }
}
