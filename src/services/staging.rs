//! Local scratch files for uploads in flight.
//!
//! Every file created here is owned by a [`ScratchFile`] guard and is removed
//! when the guard drops, whichever way the request ends.

use axum::extract::multipart::MultipartError;
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io,
    path::{Path, PathBuf},
};
use tempfile::TempPath;
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::debug;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error(transparent)]
    Body(#[from] MultipartError),
    #[error("failed to write upload to scratch storage: {0}")]
    Io(#[from] io::Error),
}

/// A file on local disk that is deleted when dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: TempPath,
    len: u64,
}

impl ScratchFile {
    /// Take ownership of an existing file so it is cleaned up with the request.
    pub async fn adopt(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let len = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(err) => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(err);
            }
        };
        Ok(Self {
            path: TempPath::try_from_path(path)?,
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes at the time the file was staged or adopted.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Stream `body` into a fresh, uniquely named file under `dir`.
///
/// Partial files are removed on error.
pub async fn stage<S, E>(dir: &Path, suffix: &str, body: S) -> Result<ScratchFile, StagingError>
where
    S: Stream<Item = Result<Bytes, E>>,
    StagingError: From<E>,
{
    let named = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(suffix)
        .tempfile_in(dir)?;
    let (std_file, path) = named.into_parts();
    let mut file = File::from_std(std_file);

    let mut len: u64 = 0;
    pin_mut!(body);
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        len += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    debug!(path = %path.display(), bytes = len, "staged upload");
    Ok(ScratchFile { path, len })
}
