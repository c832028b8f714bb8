//! Object storage for finished videos.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::Region,
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use std::{path::Path, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to read {path:?} for upload: {message}")]
    Body { path: String, message: String },
    #[error("failed to upload `{key}` to bucket `{bucket}`: {message}")]
    Put {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("failed to presign `{key}` in bucket `{bucket}`: {message}")]
    Presign {
        bucket: String,
        key: String,
        message: String,
    },
}

#[async_trait]
pub trait ObjectPublisher: Send + Sync {
    /// Single-shot upload of a local file.
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), PublishError>;

    /// A GET URL for a private object, valid for `ttl`.
    async fn presign_get(&self, bucket: &str, key: &str, ttl: Duration)
    -> Result<String, PublishError>;
}

#[derive(Clone)]
pub struct S3Publisher {
    client: Client,
}

impl S3Publisher {
    /// Build a client from the default AWS credential chain.
    ///
    /// `endpoint` points at an S3-compatible provider (e.g. MinIO) and switches
    /// to path-style addressing.
    pub async fn from_env(region: String, endpoint: Option<String>) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectPublisher for S3Publisher {
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), PublishError> {
        let start = std::time::Instant::now();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| PublishError::Body {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %bucket,
                    key = %key,
                    "S3 upload failed"
                );
                PublishError::Put {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: DisplayErrorContext(&e).to_string(),
                }
            })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, PublishError> {
        let presign_err = |message: String| PublishError::Presign {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let config = PresigningConfig::expires_in(ttl).map_err(|e| presign_err(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| presign_err(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}
