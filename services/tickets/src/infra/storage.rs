use std::time::Duration;

use anyhow::Context as _;
use aws_sdk_s3::primitives::ByteStream;

use crate::domain::repository::FileStorage;
use crate::error::TicketsServiceError;

/// S3 bucket whose objects are served from `public_base_url`.
#[derive(Clone)]
pub struct S3FileStorage {
    pub client: aws_sdk_s3::Client,
    pub bucket: String,
    pub public_base_url: String,
    pub timeout: Duration,
}

impl S3FileStorage {
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url.trim_end_matches('/'))
    }
}

impl FileStorage for S3FileStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, TicketsServiceError> {
        let size = bytes.len();
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send();

        tokio::time::timeout(self.timeout, request)
            .await
            .with_context(|| format!("upload {key} timed out"))
            .map_err(TicketsServiceError::upstream)?
            .with_context(|| format!("upload {key}"))
            .map_err(TicketsServiceError::upstream)?;

        tracing::debug!(bucket = %self.bucket, key, size, "object stored");
        Ok(self.object_url(key))
    }
}
