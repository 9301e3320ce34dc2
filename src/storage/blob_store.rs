use async_trait::async_trait;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, Client as S3Client};
use bytes::Bytes;

use crate::{
    config::StorageConfig,
    error::{AppError, Result},
};

/// Object-storage access as the service needs it: upload a blob under a chosen
/// name, delete one, and derive the public URL for a name without any round
/// trip.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `content` under `blob_name`, silently overwriting an existing
    /// blob with the same name, and returns the public URL.
    async fn put(
        &self,
        blob_name: &str,
        content: Bytes,
        content_type: Option<String>,
    ) -> Result<String>;

    /// Deletes `blob_name`. A blob that is already gone counts as success.
    async fn delete(&self, blob_name: &str) -> Result<()>;

    /// Pure string construction from the configured bucket and region.
    fn url_for(&self, blob_name: &str) -> String;
}

pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
    region: String,
}

impl S3BlobStore {
    pub fn new(client: S3Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        blob_name: &str,
        content: Bytes,
        content_type: Option<String>,
    ) -> Result<String> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(blob_name)
            .body(ByteStream::from(content));

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("{}", DisplayErrorContext(&e))))?;

        Ok(self.url_for(blob_name))
    }

    async fn delete(&self, blob_name: &str) -> Result<()> {
        // S3 DeleteObject succeeds for keys that do not exist, which gives us
        // the idempotent-lenient contract for free.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(blob_name)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("{}", DisplayErrorContext(&e))))?;

        Ok(())
    }

    fn url_for(&self, blob_name: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, blob_name
        )
    }
}
