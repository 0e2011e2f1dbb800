use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use aws_sdk_s3::{Client, config::Region, error::DisplayErrorContext, primitives::ByteStream};
use log::info;

use crate::{
    errors::{Error, Result},
    vars::{ARCHIVER_S3_ENDPOINT, ARCHIVER_S3_REGION},
};

/// The single capability the archiver needs from a storage backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the current contents of `local_path` to `bucket`/`key`.
    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()>;
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| Error::Storage(format!("failed to read {}: {e}", local_path.display())))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Storage(DisplayErrorContext(e).to_string()))?;

        Ok(())
    }
}

/// Builds an S3 client from the default AWS credential chain.
///
/// A custom `ARCHIVER_S3_ENDPOINT` switches to path-style addressing, which is
/// what MinIO and most S3-compatible servers expect.
pub async fn setup_storage() -> Arc<S3ObjectStore> {
    let endpoint = *ARCHIVER_S3_ENDPOINT;
    let mut loader = aws_config::from_env().region(Region::new(*ARCHIVER_S3_REGION));
    if endpoint.is_empty() {
        info!("S3 storage: default endpoint (region: {})", *ARCHIVER_S3_REGION);
    } else {
        info!("S3 storage: {endpoint} (region: {})", *ARCHIVER_S3_REGION);
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(!endpoint.is_empty())
        .build();

    Arc::new(S3ObjectStore::new(Client::from_conf(s3_config)))
}
