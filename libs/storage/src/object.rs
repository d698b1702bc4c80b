use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use opendal::{ErrorKind, Operator};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::operator::init_operator;
use crate::path::validate_path;

/// Every started MiB of payload adds this much to the upload deadline
const UPLOAD_TIME_PER_MIB: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub public_url: String,
    /// Absent when the backend cannot sign URLs
    pub signed_url: Option<String>,
    pub file_name: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, data: Bytes, content_type: &str, file_name: &str)
        -> Result<StoredObject>;

    /// Deleting a missing object succeeds
    async fn delete(&self, file_name: &str) -> Result<()>;

    async fn refresh_signed_url(&self, file_name: &str) -> Result<String>;

    fn public_url(&self, file_name: &str) -> String;

    fn signs_urls(&self) -> bool;
}

pub struct OperatorStorage {
    operator: Operator,
    public_base: String,
    signed_url_expires: Duration,
    upload_timeout: Duration,
}

impl OperatorStorage {
    pub fn new(operator: Operator, config: &StorageConfig) -> Self {
        Self {
            operator,
            public_base: config
                .public_url
                .clone()
                .unwrap_or_else(|| config.backend.default_public_url()),
            signed_url_expires: Duration::from_secs(config.signed_url_expires),
            upload_timeout: Duration::from_secs(config.upload_timeout),
        }
    }

    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let operator = init_operator(&config.backend).await?;
        Ok(Self::new(operator, config))
    }

    fn upload_deadline(&self, size: usize) -> Duration {
        let mib = size.div_ceil(1024 * 1024) as u32;
        self.upload_timeout + UPLOAD_TIME_PER_MIB * mib
    }

    async fn presign(&self, file_name: &str) -> Result<Option<String>> {
        if !self.signs_urls() {
            return Ok(None);
        }
        match self
            .operator
            .presign_read(file_name, self.signed_url_expires)
            .await
        {
            Ok(req) => Ok(Some(req.uri().to_string())),
            Err(e) if e.kind() == ErrorKind::Unsupported => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ObjectStorage for OperatorStorage {
    async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        file_name: &str,
    ) -> Result<StoredObject> {
        if !validate_path(file_name) {
            bail!("invalid object name: {}", file_name);
        }

        let size = data.len();
        let deadline = self.upload_deadline(size);
        debug!("Uploading {} ({} bytes, deadline {:?})", file_name, size, deadline);

        let write = async {
            self.operator
                .write_with(file_name, data)
                .content_type(content_type)
                .await
        };
        match tokio::time::timeout(deadline, write).await {
            Ok(result) => {
                result?;
            }
            Err(_) => {
                return Err(anyhow!(
                    "upload of {} timed out after {:?}",
                    file_name,
                    deadline
                ))
            }
        }

        let signed_url = match self.presign(file_name).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Failed to sign URL for {}: {}", file_name, e);
                None
            }
        };

        info!("Uploaded {} ({} bytes)", file_name, size);
        Ok(StoredObject {
            public_url: self.public_url(file_name),
            signed_url,
            file_name: file_name.to_string(),
            size_bytes: size as u64,
        })
    }

    async fn delete(&self, file_name: &str) -> Result<()> {
        if !validate_path(file_name) {
            bail!("invalid object name: {}", file_name);
        }
        self.operator.delete(file_name).await?;
        debug!("Deleted {}", file_name);
        Ok(())
    }

    async fn refresh_signed_url(&self, file_name: &str) -> Result<String> {
        if !self.operator.exists(file_name).await? {
            bail!("object not found: {}", file_name);
        }
        self.presign(file_name)
            .await?
            .ok_or_else(|| anyhow!("storage backend cannot sign URLs"))
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_base.trim_end_matches('/'), file_name)
    }

    fn signs_urls(&self) -> bool {
        self.operator.info().full_capability().presign_read
    }
}
