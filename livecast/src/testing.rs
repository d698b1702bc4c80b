use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use sea_orm::DatabaseConnection;

use storage::{ObjectStorage, StoredObject};

use crate::config::Database;
use crate::service::database::DatabaseService;

pub(crate) async fn database() -> DatabaseConnection {
    let config = Database {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connect_timeout: 5,
    };
    DatabaseService::new(&config).await.unwrap().connection
}

/// Keeps every upload in memory so tests can inspect the payload
#[derive(Default)]
pub(crate) struct CapturingStorage {
    pub uploads: Mutex<Vec<(String, String, Bytes)>>,
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStorage for CapturingStorage {
    async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        file_name: &str,
    ) -> Result<StoredObject> {
        let size_bytes = data.len() as u64;
        self.uploads.lock().unwrap().push((
            file_name.to_string(),
            content_type.to_string(),
            data,
        ));
        Ok(StoredObject {
            public_url: self.public_url(file_name),
            signed_url: Some(format!("{}?sig=1", self.public_url(file_name))),
            file_name: file_name.to_string(),
            size_bytes,
        })
    }

    async fn delete(&self, file_name: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(file_name.to_string());
        Ok(())
    }

    async fn refresh_signed_url(&self, file_name: &str) -> Result<String> {
        Ok(format!("{}?sig=2", self.public_url(file_name)))
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("https://cdn.test/{}", file_name)
    }

    fn signs_urls(&self) -> bool {
        true
    }
}

/// Every call fails, like an unreachable bucket
pub(crate) struct FailingStorage;

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn upload(&self, _: Bytes, _: &str, _: &str) -> Result<StoredObject> {
        Err(anyhow!("connection refused"))
    }

    async fn delete(&self, _: &str) -> Result<()> {
        Err(anyhow!("connection refused"))
    }

    async fn refresh_signed_url(&self, _: &str) -> Result<String> {
        Err(anyhow!("connection refused"))
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("https://cdn.test/{}", file_name)
    }

    fn signs_urls(&self) -> bool {
        true
    }
}

pub(crate) fn capturing() -> Arc<CapturingStorage> {
    Arc::new(CapturingStorage::default())
}
