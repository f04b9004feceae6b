// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object storage blob store for S3-compatible and GCS buckets.
//!
//! Both cloud variants share one implementation over `object_store`; only
//! the builder and the locator scheme differ. Create-new writes use a
//! conditional put where the backend supports it, and fall back to a
//! head-then-put check where it does not.

use std::sync::Arc;

use async_trait::async_trait;
use casebot_config::model::{GcsConfig, S3Config};
use casebot_core::{
    AdapterType, BlobStore, CaseError, HealthStatus, Locator, PluginAdapter, WriteMode,
};
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode, PutPayload};
use tracing::{debug, warn};

use crate::check_write;

/// Blob store backed by an [`ObjectStore`] bucket.
#[derive(Debug, Clone)]
pub struct ObjectBlobStore {
    store: Arc<dyn ObjectStore>,
    scheme: &'static str,
    bucket: String,
    max_blob_bytes: u64,
}

impl ObjectBlobStore {
    /// Wraps an existing object store. `scheme` and `bucket` only shape locators.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        scheme: &'static str,
        bucket: impl Into<String>,
        max_blob_bytes: u64,
    ) -> Self {
        Self {
            store,
            scheme,
            bucket: bucket.into(),
            max_blob_bytes,
        }
    }

    /// Builds an S3-compatible store. Credentials fall back to the standard
    /// AWS environment when not configured explicitly.
    pub fn s3(config: &S3Config, max_blob_bytes: u64) -> Result<Self, CaseError> {
        let bucket = required(&config.bucket, "storage.s3.bucket")?;
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&bucket);
        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"))
                .with_virtual_hosted_style_request(false);
        }
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key)
                .with_secret_access_key(secret);
        }
        let store = builder.build().map_err(|e| {
            CaseError::InvalidConfiguration(format!("cannot build S3 client: {e}"))
        })?;
        Ok(Self::new(Arc::new(store), "s3", bucket, max_blob_bytes))
    }

    /// Builds a Google Cloud Storage store.
    pub fn gcs(config: &GcsConfig, max_blob_bytes: u64) -> Result<Self, CaseError> {
        let bucket = required(&config.bucket, "storage.gcs.bucket")?;
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(&bucket);
        if let Some(path) = &config.service_account_path {
            builder = builder.with_service_account_path(path);
        }
        let store = builder.build().map_err(|e| {
            CaseError::InvalidConfiguration(format!("cannot build GCS client: {e}"))
        })?;
        Ok(Self::new(Arc::new(store), "gcs", bucket, max_blob_bytes))
    }

    fn locator_for(&self, path: &ObjectPath) -> Locator {
        Locator::new(format!("{}://{}/{path}", self.scheme, self.bucket))
    }

    fn path_from_locator(&self, locator: &Locator) -> Result<ObjectPath, CaseError> {
        let prefix = format!("{}://{}/", self.scheme, self.bucket);
        let key = locator.as_str().strip_prefix(&prefix).ok_or_else(|| {
            CaseError::InvalidInput(format!("`{locator}` does not belong to {prefix}"))
        })?;
        ObjectPath::parse(key)
            .map_err(|e| CaseError::InvalidInput(format!("invalid object key in `{locator}`: {e}")))
    }

    async fn resolve_existing(
        &self,
        path: &ObjectPath,
        bytes: &[u8],
    ) -> Result<Locator, CaseError> {
        let locator = self.locator_for(path);
        let existing = self.read(path).await?;
        if existing == bytes {
            debug!(locator = %locator, "identical blob already stored");
            Ok(locator)
        } else {
            Err(CaseError::BlobConflict {
                locator: locator.to_string(),
            })
        }
    }

    async fn read(&self, path: &ObjectPath) -> Result<Vec<u8>, CaseError> {
        let result = self.store.get(path).await.map_err(map_store_err)?;
        let bytes = result.bytes().await.map_err(map_store_err)?;
        Ok(bytes.to_vec())
    }

    async fn put(&self, path: &ObjectPath, bytes: &[u8]) -> Result<(), CaseError> {
        self.store
            .put(path, PutPayload::from(bytes.to_vec()))
            .await
            .map_err(map_store_err)?;
        Ok(())
    }

    /// Create-new for backends without conditional writes. Not atomic
    /// across processes, but per-case locking serializes writers in-process.
    async fn create_unconditionally(
        &self,
        path: &ObjectPath,
        bytes: &[u8],
    ) -> Result<Locator, CaseError> {
        match self.store.head(path).await {
            Ok(_) => self.resolve_existing(path, bytes).await,
            Err(object_store::Error::NotFound { .. }) => {
                self.put(path, bytes).await?;
                Ok(self.locator_for(path))
            }
            Err(e) => Err(map_store_err(e)),
        }
    }
}

fn required(value: &Option<String>, key: &str) -> Result<String, CaseError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CaseError::InvalidConfiguration(format!("{key} is required")))
}

fn map_store_err(e: object_store::Error) -> CaseError {
    match e {
        object_store::Error::NotFound { path, .. } => CaseError::not_found(format!("blob {path}")),
        other => CaseError::storage_unavailable("object store request failed", other),
    }
}

#[async_trait]
impl PluginAdapter for ObjectBlobStore {
    fn name(&self) -> &str {
        self.scheme
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseError> {
        // A missing probe object still proves the bucket answered.
        let probe = ObjectPath::from(".casebot-health");
        match self.store.head(&probe).await {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "{}://{} unreachable: {e}",
                self.scheme, self.bucket
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), CaseError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn store(
        &self,
        scope: &str,
        logical_name: &str,
        bytes: &[u8],
        mode: WriteMode,
    ) -> Result<Locator, CaseError> {
        check_write(scope, logical_name, bytes.len(), self.max_blob_bytes)?;
        let path = ObjectPath::from(format!("{scope}/{logical_name}"));

        if mode == WriteMode::Overwrite {
            self.put(&path, bytes).await?;
            let locator = self.locator_for(&path);
            debug!(locator = %locator, size = bytes.len(), "blob stored");
            return Ok(locator);
        }

        let payload = PutPayload::from(bytes.to_vec());
        match self.store.put_opts(&path, payload, PutMode::Create.into()).await {
            Ok(_) => {
                let locator = self.locator_for(&path);
                debug!(locator = %locator, size = bytes.len(), "blob stored");
                Ok(locator)
            }
            Err(object_store::Error::AlreadyExists { .. }) => {
                self.resolve_existing(&path, bytes).await
            }
            Err(object_store::Error::NotImplemented) => {
                warn!(
                    scheme = self.scheme,
                    "conditional put unsupported, falling back to head-then-put"
                );
                self.create_unconditionally(&path, bytes).await
            }
            Err(e) => Err(map_store_err(e)),
        }
    }

    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, CaseError> {
        let path = self.path_from_locator(locator)?;
        self.read(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn memory_store(scheme: &'static str) -> ObjectBlobStore {
        ObjectBlobStore::new(Arc::new(InMemory::new()), scheme, "claims", 1024)
    }

    #[tokio::test]
    async fn s3_locator_format() {
        let store = memory_store("s3");
        let locator = store
            .store("C1", "doc1.pdf", b"%PDF", WriteMode::CreateNew)
            .await
            .unwrap();
        assert_eq!(locator.as_str(), "s3://claims/C1/doc1.pdf");
    }

    #[tokio::test]
    async fn gcs_locator_format() {
        let store = memory_store("gcs");
        let locator = store
            .store("reports/42", "report_1.txt", b"text", WriteMode::Overwrite)
            .await
            .unwrap();
        assert_eq!(locator.as_str(), "gcs://claims/reports/42/report_1.txt");
    }

    #[tokio::test]
    async fn foreign_bucket_locator_is_rejected() {
        let store = memory_store("s3");
        let err = store
            .fetch(&Locator::new("s3://other-bucket/C1/doc1.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = memory_store("gcs");
        let err = store
            .fetch(&Locator::new("gcs://claims/C9/none.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unconditional_fallback_detects_conflict() {
        let store = memory_store("s3");
        let path = ObjectPath::from("C1/a.pdf");
        let first = store.create_unconditionally(&path, b"one").await.unwrap();
        let again = store.create_unconditionally(&path, b"one").await.unwrap();
        assert_eq!(first, again);
        let err = store
            .create_unconditionally(&path, b"two")
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::BlobConflict { .. }));
    }

    #[tokio::test]
    async fn health_check_is_healthy_for_reachable_bucket() {
        let store = memory_store("s3");
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[test]
    fn gcs_requires_bucket() {
        let err = ObjectBlobStore::gcs(&GcsConfig::default(), 10).unwrap_err();
        assert!(matches!(err, CaseError::InvalidConfiguration(_)));
    }
}
