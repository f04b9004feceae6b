// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob storage backends for Casebot.
//!
//! Attachments and generated reports are persisted through the
//! [`BlobStore`] trait. Three interchangeable variants are selected by
//! `storage.backend`:
//!
//! - `local`: files under `storage.media_dir`, locators `local:///abs/path`
//! - `s3`: any S3-compatible bucket, locators `s3://bucket/key`
//! - `gcs`: Google Cloud Storage, locators `gcs://bucket/key`
//!
//! All variants share the same collision, idempotency, and quota semantics.

pub mod local;
pub mod object;

use std::sync::Arc;

use casebot_config::model::{StorageBackend, StorageConfig};
use casebot_core::{BlobStore, CaseError};
use tracing::info;

pub use local::LocalBlobStore;
pub use object::ObjectBlobStore;

/// Build the blob store selected by configuration.
///
/// Missing buckets or unusable credentials surface as `InvalidConfiguration`
/// here, at startup, rather than on the first upload.
pub fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, CaseError> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Local => Arc::new(LocalBlobStore::new(
            &config.media_dir,
            config.max_blob_bytes,
        )?),
        StorageBackend::S3 => Arc::new(ObjectBlobStore::s3(&config.s3, config.max_blob_bytes)?),
        StorageBackend::Gcs => {
            Arc::new(ObjectBlobStore::gcs(&config.gcs, config.max_blob_bytes)?)
        }
    };
    info!(backend = %config.backend, name = store.name(), "blob store ready");
    Ok(store)
}

/// Checks that a blob write is well-formed before any backend I/O.
///
/// `scope` may contain `/`-separated segments (`reports/12345`); the logical
/// name must be a single segment. `.`/`..` segments and backslashes are
/// rejected everywhere so a name can never escape its scope.
pub(crate) fn check_write(
    scope: &str,
    logical_name: &str,
    len: usize,
    max_blob_bytes: u64,
) -> Result<(), CaseError> {
    if len == 0 {
        return Err(CaseError::InvalidInput("refusing to store an empty blob".into()));
    }
    if scope.split('/').any(|segment| !is_valid_segment(segment)) {
        return Err(CaseError::InvalidInput(format!("invalid blob scope `{scope}`")));
    }
    if logical_name.contains('/') || !is_valid_segment(logical_name) {
        return Err(CaseError::InvalidInput(format!(
            "invalid blob name `{logical_name}`"
        )));
    }
    if len as u64 > max_blob_bytes {
        return Err(CaseError::StorageQuotaExceeded {
            message: format!("blob of {len} bytes exceeds the {max_blob_bytes} byte limit"),
        });
    }
    Ok(())
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('\\')
        && !segment.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_invalid_input() {
        let err = check_write("C1", "doc.pdf", 0, 100).unwrap_err();
        assert!(matches!(err, CaseError::InvalidInput(_)));
    }

    #[test]
    fn names_cannot_escape_scope() {
        for name in ["../etc/passwd", "a/b.pdf", "..", ".", "", "a\\b"] {
            assert!(
                check_write("C1", name, 1, 100).is_err(),
                "name {name:?} should be rejected"
            );
        }
        assert!(check_write("C1/../C2", "a.pdf", 1, 100).is_err());
        assert!(check_write("/C1", "a.pdf", 1, 100).is_err());
    }

    #[test]
    fn nested_scope_is_accepted() {
        assert!(check_write("reports/12345", "report_1.pdf", 10, 100).is_ok());
    }

    #[test]
    fn oversized_blob_exceeds_quota() {
        let err = check_write("C1", "big.bin", 101, 100).unwrap_err();
        assert!(matches!(err, CaseError::StorageQuotaExceeded { .. }));
    }

    #[test]
    fn build_rejects_s3_without_bucket() {
        let config = StorageConfig {
            backend: StorageBackend::S3,
            ..StorageConfig::default()
        };
        let err = build_blob_store(&config).err().unwrap();
        assert!(matches!(err, CaseError::InvalidConfiguration(_)));
    }

    #[test]
    fn build_local_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            media_dir: dir.path().display().to_string(),
            ..StorageConfig::default()
        };
        let store = build_blob_store(&config).unwrap();
        assert_eq!(store.name(), "local");
    }
}
