// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local filesystem blob store.
//!
//! Blobs live at `<media_dir>/<scope>/<logical_name>`. Writes go to a
//! temporary sibling first and are then linked (create-new) or renamed
//! (overwrite) into place, so readers never observe a partial file.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use casebot_core::{
    AdapterType, BlobStore, CaseError, HealthStatus, Locator, PluginAdapter, WriteMode,
};
use tracing::debug;

use crate::check_write;

const SCHEME_PREFIX: &str = "local://";

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    max_blob_bytes: u64,
}

impl LocalBlobStore {
    /// Creates a store rooted at `root`. Relative roots are resolved against
    /// the current directory and `.`/`..` are folded away, so locators are
    /// always absolute and free of parent components.
    pub fn new(root: impl AsRef<Path>, max_blob_bytes: u64) -> Result<Self, CaseError> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(CaseError::InvalidConfiguration(
                "storage.media_dir must not be empty".into(),
            ));
        }
        let root = std::path::absolute(root).map_err(|e| {
            CaseError::InvalidConfiguration(format!(
                "cannot resolve media directory {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self {
            root: normalize_lexically(&root),
            max_blob_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_from_locator(&self, locator: &Locator) -> Result<PathBuf, CaseError> {
        let raw = locator.as_str().strip_prefix(SCHEME_PREFIX).ok_or_else(|| {
            CaseError::InvalidInput(format!("`{locator}` is not a local locator"))
        })?;
        let path = PathBuf::from(raw);
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir));
        if escapes || !path.starts_with(&self.root) {
            return Err(CaseError::InvalidInput(format!(
                "`{locator}` is outside the media directory"
            )));
        }
        Ok(path)
    }

    /// Resolves a name collision: identical content is an idempotent retry.
    async fn resolve_existing(
        &self,
        path: &Path,
        bytes: &[u8],
        locator: Locator,
    ) -> Result<Locator, CaseError> {
        let existing = tokio::fs::read(path).await.map_err(|e| map_io_err(e, path))?;
        if existing == bytes {
            debug!(locator = %locator, "identical blob already stored");
            Ok(locator)
        } else {
            Err(CaseError::BlobConflict {
                locator: locator.to_string(),
            })
        }
    }
}

/// Folds `.` and `..` out of an absolute path without touching the
/// filesystem. `..` at the root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Formats the locator for a blob path.
pub fn locator_for(path: &Path) -> Locator {
    Locator::new(format!("{SCHEME_PREFIX}{}", path.display()))
}

fn map_io_err(e: io::Error, path: &Path) -> CaseError {
    match e.kind() {
        io::ErrorKind::NotFound => CaseError::not_found(format!("blob {}", path.display())),
        io::ErrorKind::StorageFull => CaseError::StorageQuotaExceeded {
            message: format!("no space left writing {}", path.display()),
        },
        _ => CaseError::storage_unavailable(format!("I/O error on {}", path.display()), e),
    }
}

#[async_trait]
impl PluginAdapter for LocalBlobStore {
    fn name(&self) -> &str {
        "local"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseError> {
        match tokio::fs::create_dir_all(&self.root).await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "media directory {} unusable: {e}",
                self.root.display()
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), CaseError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        scope: &str,
        logical_name: &str,
        bytes: &[u8],
        mode: WriteMode,
    ) -> Result<Locator, CaseError> {
        check_write(scope, logical_name, bytes.len(), self.max_blob_bytes)?;

        let dir = self.root.join(scope);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| map_io_err(e, &dir))?;

        let path = dir.join(logical_name);
        let locator = locator_for(&path);
        let tmp = dir.join(format!(".{logical_name}.{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| map_io_err(e, &tmp))?;

        let placed = match mode {
            // hard_link fails if the target exists, giving an atomic create-new.
            WriteMode::CreateNew => tokio::fs::hard_link(&tmp, &path).await,
            WriteMode::Overwrite => tokio::fs::rename(&tmp, &path).await,
        };
        if mode == WriteMode::CreateNew || placed.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }

        match placed {
            Ok(()) => {
                debug!(locator = %locator, size = bytes.len(), "blob stored");
                Ok(locator)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                self.resolve_existing(&path, bytes, locator).await
            }
            Err(e) => Err(map_io_err(e, &path)),
        }
    }

    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, CaseError> {
        let path = self.path_from_locator(locator)?;
        tokio::fs::read(&path).await.map_err(|e| map_io_err(e, &path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> LocalBlobStore {
        LocalBlobStore::new(dir, 1024).unwrap()
    }

    #[test]
    fn locator_uses_absolute_path() {
        let path = Path::new("/media").join("C1").join("doc1.pdf");
        assert_eq!(locator_for(&path).as_str(), "local:///media/C1/doc1.pdf");
    }

    #[tokio::test]
    async fn store_then_fetch_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let locator = store
            .store("C1", "doc1.pdf", b"%PDF-1.4 body", WriteMode::CreateNew)
            .await
            .unwrap();
        let expected = format!("local://{}/C1/doc1.pdf", dir.path().display());
        assert_eq!(locator.as_str(), expected);
        assert_eq!(store.fetch(&locator).await.unwrap(), b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn no_temp_files_are_left_behind() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .store("C1", "a.jpg", b"jpeg", WriteMode::CreateNew)
            .await
            .unwrap();
        store
            .store("C1", "a.jpg", b"jpeg2", WriteMode::Overwrite)
            .await
            .unwrap();

        let mut entries = std::fs::read_dir(dir.path().join("C1"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        entries.sort();
        assert_eq!(entries, vec!["a.jpg"]);
    }

    #[tokio::test]
    async fn fetch_outside_root_is_rejected() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let err = store
            .fetch(&Locator::new("local:///etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::InvalidInput(_)));

        let sneaky = format!("local://{}/../etc/passwd", dir.path().display());
        let err = store.fetch(&Locator::new(sneaky)).await.unwrap_err();
        assert!(matches!(err, CaseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn relative_root_becomes_absolute() {
        let store = LocalBlobStore::new("relative/media", 10).unwrap();
        assert!(store.root().is_absolute());
    }

    #[tokio::test]
    async fn unwritable_root_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let store = store_in(&file);
        let err = store
            .store("C1", "a.pdf", b"data", WriteMode::CreateNew)
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::StorageUnavailable { .. }), "got {err:?}");
    }
}
