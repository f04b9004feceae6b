// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob store trait for attachment and report persistence.

use async_trait::async_trait;

use crate::error::CaseError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Locator, WriteMode};

/// Uniform interface over the local, S3-compatible, and GCS-compatible backends.
///
/// Every implementation guarantees:
/// - `store` rejects empty payloads with `InvalidInput`.
/// - `logical_name` is scoped under `scope` (usually a case id), so names
///   only collide within the same scope.
/// - With [`WriteMode::CreateNew`], storing byte-identical content under an
///   existing name returns the existing locator; different content yields
///   `BlobConflict`.
/// - Once `store` returns, `fetch(locator)` yields the same bytes.
#[async_trait]
pub trait BlobStore: PluginAdapter {
    /// Persists `bytes` as `<scope>/<logical_name>` and returns its locator.
    async fn store(
        &self,
        scope: &str,
        logical_name: &str,
        bytes: &[u8],
        mode: WriteMode,
    ) -> Result<Locator, CaseError>;

    /// Reads back a previously stored blob.
    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, CaseError>;
}

