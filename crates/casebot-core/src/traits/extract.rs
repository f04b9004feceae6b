// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document field extraction trait.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::CaseError;

/// Extracts structured fields from an uploaded PDF.
///
/// Returns `MalformedDocument` only when the bytes are not a PDF at all;
/// well-formed documents without recognizable fields yield an empty map.
#[async_trait]
pub trait DocumentExtractor: Send + Sync + 'static {
    async fn extract(&self, pdf_bytes: &[u8]) -> Result<BTreeMap<String, String>, CaseError>;
}
