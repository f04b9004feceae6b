// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Casebot intake pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::CaseStatus;

/// The primary error type used across all Casebot adapter traits and pipeline stages.
#[derive(Debug, Error)]
pub enum CaseError {
    /// Blob backend could not be reached (network, permissions, missing directory).
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Blob backend refused the write because capacity is exhausted.
    #[error("storage quota exceeded: {message}")]
    StorageQuotaExceeded { message: String },

    /// Required credentials, bucket, or paths are missing or invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Input bytes could not be parsed as a PDF at all.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The case database could not be reached or a query failed.
    #[error("persistence unavailable: {source}")]
    PersistenceUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Unknown case id or blob locator.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A blob with different content already exists under the requested name.
    #[error("blob already exists at {locator}")]
    BlobConflict { locator: String },

    /// The requested status change does not follow the forward sequence.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: CaseStatus, to: CaseStatus },

    /// Caller supplied unusable input (empty payload, bad name, foreign locator).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Chat transport errors (connection failure, download failure, send failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Language-model API errors.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Flat classification of a [`CaseError`], persisted on failed cases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ErrorKind {
    StorageUnavailable,
    StorageQuotaExceeded,
    InvalidConfiguration,
    MalformedDocument,
    PersistenceUnavailable,
    NotFound,
    BlobConflict,
    InvalidTransition,
    InvalidInput,
    Channel,
    Provider,
    Timeout,
    Internal,
}

impl CaseError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaseError::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            CaseError::StorageQuotaExceeded { .. } => ErrorKind::StorageQuotaExceeded,
            CaseError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            CaseError::MalformedDocument(_) => ErrorKind::MalformedDocument,
            CaseError::PersistenceUnavailable { .. } => ErrorKind::PersistenceUnavailable,
            CaseError::NotFound { .. } => ErrorKind::NotFound,
            CaseError::BlobConflict { .. } => ErrorKind::BlobConflict,
            CaseError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            CaseError::InvalidInput(_) => ErrorKind::InvalidInput,
            CaseError::Channel { .. } => ErrorKind::Channel,
            CaseError::Provider { .. } => ErrorKind::Provider,
            CaseError::Timeout { .. } => ErrorKind::Timeout,
            CaseError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a [`CaseError::StorageUnavailable`] wrapping a source error.
    pub fn storage_unavailable(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CaseError::StorageUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a [`CaseError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        CaseError::NotFound { what: what.into() }
    }

    /// Returns a short message suitable for showing to the chat user.
    ///
    /// Internal details (paths, SQL, credentials) are never included.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::StorageUnavailable => "File storage is currently unavailable.",
            ErrorKind::StorageQuotaExceeded => "File storage is full or the file is too large.",
            ErrorKind::MalformedDocument => "The uploaded PDF could not be read.",
            ErrorKind::PersistenceUnavailable => "The case database is currently unavailable.",
            ErrorKind::InvalidInput => "The uploaded file could not be accepted.",
            ErrorKind::Provider => "Could not reach the language model.",
            ErrorKind::Timeout => "The request timed out.",
            _ => "An internal error occurred.",
        }
    }
}
