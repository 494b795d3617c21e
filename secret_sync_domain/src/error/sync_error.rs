// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the hierarchical error system for the secret
//! synchronization domain. Failures are categorized so the orchestrator and
//! the resilience layer can make systematic decisions: configuration errors
//! are fatal at startup, transient errors are retried, permission errors are
//! skipped or recorded, and limit errors fail their operation without retry.
//!
//! ## Error Categories
//!
//! - **Configuration**: `InvalidConfiguration`, `UnresolvedImport`,
//!   `CycleDetected` - reported at startup, fatal
//! - **Validation**: `InvalidPath`, `InvalidAccountId` - always fatal for
//!   that input
//! - **Transient**: `Timeout`, `RateLimited`, `NetworkError` - retried per
//!   circuit-breaker policy
//! - **Permission**: `AccessDenied` - never retried; skipped during
//!   discovery and traversal, recorded as the target's failure on writes
//! - **Limit**: `DepthExceeded`, `CountExceeded`, `CircuitOpen` - fail the
//!   specific operation, never retried
//! - **Data**: `DecodeError`, `EncodeError` - fail the operation; typically
//!   signal a corrupt bundle
//! - **System**: `NotFound`, `Cancelled`, `InternalError`, `MetricsError`

use thiserror::Error;

/// Domain-specific errors for the secret synchronization system.
///
/// Each variant includes a descriptive message. Variants are grouped by
/// category (see [`SyncError::category`]) so callers can handle whole
/// classes of failures uniformly, and [`SyncError::is_transient`] drives
/// the retry policy.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unresolved import: {0}")]
    UnresolvedImport(String),

    #[error("Dependency cycle detected: {0}")]
    CycleDetected(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Traversal depth exceeded: {0}")]
    DepthExceeded(String),

    #[error("Secret count exceeded: {0}")]
    CountExceeded(String),

    #[error("Circuit open: {0}")]
    CircuitOpen(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),
}

impl SyncError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new unresolved-import error
    pub fn unresolved_import(msg: impl Into<String>) -> Self {
        Self::UnresolvedImport(msg.into())
    }

    /// Creates a new invalid-path error
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Creates a new access-denied error
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    /// Creates a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a new network error
    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Creates a new decode error
    pub fn decode_error(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Creates a new encode error
    pub fn encode_error(msg: impl Into<String>) -> Self {
        Self::EncodeError(msg.into())
    }

    /// Creates a new cancellation error
    pub fn cancelled() -> Self {
        Self::Cancelled("operation cancelled".to_string())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Creates a new metrics error
    pub fn metrics_error(msg: impl Into<String>) -> Self {
        Self::MetricsError(msg.into())
    }

    /// Checks whether the error is transient and eligible for retry.
    ///
    /// Only network-shaped failures retry. Limit, permission, validation,
    /// and data errors never do.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Timeout(_) | SyncError::RateLimited(_) | SyncError::NetworkError(_)
        )
    }

    /// Checks whether the error is a startup-fatal configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfiguration(_) | SyncError::UnresolvedImport(_) | SyncError::CycleDetected(_)
        )
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::InvalidConfiguration(_) => "configuration",
            SyncError::UnresolvedImport(_) => "configuration",
            SyncError::CycleDetected(_) => "configuration",
            SyncError::InvalidPath(_) => "validation",
            SyncError::InvalidAccountId(_) => "validation",
            SyncError::Timeout(_) => "transient",
            SyncError::RateLimited(_) => "transient",
            SyncError::NetworkError(_) => "transient",
            SyncError::AccessDenied(_) => "permission",
            SyncError::NotFound(_) => "data",
            SyncError::DepthExceeded(_) => "limit",
            SyncError::CountExceeded(_) => "limit",
            SyncError::CircuitOpen(_) => "limit",
            SyncError::DecodeError(_) => "data",
            SyncError::EncodeError(_) => "data",
            SyncError::Cancelled(_) => "cancellation",
            SyncError::InternalError(_) => "internal",
            SyncError::MetricsError(_) => "metrics",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::DecodeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SyncError::Timeout("t".into()).is_transient());
        assert!(SyncError::RateLimited("r".into()).is_transient());
        assert!(SyncError::NetworkError("n".into()).is_transient());
        assert!(!SyncError::AccessDenied("a".into()).is_transient());
        assert!(!SyncError::CircuitOpen("c".into()).is_transient());
        assert!(!SyncError::DecodeError("d".into()).is_transient());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(SyncError::invalid_config("bad").is_configuration());
        assert!(SyncError::CycleDetected("x -> y -> x".into()).is_configuration());
        assert!(!SyncError::cancelled().is_configuration());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(SyncError::invalid_path("p").category(), "validation");
        assert_eq!(SyncError::CountExceeded("n".into()).category(), "limit");
        assert_eq!(SyncError::cancelled().category(), "cancellation");
    }
}
