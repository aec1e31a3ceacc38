// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Core Error System
//!
//! A single tagged error type for the FDO compilation/transport pipeline. Every
//! fallible operation in the domain and application layers returns `CoreError`
//! (or wraps it), so callers can classify a failure without downcasting.
//!
//! The five buckets below map directly onto the places a call can fail:
//! malformed input (`Parse`), the legacy Ada32 worker rejecting a request
//! (`WorkerReported`), the worker process itself being unreachable
//! (`Transport`), a safety cap tripping (`ResourceCap`), and bad startup
//! configuration (`Config`). `Io`, `Internal`, and `Cancelled` round out the
//! ambient bottom that every layered system needs.

use thiserror::Error;

/// Errors produced anywhere in the FDO pipeline domain.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("worker reported error: {message}")]
    WorkerReported {
        message: String,
        code: Option<String>,
        line: Option<usize>,
        kind: Option<String>,
        context: Option<String>,
        hint: Option<String>,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("resource cap exceeded: {0}")]
    ResourceCap(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl CoreError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse { line, message: message.into() }
    }

    pub fn worker_reported(message: impl Into<String>) -> Self {
        Self::WorkerReported {
            message: message.into(),
            code: None,
            line: None,
            kind: None,
            context: None,
            hint: None,
        }
    }

    /// Builder-style variant used when the worker's JSON error envelope carries
    /// more than a headline message.
    pub fn worker_reported_full(
        message: impl Into<String>,
        code: Option<String>,
        line: Option<usize>,
        kind: Option<String>,
        context: Option<String>,
        hint: Option<String>,
    ) -> Self {
        Self::WorkerReported { message: message.into(), code, line, kind, context, hint }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn resource_cap(message: impl Into<String>) -> Self {
        Self::ResourceCap(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled(message.into())
    }

    /// Coarse category, stable across variant field changes, suitable for
    /// metrics labels and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            CoreError::Parse { .. } => "parse",
            CoreError::WorkerReported { .. } => "worker_reported",
            CoreError::Transport(_) => "transport",
            CoreError::ResourceCap(_) => "resource_cap",
            CoreError::Config(_) => "config",
            CoreError::Io(_) => "io",
            CoreError::Internal(_) => "internal",
            CoreError::Cancelled(_) => "cancelled",
        }
    }

    /// Whether a caller may reasonably retry the operation that produced this
    /// error. Parse errors and configuration errors will not succeed on
    /// retry; transport errors and worker-reported errors might (the worker
    /// resets its own state after a reported failure).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::Transport(_) | CoreError::WorkerReported { .. })
    }

    /// A `Transport` error means the worker process itself is gone or
    /// unreachable, as opposed to having rejected the request. C9/C10 use
    /// this to decide whether to open a circuit breaker and restart the
    /// worker, rather than simply surfacing the failure to the caller.
    pub fn is_worker_crash(&self) -> bool {
        matches!(self, CoreError::Transport(_))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

/// Strips the `Ada32 error rc=<n>:` prefix the native worker puts on every
/// reported failure, leaving the human-readable tail. Frames with no such
/// prefix pass through unchanged.
pub fn normalize_worker_error_message(raw: &str) -> String {
    match raw.find(':') {
        Some(idx) if raw[..idx].trim_start().starts_with("Ada32 error") => {
            raw[idx + 1..].trim_start().to_string()
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ada32_prefix() {
        assert_eq!(
            normalize_worker_error_message("Ada32 error rc=12: unterminated atom at line 3"),
            "unterminated atom at line 3"
        );
    }

    #[test]
    fn passes_through_unprefixed_messages() {
        assert_eq!(normalize_worker_error_message("connection refused"), "connection refused");
    }

    #[test]
    fn categorizes_transport_as_worker_crash() {
        let err = CoreError::transport("connection reset");
        assert!(err.is_worker_crash());
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "transport");
    }

    #[test]
    fn parse_errors_are_not_recoverable() {
        let err = CoreError::parse(4, "unterminated action block");
        assert!(!err.is_recoverable());
        assert!(!err.is_worker_crash());
    }
}
