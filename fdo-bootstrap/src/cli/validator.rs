// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secure Argument Validation
//!
//! Re-validates clap-parsed paths and numbers before they reach the worker
//! pool or the filesystem. Clap guarantees an argument parses as a `PathBuf`
//! or a number; it says nothing about whether that path escapes the working
//! directory or points at `/etc`.
//!
//! ## Dangerous patterns rejected
//!
//! `..`, `~`, `$`, backticks, `;` `&` `|` `>` `<`, null bytes, newlines.

use std::path::{Path, PathBuf};
use thiserror::Error;

const MAX_ARG_LENGTH: usize = 1000;
const MAX_PATH_LENGTH: usize = 4096;

const DANGEROUS_PATTERNS: &[&str] = &["..", "~", "$", "`", ";", "&", "|", ">", "<", "\n", "\r", "\0"];

const PROTECTED_DIRS: &[&str] = &["/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("argument too long (max {MAX_ARG_LENGTH} characters): {0}")]
    ArgumentTooLong(String),

    #[error("dangerous pattern '{pattern}' detected in argument: {arg}")]
    DangerousPattern { pattern: String, arg: String },

    #[error("path exceeds maximum length (max {MAX_PATH_LENGTH})")]
    PathTooLong,

    #[error("access to protected system directory denied: {0}")]
    ProtectedDirectory(String),

    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid value for {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

/// Stateless namespace for the validation functions below.
pub struct SecureArgParser;

impl SecureArgParser {
    /// Rejects arguments that are too long or contain a shell metacharacter
    /// or path-traversal pattern.
    pub fn validate_argument(arg: &str) -> Result<(), ParseError> {
        if arg.len() > MAX_ARG_LENGTH {
            return Err(ParseError::ArgumentTooLong(arg.chars().take(50).collect::<String>() + "..."));
        }

        for pattern in DANGEROUS_PATTERNS {
            if arg.contains(pattern) {
                return Err(ParseError::DangerousPattern { pattern: pattern.to_string(), arg: arg.to_string() });
            }
        }

        Ok(())
    }

    /// Validates an existing path: no dangerous patterns, canonicalizes, and
    /// rejects paths under a protected system directory.
    pub fn validate_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path).map_err(|e| match e {
            ParseError::ArgumentTooLong(_) => ParseError::InvalidPath(format!("path too long: {path}")),
            ParseError::DangerousPattern { pattern, .. } => {
                ParseError::InvalidPath(format!("path contains dangerous pattern '{pattern}': {path}"))
            }
            other => other,
        })?;

        let path_obj = Path::new(path);
        let canonical = path_obj.canonicalize().map_err(|e| {
            if !path_obj.exists() {
                ParseError::PathNotFound(path.to_string())
            } else {
                ParseError::InvalidPath(format!("{path}: {e}"))
            }
        })?;

        if canonical.to_string_lossy().len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }

        for protected in PROTECTED_DIRS {
            if canonical.starts_with(protected) {
                return Err(ParseError::ProtectedDirectory(canonical.display().to_string()));
            }
        }

        Ok(canonical)
    }

    pub fn validate_optional_path(path: Option<&str>) -> Result<Option<PathBuf>, ParseError> {
        match path {
            Some(p) => Self::validate_path(p).map(Some),
            None => Ok(None),
        }
    }

    /// Validates a numeric argument already rendered as a string (e.g. a
    /// `--stream-id` or `--pool-size` flag), enforcing an optional range.
    pub fn validate_number<T>(arg_name: &str, value: &str, min: Option<T>, max: Option<T>) -> Result<T, ParseError>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display,
    {
        Self::validate_argument(value)?;

        let num = value
            .parse::<T>()
            .map_err(|_| ParseError::InvalidValue { arg: arg_name.to_string(), reason: format!("not a valid number: {value}") })?;

        if let Some(min_val) = min {
            if num < min_val {
                return Err(ParseError::InvalidValue {
                    arg: arg_name.to_string(),
                    reason: format!("value {value} is less than minimum {min_val}"),
                });
            }
        }

        if let Some(max_val) = max {
            if num > max_val {
                return Err(ParseError::InvalidValue {
                    arg: arg_name.to_string(),
                    reason: format!("value {value} is greater than maximum {max_val}"),
                });
            }
        }

        Ok(num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_safe_arguments() {
        assert!(SecureArgParser::validate_argument("safe-arg").is_ok());
        assert!(SecureArgParser::validate_argument("script.fdo").is_ok());
        assert!(SecureArgParser::validate_argument("path/to/file").is_ok());
    }

    #[test]
    fn rejects_too_long_arguments() {
        let long_arg = "a".repeat(MAX_ARG_LENGTH + 1);
        assert!(matches!(SecureArgParser::validate_argument(&long_arg), Err(ParseError::ArgumentTooLong(_))));
    }

    #[test]
    fn detects_dangerous_patterns() {
        let dangerous = [
            "../etc/passwd",
            "~/.ssh/id_rsa",
            "$(whoami)",
            "`ls`",
            "file;rm -rf /",
            "file&background",
            "file|pipe",
            "file>output",
            "file<input",
            "file\nwith\nnewlines",
        ];

        for arg in dangerous {
            assert!(
                matches!(SecureArgParser::validate_argument(arg), Err(ParseError::DangerousPattern { .. })),
                "failed to detect dangerous pattern in: {arg}"
            );
        }
    }

    #[test]
    fn rejects_nonexistent_paths() {
        assert!(matches!(SecureArgParser::validate_path("/no/such/fdo/script.fdo"), Err(ParseError::PathNotFound(_))));
    }

    #[test]
    fn rejects_protected_directories() {
        assert!(matches!(SecureArgParser::validate_path("/etc/passwd"), Err(ParseError::ProtectedDirectory(_))));
    }

    #[test]
    fn validates_valid_numbers() {
        assert_eq!(SecureArgParser::validate_number::<u32>("pool-size", "8", Some(1), Some(20)).unwrap(), 8);
    }

    #[test]
    fn rejects_invalid_numbers() {
        assert!(matches!(
            SecureArgParser::validate_number::<u32>("pool-size", "abc", None, None),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn enforces_range_constraints() {
        assert!(matches!(
            SecureArgParser::validate_number::<u32>("pool-size", "100", Some(1), Some(20)),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            SecureArgParser::validate_number::<u32>("pool-size", "0", Some(1), Some(20)),
            Err(ParseError::InvalidValue { .. })
        ));
    }
}
