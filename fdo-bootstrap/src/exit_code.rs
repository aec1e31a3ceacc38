// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standard Unix exit codes following BSD `sysexits.h` conventions, plus a
//! direct mapping from [`fdo_domain::CoreError`]'s own category so the CLI
//! doesn't have to string-sniff an error message to pick a process exit
//! status.
//!
//! ## Conventions
//!
//! - **0**: success
//! - **1**: general error
//! - **64-78**: specific error conditions (BSD sysexits.h)
//! - **128+N**: fatal signal N (e.g. 130 = SIGINT)

use std::fmt;

use fdo_domain::CoreError;

/// Exit codes following Unix conventions (BSD sysexits.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    #[default]
    Success = 0,

    /// General error (1).
    Error = 1,

    /// Command line usage error (64): bad arguments, missing required flags.
    UsageError = 64,

    /// Data format error (65): malformed FDO source, bad atom, unparsable
    /// JSONL.
    DataError = 65,

    /// Cannot open input (66): input file not found or unreadable.
    NoInput = 66,

    /// Service unavailable (69): worker pool exhausted, no healthy instance.
    Unavailable = 69,

    /// Internal software error (70).
    Software = 70,

    /// System error (71): process spawn failed, subprocess I/O error.
    OsError = 71,

    /// Cannot create output file (73).
    CantCreate = 73,

    /// I/O error (74).
    IoError = 74,

    /// Temporary failure, retry (75): a recoverable transport error that
    /// exhausted its retries.
    TempFail = 75,

    /// Remote error in protocol (76): the worker rejected the request.
    Protocol = 76,

    /// Permission denied (77).
    NoPerm = 77,

    /// Configuration error (78): bad `FdoConfig`, invalid pool sizing.
    Config = 78,

    /// Interrupted by SIGINT (130).
    Interrupted = 130,

    /// Terminated by SIGTERM (143).
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a [`CoreError`] to an exit code using its typed category, not
    /// string matching.
    pub fn from_core_error(error: &CoreError) -> Self {
        match error {
            CoreError::Parse { .. } => ExitCode::DataError,
            CoreError::WorkerReported { .. } => ExitCode::Protocol,
            CoreError::Transport(_) => {
                if error.is_recoverable() {
                    ExitCode::TempFail
                } else {
                    ExitCode::Unavailable
                }
            }
            CoreError::ResourceCap(_) => ExitCode::Unavailable,
            CoreError::Config(_) => ExitCode::Config,
            CoreError::Io(_) => ExitCode::IoError,
            CoreError::Internal(_) => ExitCode::Software,
            CoreError::Cancelled(_) => ExitCode::Terminated,
        }
    }

    /// Fallback mapping for errors outside the `CoreError` hierarchy
    /// (`anyhow`-wrapped I/O and clap errors at the CLI boundary).
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let message = error.to_string().to_lowercase();

        if message.contains("permission") || message.contains("access denied") {
            ExitCode::NoPerm
        } else if message.contains("not found") || message.contains("no such") {
            ExitCode::NoInput
        } else if message.contains("invalid") || message.contains("argument") {
            ExitCode::UsageError
        } else if message.contains("parse") || message.contains("format") {
            ExitCode::DataError
        } else if message.contains("config") {
            ExitCode::Config
        } else if message.contains("io") || message.contains("read") || message.contains("write") {
            ExitCode::IoError
        } else {
            ExitCode::Error
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "success",
            ExitCode::Error => "general error",
            ExitCode::UsageError => "command line usage error",
            ExitCode::DataError => "data format error",
            ExitCode::NoInput => "cannot open input",
            ExitCode::Unavailable => "service unavailable",
            ExitCode::Software => "internal software error",
            ExitCode::OsError => "system error",
            ExitCode::CantCreate => "cannot create output file",
            ExitCode::IoError => "I/O error",
            ExitCode::TempFail => "temporary failure, retry",
            ExitCode::Protocol => "remote error in protocol",
            ExitCode::NoPerm => "permission denied",
            ExitCode::Config => "configuration error",
            ExitCode::Interrupted => "interrupted by signal (SIGINT)",
            ExitCode::Terminated => "terminated by signal (SIGTERM)",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn is_error(self) -> bool {
        !self.is_success()
    }

    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted | ExitCode::Terminated)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_match_sysexits() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Error.as_i32(), 1);
        assert_eq!(ExitCode::UsageError.as_i32(), 64);
        assert_eq!(ExitCode::Config.as_i32(), 78);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
        assert_eq!(ExitCode::Terminated.as_i32(), 143);
    }

    #[test]
    fn success_and_error_are_exclusive() {
        assert!(ExitCode::Success.is_success());
        assert!(!ExitCode::Success.is_error());
        assert!(ExitCode::Error.is_error());
    }

    #[test]
    fn signal_codes() {
        assert!(ExitCode::Interrupted.is_signal());
        assert!(ExitCode::Terminated.is_signal());
        assert!(!ExitCode::Success.is_signal());
    }

    #[test]
    fn default_is_success() {
        assert_eq!(ExitCode::default(), ExitCode::Success);
    }

    #[test]
    fn display_includes_description_and_number() {
        let rendered = format!("{}", ExitCode::UsageError);
        assert!(rendered.contains("usage error"));
        assert!(rendered.contains("64"));
    }

    #[test]
    fn maps_recoverable_transport_to_tempfail() {
        assert_eq!(ExitCode::from_core_error(&CoreError::transport("connection reset")), ExitCode::TempFail);
    }

    #[test]
    fn maps_parse_error_to_data_error() {
        assert_eq!(ExitCode::from_core_error(&CoreError::parse(3, "bad atom")), ExitCode::DataError);
    }

    #[test]
    fn maps_config_error_to_config() {
        assert_eq!(ExitCode::from_core_error(&CoreError::config("pool.size out of range")), ExitCode::Config);
    }

    #[test]
    fn from_error_matches_permission_denied() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        assert_eq!(ExitCode::from_error(&err), ExitCode::NoPerm);
    }

    #[test]
    fn conversion_to_i32() {
        let code: i32 = ExitCode::Config.into();
        assert_eq!(code, 78);
    }
}
