// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the `fdo-pipeline` application
//! layers (domain, application, infrastructure) and provides the ambient OS
//! infrastructure the composition root in `fdo-pipeline::main` wires up
//! before the first worker is spawned:
//!
//! - **Platform abstraction** - page size, CPU count, memory, elevated-user
//!   check, executable-bit check (Unix vs Windows)
//! - **Signal handling** - graceful shutdown on SIGTERM, SIGINT, SIGHUP
//! - **Secure CLI parsing** - `clap` structure plus a second validation pass
//!   against path traversal and shell metacharacters
//! - **Exit codes** - `CoreError` category to Unix exit status mapping
//! - **Shutdown coordination** - cancellation token with a grace-period
//!   timeout so in-flight RPCs to worker subprocesses drain before kill
//! - **Logging** - the `tracing` subscriber bootstrap used before
//!   `fdo-pipeline`'s own structured logging takes over
//!
//! ## Architecture Position
//!
//! ```text
//! fdo-pipeline (binary: src/main.rs)
//!      │ depends on
//!      ▼
//! fdo-bootstrap (this crate, library only)
//!      │ depends on
//!      ▼
//! fdo-domain (CoreError, atom/frame value types)
//! ```
//!
//! `fdo-bootstrap` never depends on `fdo-pipeline`; the composition root
//! lives in the binary crate, not here.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS abstraction (Unix/Windows)
//! - [`signals`] - signal handling (SIGTERM, SIGINT, SIGHUP)
//! - [`cli`] - secure argument parsing (`parser` + `validator`)
//! - [`exit_code`] - Unix exit code enumeration
//! - [`logger`] - bootstrap-specific logging
//! - [`shutdown`] - shutdown coordination

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{Cli, Commands, ParseError, SecureArgParser};
pub use exit_code::ExitCode;
pub use platform::{create_platform, Platform, PlatformError};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
pub use signals::{create_signal_handler, SystemSignals};
