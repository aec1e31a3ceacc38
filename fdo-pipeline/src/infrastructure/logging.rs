// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Logging
//!
//! Initializes the `tracing` subscriber used across the pipeline. Development
//! builds get human-readable, ANSI-colored output; a supervised process under
//! a log collector wants compact JSON lines instead, selected via
//! [`LogFormat::Json`].

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Installs the global tracing subscriber. Must be called at most once, as
/// early in `main` as possible. `default_level` is used when `RUST_LOG` is
/// unset.
pub fn init_logging(format: LogFormat, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = fmt().with_env_filter(filter).with_target(true);

    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}
