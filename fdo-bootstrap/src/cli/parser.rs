// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! The raw `clap` structure for the `fdo-pipeline` binary. Security
//! validation of the parsed paths and numbers happens afterwards, in
//! [`crate::cli::validator`].

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "fdo-pipeline")]
#[command(about = concat!("FDO compile/decompile pipeline v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long)]
    pub json_logs: bool,

    /// Configuration file path (TOML). Defaults apply when absent.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile FDO source text into wire-ready P3 packets
    Compile {
        /// FDO source file. Reads stdin when omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file for the concatenated packet bytes. Writes stdout when
        /// omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// P3 stream ID to packetize under
        #[arg(long, default_value = "0")]
        stream_id: u32,

        /// Two-letter FDO token (e.g. "AT")
        #[arg(long, default_value = "AT")]
        token: String,
    },

    /// Extract and decompile FDO streams from a JSONL capture of P3 traffic
    Decompile {
        /// JSONL capture file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the annotated decompiled source. Writes stdout
        /// when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory crash forensics are written to
        #[arg(long, default_value = "./forensics")]
        forensics_dir: PathBuf,
    },

    /// Report the health and circuit-breaker state of every pool instance
    PoolStatus,

    /// Project packet and action-block counts for a script without
    /// compiling it
    Estimate {
        /// FDO source file. Reads stdin when omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Two-letter FDO token (e.g. "AT")
        #[arg(long, default_value = "AT")]
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_compile_subcommand() {
        let cli = Cli::parse_from(["fdo-pipeline", "compile", "--input", "script.fdo", "--token", "AT"]);
        match cli.command {
            Commands::Compile { input, token, .. } => {
                assert_eq!(input, Some(PathBuf::from("script.fdo")));
                assert_eq!(token, "AT");
            }
            _ => panic!("expected Compile"),
        }
    }
}
