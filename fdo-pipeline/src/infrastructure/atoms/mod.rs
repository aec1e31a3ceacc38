// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Atom Compilation (C1, C2)
//!
//! [`manual_encoder`] is the fast-path compiler for hex-pair data atoms.
//! [`preprocessor`] and [`parser`] turn FDO source into the ordered
//! [`fdo_domain::AtomUnit`] list the chunker consumes.

pub mod manual_encoder;
pub mod parser;
pub mod preprocessor;

pub use parser::{parse_atoms, validate_syntax, SyntaxReport};
pub use preprocessor::preprocess_script;
