// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Service Ports
//!
//! Trait boundaries the domain defines and infrastructure fulfills.

pub mod compiler;

pub use compiler::{AtomCompiler, Decompiler};
