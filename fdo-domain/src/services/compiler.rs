// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Compiler / Decompiler Ports
//!
//! The domain depends on the legacy native worker only through these two
//! traits. Infrastructure provides the real implementation (an HTTP call
//! through the worker pool); tests provide an in-memory fake.

use async_trait::async_trait;

use crate::error::CoreError;

/// Compiles a single FDO source fragment (one atom's textual content) to its
/// binary form.
#[async_trait]
pub trait AtomCompiler: Send + Sync {
    async fn compile(&self, source: &str) -> Result<Vec<u8>, CoreError>;
}

/// Decompiles a binary FDO payload back to annotated source text.
#[async_trait]
pub trait Decompiler: Send + Sync {
    async fn decompile(&self, data: &[u8]) -> Result<String, CoreError>;
}
