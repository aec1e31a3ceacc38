// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Atom Unit Value Object
//!
//! An `AtomUnit` is one logical construct produced by preprocessing and
//! parsing an FDO source script: a single atom line, a multi-line action
//! block, or a `raw_data` literal. Chunking treats each kind differently, so
//! the kind travels with the content rather than being re-derived downstream.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomKind {
    SingleAtom,
    ActionBlock,
    RawDataAtom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomUnit {
    pub content: String,
    pub kind: AtomKind,
    pub line_start: usize,
    pub line_end: usize,
}

impl AtomUnit {
    pub fn new(content: impl Into<String>, kind: AtomKind, line_start: usize, line_end: usize) -> Self {
        Self { content: content.into(), kind, line_start, line_end }
    }

    pub fn single(content: impl Into<String>, line: usize) -> Self {
        Self::new(content, AtomKind::SingleAtom, line, line)
    }

    pub fn is_raw_data(&self) -> bool {
        matches!(self.kind, AtomKind::RawDataAtom)
    }

    pub fn is_action_block(&self) -> bool {
        matches!(self.kind, AtomKind::ActionBlock)
    }
}
