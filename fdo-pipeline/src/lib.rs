// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # FDO Compile/Decompile Pipeline
//!
//! Compiles FDO source text into wire-ready P3 protocol frames, and in the
//! other direction, detects, extracts, reassembles, and decompiles FDO
//! streams embedded in a capture of P3 traffic. A legacy native
//! compiler/decompiler is wrapped by a pool of long-lived worker processes
//! that expose compile/decompile over HTTP; those workers are fragile and
//! crash on malformed input, which is why most of this crate's complexity
//! lives in health monitoring, retry, and forensics rather than in the wire
//! codec itself.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Application Layer                      │
//! │  ChunkerService (C4)  JsonlProcessor (C6)  ForensicDriver  │
//! │                                            (C10)           │
//! └───────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Infrastructure Layer                      │
//! │  atoms (C1/C2)   p3 (C3/C5)   worker (C7/C8/C9)             │
//! │  logging   metrics   config                                │
//! └───────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────────────────────────────────────────────────────┐
//! │                       Domain Layer                         │
//! │  Token, StreamId, AtomUnit, Segment, Packet, P3Frame,      │
//! │  FdoFrameRecord, WorkerInstance, CoreError                 │
//! │                     (fdo-domain crate)                     │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Compile path: FDO source → [`application::services::ChunkerService`]
//! (preprocess, parse into atom units, compile each via a worker or the
//! manual hex-pair fast path, segment and packetize) → `Vec<Vec<u8>>` of
//! wire-ready packets.
//!
//! Decompile path: a JSONL capture → [`application::services::process_jsonl`]
//! (detect chronological order, extract FDO frames via the P3 detector) →
//! [`application::services::ForensicDriver`] (drive each frame through the
//! worker pool, annotate successes/failures/crashes) → a single annotated
//! source text.

pub mod application;
pub mod infrastructure;

pub use fdo_domain::{
    AtomCompiler, AtomKind, AtomUnit, ChunkMetadata, CoreError, Decompiler, FdoFrameRecord, P3Frame, Packet,
    PacketType, StreamId, Token, WorkerInstance, WorkerState,
};
pub use infrastructure::worker::{PoolClient, PoolWorker, WorkerPool, WorkerSupervisor};
