// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # FDO Domain
//!
//! Pure domain types for the FDO compilation/transport pipeline: the P3 wire
//! format (tokens, stream ids, packets, frames), the atom model produced by
//! parsing FDO source, the worker pool's observable state, and the
//! [`CoreError`] taxonomy every fallible operation in the system returns.
//!
//! This crate has no I/O. It defines ports ([`services::AtomCompiler`],
//! [`services::Decompiler`]) that the pipeline crate implements against the
//! real worker pool.

pub mod error;
pub mod services;
pub mod value_objects;

pub use error::{normalize_worker_error_message, CoreError};
pub use services::{AtomCompiler, Decompiler};
pub use value_objects::{
    build_packet, parse_frame, parse_packet_header, quick_validate, AtomKind, AtomUnit, ChunkMetadata,
    FdoFrameRecord, P3Frame, Packet, PacketType, StreamId, Token, WorkerInstance, WorkerState,
};
