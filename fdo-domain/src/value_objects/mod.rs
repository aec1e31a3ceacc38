// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Value Objects
//!
//! Immutable, self-validating objects describing the FDO wire format and the
//! worker pool's observable state:
//!
//! - [`Token`] / [`StreamId`]: the two-field P3 payload header
//! - [`AtomUnit`]: one parsed construct from FDO source
//! - [`Segment`]: a wire-sized slice of a compiled atom's bytes
//! - [`ChunkMetadata`]: per-packet emission bookkeeping
//! - [`Packet`]: a built or parsed P3 payload
//! - [`P3Frame`]: the framing layer wrapped around a packet
//! - [`FdoFrameRecord`]: one FDO extraction from a JSONL capture
//! - [`WorkerInstance`]: pool-tracked state for a supervised worker process

pub mod atom_unit;
pub mod chunk_metadata;
pub mod fdo_frame_record;
pub mod p3_frame;
pub mod packet;
pub mod segment;
pub mod stream_id;
pub mod token;
pub mod worker_instance;

pub use atom_unit::{AtomKind, AtomUnit};
pub use chunk_metadata::ChunkMetadata;
pub use fdo_frame_record::FdoFrameRecord;
pub use p3_frame::{parse_frame, quick_validate, P3Frame, PacketType};
pub use packet::{build_packet, parse_packet_header, Packet};
pub use segment::segment_data_if_needed;
pub use stream_id::StreamId;
pub use token::Token;
pub use worker_instance::{WorkerInstance, WorkerState};
