// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # P3 Transport Layer (C3, C5)
//!
//! [`payload_builder`] is a dry-run sizing helper over the domain's packet
//! codec; [`frame_parser`] detects FDO carried inside P3 frames.

pub mod frame_parser;
pub mod payload_builder;

pub use frame_parser::{detect_fdo_in_frame, quick_fdo_check, FdoDetection};
pub use payload_builder::{estimate_packet_size, PacketSizeEstimate};
