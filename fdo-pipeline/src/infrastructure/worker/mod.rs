// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Native Worker Pool (C7, C8, C9)
//!
//! [`supervisor`] owns a single worker subprocess; [`pool`] provisions and
//! load-balances a fleet of them with health monitoring, restart, and circuit
//! breaking; [`client`] is the retrying [`fdo_domain::AtomCompiler`] /
//! [`fdo_domain::Decompiler`] adapter application code actually calls.

pub mod client;
pub mod pool;
pub mod supervisor;

pub use client::PoolClient;
pub use pool::{PoolStatus, PoolWorker, WorkerPool};
pub use supervisor::WorkerSupervisor;
