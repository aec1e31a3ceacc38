// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # P3 Payload Builder (C3)
//!
//! Thin dry-run layer over [`fdo_domain::value_objects::packet`]: script
//! authoring tools want to know whether a proposed packet would fit or force
//! segmentation *before* compiling real atoms, without duplicating the
//! domain's build/parse logic.

use fdo_domain::value_objects::packet::{calculate_packet_overhead, validate_packet_size, MAX_OUTBOUND_SIZE};
use fdo_domain::Token;

#[derive(Debug, Clone)]
pub struct PacketSizeEstimate {
    pub header_size: usize,
    pub total_size: usize,
    pub fits: bool,
    pub warning: Option<String>,
}

/// Projects whether `data_len` bytes of payload would fit in a single
/// outbound packet for `token`, without building the packet. Returns a
/// warning rather than an error when it wouldn't: the caller (typically the
/// chunker or a CLI `estimate` command) decides whether that is fatal.
pub fn estimate_packet_size(token: &Token, data_len: usize) -> PacketSizeEstimate {
    let header_size = calculate_packet_overhead(token);
    let total_size = header_size + data_len;
    let fits = validate_packet_size(token, data_len).is_ok();
    let warning = (!fits).then(|| {
        format!(
            "packet for token {token} would be {total_size} bytes, exceeding the {MAX_OUTBOUND_SIZE}-byte outbound limit; it will be segmented or split upstream"
        )
    });

    PacketSizeEstimate { header_size, total_size, fits, warning }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payload_fits_without_warning() {
        let estimate = estimate_packet_size(&Token::new("AT"), 10);
        assert!(estimate.fits);
        assert!(estimate.warning.is_none());
    }

    #[test]
    fn oversize_payload_warns_but_does_not_panic() {
        let estimate = estimate_packet_size(&Token::new("AT"), 200);
        assert!(!estimate.fits);
        assert!(estimate.warning.is_some());
    }
}
