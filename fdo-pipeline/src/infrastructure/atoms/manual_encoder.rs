// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Manual Atom Encoder (C1)
//!
//! Fast-path compiler for hex-pair data atoms, bypassing the native worker
//! entirely for the subset of FDO source it can prove it understands:
//! `idb_append_data`, `dod_data`, and `man_append_data` lines whose argument
//! is a comma-separated list of `NNx` hex pairs.
//!
//! All three atom names share one opcode in the reverse-engineered binary
//! format; `dod_data` and `man_append_data` have never been independently
//! confirmed against a distinct opcode, so both keep using
//! `idb_append_data`'s until a counter-example turns up.

use once_cell::sync::Lazy;
use regex::Regex;

use fdo_domain::CoreError;

/// Opcode shared by all three hex-pair atom names. See module docs.
const MANUAL_HEX_OPCODE: u8 = 0x05;
const FLAGS: u8 = 0x0B;
const FORMAT_MARKER: u8 = 0x80;
const MAX_PAYLOAD_LEN: usize = 255;

const SUPPORTED_ATOMS: [&str; 3] = ["idb_append_data", "dod_data", "man_append_data"];

static HEX_PAIR_CONTAINER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*[0-9a-fA-F]x[^>]*>").unwrap());
static ANGLE_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([^>]+)>").unwrap());
static HEX_PAIR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{1,2}$").unwrap());

/// Returns `true` when `line` is a hex-pair atom this encoder can compile
/// without involving the worker.
pub fn can_compile_manually(line: &str) -> bool {
    let trimmed = line.trim();
    if !SUPPORTED_ATOMS.iter().any(|atom| trimmed.starts_with(atom)) {
        return false;
    }
    if !HEX_PAIR_CONTAINER.is_match(trimmed) {
        return false;
    }
    match extract_hex_pairs(trimmed) {
        Some(pairs) => pairs.len() <= MAX_PAYLOAD_LEN,
        None => false,
    }
}

/// Extracts and normalizes hex pairs from inside the atom's `<...>` argument,
/// e.g. `"idb_append_data <01x, 2x, FFx>"` -> `["01", "02", "FF"]`.
fn extract_hex_pairs(line: &str) -> Option<Vec<String>> {
    let content = ANGLE_CONTENT.captures(line)?.get(1)?.as_str();

    let pairs: Vec<String> = content
        .split(',')
        .filter_map(|item| {
            let item = item.trim().to_ascii_lowercase();
            let hex = item.strip_suffix('x')?;
            if HEX_PAIR_TOKEN.is_match(hex) {
                Some(format!("{hex:0>2}").to_ascii_uppercase())
            } else {
                None
            }
        })
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs)
    }
}

fn atom_type(line: &str) -> Option<&'static str> {
    SUPPORTED_ATOMS.into_iter().find(|atom| line.starts_with(atom))
}

/// Compiles a single FDO source line, or returns `None` if the line falls
/// outside this encoder's supported subset (the caller should fall back to
/// the worker).
pub fn compile_line(line: &str) -> Option<Vec<u8>> {
    let trimmed = line.trim();
    if !can_compile_manually(trimmed) {
        return None;
    }
    let _ = atom_type(trimmed)?;
    let pairs = extract_hex_pairs(trimmed)?;
    compile_hex_pairs(&pairs).ok()
}

/// Encodes already-extracted hex pairs as `[opcode][flags][marker][len][payload...]`.
pub fn compile_hex_pairs(hex_pairs: &[String]) -> Result<Vec<u8>, CoreError> {
    let payload_len = hex_pairs.len();
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(CoreError::parse(0, format!("payload too long: {payload_len} bytes (max {MAX_PAYLOAD_LEN})")));
    }

    let mut out = Vec::with_capacity(4 + payload_len);
    out.push(MANUAL_HEX_OPCODE);
    out.push(FLAGS);
    out.push(FORMAT_MARKER);
    out.push(payload_len as u8);
    for pair in hex_pairs {
        let byte = u8::from_str_radix(pair, 16)
            .map_err(|_| CoreError::parse(0, format!("invalid hex pair: {pair}")))?;
        out.push(byte);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_atom_names() {
        assert!(!can_compile_manually("uni_start_stream <foo>"));
        assert_eq!(compile_line("uni_start_stream <foo>"), None);
    }

    #[test]
    fn rejects_quoted_text_argument() {
        assert!(!can_compile_manually(r#"man_append_data <"hello world">"#));
    }

    #[test]
    fn accepts_single_and_double_digit_hex_tokens() {
        let result = compile_line("idb_append_data <5x, 0Ax>").unwrap();
        assert_eq!(result, vec![0x05, 0x0B, 0x80, 0x02, 0x05, 0x0A]);
    }

    #[test]
    fn rejects_payload_over_255_pairs() {
        let pairs: Vec<String> = (0..256).map(|_| "AA".to_string()).collect();
        assert!(compile_hex_pairs(&pairs).is_err());
    }

    /// Golden vector carried over from the legacy reverse-engineering notes:
    /// a GIF87a thumbnail blob compiled as an `idb_append_data` atom.
    #[test]
    fn matches_golden_vector() {
        let line = "idb_append_data <01x,00x,01x,00x,01x,00x,0bx,05x,00x,00x,01x,00x,00x,00x,05x,02x,\
            78x,00x,29x,00x,00x,00x,e7x,04x,00x,00x,24x,00x,00x,00x,00x,00x,00x,00x,00x,00x,80x,fdx,\
            00x,00x,47x,49x,46x,38x,37x,61x,78x,00x,29x,00x,d5x,00x,00x,00x,00x,00x,ffx,00x,00x,ffx,\
            80x,00x,ffx,80x,40x,ffx,8ex,1cx,edx,92x,24x,f7x,99x,2bx,fcx,9dx,2cx,fcx,9fx,31x,ffx,9fx,\
            20x,fcx,a1x,34x,ffx,a2x,2fx,fcx,a4x,3cx,ffx,a4x,24x,fcx,a7x,42x,fcx,a8x,44x,ffx,aax,00x,\
            ffx,aax,2bx,ffx,aax,39x,fcx,acx,4cx,fcx,afx,53x,fcx,b0x,56x,fcx,b3x,5bx,fdx,b6x,63x,ffx,\
            b6x,24x,fdx,b8x,66x,fdx,bax,6ax,fdx,bex,73x,fdx,c0x,77x,fdx,c2x,7cx,fdx,c6x,84x,fdx,c7x,\
            88x,fdx>";
        let expected_hex = "050B80960100010001000B050000010000000502780029000000E70400002400000000000000000080FD000047494638376178002900D50000000000FF0000FF8000FF8040FF8E1CED9224F7992BFC9D2CFC9F31FF9F20FCA134FFA22FFCA43CFFA424FCA742FCA844FFAA00FFAA2BFFAA39FCAC4CFCAF53FCB056FCB35BFDB663FFB624FDB866FDBA6AFDBE73FDC077FDC27CFDC684FDC788FD";

        let compiled = compile_line(line).expect("golden line should compile manually");
        let got_hex: String = compiled.iter().map(|b| format!("{b:02X}")).collect();
        assert_eq!(got_hex, expected_hex);
    }
}
