// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Atom Preprocessor (C2, pass 1)
//!
//! Splits oversize `man_append_data`, `idb_append_data`, and `dod_data`
//! lines into multiple smaller lines before tokenization, so the chunker
//! (C4) never has to reach for P3 continuation segmentation on a single
//! atom when a line-level split would do. Indentation is preserved on
//! every emitted line; the quoted-text splitter preserves boundary
//! whitespace exactly, since stripping it would let words concatenate
//! across the resulting packets.

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_APPEND_DATA_TEXT_LENGTH: usize = 200;
const MAX_MAN_APPEND_DATA_HEX_PAIRS: usize = 150;
const MAX_IDB_APPEND_DATA_HEX_LENGTH: usize = 400;
const MAX_IDB_APPEND_DATA_HEX_PAIRS: usize = 200;
const MAX_DOD_DATA_HEX_LENGTH: usize = 400;
const MAX_DOD_DATA_HEX_PAIRS: usize = 200;

static INDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)").unwrap());
static MAN_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"man_append_data\s*<\s*"([^"]*)"#).unwrap());
static MAN_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"man_append_data\s*<\s*([0-9A-Fa-fx, ]+)\s*>").unwrap());
static IDB_CONTINUOUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"idb_append_data\s*<\s*([0-9A-Fa-f\s]+)\s*>").unwrap());
static IDB_HEX_PAIRS: Lazy<Regex> = Lazy::new(|| Regex::new(r"idb_append_data\s*<\s*([0-9A-Fa-fx, ]+)\s*>").unwrap());
static DOD_CONTINUOUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"dod_data\s*<\s*([0-9A-Fa-f\s]+)\s*>").unwrap());
static DOD_HEX_PAIRS: Lazy<Regex> = Lazy::new(|| Regex::new(r"dod_data\s*<\s*([0-9A-Fa-fx, ]+)\s*>").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

fn indent_of(line: &str) -> &str {
    INDENT.find(line).map(|m| m.as_str()).unwrap_or("")
}

/// Splits every oversize data-atom line in `source`, leaving all other
/// lines untouched. Run before [`super::parser::parse_atoms`].
pub fn preprocess_script(source: &str) -> String {
    source.split('\n').flat_map(preprocess_line).collect::<Vec<_>>().join("\n")
}

fn preprocess_line(line: &str) -> Vec<String> {
    let trimmed = line.trim();

    if trimmed.starts_with("man_append_data") {
        if let Some(text) = extract_man_text(trimmed) {
            if text.chars().count() > MAX_APPEND_DATA_TEXT_LENGTH {
                return split_man_text_line(line, &text);
            }
        } else if let Some(hex) = extract_man_hex(trimmed) {
            if count_pairs(&hex) > MAX_MAN_APPEND_DATA_HEX_PAIRS {
                return split_hex_pairs_line(line, "man_append_data", &hex, MAX_MAN_APPEND_DATA_HEX_PAIRS);
            }
        }
    } else if trimmed.starts_with("idb_append_data") {
        if let Some(hex) = extract_idb_hex_pairs(trimmed) {
            if count_pairs(&hex) > MAX_IDB_APPEND_DATA_HEX_PAIRS {
                return split_hex_pairs_line(line, "idb_append_data", &hex, MAX_IDB_APPEND_DATA_HEX_PAIRS);
            }
        } else if let Some(hex) = extract_idb_continuous(trimmed) {
            if hex.len() > MAX_IDB_APPEND_DATA_HEX_LENGTH {
                return split_continuous_hex_line(line, "idb_append_data", &hex, MAX_IDB_APPEND_DATA_HEX_LENGTH);
            }
        }
    } else if trimmed.starts_with("dod_data") {
        if let Some(hex) = extract_dod_hex_pairs(trimmed) {
            if count_pairs(&hex) > MAX_DOD_DATA_HEX_PAIRS {
                return split_hex_pairs_line(line, "dod_data", &hex, MAX_DOD_DATA_HEX_PAIRS);
            }
        } else if let Some(hex) = extract_dod_continuous(trimmed) {
            if hex.len() > MAX_DOD_DATA_HEX_LENGTH {
                return split_continuous_hex_line(line, "dod_data", &hex, MAX_DOD_DATA_HEX_LENGTH);
            }
        }
    }

    vec![line.to_string()]
}

fn count_pairs(hex_content: &str) -> usize {
    hex_content.split(',').filter(|p| !p.trim().is_empty()).count()
}

fn extract_man_text(line: &str) -> Option<String> {
    MAN_TEXT.captures(line).map(|c| c[1].to_string())
}

fn extract_man_hex(line: &str) -> Option<String> {
    let content = MAN_HEX.captures(line)?[1].to_string();
    content.to_ascii_lowercase().contains('x').then_some(content)
}

fn extract_idb_continuous(line: &str) -> Option<String> {
    let content = IDB_CONTINUOUS.captures(line)?[1].to_string();
    let lower = content.to_ascii_lowercase();
    (!lower.contains('x') && !content.contains(',')).then_some(content)
}

fn extract_idb_hex_pairs(line: &str) -> Option<String> {
    let content = IDB_HEX_PAIRS.captures(line)?[1].to_string();
    let lower = content.to_ascii_lowercase();
    (lower.contains('x') && content.contains(',')).then_some(content)
}

fn extract_dod_continuous(line: &str) -> Option<String> {
    let content = DOD_CONTINUOUS.captures(line)?[1].to_string();
    let lower = content.to_ascii_lowercase();
    (!lower.contains('x') && !content.contains(',')).then_some(content)
}

fn extract_dod_hex_pairs(line: &str) -> Option<String> {
    let content = DOD_HEX_PAIRS.captures(line)?[1].to_string();
    let lower = content.to_ascii_lowercase();
    (lower.contains('x') && content.contains(',')).then_some(content)
}

/// Splits `text` at the last sentence-ending punctuation within the first
/// `max_length` characters; falls back to the last space, then a hard cut.
/// Boundary whitespace is never trimmed off the returned chunks.
fn split_text_smartly(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text.trim().to_string();

    while !remaining.is_empty() {
        if remaining.chars().count() <= MAX_APPEND_DATA_TEXT_LENGTH {
            chunks.push(remaining);
            break;
        }
        let split_at = find_good_split_point(&remaining, MAX_APPEND_DATA_TEXT_LENGTH);
        let (chunk, rest) = split_char_boundary(&remaining, split_at);
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        remaining = rest.to_string();
    }

    chunks
}

fn split_char_boundary(text: &str, char_idx: usize) -> (&str, &str) {
    let byte_idx = text.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(text.len());
    text.split_at(byte_idx)
}

fn find_good_split_point(text: &str, max_length: usize) -> usize {
    let char_count = text.chars().count();
    if char_count <= max_length {
        return char_count;
    }

    let (window, _) = split_char_boundary(text, max_length);
    if let Some(m) = SENTENCE_END.find_iter(window).last() {
        return window[..m.end()].chars().count();
    }

    if let Some(last_space) = window.char_indices().filter(|&(_, c)| c == ' ').last() {
        let space_char_idx = window[..last_space.0].chars().count();
        if space_char_idx > 0 {
            return space_char_idx + 1;
        }
    }

    max_length
}

fn split_man_text_line(line: &str, text: &str) -> Vec<String> {
    let indent = indent_of(line);
    split_text_smartly(text)
        .into_iter()
        .map(|chunk| format!("{indent}man_append_data <\"{}\">", chunk.replace('"', "\\\"")))
        .collect()
}

fn split_hex_pairs_line(line: &str, atom: &str, hex_content: &str, max_pairs: usize) -> Vec<String> {
    let indent = indent_of(line);
    let pairs: Vec<&str> = hex_content.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    pairs
        .chunks(max_pairs)
        .map(|chunk| format!("{indent}{atom} <{}>", chunk.join(", ")))
        .collect()
}

fn split_continuous_hex_line(line: &str, atom: &str, hex_content: &str, max_length: usize) -> Vec<String> {
    let indent = indent_of(line);
    let cleaned: String = hex_content.chars().filter(|c| !c.is_whitespace()).collect();

    let mut chunks = Vec::new();
    let mut remaining = cleaned.as_str();
    while !remaining.is_empty() {
        if remaining.len() <= max_length {
            chunks.push(remaining.to_string());
            break;
        }
        let candidate = &remaining[..max_length];
        if let Some(last_comma) = candidate.rfind(',') {
            if last_comma > 0 {
                chunks.push(remaining[..last_comma].to_string());
                remaining = &remaining[last_comma + 1..];
                continue;
            }
        }
        chunks.push(remaining[..max_length].to_string());
        remaining = &remaining[max_length..];
    }

    chunks.into_iter().map(|chunk| format!("{indent}{atom} <{chunk}>")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lines_pass_through_unchanged() {
        let src = "idb_append_data <01x, 02x>\nman_append_data <\"hi\">";
        assert_eq!(preprocess_script(src), src);
    }

    #[test]
    fn splits_oversize_hex_pair_line_on_pair_boundary() {
        let pairs: Vec<String> = (0..210).map(|i| format!("{:02X}x", i % 256)).collect();
        let line = format!("idb_append_data <{}>", pairs.join(", "));
        let result = preprocess_line(&line);
        assert_eq!(result.len(), 2);
        assert!(result[0].starts_with("idb_append_data <"));
        assert_eq!(count_pairs(&extract_idb_hex_pairs(result[0].trim()).unwrap()), 200);
    }

    #[test]
    fn quoted_text_split_preserves_boundary_spaces() {
        let text: String = std::iter::repeat("word ").take(60).collect();
        let line = format!("man_append_data <\"{}\">", text.trim_end());
        let result = split_man_text_line(&line, text.trim_end());
        let rejoined: String = result
            .iter()
            .map(|l| extract_man_text(l).unwrap())
            .collect();
        assert_eq!(rejoined, text.trim_end());
    }

    #[test]
    fn continuous_hex_prefers_comma_split() {
        let hex = format!("{},{}", "AB".repeat(200), "CD".repeat(10));
        let line = format!("idb_append_data <{hex}>");
        let result = split_continuous_hex_line(&line, "idb_append_data", &hex, MAX_IDB_APPEND_DATA_HEX_LENGTH);
        assert_eq!(result.len(), 2);
    }
}
