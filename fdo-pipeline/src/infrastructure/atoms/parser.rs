// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Atom Parser (C2, pass 2)
//!
//! Turns preprocessed FDO source into an ordered list of
//! [`fdo_domain::AtomUnit`]s, keeping multi-line action blocks intact so the
//! chunker never splits a block across P3 packets and breaks the receiver's
//! state machine. Also exposes [`validate_syntax`], a separate bracket- and
//! stream-balance check used for diagnostics, not for parsing itself.

use once_cell::sync::Lazy;
use regex::Regex;

use fdo_domain::{AtomKind, AtomUnit};

const ACTION_ATOMS: [&str; 8] = [
    "act_replace_select_action",
    "act_replace_action",
    "act_set_criterion",
    "act_do_action",
    "act_append_select_action",
    "act_append_action",
    "act_prepend_select_action",
    "act_insert_select_action",
];

static NESTED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\s*\w+_\w+\s*<").unwrap(),
        Regex::new(r"^\s*uni_start_stream").unwrap(),
        Regex::new(r"^\s*uni_end_stream").unwrap(),
        Regex::new(r"^\s*man_\w+").unwrap(),
        Regex::new(r"^\s*mat_\w+").unwrap(),
        Regex::new(r"^\s*sm_\w+").unwrap(),
        Regex::new(r"^\s*<$").unwrap(),
        Regex::new(r"^\s*>$").unwrap(),
    ]
});

fn is_action_atom(line: &str) -> bool {
    ACTION_ATOMS.iter().any(|atom| line.contains(atom))
}

fn looks_like_nested_atom(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && NESTED_PATTERNS.iter().any(|re| re.is_match(trimmed))
}

fn is_raw_data(line: &str) -> bool {
    line.trim().starts_with("raw_data")
}

/// Parses preprocessed FDO source (see [`super::preprocessor::preprocess_script`])
/// into atom units. Empty lines are skipped; every non-empty line ends up in
/// exactly one unit.
pub fn parse_atoms(preprocessed_source: &str) -> Vec<AtomUnit> {
    let lines: Vec<&str> = preprocessed_source.trim().split('\n').collect();
    let mut units = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        if is_action_atom(line) {
            let (unit, next_i) = parse_action_block(&lines, i);
            units.push(unit);
            i = next_i;
        } else if is_raw_data(line) {
            units.push(AtomUnit::new(line.to_string(), AtomKind::RawDataAtom, i, i));
            i += 1;
        } else {
            units.push(AtomUnit::single(line.to_string(), i));
            i += 1;
        }
    }

    units
}

/// Returns the parsed unit and the index of the next unconsumed line.
fn parse_action_block(lines: &[&str], start_idx: usize) -> (AtomUnit, usize) {
    let action_line = lines[start_idx].trim();
    let mut block_lines = vec![action_line.to_string()];
    let mut idx = start_idx + 1;

    if idx < lines.len() {
        let next_line = lines[idx].trim();

        if next_line == "<" {
            block_lines.push(next_line.to_string());
            idx += 1;

            let mut depth = 1i32;
            while idx < lines.len() && depth > 0 {
                let curr = lines[idx].trim();
                block_lines.push(curr.to_string());
                if curr == "<" {
                    depth += 1;
                } else if curr == ">" {
                    depth -= 1;
                }
                idx += 1;
            }
        } else if looks_like_nested_atom(next_line) {
            while idx < lines.len() && !lines[idx].trim().is_empty() && looks_like_nested_atom(lines[idx].trim()) {
                block_lines.push(lines[idx].trim().to_string());
                idx += 1;
            }
        }
    }

    if block_lines.len() > 1 {
        let unit = AtomUnit::new(block_lines.join("\n"), AtomKind::ActionBlock, start_idx, idx - 1);
        (unit, idx)
    } else {
        (AtomUnit::single(action_line.to_string(), start_idx), start_idx + 1)
    }
}

/// Bracket- and stream-balance diagnostic over raw (unpreprocessed) source.
#[derive(Debug, Clone, Default)]
pub struct SyntaxReport {
    pub total_lines: usize,
    pub atom_count: usize,
    pub action_blocks: usize,
    pub empty_lines: usize,
    pub errors: Vec<String>,
}

impl SyntaxReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_syntax(source: &str) -> SyntaxReport {
    let lines: Vec<&str> = source.trim().split('\n').collect();
    let mut report = SyntaxReport { total_lines: lines.len(), ..Default::default() };

    let mut bracket_depth: i32 = 0;
    let mut stream_depth: i32 = 0;

    for (i, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        let line_no = i + 1;

        if line.is_empty() {
            report.empty_lines += 1;
            continue;
        }
        report.atom_count += 1;

        if line == "<" {
            bracket_depth += 1;
        } else if line == ">" {
            bracket_depth -= 1;
            if bracket_depth < 0 {
                report.errors.push(format!("line {line_no}: unmatched closing bracket '>'"));
            }
        }

        if line.contains("uni_start_stream") {
            stream_depth += 1;
        } else if line.contains("uni_end_stream") {
            stream_depth -= 1;
            if stream_depth < 0 {
                report.errors.push(format!("line {line_no}: unmatched uni_end_stream"));
            }
        }

        if is_action_atom(line) {
            report.action_blocks += 1;
        }
    }

    if bracket_depth != 0 {
        report.errors.push(format!("unbalanced brackets: {bracket_depth} unclosed"));
    }
    if stream_depth != 0 {
        report.errors.push(format!("unbalanced streams: {stream_depth} unclosed"));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_atoms_parse_one_per_line() {
        let src = "uni_start_stream <1>\nidb_append_data <01x>\nuni_end_stream <1>";
        let units = parse_atoms(src);
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.kind == AtomKind::SingleAtom));
    }

    #[test]
    fn raw_data_gets_its_own_kind() {
        let units = parse_atoms(r#"raw_data <"AABB">"#);
        assert_eq!(units.len(), 1);
        assert!(units[0].is_raw_data());
    }

    #[test]
    fn bracketed_action_block_collects_until_rebalanced() {
        let src = "act_do_action <criteria>\n<\nsm_send_k1 <8-50934>\n<\nman_data <1>\n>\n>\nidb_append_data <02x>";
        let units = parse_atoms(src);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].kind, AtomKind::ActionBlock);
        assert_eq!(units[0].line_end, 6);
        assert_eq!(units[1].kind, AtomKind::SingleAtom);
    }

    #[test]
    fn implicit_nested_action_block_absorbs_following_atoms() {
        let src = "act_set_criterion <x>\nsm_send_k1 <8-50934>\nman_data <1>\nuni_start_stream <1>";
        let units = parse_atoms(src);
        assert_eq!(units[0].kind, AtomKind::ActionBlock);
        assert_eq!(units[0].line_end, 2);
        assert_eq!(units[1].kind, AtomKind::SingleAtom);
    }

    #[test]
    fn single_line_action_degrades_to_plain_atom() {
        let src = "act_do_action <self-contained>\nidb_append_data <01x>";
        let units = parse_atoms(src);
        assert_eq!(units[0].kind, AtomKind::SingleAtom);
    }

    #[test]
    fn validate_syntax_flags_unmatched_bracket() {
        let report = validate_syntax("idb_append_data <01x>\n>");
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("unmatched closing bracket")));
    }

    #[test]
    fn validate_syntax_flags_unbalanced_stream() {
        let report = validate_syntax("uni_start_stream <1>\nidb_append_data <01x>");
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("unbalanced streams")));
    }
}
