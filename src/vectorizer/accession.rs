//! Accession-number cross-referencing.
//!
//! Reports routinely cite other reports by accession number. Each
//! accession-shaped substring is resolved against the current report's
//! accession and rewritten to `THIS_ACC_NUM` or `OTHER_ACC_NUM` so the
//! window features distinguish "our result" from "their result".

use regex::Regex;

use super::normalize::replace_all;
use super::{OTHER_ACC_NUM, THIS_ACC_NUM};

/// Accession shape: 1-2 letter block, 2-4 digit block, separator, 2-8 digit
/// block, tolerant of embedded parentheses and spaced separators.
pub(crate) const ACCESSION_SHAPE: &str =
    r"[\W]([\(]?[A-Z]{1,2}[\- ]?[\d]{2,4}[\- ]{1,3}[\d]{2,8}[\)]?)[\W]";

/// Strip separators and parentheses so differently formatted mentions of
/// the same accession compare equal.
pub fn normalize_accession(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '(' | ')' | '-' | ' '))
        .collect()
}

/// Rewrite every accession-shaped substring. Candidates are collected from
/// a snapshot first; each one is then replaced wherever its literal text
/// occurs, with regex metacharacters in the literal escaped.
pub fn resolve_accessions(shape: &Regex, text: &mut String, this_accession: &str) {
    let snapshot = text.clone();
    for caps in shape.captures_iter(&snapshot) {
        let literal = &caps[1];
        let replacement = if normalize_accession(literal) == this_accession {
            super::padded_token(THIS_ACC_NUM)
        } else {
            super::padded_token(OTHER_ACC_NUM)
        };
        let literal_matcher =
            Regex::new(&regex::escape(literal)).expect("escaped literal is a valid pattern");
        replace_all(text, &literal_matcher, &replacement);
    }
}
