//! Input cleanup and context normalization.
//!
//! `clean_input` makes the raw report text safe for pattern matching;
//! `standardize` rewrites everything that is not the requested marker into
//! generic placeholders.

use regex::{NoExpand, Regex};

use super::library::{PatternLibrary, NEWLINE_TOKEN};
use super::OTHER_TEST;

/// ASCII-only version of the raw text: code points ≥ 128 become a single
/// space, runs of space characters collapse to one, and embedded
/// `<newline>` markers (the tab-delimited-file encoding of true newlines)
/// become actual newlines. Newline characters themselves are preserved —
/// the section guards anchor on them.
pub fn clean_input(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_space = false;
    for ch in raw.chars() {
        let ch = if (ch as u32) >= 128 { ' ' } else { ch };
        if ch == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        out.push(ch);
    }
    out.replace(NEWLINE_TOKEN, "\n")
}

/// Replace every match of `matcher` with the literal `replacement`.
pub(crate) fn replace_all(text: &mut String, matcher: &Regex, replacement: &str) {
    if !matcher.is_match(text) {
        return;
    }
    *text = matcher.replace_all(text, NoExpand(replacement)).into_owned();
}

/// Rewrite other tests, section headers, and keyword categories into their
/// placeholders. Two passes: the consuming word guards leave adjacent
/// candidates unmatched until a neighboring match has been replaced, and
/// the trained models depend on exactly two passes, not a fixed point.
pub fn standardize(library: &PatternLibrary, marker: &str, text: &mut String) {
    for _ in 0..2 {
        for tp in &library.test_patterns {
            if tp.test == marker {
                continue;
            }
            replace_all(text, &tp.matcher, &super::padded_token(OTHER_TEST));
        }
        for sp in &library.section_patterns {
            replace_all(text, &sp.matcher, &super::padded_token(&sp.label));
        }
        for kp in &library.other_patterns {
            replace_all(text, &kp.matcher, &super::padded_token(&kp.label));
        }
    }
}
