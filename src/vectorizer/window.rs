//! Boundary-aware windowing and contextual feature emission.
//!
//! For every anchor token, a candidate window of surrounding tokens is
//! clipped at the nearest structural boundary on each side of the window
//! midpoint, then unigram, skip-gram, and section features are emitted
//! from the clipped span.

use super::{OTHER_TEST, PUNCTUATION, SECTION_BOUNDARY, SPECIMEN_LABEL, TEST_INSTANCE};

/// Candidate window half-width in tokens.
const WINDOW_RADIUS: usize = 10;

/// Skip-gram reach on either side of a window token.
const SKIP_OFFSETS: [usize; 3] = [1, 2, 3];

/// Tokens that clip a context window: a new section, sentence punctuation,
/// a specimen label, or a mention of some other test.
fn is_window_break(token: &str) -> bool {
    matches!(
        token,
        SECTION_BOUNDARY | PUNCTUATION | SPECIMEN_LABEL | OTHER_TEST
    )
}

/// Emit all anchor-context features for the tokenized buffer.
pub fn window_features(tokens: &[&str], marker: &str, features: &mut Vec<String>) {
    for (index, token) in tokens.iter().enumerate() {
        if *token != TEST_INSTANCE {
            continue;
        }
        features.push(marker.to_string());
        add_section(tokens, index, features);

        let (start, end) = window_bounds(tokens, index);
        if index > 0 && index > start {
            features.push(format!("immediately_pre_window={}", tokens[index - 1]));
        }
        for k in (start..index).rev() {
            features.push(format!("pre_window={}", tokens[k]));
            for offset in SKIP_OFFSETS {
                if k >= offset && k - offset >= start {
                    features.push(format!("pre_window={}_{}", tokens[k - offset], tokens[k]));
                }
            }
        }
        if index + 1 < tokens.len() && index + 1 < end {
            features.push(format!("immediately_post_window={}", tokens[index + 1]));
        }
        for k in index + 1..end {
            features.push(format!("post_window={}", tokens[k]));
            for offset in SKIP_OFFSETS {
                if k + offset < end {
                    features.push(format!("post_window={}_{}", tokens[k], tokens[k + offset]));
                }
            }
        }
    }
}

/// Clip the candidate window around `index` at structural boundaries.
/// The true start is one past the boundary closest to (and below) the
/// window midpoint; the true end is the boundary closest to (and above)
/// it. Midpoint comparisons are `2*rel <> wlen`, i.e. `rel <> wlen/2`
/// without the integer truncation.
fn window_bounds(tokens: &[&str], index: usize) -> (usize, usize) {
    let window_start = index.saturating_sub(WINDOW_RADIUS);
    let window_end = (index + WINDOW_RADIUS).min(tokens.len());
    let window_len = window_end - window_start;
    let mut start = window_start;
    let mut end = window_end;
    for (rel, token) in tokens[window_start..window_end].iter().enumerate() {
        if !is_window_break(token) {
            continue;
        }
        if 2 * rel < window_len {
            start = start.max(window_start + rel + 1);
        }
        if 2 * rel > window_len {
            end = end.min(window_start + rel);
        }
    }
    (start, end)
}

/// Scan backward from the anchor for the nearest section boundary and
/// emit the section name sitting immediately before it.
fn add_section(tokens: &[&str], index: usize, features: &mut Vec<String>) {
    for p in (0..index).rev() {
        if tokens[p] == SECTION_BOUNDARY {
            if p > 0 {
                features.push(format!("SECTION={}", tokens[p - 1]));
            }
            return;
        }
    }
}
