//! The vectorizer — deterministic normalization and feature extraction
//! for one (report, marker) pair.
//!
//! `make_vector` is a strict linear sequence of total-text rewrites
//! followed by a single windowed feature-emission pass. The order is a
//! contract: every later stage depends on placeholders introduced by an
//! earlier one.

pub mod accession;
pub mod library;
pub mod normalize;
pub mod substitute;
pub mod window;

pub use library::{LibraryError, PatternLibrary};

use regex::Regex;
use tracing::debug;

/// Placeholder substituted for every mention of the requested marker's
/// test — the anchor every context window forms around.
pub const TEST_INSTANCE: &str = "TEST_INSTANCE";
/// Placeholder for mentions of any test other than the requested marker.
pub const OTHER_TEST: &str = "OTHER_TEST";
/// Token marking a section break inside section labels.
pub const SECTION_BOUNDARY: &str = "_SECTION_";
/// Placeholder for sentence punctuation.
pub const PUNCTUATION: &str = "PUNCTUATION";
/// Placeholder for single-letter specimen labels ("A.", "B.").
pub const SPECIMEN_LABEL: &str = "SPECIMEN_LABEL";
/// Placeholder for date-shaped substrings.
pub const DATE: &str = "DATE";
/// Replacement for an accession number naming this report.
pub const THIS_ACC_NUM: &str = "THIS_ACC_NUM";
/// Replacement for an accession number naming some other report.
pub const OTHER_ACC_NUM: &str = "OTHER_ACC_NUM";

/// Sentinel: the accession scan ran over this report.
pub const OTHER_ACC_NUM_IN_TEXT: &str = "OTHER_ACC_NUM_IN_TEXT";
/// Sentinel: insufficient-sample language present.
pub const INSUFFICIENT: &str = "INSUFFICIENT";
/// Sentinel: cytology-related report.
pub const CYTO_RELATED_REPORT: &str = "CYTO_RELATED_REPORT";
/// Sentinel: emitted once after all anchor occurrences are windowed.
pub const COUNT_TEST_INSTANCE: &str = "COUNT_TEST_INSTANCE";
/// Sentinel: the marker's test is never mentioned in this report.
pub const NO_KEYWORD_IN_TEXT: &str = "NO_KEYWORD_IN_TEXT";

pub(crate) fn padded_token(token: &str) -> String {
    format!(" {token} ")
}

/// Per-call mutable state: the working text buffer, destructively
/// rewritten by every stage, and the normalized accession of this report.
/// Created fresh per call and owned by it — never shared.
pub struct ReportState {
    pub text: String,
    pub accession: String,
}

/// The feature-extraction engine. Owns the compiled pattern library and
/// every fixed matcher; immutable after construction, so one instance can
/// serve concurrent callers by reference.
pub struct Vectorizer {
    library: PatternLibrary,
    substitutions: Vec<substitute::Substitution>,
    stop_words: Regex,
    cytology: Regex,
    insufficient: Regex,
    accession_shape: Regex,
}

impl Vectorizer {
    pub fn new(library: PatternLibrary) -> Self {
        Self {
            library,
            substitutions: substitute::build_substitutions(),
            stop_words: Regex::new(substitute::STOP_WORDS).expect("valid regex"),
            cytology: Regex::new(r"(?i)(cytoprep)|(cytolog)").expect("valid regex"),
            insufficient: Regex::new(
                r"(?i)insufficient (tumor|sample|tissue|material)?|(tumor|sample) insufficient|technical difficult",
            )
            .expect("valid regex"),
            accession_shape: Regex::new(accession::ACCESSION_SHAPE).expect("valid regex"),
        }
    }

    /// Turn one report into an ordered feature bag for the given marker.
    /// Always terminates with a feature sequence; a report that never
    /// mentions the marker yields the `NO_KEYWORD_IN_TEXT` sentinel.
    pub fn make_vector(&self, raw_text: &str, accession: &str, marker: &str) -> Vec<String> {
        let mut state = ReportState {
            text: normalize::clean_input(raw_text),
            accession: accession::normalize_accession(accession),
        };
        let mut features = Vec::new();

        self.cytology_report(&state, &mut features);
        self.positive_test(&state, marker, &mut features);
        self.tag_mentions(&mut state, marker);
        normalize::standardize(&self.library, marker, &mut state.text);
        self.resolve_accessions(&mut state, &mut features);
        self.insufficient_sample(&state, &mut features);
        substitute::apply(&self.substitutions, &mut state.text);
        substitute::strip_stop_words(&self.stop_words, &mut state.text);
        self.emit_window_features(&state, marker, &mut features);

        debug!(marker, features = features.len(), "report vectorized");
        features
    }

    /// Cytology reports rarely carry reliable genetic tests; flag them.
    fn cytology_report(&self, state: &ReportState, features: &mut Vec<String>) {
        if self.cytology.is_match(&state.text) {
            features.push(CYTO_RELATED_REPORT.to_string());
        }
    }

    /// An explicit "<test> +" assertion for the requested marker. A
    /// trailing "-" is deliberately not a negation signal: it is ambiguous
    /// with a formatting hyphen.
    fn positive_test(&self, state: &ReportState, marker: &str, features: &mut Vec<String>) {
        for tp in self.library.marker_patterns(marker) {
            if tp.positive.is_match(&state.text) {
                features.push("post_window=POSITIVE".to_string());
                features.push("post_window=TEST_INSTANCE_POSITIVE".to_string());
                break;
            }
        }
    }

    /// Consume every raw mention of the requested marker before any other
    /// normalization touches the text.
    fn tag_mentions(&self, state: &mut ReportState, marker: &str) {
        for tp in self.library.marker_patterns(marker) {
            normalize::replace_all(&mut state.text, &tp.matcher, &padded_token(TEST_INSTANCE));
        }
    }

    fn resolve_accessions(&self, state: &mut ReportState, features: &mut Vec<String>) {
        accession::resolve_accessions(&self.accession_shape, &mut state.text, &state.accession);
        features.push(OTHER_ACC_NUM_IN_TEXT.to_string());
    }

    /// Insufficient-sample language counts even when the test itself is
    /// never mentioned; checked over the pre-uppercase text.
    fn insufficient_sample(&self, state: &ReportState, features: &mut Vec<String>) {
        if self.insufficient.is_match(&state.text) {
            features.push(INSUFFICIENT.to_string());
        }
    }

    fn emit_window_features(&self, state: &ReportState, marker: &str, features: &mut Vec<String>) {
        let tokens: Vec<&str> = state.text.split_whitespace().collect();
        window::window_features(&tokens, marker, features);
        features.push(COUNT_TEST_INSTANCE.to_string());
        if state.text.matches(TEST_INSTANCE).count() == 0 {
            features.push(NO_KEYWORD_IN_TEXT.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer() -> Vectorizer {
        Vectorizer::new(PatternLibrary::bundled().unwrap())
    }

    #[test]
    fn end_to_end_negative_egfr_report() {
        let v = vectorizer();
        let features = v.make_vector(
            "EGFR mutation testing: negative. (S17-1111)",
            "S17-1111",
            "EGFR",
        );
        assert!(features.contains(&"EGFR".to_string()));
        assert!(features.contains(&OTHER_ACC_NUM_IN_TEXT.to_string()));
        assert!(features.contains(&COUNT_TEST_INSTANCE.to_string()));
        assert!(features.contains(&"post_window=NEGATIVE".to_string()), "got {features:?}");
        assert!(features.contains(&"post_window=THIS_ACC_NUM".to_string()));
        assert!(!features.contains(&INSUFFICIENT.to_string()));
        assert!(!features.contains(&NO_KEYWORD_IN_TEXT.to_string()));
    }

    #[test]
    fn vectorization_is_deterministic() {
        let v = vectorizer();
        let text = "FINAL DIAGNOSIS:\nEGFR and KRAS mutation analysis negative. (S17-1234)";
        let first = v.make_vector(text, "S17-1234", "EGFR");
        let second = v.make_vector(text, "S17-1234", "EGFR");
        assert_eq!(first, second);
    }

    #[test]
    fn no_mention_yields_only_sentinels() {
        let v = vectorizer();
        let features = v.make_vector("no genetic testing performed.", "S17-1", "EGFR");
        assert!(features.contains(&NO_KEYWORD_IN_TEXT.to_string()));
        assert!(features.contains(&COUNT_TEST_INSTANCE.to_string()));
        assert!(!features.iter().any(|f| f.starts_with("pre_window=")));
        assert!(!features.iter().any(|f| f.starts_with("post_window=")));
    }

    #[test]
    fn no_keyword_sentinel_is_exclusive_with_anchor() {
        let v = vectorizer();
        let with_mention = v.make_vector("EGFR was tested.", "S17-1", "EGFR");
        assert!(!with_mention.contains(&NO_KEYWORD_IN_TEXT.to_string()));
        let other_marker = v.make_vector("EGFR was tested.", "S17-1", "ALK");
        assert!(other_marker.contains(&NO_KEYWORD_IN_TEXT.to_string()));
    }

    #[test]
    fn lowercased_input_vectorizes_identically() {
        let v = vectorizer();
        let text = "EGFR TESTING WAS NEGATIVE.";
        let upper = v.make_vector(text, "S17-1", "EGFR");
        let lower = v.make_vector(&text.to_lowercase(), "S17-1", "EGFR");
        assert_eq!(upper, lower);
    }

    #[test]
    fn explicit_plus_emits_positive_assertions_once() {
        let v = vectorizer();
        let features = v.make_vector("IHC result: ALK + (confirmed)", "S17-1", "ALK");
        let positives = features.iter().filter(|f| *f == "post_window=POSITIVE").count();
        assert_eq!(positives, 1);
        assert!(features.contains(&"post_window=TEST_INSTANCE_POSITIVE".to_string()));
    }

    #[test]
    fn trailing_minus_is_not_a_negation_signal() {
        let v = vectorizer();
        let features = v.make_vector("result: ALK - see comment", "S17-1", "ALK");
        assert!(!features.contains(&"post_window=POSITIVE".to_string()));
    }

    #[test]
    fn insufficient_language_is_flagged() {
        let v = vectorizer();
        let features = v.make_vector(
            "EGFR not assessed, insufficient tumor for analysis.",
            "S17-1",
            "EGFR",
        );
        assert!(features.contains(&INSUFFICIENT.to_string()));
    }

    #[test]
    fn cytology_language_is_flagged() {
        let v = vectorizer();
        let features = v.make_vector("Cytology specimen reviewed.", "S17-1", "EGFR");
        assert!(features.contains(&CYTO_RELATED_REPORT.to_string()));
    }

    #[test]
    fn accession_sentinel_is_always_present() {
        let v = vectorizer();
        let features = v.make_vector("nothing here.", "S17-1", "EGFR");
        assert!(features.contains(&OTHER_ACC_NUM_IN_TEXT.to_string()));
    }

    #[test]
    fn section_context_reaches_the_anchor() {
        let v = vectorizer();
        let features = v.make_vector(
            "CLINICAL HISTORY:<newline>lung mass\nFINAL DIAGNOSIS:\nadenocarcinoma of lung\nEGFR testing negative",
            "S17-1",
            "EGFR",
        );
        assert!(features.contains(&"SECTION=DIAGNOSIS".to_string()), "got {features:?}");
    }

    #[test]
    fn other_marker_mentions_become_other_test() {
        let v = vectorizer();
        let features = v.make_vector("EGFR was tested. KRAS was also tested.", "S17-1", "EGFR");
        assert!(
            features.iter().any(|f| f.contains("OTHER_TEST")),
            "got {features:?}"
        );
        assert!(!features.iter().any(|f| f.contains("KRAS")));
    }

    #[test]
    fn coordinated_other_test_folds_into_the_anchor() {
        // "EGFR and KRAS were tested" reads as one mention of the marker's
        // test, not a separate other-test mention
        let v = vectorizer();
        let features = v.make_vector("EGFR and KRAS were tested.", "S17-1", "EGFR");
        assert!(!features.iter().any(|f| f.contains("OTHER_TEST")), "got {features:?}");
    }
}
