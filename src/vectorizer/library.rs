//! Pattern library — compiles the three pattern documents into anchored
//! matchers shared read-only by every vectorization call.
//!
//! Raw fragments are wrapped with pre/post context guards so a match never
//! splits inside an alphanumeric token, and uppercase duplicates are
//! compiled for the collections that must survive the later upper-casing
//! of the text buffer.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use thiserror::Error;

/// Guard before test and keyword fragments: one non-word character, or the
/// text/line edge. The guard character is consumed by the match, which is
/// why the standardize sweeps run twice.
const WORD_GUARD_PRE: &str = r"(?:\W|^)";
/// Guard after test and keyword fragments.
const WORD_GUARD_POST: &str = r"(?:\W|$)";
/// Section headers anchor to whole lines instead of consuming a guard.
const LINE_GUARD_PRE: &str = "^";
const LINE_GUARD_POST: &str = "$";

/// Reserved token in a replacement label standing for a literal newline
/// (JSON labels cannot hold raw newlines).
pub(crate) const NEWLINE_TOKEN: &str = "<newline>";

const CONDENSED_PATTERNS: &str = include_str!("../../patterns/condensed_patterns.json");
const OTHER_KW_PATTERNS: &str = include_str!("../../patterns/other_kw_patterns.json");
const SECTION_PATTERNS: &str = include_str!("../../patterns/section_patterns.json");

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("cannot read pattern document {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed pattern document {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("fragment {fragment:?} under label {label:?} does not compile: {source}")]
    Pattern {
        label: String,
        fragment: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled test matcher. `positive` is the derived positive-assertion
/// variant: same fragment, post guard dropped, a `+` required after
/// optional whitespace.
#[derive(Debug)]
pub struct TestPattern {
    pub matcher: Regex,
    pub positive: Regex,
    pub test: String,
}

/// A compiled keyword or section matcher with its replacement label.
#[derive(Debug)]
pub struct LabeledPattern {
    pub matcher: Regex,
    pub label: String,
}

/// The three pattern collections, immutable once built. Shareable by
/// reference across concurrent vectorization calls.
#[derive(Debug)]
pub struct PatternLibrary {
    pub test_patterns: Vec<TestPattern>,
    pub other_patterns: Vec<LabeledPattern>,
    pub section_patterns: Vec<LabeledPattern>,
}

impl PatternLibrary {
    /// Build the library from the pattern documents bundled with the crate.
    pub fn bundled() -> Result<Self, LibraryError> {
        Self::from_documents(
            CONDENSED_PATTERNS,
            OTHER_KW_PATTERNS,
            SECTION_PATTERNS,
            "bundled",
        )
    }

    /// Build the library from a directory holding the three documents.
    pub fn from_dir(dir: &Path) -> Result<Self, LibraryError> {
        let read = |name: &str| -> Result<String, LibraryError> {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| LibraryError::Io {
                file: path.display().to_string(),
                source,
            })
        };
        let condensed = read("condensed_patterns.json")?;
        let other = read("other_kw_patterns.json")?;
        let sections = read("section_patterns.json")?;
        Self::from_documents(&condensed, &other, &sections, &dir.display().to_string())
    }

    fn from_documents(
        condensed: &str,
        other: &str,
        sections: &str,
        origin: &str,
    ) -> Result<Self, LibraryError> {
        Ok(Self {
            test_patterns: compile_tests(condensed, &format!("{origin}/condensed_patterns.json"))?,
            other_patterns: compile_labeled(
                other,
                &format!("{origin}/other_kw_patterns.json"),
                false,
                WORD_GUARD_PRE,
                WORD_GUARD_POST,
            )?,
            section_patterns: compile_labeled(
                sections,
                &format!("{origin}/section_patterns.json"),
                true,
                LINE_GUARD_PRE,
                LINE_GUARD_POST,
            )?,
        })
    }

    /// Test patterns belonging to the given marker, in document order.
    pub fn marker_patterns<'a>(
        &'a self,
        marker: &'a str,
    ) -> impl Iterator<Item = &'a TestPattern> {
        self.test_patterns.iter().filter(move |tp| tp.test == marker)
    }
}

/// Parse a pattern document into a label → fragments map. `BTreeMap` fixes
/// the sweep order (sorted by label) so vectorization is deterministic.
fn parse_document(doc: &str, file: &str) -> Result<BTreeMap<String, Vec<String>>, LibraryError> {
    serde_json::from_str(doc).map_err(|source| LibraryError::Json {
        file: file.to_string(),
        source,
    })
}

fn compile_fragment(
    pre: &str,
    fragment: &str,
    post: &str,
    label: &str,
) -> Result<Regex, LibraryError> {
    Regex::new(&format!("(?m){pre}({fragment}){post}")).map_err(|source| LibraryError::Pattern {
        label: label.to_string(),
        fragment: fragment.to_string(),
        source,
    })
}

/// Compile the test/marker document. Always uppercase-duplicated, and every
/// entry carries its derived positive-assertion matcher.
fn compile_tests(doc: &str, file: &str) -> Result<Vec<TestPattern>, LibraryError> {
    let mut compiled = Vec::new();
    for (test, fragments) in parse_document(doc, file)? {
        for fragment in &fragments {
            for variant in [fragment.clone(), fragment.to_uppercase()] {
                let matcher = compile_fragment(WORD_GUARD_PRE, &variant, WORD_GUARD_POST, &test)?;
                let positive =
                    compile_fragment(WORD_GUARD_PRE, &variant, r"[\s]*[\+]", &test)?;
                compiled.push(TestPattern {
                    matcher,
                    positive,
                    test: test.clone(),
                });
            }
        }
    }
    Ok(compiled)
}

/// Compile a labeled document. Uppercase duplication is only safe for
/// documents whose fragments carry no regex character classes with letter
/// escapes (`\w` must not become `\W`); the keyword document opts out and
/// spells its case variants explicitly.
fn compile_labeled(
    doc: &str,
    file: &str,
    uppercase: bool,
    pre: &str,
    post: &str,
) -> Result<Vec<LabeledPattern>, LibraryError> {
    let mut compiled = Vec::new();
    for (label, fragments) in parse_document(doc, file)? {
        let label = label.replace(NEWLINE_TOKEN, "\n");
        for fragment in &fragments {
            compiled.push(LabeledPattern {
                matcher: compile_fragment(pre, fragment, post, &label)?,
                label: label.clone(),
            });
            if uppercase {
                compiled.push(LabeledPattern {
                    matcher: compile_fragment(pre, &fragment.to_uppercase(), post, &label)?,
                    label: label.clone(),
                });
            }
        }
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_documents_compile() {
        let library = PatternLibrary::bundled().unwrap();
        assert!(!library.test_patterns.is_empty());
        assert!(!library.other_patterns.is_empty());
        assert!(!library.section_patterns.is_empty());
    }

    #[test]
    fn marker_patterns_filter_by_test_name() {
        let library = PatternLibrary::bundled().unwrap();
        assert!(library.marker_patterns("EGFR").count() > 0);
        assert!(library.marker_patterns("EGFR").all(|tp| tp.test == "EGFR"));
        assert_eq!(library.marker_patterns("NO_SUCH_TEST").count(), 0);
    }

    #[test]
    fn guard_isolates_fragment_from_alphanumerics() {
        let library = PatternLibrary::bundled().unwrap();
        let egfr = library
            .marker_patterns("EGFR")
            .find(|tp| tp.matcher.as_str().contains("(egfr)"))
            .unwrap();
        assert!(egfr.matcher.is_match(" egfr "));
        assert!(!egfr.matcher.is_match("megfrx"));
        assert!(!egfr.matcher.is_match(" egfrx "));
    }

    #[test]
    fn guard_matches_at_text_edges() {
        let library = PatternLibrary::bundled().unwrap();
        let egfr = library
            .marker_patterns("EGFR")
            .find(|tp| tp.matcher.as_str().contains("(egfr)"))
            .unwrap();
        assert!(egfr.matcher.is_match("egfr positive"));
        assert!(egfr.matcher.is_match("testing for egfr"));
        assert!(egfr.matcher.is_match("egfr"));
    }

    #[test]
    fn uppercase_variant_compiled_for_tests() {
        let library = PatternLibrary::bundled().unwrap();
        assert!(library
            .marker_patterns("EGFR")
            .any(|tp| tp.matcher.is_match(" EGFR ")));
    }

    #[test]
    fn positive_matcher_requires_trailing_plus() {
        let library = PatternLibrary::bundled().unwrap();
        let hit = |text: &str| library.marker_patterns("ALK").any(|tp| tp.positive.is_match(text));
        assert!(hit(" ALK + "));
        assert!(hit(" ALK+ "));
        assert!(!hit(" ALK "));
        assert!(!hit(" ALK - "));
    }

    #[test]
    fn newline_token_translated_in_section_labels() {
        let library = PatternLibrary::bundled().unwrap();
        assert!(library.section_patterns.iter().all(|sp| !sp.label.contains(NEWLINE_TOKEN)));
        assert!(library.section_patterns.iter().any(|sp| sp.label.starts_with('\n')));
    }

    #[test]
    fn section_guards_anchor_whole_lines() {
        let library = PatternLibrary::bundled().unwrap();
        let diagnosis = library
            .section_patterns
            .iter()
            .find(|sp| sp.matcher.as_str().contains("FINAL DIAGNOSIS"))
            .unwrap();
        assert!(diagnosis.matcher.is_match("report\nFINAL DIAGNOSIS:\nbody"));
        assert!(!diagnosis.matcher.is_match("the FINAL DIAGNOSIS: was"));
    }

    #[test]
    fn malformed_document_is_a_load_error() {
        let err = PatternLibrary::from_documents("{ not json", "{}", "{}", "test").unwrap_err();
        assert!(matches!(err, LibraryError::Json { .. }));
    }

    #[test]
    fn bad_fragment_is_a_load_error() {
        let doc = r#"{"EGFR": ["(unclosed"]}"#;
        let err = PatternLibrary::from_documents(doc, "{}", "{}", "test").unwrap_err();
        assert!(matches!(err, LibraryError::Pattern { .. }));
    }

    #[test]
    fn missing_directory_is_a_load_error() {
        let err = PatternLibrary::from_dir(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, LibraryError::Io { .. }));
    }
}
