//! Ordered rewrite rules applied after tagging, plus the stop-word
//! stripper. Rule order is a contract: later rules assume earlier ones
//! have already collapsed duplicated placeholders and punctuation.

use regex::Regex;

use super::normalize::replace_all;
use super::{DATE, PUNCTUATION, SPECIMEN_LABEL, TEST_INSTANCE};

/// Labels whose duplicated adjacent mentions collapse to one, in rule
/// order. Coordinated phrasings ("EGFR and KRAS are pending") produce
/// back-to-back placeholders joined by connector words and punctuation.
const COLLAPSED_LABELS: &[&str] = &[
    "OTHER_TEST",
    "PUBLICATION",
    "TEST_INSTANCE",
    "IHC",
    "PATHOLOGIST",
    "BLOCK_ACC",
    "SPECIFIC_MUT",
    "MUT_ANALYSIS",
    "FISH",
    "AUTHOR",
];

/// Stop words stripped from the upper-cased buffer, optionally followed by
/// a second article.
pub(crate) const STOP_WORDS: &str =
    r"(?:\s|^)(TO|THE|FOR|A|AN|AS|THIS|THAT|THESE|THEY|IN|OF|ON|OR|BY)( THE|A|AN)?(?:\s|$)";

/// One ordered rewrite rule.
pub struct Substitution {
    matcher: Regex,
    replacement: String,
}

/// Build the fixed rule table. Index order is the application order.
pub fn build_substitutions() -> Vec<Substitution> {
    let mut rules = Vec::new();
    for label in COLLAPSED_LABELS {
        // the connector class deliberately includes the label's own
        // characters, so a mangled partial neighbor folds into the collapse
        let matcher = Regex::new(&format!(r"{0}[,.\(\):\-;andor{0} ]{{1,}}{0}", label))
            .expect("valid regex");
        rules.push(Substitution {
            matcher,
            replacement: format!(" {label} "),
        });
    }
    rules.push(Substitution {
        // a marker mention coordinated with some other test reads as a
        // single mention of the marker's test
        matcher: Regex::new(r"TEST_INSTANCE[,.\(\):\-;andor ]{1,}OTHER_TEST").expect("valid regex"),
        replacement: TEST_INSTANCE.to_string(),
    });
    rules.push(Substitution {
        matcher: Regex::new(r"[0-9]{2}[\-\\/][0-9]{2}[\-\\/][0-9]{2,5}").expect("valid regex"),
        replacement: super::padded_token(DATE),
    });
    rules.push(Substitution {
        matcher: Regex::new(r"(^|\s)[A-H][\)]?[.]").expect("valid regex"),
        replacement: super::padded_token(SPECIMEN_LABEL),
    });
    rules.push(Substitution {
        matcher: Regex::new(r#"["\(\\\)\-/']"#).expect("valid regex"),
        replacement: " ".to_string(),
    });
    rules.push(Substitution {
        matcher: Regex::new(r"[.,;:\?]").expect("valid regex"),
        replacement: super::padded_token(PUNCTUATION),
    });
    rules.push(Substitution {
        matcher: Regex::new(r"[\[\]]").expect("valid regex"),
        replacement: " ".to_string(),
    });
    rules
}

/// Apply every rule strictly in index order.
pub fn apply(rules: &[Substitution], text: &mut String) {
    for rule in rules {
        replace_all(text, &rule.matcher, &rule.replacement);
    }
}

/// Upper-case the buffer and strip stop words. Two passes: a stripped match
/// consumes its trailing separator, hiding an immediately following stop
/// word until the next pass.
pub fn strip_stop_words(stop_words: &Regex, text: &mut String) {
    *text = text.to_uppercase();
    for _ in 0..2 {
        replace_all(text, stop_words, " ");
    }
}
