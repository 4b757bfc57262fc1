//! Linear-model classification of report feature bags.
//!
//! Three algorithms, keyed by model-directory name: `svm_reported` (were
//! test results reported at all), `positive` (what the result was), and
//! `method` (how the test was performed). Each is a plain linear model
//! over binary feature presence.

pub mod model;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::vectorizer::NO_KEYWORD_IN_TEXT;
use model::LinearModel;

/// Algorithm deciding whether results were reported.
pub const ALGO_REPORTED: &str = "svm_reported";
/// Algorithm deciding the reported result.
pub const ALGO_RESULT: &str = "positive";
/// Algorithm deciding the test method.
pub const ALGO_METHOD: &str = "method";

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("cannot read model file {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model file {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed feature mapping line {line:?} in {file}")]
    FeatureLine { file: String, line: String },

    #[error("inconsistent model file {file}: {detail}")]
    Shape { file: String, detail: String },

    #[error("no model loaded for algorithm {0:?}")]
    MissingAlgorithm(String),

    #[error("model for {algorithm:?} produced unknown output code {code}")]
    UnknownCode { algorithm: String, code: i64 },
}

/// Record-level labels for one (report, marker) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub reported: String,
    pub result: String,
    pub method: String,
}

impl Labels {
    fn not_reported() -> Self {
        Self {
            reported: "Not Reported".to_string(),
            result: "N/A".to_string(),
            method: "N/A".to_string(),
        }
    }
}

fn method_label(code: i64) -> Option<&'static str> {
    Some(match code {
        0 => "Mutational Analysis",
        1 => "IHC",
        2 => "FISH",
        3 => "OTHER",
        4 => "NONE",
        _ => return None,
    })
}

fn result_label(code: i64) -> Option<&'static str> {
    Some(match code {
        0 => "Unknown",
        1 => "Positive",
        2 => "Negative",
        3 => "Insufficient",
        4 => "Reported",
        5 => "Not Reported",
        _ => return None,
    })
}

/// All loaded algorithms. Immutable after load; shareable by reference
/// across concurrent classification calls.
pub struct GenTestClassifier {
    algorithms: HashMap<String, LinearModel>,
}

impl GenTestClassifier {
    /// Load every algorithm subdirectory under `model_dir`. A missing or
    /// malformed model is fatal — classification must never run against a
    /// partially loaded set.
    pub fn load(model_dir: &Path) -> Result<Self, ClassifierError> {
        let entries = fs::read_dir(model_dir).map_err(|source| ClassifierError::Io {
            file: model_dir.display().to_string(),
            source,
        })?;
        let mut algorithms = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| ClassifierError::Io {
                file: model_dir.display().to_string(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let model = LinearModel::load(&entry.path())?;
            debug!(algorithm = %name, "model loaded");
            algorithms.insert(name, model);
        }
        info!(algorithms = algorithms.len(), "classifier ready");
        Ok(Self { algorithms })
    }

    /// Label one feature bag. A report that never mentions the marker, or
    /// one the reported-model rejects, short-circuits to Not Reported
    /// without consulting the remaining models.
    pub fn classify(&self, features: &[String]) -> Result<Labels, ClassifierError> {
        if features.iter().any(|f| f == NO_KEYWORD_IN_TEXT) {
            return Ok(Labels::not_reported());
        }
        if self.predict_label(ALGO_REPORTED, features)? != "Reported" {
            return Ok(Labels::not_reported());
        }
        Ok(Labels {
            reported: "Results Reported".to_string(),
            result: self.predict_label(ALGO_RESULT, features)?,
            method: self.predict_label(ALGO_METHOD, features)?,
        })
    }

    fn predict_label(
        &self,
        algorithm: &str,
        features: &[String],
    ) -> Result<String, ClassifierError> {
        let model = self
            .algorithms
            .get(algorithm)
            .ok_or_else(|| ClassifierError::MissingAlgorithm(algorithm.to_string()))?;
        let code = model.predict(features);
        let label = if algorithm == ALGO_METHOD {
            method_label(code)
        } else {
            result_label(code)
        };
        label
            .map(str::to_string)
            .ok_or(ClassifierError::UnknownCode {
                algorithm: algorithm.to_string(),
                code,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Model set where `svm_reported` says Reported iff REPORT_HIT is
    /// present, `positive` answers Positive/Negative on POS_HIT, and
    /// `method` picks Mutational Analysis vs FISH on MUT_HIT.
    fn model_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let write = |algo: &str, features: &str, model: &str| {
            let path = dir.path().join(algo);
            fs::create_dir_all(&path).unwrap();
            let mut f = fs::File::create(path.join("features.txt")).unwrap();
            f.write_all(features.as_bytes()).unwrap();
            let mut m = fs::File::create(path.join("model.json")).unwrap();
            m.write_all(model.as_bytes()).unwrap();
        };
        write(
            ALGO_REPORTED,
            "REPORT_HIT 0\n",
            r#"{"classes": [5, 4], "weights": [[1.0]], "intercepts": [-0.5]}"#,
        );
        write(
            ALGO_RESULT,
            "POS_HIT 0\n",
            r#"{"classes": [2, 1], "weights": [[1.0]], "intercepts": [-0.5]}"#,
        );
        write(
            ALGO_METHOD,
            "MUT_HIT 0\n",
            r#"{"classes": [2, 0], "weights": [[1.0]], "intercepts": [-0.5]}"#,
        );
        dir
    }

    fn bag(features: &[&str]) -> Vec<String> {
        features.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn no_keyword_short_circuits_without_models() {
        // an empty directory has no models at all; the sentinel path must
        // not need them
        let dir = tempfile::tempdir().unwrap();
        let classifier = GenTestClassifier::load(dir.path()).unwrap();
        let labels = classifier.classify(&bag(&[NO_KEYWORD_IN_TEXT])).unwrap();
        assert_eq!(labels, Labels::not_reported());
    }

    #[test]
    fn unreported_stops_the_cascade() {
        let dir = model_dir();
        let classifier = GenTestClassifier::load(dir.path()).unwrap();
        let labels = classifier.classify(&bag(&["POS_HIT"])).unwrap();
        assert_eq!(labels.reported, "Not Reported");
        assert_eq!(labels.result, "N/A");
        assert_eq!(labels.method, "N/A");
    }

    #[test]
    fn full_cascade_labels_all_three() {
        let dir = model_dir();
        let classifier = GenTestClassifier::load(dir.path()).unwrap();
        let labels = classifier
            .classify(&bag(&["REPORT_HIT", "POS_HIT", "MUT_HIT"]))
            .unwrap();
        assert_eq!(labels.reported, "Results Reported");
        assert_eq!(labels.result, "Positive");
        assert_eq!(labels.method, "Mutational Analysis");
    }

    #[test]
    fn negative_fish_report() {
        let dir = model_dir();
        let classifier = GenTestClassifier::load(dir.path()).unwrap();
        let labels = classifier.classify(&bag(&["REPORT_HIT"])).unwrap();
        assert_eq!(labels.result, "Negative");
        assert_eq!(labels.method, "FISH");
    }

    #[test]
    fn out_of_vocabulary_features_change_nothing() {
        let dir = model_dir();
        let classifier = GenTestClassifier::load(dir.path()).unwrap();
        let plain = classifier.classify(&bag(&["REPORT_HIT"])).unwrap();
        let noisy = classifier
            .classify(&bag(&["REPORT_HIT", "pre_window=SOMETHING_NEW"]))
            .unwrap();
        assert_eq!(plain, noisy);
    }

    #[test]
    fn missing_algorithm_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = GenTestClassifier::load(dir.path()).unwrap();
        assert!(matches!(
            classifier.classify(&bag(&["anything"])),
            Err(ClassifierError::MissingAlgorithm(_))
        ));
    }

    #[test]
    fn missing_model_directory_is_fatal_at_load() {
        assert!(matches!(
            GenTestClassifier::load(Path::new("/no/such/models")),
            Err(ClassifierError::Io { .. })
        ));
    }

    #[test]
    fn label_tables_match_output_codes() {
        assert_eq!(method_label(0), Some("Mutational Analysis"));
        assert_eq!(method_label(4), Some("NONE"));
        assert_eq!(method_label(5), None);
        assert_eq!(result_label(1), Some("Positive"));
        assert_eq!(result_label(5), Some("Not Reported"));
        assert_eq!(result_label(6), None);
    }
}
