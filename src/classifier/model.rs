//! Plain value record for one trained linear model: compiled weights, the
//! feature-name → column mapping, and the class codes it predicts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::ClassifierError;

/// Serialized weight file. Binary models carry a single weight row and two
/// class codes; multi-class models carry one one-vs-rest row per class.
#[derive(Deserialize)]
struct ModelFile {
    classes: Vec<i64>,
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

pub struct LinearModel {
    classes: Vec<i64>,
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    mapping: HashMap<String, usize>,
}

impl LinearModel {
    /// Load `features.txt` (lines of `feature_name index`) and `model.json`
    /// from one algorithm directory. Any malformed content is fatal.
    pub fn load(dir: &Path) -> Result<Self, ClassifierError> {
        let features_path = dir.join("features.txt");
        let features_file = features_path.display().to_string();
        let raw = fs::read_to_string(&features_path).map_err(|source| ClassifierError::Io {
            file: features_file.clone(),
            source,
        })?;

        let mut mapping = HashMap::new();
        let mut num_features = 0;
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(feature), Some(index)) = (parts.next(), parts.next()) else {
                return Err(ClassifierError::FeatureLine {
                    file: features_file.clone(),
                    line: line.to_string(),
                });
            };
            let index: usize = index.parse().map_err(|_| ClassifierError::FeatureLine {
                file: features_file.clone(),
                line: line.to_string(),
            })?;
            num_features = num_features.max(index + 1);
            mapping.insert(feature.to_string(), index);
        }

        let model_path = dir.join("model.json");
        let model_file = model_path.display().to_string();
        let raw = fs::read_to_string(&model_path).map_err(|source| ClassifierError::Io {
            file: model_file.clone(),
            source,
        })?;
        let parsed: ModelFile =
            serde_json::from_str(&raw).map_err(|source| ClassifierError::Json {
                file: model_file.clone(),
                source,
            })?;

        if parsed.weights.len() != parsed.intercepts.len() {
            return Err(ClassifierError::Shape {
                file: model_file,
                detail: format!(
                    "{} weight rows but {} intercepts",
                    parsed.weights.len(),
                    parsed.intercepts.len()
                ),
            });
        }
        if parsed.weights.len() == 1 && parsed.classes.len() != 2 {
            return Err(ClassifierError::Shape {
                file: model_file,
                detail: "a single weight row needs exactly two class codes".to_string(),
            });
        }
        if parsed.weights.len() > 1 && parsed.weights.len() != parsed.classes.len() {
            return Err(ClassifierError::Shape {
                file: model_file,
                detail: format!(
                    "{} weight rows but {} class codes",
                    parsed.weights.len(),
                    parsed.classes.len()
                ),
            });
        }
        if let Some(row) = parsed.weights.iter().find(|row| row.len() < num_features) {
            return Err(ClassifierError::Shape {
                file: model_file,
                detail: format!(
                    "weight row has {} columns but the mapping needs {}",
                    row.len(),
                    num_features
                ),
            });
        }

        Ok(Self {
            classes: parsed.classes,
            weights: parsed.weights,
            intercepts: parsed.intercepts,
            mapping,
        })
    }

    /// Predict the class code for a feature bag. Presence is binary —
    /// multiplicities do not stack — and features outside the model's
    /// vocabulary are dropped silently.
    pub fn predict(&self, features: &[String]) -> i64 {
        let mut active: Vec<usize> = features
            .iter()
            .filter_map(|f| self.mapping.get(f).copied())
            .collect();
        active.sort_unstable();
        active.dedup();

        if self.weights.len() == 1 {
            let score = self.decision(0, &active);
            return if score > 0.0 {
                self.classes[1]
            } else {
                self.classes[0]
            };
        }

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for row in 0..self.weights.len() {
            let score = self.decision(row, &active);
            if score > best_score {
                best_score = score;
                best = row;
            }
        }
        self.classes[best]
    }

    fn decision(&self, row: usize, active: &[usize]) -> f64 {
        active
            .iter()
            .map(|&col| self.weights[row][col])
            .sum::<f64>()
            + self.intercepts[row]
    }
}
