//! Patient/tumor case-level aggregation of record-level results.

use std::collections::BTreeMap;

use crate::classifier::Labels;

/// Per-marker case status with the record that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub status: String,
    pub record: String,
}

impl Default for CaseResult {
    fn default() -> Self {
        Self {
            status: "Unknown".to_string(),
            record: "N/A".to_string(),
        }
    }
}

/// Case key (`patient_tumor`) → marker → result. BTreeMap keeps the
/// case-level output sorted by key.
#[derive(Default)]
pub struct CaseTable {
    cases: BTreeMap<String, BTreeMap<String, CaseResult>>,
}

impl CaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record-level result into the case. The first qualifying
    /// Positive wins and is never downgraded; a qualifying Negative fills
    /// in while nothing better has been seen. EGFR results only qualify
    /// when obtained by mutational analysis; any ALK method qualifies.
    pub fn update(&mut self, case: &str, marker: &str, record: &str, labels: &Labels) {
        let entry = self
            .cases
            .entry(case.to_string())
            .or_default()
            .entry(marker.to_string())
            .or_default();
        if entry.status == "Positive" {
            return;
        }
        let qualifies = marker == "ALK" || labels.method == "Mutational Analysis";
        if !qualifies {
            return;
        }
        if labels.result == "Positive" {
            *entry = CaseResult {
                status: "Positive".to_string(),
                record: record.to_string(),
            };
            return;
        }
        if entry.status == "Negative" {
            return;
        }
        if labels.result == "Negative" {
            *entry = CaseResult {
                status: "Negative".to_string(),
                record: record.to_string(),
            };
        }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Cases in key order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.cases.keys()
    }

    /// Result for one (case, marker), defaulting to Unknown/N-A.
    pub fn result_for(&self, case: &str, marker: &str) -> CaseResult {
        self.cases
            .get(case)
            .and_then(|markers| markers.get(marker))
            .cloned()
            .unwrap_or_default()
    }
}
