use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Pathmark";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Markers classified on every report, in output-column order.
pub const MARKERS: &[&str] = &["EGFR", "ALK"];

/// Input column holding the raw report text.
pub const FIELD_TEXT: &str = "full_path_text";
/// Input column holding the hospital accession number.
pub const FIELD_ACCESSION: &str = "accession_number_hosp";
/// Input column holding the patient ID.
pub const FIELD_PATIENT: &str = "patient_id";
/// Input column holding the tumor record ID.
pub const FIELD_TUMOR: &str = "tumor_record";
/// Input column holding the source record ID.
pub const FIELD_RECORD: &str = "source_id";

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Default directory for trained model files.
pub fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

/// Default directory for record- and case-level output files.
pub fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
