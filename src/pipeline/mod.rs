//! Batch classification of a tab-delimited pathology report export:
//! record-level labels per (report, marker), aggregated to patient/tumor
//! case level.

pub mod cases;
pub mod runner;

use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::vectorizer::LibraryError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error on {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("input has no {0:?} column")]
    MissingField(String),

    #[error("row {row} has {found} fields, header has {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}
