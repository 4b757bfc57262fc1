//! BatchRunner — drives the full pipeline over one input file.
//!
//! One report per input row; the text field encodes true newlines as
//! `<newline>` markers, so a plain tab split is exact. Row-shape problems
//! abort the run — silently misaligned columns would corrupt every
//! downstream label.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::cases::CaseTable;
use super::PipelineError;
use crate::classifier::GenTestClassifier;
use crate::config;
use crate::vectorizer::Vectorizer;

/// Log a progress line every this many records.
const PROGRESS_EVERY: usize = 1000;

const RECORD_OUTPUT: &str = "record_level_output.txt";
const CASE_OUTPUT: &str = "case_level_output.txt";

#[derive(Debug)]
pub struct RunSummary {
    pub records: usize,
    pub cases: usize,
    pub record_output: PathBuf,
    pub case_output: PathBuf,
}

pub struct BatchRunner {
    vectorizer: Vectorizer,
    classifier: GenTestClassifier,
}

impl BatchRunner {
    pub fn new(vectorizer: Vectorizer, classifier: GenTestClassifier) -> Self {
        Self {
            vectorizer,
            classifier,
        }
    }

    /// Classify every record in `input`, writing record-level and
    /// case-level files under `output_dir`.
    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<RunSummary, PipelineError> {
        let io_err = |file: &Path| {
            let file = file.display().to_string();
            move |source| PipelineError::Io { file, source }
        };

        fs::create_dir_all(output_dir).map_err(io_err(output_dir))?;
        let record_path = output_dir.join(RECORD_OUTPUT);
        let case_path = output_dir.join(CASE_OUTPUT);

        let reader = BufReader::new(File::open(input).map_err(io_err(input))?);
        let mut lines = reader.lines();
        let header_line = match lines.next() {
            Some(line) => line.map_err(io_err(input))?,
            None => String::new(),
        };
        let headers: Vec<&str> = header_line.split('\t').collect();
        let columns = InputColumns::locate(&headers)?;

        let mut out = BufWriter::new(File::create(&record_path).map_err(io_err(&record_path))?);
        write_record_header(&mut out, &headers, columns.text).map_err(io_err(&record_path))?;

        let mut cases = CaseTable::new();
        let mut records = 0usize;
        for (row_index, line) in lines.enumerate() {
            let line = line.map_err(io_err(input))?;
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != headers.len() {
                return Err(PipelineError::RowLength {
                    // header is row 1
                    row: row_index + 2,
                    expected: headers.len(),
                    found: fields.len(),
                });
            }
            self.process_row(&mut out, &columns, &fields, &mut cases)
                .map_err(|e| match e {
                    RowError::Io(source) => PipelineError::Io {
                        file: record_path.display().to_string(),
                        source,
                    },
                    RowError::Pipeline(e) => e,
                })?;
            records += 1;
            if records % PROGRESS_EVERY == 0 {
                info!(records, "records processed");
            }
        }

        write_case_file(&case_path, &cases).map_err(io_err(&case_path))?;
        info!(
            records,
            cases = cases.len(),
            record_output = %record_path.display(),
            case_output = %case_path.display(),
            "run complete"
        );
        Ok(RunSummary {
            records,
            cases: cases.len(),
            record_output: record_path,
            case_output: case_path,
        })
    }

    fn process_row(
        &self,
        out: &mut impl Write,
        columns: &InputColumns,
        fields: &[&str],
        cases: &mut CaseTable,
    ) -> Result<(), RowError> {
        let text = fields[columns.text];
        let accession = fields[columns.accession];
        let patient = fields[columns.patient];
        let tumor = fields[columns.tumor];
        let record = fields[columns.record];
        let case_key = format!("{patient}_{tumor}");

        let mut first = true;
        for (i, field) in fields.iter().enumerate() {
            if i == columns.text {
                continue;
            }
            if !first {
                out.write_all(b"\t")?;
            }
            out.write_all(field.as_bytes())?;
            first = false;
        }
        for marker in config::MARKERS {
            let vector = self.vectorizer.make_vector(text, accession, marker);
            let labels = self
                .classifier
                .classify(&vector)
                .map_err(|e| RowError::Pipeline(e.into()))?;
            write!(out, "\t{}\t{}\t{}", labels.reported, labels.result, labels.method)?;
            cases.update(&case_key, marker, record, &labels);
        }
        out.write_all(b"\n")?;
        Ok(())
    }
}

enum RowError {
    Io(std::io::Error),
    Pipeline(PipelineError),
}

impl From<std::io::Error> for RowError {
    fn from(source: std::io::Error) -> Self {
        Self::Io(source)
    }
}

/// Column indices of the required input fields.
struct InputColumns {
    text: usize,
    accession: usize,
    patient: usize,
    tumor: usize,
    record: usize,
}

impl InputColumns {
    fn locate(headers: &[&str]) -> Result<Self, PipelineError> {
        let find = |field: &str| {
            headers
                .iter()
                .position(|h| *h == field)
                .ok_or_else(|| PipelineError::MissingField(field.to_string()))
        };
        Ok(Self {
            text: find(config::FIELD_TEXT)?,
            accession: find(config::FIELD_ACCESSION)?,
            patient: find(config::FIELD_PATIENT)?,
            tumor: find(config::FIELD_TUMOR)?,
            record: find(config::FIELD_RECORD)?,
        })
    }
}

/// Original columns minus the text field, then per-marker label columns.
fn write_record_header(
    out: &mut impl Write,
    headers: &[&str],
    text_column: usize,
) -> std::io::Result<()> {
    let mut first = true;
    for (i, header) in headers.iter().enumerate() {
        if i == text_column {
            continue;
        }
        if !first {
            out.write_all(b"\t")?;
        }
        out.write_all(header.as_bytes())?;
        first = false;
    }
    for marker in config::MARKERS {
        for category in ["Reported", "Result", "Method"] {
            write!(out, "\t{marker} {category}")?;
        }
    }
    out.write_all(b"\n")
}

fn write_case_file(path: &Path, cases: &CaseTable) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(b"patient_id")?;
    for marker in config::MARKERS {
        write!(out, "\t{marker} Result\t{marker} Record ID")?;
    }
    out.write_all(b"\n")?;
    for case in cases.iter() {
        out.write_all(case.as_bytes())?;
        for marker in config::MARKERS {
            let result = cases.result_for(case, marker);
            write!(out, "\t{}\t{}", result.status, result.record)?;
        }
        out.write_all(b"\n")?;
    }
    out.flush()
}
