//! Pathmark CLI — classify a tab-delimited pathology report export.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use pathmark::classifier::GenTestClassifier;
use pathmark::config;
use pathmark::pipeline::runner::BatchRunner;
use pathmark::pipeline::PipelineError;
use pathmark::vectorizer::{PatternLibrary, Vectorizer};

const USAGE: &str = "usage: pathmark <input.tsv> [--models DIR] [--patterns DIR] [--output DIR]";

struct CliArgs {
    input: PathBuf,
    models: PathBuf,
    patterns: Option<PathBuf>,
    output: PathBuf,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut input = None;
        let mut models = config::default_models_dir();
        let mut patterns = None;
        let mut output = config::default_output_dir();
        while let Some(arg) = args.next() {
            let mut dir_value = |flag: &str| {
                args.next()
                    .map(PathBuf::from)
                    .ok_or_else(|| format!("{flag} needs a directory argument"))
            };
            match arg.as_str() {
                "--models" => models = dir_value("--models")?,
                "--patterns" => patterns = Some(dir_value("--patterns")?),
                "--output" => output = dir_value("--output")?,
                flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
                path if input.is_none() => input = Some(PathBuf::from(path)),
                extra => return Err(format!("unexpected argument {extra}")),
            }
        }
        let input = input.ok_or("provide the path to the input file")?;
        Ok(Self {
            input,
            models,
            patterns,
            output,
        })
    }
}

fn run(args: CliArgs) -> Result<(), PipelineError> {
    let library = match &args.patterns {
        Some(dir) => PatternLibrary::from_dir(dir)?,
        None => PatternLibrary::bundled()?,
    };
    let classifier = GenTestClassifier::load(&args.models)?;
    let runner = BatchRunner::new(Vectorizer::new(library), classifier);
    let summary = runner.run(&args.input, &args.output)?;
    tracing::info!(
        records = summary.records,
        cases = summary.cases,
        "classification finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "pipeline failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        CliArgs::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn input_path_is_required() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn defaults_apply_without_flags() {
        let args = parse(&["reports.tsv"]).unwrap();
        assert_eq!(args.input, PathBuf::from("reports.tsv"));
        assert_eq!(args.models, config::default_models_dir());
        assert_eq!(args.output, config::default_output_dir());
        assert!(args.patterns.is_none());
    }

    #[test]
    fn directory_flags_override_defaults() {
        let args = parse(&[
            "reports.tsv",
            "--models",
            "/opt/models",
            "--patterns",
            "/opt/patterns",
            "--output",
            "/tmp/out",
        ])
        .unwrap();
        assert_eq!(args.models, PathBuf::from("/opt/models"));
        assert_eq!(args.patterns, Some(PathBuf::from("/opt/patterns")));
        assert_eq!(args.output, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(parse(&["reports.tsv", "--frobnicate"]).is_err());
        assert!(parse(&["reports.tsv", "extra.tsv"]).is_err());
    }

    #[test]
    fn flag_without_value_is_rejected() {
        assert!(parse(&["reports.tsv", "--models"]).is_err());
    }
}
