use crate::external_tools::Stage;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing value for argument: {flag}")]
    MissingValue { flag: String },
    #[error("invalid value for {flag}={value}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },
    #[error("unsupported argument: {arg}")]
    UnsupportedArgument { arg: String },
    #[error("parse error: {message}")]
    ParseError { message: String },
    #[error("{text}")]
    HelpRequested { text: String },
    #[error("no subcommand given\n\n{usage}")]
    MissingSubcommand { usage: String },
    #[error("required command not found: {command}")]
    CommandNotFound { command: String },
    #[error("tools still unavailable after install attempt: {}", tools.join(", "))]
    ToolsUnavailable { tools: Vec<String> },
    #[error("{stage} stage failed: {command} (exit: {code:?}) stderr: {stderr}")]
    StageFailed {
        stage: Stage,
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },
    #[error("input file not found: {}", path.display())]
    MissingInput { path: PathBuf },
    #[error("invalid region {chromosome}:{start}-{end}: {reason}")]
    InvalidRegion {
        chromosome: String,
        start: u64,
        end: u64,
        reason: String,
    },
    #[error("sequence {chromosome} (or chr{chromosome}) not present in {}", fasta.display())]
    SequenceNotFound { chromosome: String, fasta: PathBuf },
    #[error("unrecognized variant tool '{name}' (expected neat, varsim or bamsurgeon)")]
    UnknownVariantTool { name: String },
    #[error("invalid tool parameter file {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
