//! Error types for the pipeline.
//!
//! Per-item failures ([`ParseError`], [`RenderError`]) are collected into a
//! run's skipped list by the skills. [`StoreError`]s for a missing stage or
//! an unwritable path abort the run and surface to the invoker.

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::Stage;

/// Failure to turn raw text into a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// File has no content after trimming whitespace.
    #[error("{0}: file is empty")]
    Empty(String),

    /// Filename does not follow `YYYY-MM-DD-<label>.md`.
    #[error("{0}: filename must look like YYYY-MM-DD-<label>.md")]
    MalformedName(String),

    /// Filename carries a date-shaped prefix that is not a calendar date.
    #[error("{key}: invalid date '{date}'")]
    InvalidDate { key: String, date: String },

    /// A generated report is missing a section or field the reader needs.
    #[error("{key}: malformed report ({reason})")]
    MalformedReport { key: String, reason: String },
}

/// Failure to render a report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Template data is missing a field the template requires.
    #[error("{template}: missing required field '{field}'")]
    MissingField {
        template: &'static str,
        field: &'static str,
    },

    /// Period bounds are reversed.
    #[error("{template}: period start {start} is after end {end}")]
    InvertedPeriod {
        template: &'static str,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Failure inside a [`ContentStore`](crate::store::ContentStore).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The stage folder itself does not exist.
    #[error("stage folder '{0}' does not exist")]
    MissingStage(Stage),

    /// No entry under this key.
    #[error("{stage}/{key}: not found")]
    NotFound { stage: Stage, key: String },

    /// Key is empty, absolute, or escapes the stage folder.
    #[error("invalid key '{0}'")]
    InvalidKey(String),

    /// A workflow touched a stage outside its declared scope.
    #[error("{workflow} may not {access} stage '{stage}'")]
    StageViolation {
        workflow: &'static str,
        access: &'static str,
        stage: Stage,
    },

    /// Underlying I/O failure.
    #[error("{stage}/{key}: {message}")]
    Io {
        stage: Stage,
        key: String,
        message: String,
    },
}

/// Errors that abort a workflow run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Invocation arguments rejected before any stage was touched.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl StoreError {
    /// Whether the error just means "nothing stored under that key".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
