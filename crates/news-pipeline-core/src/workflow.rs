//! Workflow definitions and slash triggers.
//!
//! Every workflow is a variant of the closed [`Workflow`] enum, dispatched
//! by [`Pipeline::run`](crate::pipeline::Pipeline::run) with a `match`.
//! Trigger lines such as `/screen-stocks 2026-01-05 半导体` parse into the
//! same enum, so there is no run-time lookup by name beyond that parse.
//!
//! | Trigger | Reads | Writes |
//! |---------|-------|--------|
//! | `/analyze-news [date]` | input | processing |
//! | `/screen-stocks [date] [sector]` | processing | processing |
//! | `/generate-weekly-report [start] [end]` | processing | processing |
//! | `/generate-monthly-report [year] [month]` | processing | processing |
//! | `/extract-insights [importance]` | processing | output |
//! | `/process-input [force]` | input, processing | processing |
//! | `/archive-processed [before]` | processing | processing |
//!
//! A date-shaped argument that does not parse is an error, never a sector.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::{Candidate, Importance};
use crate::naming::DATE_FORMAT;
use crate::store::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    AnalyzeNews,
    ScreenStocks,
    GenerateWeeklyReport,
    GenerateMonthlyReport,
    ExtractInsights,
    ProcessInput,
    ArchiveProcessed,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 7] = [
        WorkflowKind::AnalyzeNews,
        WorkflowKind::ScreenStocks,
        WorkflowKind::GenerateWeeklyReport,
        WorkflowKind::GenerateMonthlyReport,
        WorkflowKind::ExtractInsights,
        WorkflowKind::ProcessInput,
        WorkflowKind::ArchiveProcessed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowKind::AnalyzeNews => "analyze-news",
            WorkflowKind::ScreenStocks => "screen-stocks",
            WorkflowKind::GenerateWeeklyReport => "generate-weekly-report",
            WorkflowKind::GenerateMonthlyReport => "generate-monthly-report",
            WorkflowKind::ExtractInsights => "extract-insights",
            WorkflowKind::ProcessInput => "process-input",
            WorkflowKind::ArchiveProcessed => "archive-processed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Stages the workflow may read, besides the one it writes.
    pub fn reads(&self) -> &'static [Stage] {
        match self {
            WorkflowKind::AnalyzeNews => &[Stage::Input],
            WorkflowKind::ProcessInput => &[Stage::Input, Stage::Processing],
            WorkflowKind::ScreenStocks
            | WorkflowKind::GenerateWeeklyReport
            | WorkflowKind::GenerateMonthlyReport
            | WorkflowKind::ExtractInsights
            | WorkflowKind::ArchiveProcessed => &[Stage::Processing],
        }
    }

    pub fn writes(&self) -> Stage {
        match self {
            WorkflowKind::ExtractInsights => Stage::Output,
            _ => Stage::Processing,
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One workflow invocation with its arguments. `None` means "use the
/// documented default" (today, this week, config importance).
#[derive(Debug, Clone, PartialEq)]
pub enum Workflow {
    /// Analyze one date, or every pending date when none is given.
    AnalyzeNews {
        date: Option<NaiveDate>,
    },
    ScreenStocks {
        date: Option<NaiveDate>,
        sector: Option<String>,
    },
    GenerateWeeklyReport {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    GenerateMonthlyReport {
        year: Option<i32>,
        month: Option<u32>,
    },
    ExtractInsights {
        importance: Option<Importance>,
    },
    /// Analyze and screen every pending date (every date with `force`).
    ProcessInput {
        force: bool,
    },
    /// Move processing reports dated before `before` (default: Monday of
    /// the current week) into `processing/archive/`.
    ArchiveProcessed {
        before: Option<NaiveDate>,
    },
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidArgs(msg.into())
}

pub fn parse_date(s: &str) -> Result<NaiveDate, PipelineError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| invalid(format!("'{}' is not a YYYY-MM-DD date", s)))
}

/// Digits and dashes starting with a digit, like `2026-01-05` or `2026-1-32`.
fn looks_like_date(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit())
        && s.contains('-')
        && s.chars().all(|c| c.is_ascii_digit() || c == '-')
}

fn no_more(kind: WorkflowKind, rest: &[&str]) -> Result<(), PipelineError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(invalid(format!(
            "/{}: unexpected arguments: {}",
            kind.name(),
            rest.join(" ")
        )))
    }
}

impl Workflow {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            Workflow::AnalyzeNews { .. } => WorkflowKind::AnalyzeNews,
            Workflow::ScreenStocks { .. } => WorkflowKind::ScreenStocks,
            Workflow::GenerateWeeklyReport { .. } => WorkflowKind::GenerateWeeklyReport,
            Workflow::GenerateMonthlyReport { .. } => WorkflowKind::GenerateMonthlyReport,
            Workflow::ExtractInsights { .. } => WorkflowKind::ExtractInsights,
            Workflow::ProcessInput { .. } => WorkflowKind::ProcessInput,
            Workflow::ArchiveProcessed { .. } => WorkflowKind::ArchiveProcessed,
        }
    }

    /// Parse a trigger line like `/generate-weekly-report 2025-12-30 2026-01-05`.
    pub fn parse_trigger(line: &str) -> Result<Workflow, PipelineError> {
        let mut tokens = line.split_whitespace();
        let head = tokens.next().ok_or_else(|| invalid("empty trigger"))?;
        let name = head
            .strip_prefix('/')
            .ok_or_else(|| invalid(format!("trigger must start with '/': {}", head)))?;
        let kind = WorkflowKind::from_name(name)
            .ok_or_else(|| invalid(format!("unknown workflow '{}'", name)))?;
        let args: Vec<&str> = tokens.collect();
        Self::from_args(kind, &args)
    }

    /// Build a workflow from its positional arguments, as given after the
    /// trigger name or on the command line.
    pub fn from_args(kind: WorkflowKind, args: &[&str]) -> Result<Workflow, PipelineError> {
        match kind {
            WorkflowKind::AnalyzeNews => {
                let date = args.first().map(|s| parse_date(s)).transpose()?;
                no_more(kind, args.get(1..).unwrap_or(&[]))?;
                Ok(Workflow::AnalyzeNews { date })
            }
            WorkflowKind::ScreenStocks => {
                let (date, rest) = match args.split_first() {
                    Some((first, rest)) if looks_like_date(first) => {
                        (Some(parse_date(first)?), rest)
                    }
                    _ => (None, args),
                };
                let (sector, rest) = match rest.split_first() {
                    Some((s, rest)) => (Some(s.to_string()), rest),
                    None => (None, rest),
                };
                no_more(kind, rest)?;
                Ok(Workflow::ScreenStocks { date, sector })
            }
            WorkflowKind::GenerateWeeklyReport => {
                let start = args.first().map(|s| parse_date(s)).transpose()?;
                let end = args.get(1).map(|s| parse_date(s)).transpose()?;
                no_more(kind, args.get(2..).unwrap_or(&[]))?;
                Ok(Workflow::GenerateWeeklyReport { start, end })
            }
            WorkflowKind::GenerateMonthlyReport => {
                let (year, month, rest) = match args {
                    [] => (None, None, &[][..]),
                    [ym, rest @ ..] if ym.contains('-') => {
                        let (y, m) = ym.split_once('-').unwrap_or((*ym, ""));
                        (Some(parse_year(y)?), Some(parse_month(m)?), rest)
                    }
                    [y] => (Some(parse_year(y)?), None, &[][..]),
                    [y, m, rest @ ..] => (Some(parse_year(y)?), Some(parse_month(m)?), rest),
                };
                no_more(kind, rest)?;
                Ok(Workflow::GenerateMonthlyReport { year, month })
            }
            WorkflowKind::ExtractInsights => {
                let importance = args
                    .first()
                    .map(|s| s.parse::<Importance>().map_err(invalid))
                    .transpose()?;
                no_more(kind, args.get(1..).unwrap_or(&[]))?;
                Ok(Workflow::ExtractInsights { importance })
            }
            WorkflowKind::ProcessInput => match args {
                [] => Ok(Workflow::ProcessInput { force: false }),
                ["force" | "--force"] => Ok(Workflow::ProcessInput { force: true }),
                rest => {
                    no_more(kind, rest)?;
                    Ok(Workflow::ProcessInput { force: false })
                }
            },
            WorkflowKind::ArchiveProcessed => {
                let before = args.first().map(|s| parse_date(s)).transpose()?;
                no_more(kind, args.get(1..).unwrap_or(&[]))?;
                Ok(Workflow::ArchiveProcessed { before })
            }
        }
    }
}

fn parse_year(s: &str) -> Result<i32, PipelineError> {
    s.parse()
        .map_err(|_| invalid(format!("'{}' is not a year", s)))
}

fn parse_month(s: &str) -> Result<u32, PipelineError> {
    match s.parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => Ok(m),
        _ => Err(invalid(format!("'{}' is not a month (1-12)", s))),
    }
}

/// An item a workflow passed over, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub key: String,
    pub reason: String,
}

/// Outcome of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub workflow: WorkflowKind,
    /// Keys written, as `stage/key`.
    pub written: Vec<String>,
    pub skipped: Vec<Skipped>,
    /// Items or reports consumed.
    pub processed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub message: String,
}

impl RunReport {
    pub fn new(workflow: WorkflowKind) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            workflow,
            written: Vec::new(),
            skipped: Vec::new(),
            processed: 0,
            candidates: Vec::new(),
            warnings: Vec::new(),
            message: String::new(),
        }
    }

    pub fn skip(&mut self, key: impl Into<String>, reason: impl fmt::Display) {
        self.skipped.push(Skipped {
            key: key.into(),
            reason: reason.to_string(),
        });
    }

    pub fn wrote(&mut self, stage: Stage, key: &str) {
        self.written.push(format!("{}/{}", stage, key));
    }

    pub fn was_skipped(&self, key: &str) -> bool {
        self.skipped.iter().any(|s| s.key == key)
    }
}
