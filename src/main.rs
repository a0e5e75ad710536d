//! # News Pipeline CLI (`np`)
//!
//! The `np` binary drives the three-stage news pipeline over the folders
//! under `[stages].root`, and hosts the small to-do service.
//!
//! ## Usage
//!
//! ```bash
//! np [--config ./config/np.toml] [--today YYYY-MM-DD] [--json] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `np init` | Create `input/`, `processing/`, `output/notes/` |
//! | `np status` | Per-stage file counts and pending input dates |
//! | `np analyze-news [DATE]` | Input → `YYYY-MM-DD-新闻分析.md` (every pending date without DATE) |
//! | `np screen-stocks [DATE] [SECTOR]` | Analysis → `YYYY-MM-DD-股票筛选.md` |
//! | `np generate-weekly-report [START] [END]` | Processing → `<start>-周报.md` |
//! | `np generate-monthly-report [YEAR] [MONTH]` | Processing → `YYYY-MM-01-月报.md` |
//! | `np extract-insights [IMPORTANCE]` | Processing → `output/notes/` |
//! | `np process-input [--force]` | Analyze and screen every pending date |
//! | `np archive-processed [BEFORE]` | Move older processing reports to `processing/archive/` |
//! | `np run "<trigger>"` | Run a slash trigger such as `/screen-stocks 半导体` |
//! | `np serve` | Start the to-do REST service |
//!
//! ## Examples
//!
//! ```bash
//! np init
//! np analyze-news 2026-01-05
//! np screen-stocks 2026-01-05 新能源
//! np generate-weekly-report 2025-12-30 2026-01-05
//! np run "/extract-insights medium"
//! np --json process-input
//! ```

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use news_pipeline::{config, logging, server, skills, status};
use news_pipeline_core::workflow::parse_date;
use news_pipeline_core::{Workflow, WorkflowKind};

/// News Pipeline CLI: market-news analysis, stock screening, periodic
/// reports and insight notes over plain markdown folders.
///
/// Configuration is read from `--config`, or from `./config/np.toml` when
/// present. See `config/np.example.toml` for every setting.
#[derive(Parser)]
#[command(
    name = "np",
    about = "News Pipeline: market-news analysis, stock screening and reports \
             over markdown folders",
    version,
    long_about = "News Pipeline moves market-news markdown through three folders \
    (input → processing → output): daily sentiment analysis, rule-based stock screening, \
    weekly and monthly reports, and importance-filtered insight notes."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/np.toml`; built-in defaults apply when that
    /// file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Date treated as today (YYYY-MM-DD). Defaults to the local date.
    #[arg(long, global = true, value_parser = parse_today)]
    today: Option<NaiveDate>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

fn parse_today(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the stage folders.
    ///
    /// Creates `input/`, `processing/` and `output/notes/` under
    /// `[stages].root`. Running it again is safe.
    Init,

    /// Show stage folder counts and pending input dates.
    Status,

    /// Analyze the news items of one date.
    ///
    /// Reads `input/DATE-*.md` and writes `processing/DATE-新闻分析.md`.
    /// Without a date, analyzes every input date whose record is missing or
    /// stale.
    AnalyzeNews {
        /// Date to analyze (YYYY-MM-DD).
        date: Option<String>,
    },

    /// Screen stocks from one date's analysis record.
    ///
    /// Writes `processing/DATE-股票筛选.md`, even when nothing passes.
    ScreenStocks {
        /// Date to screen (YYYY-MM-DD), or a sector when no date is given.
        /// A malformed date is an error.
        date: Option<String>,

        /// Restrict candidates to one sector of the allow-list.
        sector: Option<String>,
    },

    /// Aggregate processing reports of a week.
    ///
    /// Defaults to Monday of the current week through today.
    GenerateWeeklyReport {
        /// First day (YYYY-MM-DD), inclusive.
        start: Option<String>,

        /// Last day (YYYY-MM-DD), inclusive.
        end: Option<String>,
    },

    /// Aggregate processing reports of a calendar month.
    GenerateMonthlyReport {
        /// Year, or `YYYY-MM`. Defaults to the current year.
        year: Option<String>,

        /// Month (1-12). Defaults to the current month.
        month: Option<String>,
    },

    /// Copy important items into `output/notes/`.
    ///
    /// Existing notes are never overwritten.
    ExtractInsights {
        /// Minimum importance: `high`, `medium`, `low` or `all`.
        /// Defaults to `[insights].importance`.
        importance: Option<String>,
    },

    /// Analyze and screen every pending input date.
    ProcessInput {
        /// Reprocess every input date, pending or not.
        #[arg(long)]
        force: bool,
    },

    /// Move processing reports dated before BEFORE into `processing/archive/`.
    ArchiveProcessed {
        /// Cut-off date (YYYY-MM-DD), exclusive. Defaults to Monday of the
        /// current week.
        before: Option<String>,
    },

    /// Run a slash trigger, e.g. `np run "/generate-weekly-report 2025-12-30"`.
    Run {
        /// The trigger line.
        trigger: String,
    },

    /// Start the to-do REST service.
    ///
    /// Binds to `[server].bind` and stores todos in `[todos].db_path`.
    Serve,
}

impl Commands {
    /// The workflow a pipeline subcommand stands for.
    fn workflow(&self) -> Option<Result<Workflow>> {
        let (kind, args): (WorkflowKind, Vec<&str>) = match self {
            Commands::AnalyzeNews { date } => (
                WorkflowKind::AnalyzeNews,
                date.iter().map(String::as_str).collect(),
            ),
            Commands::ScreenStocks { date, sector } => (
                WorkflowKind::ScreenStocks,
                date.iter().chain(sector).map(String::as_str).collect(),
            ),
            Commands::GenerateWeeklyReport { start, end } => (
                WorkflowKind::GenerateWeeklyReport,
                start.iter().chain(end).map(String::as_str).collect(),
            ),
            Commands::GenerateMonthlyReport { year, month } => (
                WorkflowKind::GenerateMonthlyReport,
                year.iter().chain(month).map(String::as_str).collect(),
            ),
            Commands::ExtractInsights { importance } => (
                WorkflowKind::ExtractInsights,
                importance.iter().map(String::as_str).collect(),
            ),
            Commands::ProcessInput { force } => (
                WorkflowKind::ProcessInput,
                if *force { vec!["force"] } else { Vec::new() },
            ),
            Commands::ArchiveProcessed { before } => (
                WorkflowKind::ArchiveProcessed,
                before.iter().map(String::as_str).collect(),
            ),
            Commands::Init | Commands::Status | Commands::Run { .. } | Commands::Serve => {
                return None
            }
        };
        Some(Workflow::from_args(kind, &args).map_err(Into::into))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init("info");

    let cfg = config::resolve_config(cli.config.as_deref())?;
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    if let Some(workflow) = cli.command.workflow() {
        skills::run_workflow(&cfg, today, &workflow?, cli.json)?;
        return Ok(());
    }

    match cli.command {
        Commands::Init => skills::run_init(&cfg)?,
        Commands::Status => status::run_status(&cfg, today, cli.json)?,
        Commands::Run { trigger } => {
            skills::run_trigger(&cfg, today, &trigger, cli.json)?;
        }
        Commands::Serve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::run_server(&cfg))?;
        }
        // Pipeline commands returned above.
        _ => unreachable!(),
    }

    Ok(())
}
