//! # News Pipeline
//!
//! A file-based pipeline for market news. Markdown items dropped into
//! `input/` are analyzed into daily records, screened for stock candidates,
//! rolled up into weekly and monthly reports, and distilled into insight
//! notes under `output/notes/`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  input/  │──▶│ parse+analyze  │──▶│ processing/  │──▶│ output/notes │
//! └──────────┘   └────────────────┘   │ 新闻分析/筛选 │   └──────────────┘
//!                                     │ 周报/月报     │
//!                                     └──────────────┘
//! ```
//!
//! The pipeline logic lives in the `news-pipeline-core` crate and never
//! touches the filesystem; this crate supplies the [`fs_store::FsStore`],
//! configuration, logging, the `np` CLI and the to-do REST service.
//!
//! ## Quick Start
//!
//! ```bash
//! np init                               # create the stage folders
//! np analyze-news 2026-01-05            # daily analysis record
//! np screen-stocks 2026-01-05           # candidate list
//! np generate-weekly-report             # this week so far
//! np extract-insights                   # notes for high-importance items
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`fs_store`] | Filesystem stage store |
//! | [`skills`] | CLI runners for the pipeline workflows |
//! | [`status`] | Stage overview |
//! | [`logging`] | Tracing subscriber setup |
//! | [`server`] | To-do HTTP server |
//! | [`todos`] | To-do storage |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod fs_store;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod skills;
pub mod status;
pub mod todos;
