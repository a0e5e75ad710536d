//! # news-pipeline core
//!
//! Pure pipeline logic for news-pipeline: data models, the markdown content
//! parser, the sentiment lexicon, the analyzer, the stock screener, report
//! templates and their reader, the [`store::ContentStore`] abstraction and
//! the workflow orchestration that ties them together.
//!
//! This crate performs no filesystem or network I/O of its own. All stage
//! access goes through a [`store::ContentStore`] handed in by the caller;
//! [`store::memory::MemoryStore`] backs the tests.
//!
//! ## Data flow
//!
//! ```text
//! input/ ──▶ parser ──▶ analyzer ──▶ processing/ ──▶ screener / period / insight
//!                                                        │
//!                                        render ◀────────┘
//!                                          │
//!                             processing/ (reports) · output/notes/
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Pipeline settings with documented defaults |
//! | [`models`] | Records flowing between stages |
//! | [`naming`] | Stage file naming conventions |
//! | [`lexicon`] | Sentiment, category and industry keyword tables |
//! | [`parser`] | Input markdown → [`models::ParsedItem`] |
//! | [`analyzer`] | Items → [`models::AnalysisRecord`] |
//! | [`screener`] | Records → ranked [`models::Candidate`]s |
//! | [`period`] | Weekly / monthly aggregation |
//! | [`insight`] | Importance-filtered insight selection |
//! | [`render`] | Markdown report templates |
//! | [`reader`] | Processing reports → records |
//! | [`store`] | Stage store trait, scoped views, in-memory store |
//! | [`workflow`] | Workflow enum, slash triggers, run reports |
//! | [`pipeline`] | Skill implementations over a store |

pub mod analyzer;
pub mod config;
pub mod error;
pub mod insight;
pub mod lexicon;
pub mod models;
pub mod naming;
pub mod parser;
pub mod period;
pub mod pipeline;
pub mod reader;
pub mod render;
pub mod screener;
pub mod store;
pub mod workflow;

pub use config::PipelineConfig;
pub use error::{ParseError, PipelineError, RenderError, StoreError};
pub use pipeline::Pipeline;
pub use store::{ContentStore, Stage};
pub use workflow::{RunReport, Workflow, WorkflowKind};
