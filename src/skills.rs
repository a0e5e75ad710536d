//! Command-line front end for the pipeline workflows.
//!
//! Opens an [`FsStore`] over the configured stage root, runs one
//! [`Workflow`] through the core [`Pipeline`], and prints the
//! [`RunReport`] as text or JSON.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use news_pipeline_core::{Pipeline, RunReport, Workflow};

use crate::config::Config;
use crate::fs_store::FsStore;

pub fn open_pipeline(config: &Config, today: NaiveDate) -> Result<Pipeline<FsStore>> {
    let store = FsStore::new(&config.stages)?;
    Ok(Pipeline::new(store, config.pipeline_config(), today))
}

/// `np init`: create the stage folders.
pub fn run_init(config: &Config) -> Result<()> {
    let store = FsStore::new(&config.stages)?;
    let created = store.init_stages().with_context(|| {
        format!("Failed to create stage folders under {}", store.root().display())
    })?;
    for dir in &created {
        println!("created {}", dir.display());
    }
    println!("Stage folders initialized under {}.", store.root().display());
    Ok(())
}

pub fn run_workflow(
    config: &Config,
    today: NaiveDate,
    workflow: &Workflow,
    json: bool,
) -> Result<RunReport> {
    let pipeline = open_pipeline(config, today)?;
    let report = pipeline
        .run(workflow)
        .with_context(|| format!("{} failed", workflow.kind()))?;
    print_report(&report, json)?;
    Ok(report)
}

/// `np run "<trigger>"`.
pub fn run_trigger(config: &Config, today: NaiveDate, line: &str, json: bool) -> Result<RunReport> {
    let workflow = Workflow::parse_trigger(line)?;
    run_workflow(config, today, &workflow, json)
}

pub fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}: {}", report.workflow, report.message);
    for key in &report.written {
        println!("  wrote    {}", key);
    }
    for skipped in &report.skipped {
        println!("  skipped  {} ({})", skipped.key, skipped.reason);
    }
    for warning in &report.warnings {
        println!("  warning  {}", warning);
    }
    if !report.candidates.is_empty() {
        println!();
        println!(
            "  {:<4} {:<16} {:<8} {:<10} {:>8} {:>9} {:>7}   {}",
            "RANK", "ENTITY", "CODE", "SECTOR", "MENTIONS", "SENTIMENT", "SCORE", "LEVEL"
        );
        println!("  {}", "-".repeat(84));
        for (i, c) in report.candidates.iter().enumerate() {
            println!(
                "  {:<4} {:<16} {:<8} {:<10} {:>8} {:>9.4} {:>7.2}   {}",
                i + 1,
                c.entity,
                c.code.as_deref().unwrap_or("-"),
                c.sector,
                c.mention_count,
                c.sentiment_score,
                c.score,
                c.level.label()
            );
        }
    }
    Ok(())
}
