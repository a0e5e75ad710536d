//! Stage folder overview.
//!
//! Used by `np status` to show what each stage holds, which processing
//! reports exist, and which input dates still need analysis.

use anyhow::Result;
use chrono::NaiveDate;

use crate::config::Config;
use crate::skills::open_pipeline;

pub fn run_status(config: &Config, today: NaiveDate, json: bool) -> Result<()> {
    let pipeline = open_pipeline(config, today)?;
    let status = pipeline.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("News Pipeline Status");
    println!("====================");
    println!();
    println!("  Root:        {}", config.stages.root.display());
    println!("  Today:       {}", status.today);
    println!();
    println!("  {:<12} {:>6}", "STAGE", "FILES");
    println!("  {}", "-".repeat(19));
    for s in &status.stages {
        if s.present {
            println!("  {:<12} {:>6}", s.stage.dir_name(), s.files);
        } else {
            println!("  {:<12} {:>6}   (missing, run `np init`)", s.stage.dir_name(), "-");
        }
    }

    if !status.reports.is_empty() {
        println!();
        println!("  Reports:");
        for (kind, count) in &status.reports {
            println!("    {}  {}", kind, count);
        }
    }

    println!();
    match status.latest_analysis {
        Some(date) => println!("  Latest analysis: {}", date),
        None => println!("  Latest analysis: never"),
    }
    if status.pending.is_empty() {
        println!("  Pending input:   none");
    } else {
        let dates: Vec<String> = status.pending.iter().map(|d| d.to_string()).collect();
        println!("  Pending input:   {}", dates.join(", "));
    }
    println!();

    Ok(())
}
