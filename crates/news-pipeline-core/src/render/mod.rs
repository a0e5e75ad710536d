//! Markdown report templates.
//!
//! Every template is a pure function of its data. User-derived text (titles,
//! summaries, entity names, sources) passes through [`escape`] so it can
//! never open a heading, split a table cell or start emphasis. Processing
//! reports carry a front-matter block that [`reader`](crate::reader) uses to
//! recover the record.
//!
//! | Template | Data | Stage |
//! |----------|------|-------|
//! | [`daily`] | [`AnalysisRecord`] | processing |
//! | [`screening`] | [`ScreeningResult`] | processing |
//! | [`period`] | [`PeriodDigest`] | processing |
//! | [`insight`] | [`InsightNote`] | output |

pub mod daily;
pub mod insight;
pub mod period;
pub mod screening;

use std::fmt::Write as _;

use crate::error::RenderError;
use crate::insight::InsightNote;
use crate::models::{AnalysisRecord, ScreeningResult};
use crate::period::PeriodDigest;

/// Footer line closing every generated document.
pub const FOOTER: &str = "*本报告由程序自动生成，仅供参考*";

/// Characters that carry markdown structure.
const SPECIAL: &[char] = &['\\', '|', '*', '_', '`', '[', ']', '<', '>', '#'];

/// Data for one report, tagged by template kind.
#[derive(Debug, Clone, Copy)]
pub enum ReportData<'a> {
    Daily(&'a AnalysisRecord),
    StockScreen(&'a ScreeningResult),
    Period(&'a PeriodDigest),
    Insight(&'a InsightNote),
}

impl ReportData<'_> {
    pub fn template(&self) -> &'static str {
        match self {
            ReportData::Daily(_) => daily::TEMPLATE,
            ReportData::StockScreen(_) => screening::TEMPLATE,
            ReportData::Period(_) => period::TEMPLATE,
            ReportData::Insight(_) => insight::TEMPLATE,
        }
    }
}

/// Render any report.
pub fn render(data: ReportData<'_>) -> Result<String, RenderError> {
    match data {
        ReportData::Daily(r) => daily::render(r),
        ReportData::StockScreen(r) => screening::render(r),
        ReportData::Period(d) => period::render(d),
        ReportData::Insight(n) => insight::render(n),
    }
}

/// Backslash-escape markdown structure and fold line breaks into spaces.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push(' ');
                }
            }
            '\n' => out.push(' '),
            c if SPECIAL.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`] (line breaks stay folded).
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Split a table row on unescaped `|` and unescape each cell.
///
/// Returns `None` for lines that are not table rows.
pub fn split_row(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if !line.starts_with('|') {
        return None;
    }
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line[1..].chars();
    let mut closed = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '|' => {
                cells.push(unescape(current.trim()));
                current.clear();
                closed = true;
            }
            c => {
                current.push(c);
                closed = false;
            }
        }
    }
    if !closed && !current.trim().is_empty() {
        cells.push(unescape(current.trim()));
    }
    Some(cells)
}

/// Whether a row is a `|---|---|` separator.
pub fn is_separator(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells
            .iter()
            .all(|c| !c.is_empty() && c.chars().all(|ch| ch == '-' || ch == ':'))
}

/// Table header plus separator.
pub(crate) fn table_header(out: &mut String, columns: &[&str]) {
    let _ = writeln!(out, "| {} |", columns.join(" | "));
    let seps: Vec<String> = columns
        .iter()
        .map(|c| "-".repeat(c.chars().count().max(3)))
        .collect();
    let _ = writeln!(out, "|{}|", seps.join("|"));
}

pub(crate) fn table_row(out: &mut String, cells: &[String]) {
    let _ = writeln!(out, "| {} |", cells.join(" | "));
}

/// Front-matter block. Values may carry configured or user-supplied text,
/// so control characters are folded into spaces to keep one field per line.
pub(crate) fn front_matter(out: &mut String, fields: &[(&str, String)]) {
    out.push_str("---\n");
    for (k, v) in fields {
        let _ = writeln!(out, "{}: {}", k, front_matter_value(v));
    }
    out.push_str("---\n");
}

pub(crate) fn front_matter_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

pub(crate) fn footer(out: &mut String) {
    out.push_str("\n---\n");
    out.push_str(FOOTER);
    out.push('\n');
}

/// `a、b、c` with each part escaped, or `fallback` when empty.
pub(crate) fn join_escaped(parts: &[String], fallback: &str) -> String {
    if parts.is_empty() {
        fallback.to_string()
    } else {
        parts.iter().map(|p| escape(p)).collect::<Vec<_>>().join("、")
    }
}
