//! Stage file naming.
//!
//! | Stage | Pattern |
//! |-------|---------|
//! | input | `YYYY-MM-DD-<title>.md` |
//! | processing | `YYYY-MM-DD-<新闻分析\|股票筛选\|周报\|月报>.md` |
//! | output | `notes/YYYY-MM-DD-投资笔记.md` |
//!
//! Files moved under `archive/` keep their name and drop out of listings.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::ParseError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Output subfolder holding insight notes.
pub const NOTES_DIR: &str = "notes";

/// Subfolder archived processing reports are moved into.
pub const ARCHIVE_DIR: &str = "archive";

/// Label of an insight note file.
pub const NOTE_LABEL: &str = "投资笔记";

static DATED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})-(.+)\.md$").unwrap());

/// Report types stored in the processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Analysis,
    Screening,
    Weekly,
    Monthly,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Analysis,
        ReportKind::Screening,
        ReportKind::Weekly,
        ReportKind::Monthly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Analysis => "新闻分析",
            ReportKind::Screening => "股票筛选",
            ReportKind::Weekly => "周报",
            ReportKind::Monthly => "月报",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }

    /// Weekly and monthly reports summarize other reports and are never
    /// aggregated themselves.
    pub fn is_period(&self) -> bool {
        matches!(self, ReportKind::Weekly | ReportKind::Monthly)
    }
}

/// Last path component of a store key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// `README.md` files and archived entries are never pipeline data.
pub fn is_ignored(key: &str) -> bool {
    file_name(key).eq_ignore_ascii_case("readme.md") || is_archived(key)
}

pub fn is_archived(key: &str) -> bool {
    key.split('/').next() == Some(ARCHIVE_DIR) && key.contains('/')
}

/// Where `key` lives once archived.
pub fn archive_key(key: &str) -> String {
    format!("{}/{}", ARCHIVE_DIR, file_name(key))
}

/// Split `YYYY-MM-DD-<label>.md` into its date and label.
pub fn split_dated_name(key: &str) -> Result<(NaiveDate, String), ParseError> {
    let name = file_name(key);
    let caps = DATED_NAME
        .captures(name)
        .ok_or_else(|| ParseError::MalformedName(key.to_string()))?;
    let date_str = &caps[1];
    let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|_| {
        ParseError::InvalidDate {
            key: key.to_string(),
            date: date_str.to_string(),
        }
    })?;
    Ok((date, caps[2].to_string()))
}

/// Date component of a dated key, if it has one.
pub fn date_of(key: &str) -> Option<NaiveDate> {
    split_dated_name(key).ok().map(|(d, _)| d)
}

/// Processing-stage key for a report.
pub fn report_key(kind: ReportKind, date: NaiveDate) -> String {
    format!("{}-{}.md", date.format(DATE_FORMAT), kind.label())
}

/// Output-stage key for an insight note.
pub fn note_key(date: NaiveDate) -> String {
    format!("{}/{}-{}.md", NOTES_DIR, date.format(DATE_FORMAT), NOTE_LABEL)
}

/// Recognize a processing report key.
pub fn classify_report(key: &str) -> Option<(NaiveDate, ReportKind)> {
    let (date, label) = split_dated_name(key).ok()?;
    ReportKind::from_label(&label).map(|k| (date, k))
}

/// Title part of an input filename, used when the text has no heading.
pub fn title_of(key: &str) -> Option<String> {
    split_dated_name(key).ok().map(|(_, label)| label)
}
