//! Records that flow between pipeline stages.
//!
//! [`ParsedItem`]s come out of the input stage, [`AnalysisRecord`]s and
//! [`ScreeningResult`]s live in the processing stage. All of them are plain
//! values: skills build new ones instead of mutating what a previous stage
//! wrote.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ScreeningPolicy;

/// Round to four decimals, the precision reports carry.
///
/// Values produced here survive a `{:.4}` render and parse unchanged.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Importance of a news item, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Medium,
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Medium => "medium",
            Importance::High => "high",
        }
    }

    /// Whether `self` passes a threshold of `min`.
    pub fn at_least(&self, min: Importance) -> bool {
        *self >= min
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = String;

    /// Accepts `high`, `medium`, `low`, and `all` (same as `low`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Importance::High),
            "medium" => Ok(Importance::Medium),
            "low" | "all" => Ok(Importance::Low),
            other => Err(format!(
                "unknown importance '{}': expected high, medium, low or all",
                other
            )),
        }
    }
}

/// Direction of a sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

/// Scores at or above this are positive.
pub const POSITIVE_FLOOR: f64 = 0.6;
/// Scores at or below this are negative.
pub const NEGATIVE_CEILING: f64 = 0.4;

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= POSITIVE_FLOOR {
            SentimentLabel::Positive
        } else if score <= NEGATIVE_CEILING {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "📈",
            SentimentLabel::Neutral => "➖",
            SentimentLabel::Negative => "📉",
        }
    }

    pub fn from_emoji(s: &str) -> Option<Self> {
        match s {
            "📈" => Some(SentimentLabel::Positive),
            "➖" => Some(SentimentLabel::Neutral),
            "📉" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }

    /// Market mood wording used in reports.
    pub fn mood(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "偏乐观",
            SentimentLabel::Neutral => "中性",
            SentimentLabel::Negative => "偏悲观",
        }
    }
}

/// One entity occurrence summary inside a single input item.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMention {
    pub name: String,
    pub code: Option<String>,
    pub sector: String,
    pub count: u32,
}

/// An input-stage file after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    /// Store key the item was read from.
    pub key: String,
    pub date: NaiveDate,
    pub title: String,
    /// Body with the front-matter block removed.
    pub body: String,
    /// Front-matter `key: value` pairs.
    pub metadata: BTreeMap<String, String>,
    /// Mentions sorted by entity name.
    pub mentions: Vec<EntityMention>,
    /// Industry keywords found, in lexicon order.
    pub industries: Vec<String>,
    /// Sectors touched by the industry keywords, most hits first.
    pub sectors: Vec<String>,
}

impl ParsedItem {
    pub fn mention_count(&self, entity: &str) -> u32 {
        self.mentions
            .iter()
            .find(|m| m.name == entity)
            .map(|m| m.count)
            .unwrap_or(0)
    }
}

/// Per-item result kept inside an [`AnalysisRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDigest {
    /// Input key the item came from.
    pub source: String,
    pub title: String,
    pub summary: String,
    pub sentiment_score: f64,
    pub sentiment: SentimentLabel,
    pub category: String,
    pub importance: Importance,
    pub key_points: Vec<String>,
    /// Entity names mentioned by the item.
    pub entities: Vec<String>,
    pub sectors: Vec<String>,
}

/// Aggregated mentions of one entity across a record's items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStat {
    pub name: String,
    pub code: Option<String>,
    pub sector: String,
    /// Total occurrences across all items.
    pub mentions: u32,
    /// Number of items mentioning the entity.
    pub items: u32,
    /// Mention-weighted mean of the mentioning items' scores.
    pub sentiment: f64,
}

/// Daily analysis written to the processing stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub date: NaiveDate,
    pub summary: String,
    /// Mean item score, `0.5` when there are no items.
    pub sentiment_score: f64,
    pub sentiment: SentimentLabel,
    /// Sorted by mentions desc, then name.
    pub entities: Vec<EntityStat>,
    pub hot_sectors: Vec<String>,
    pub recommendation: String,
    pub items: Vec<ItemDigest>,
    /// Highest item importance, `Low` when empty.
    pub importance: Importance,
    /// SHA-256 over the input files the record was built from.
    pub input_digest: String,
}

impl AnalysisRecord {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn entity(&self, name: &str) -> Option<&EntityStat> {
        self.entities.iter().find(|e| e.name == name)
    }
}

/// Recommendation tier derived from a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Strong,
    Moderate,
    Watch,
}

impl Level {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Level::Strong
        } else if score >= 50.0 {
            Level::Moderate
        } else {
            Level::Watch
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Strong => "strong",
            Level::Moderate => "moderate",
            Level::Watch => "watch",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Strong => "强烈推荐",
            Level::Moderate => "适度关注",
            Level::Watch => "持续观察",
        }
    }

    pub fn stars(&self) -> &'static str {
        match self {
            Level::Strong => "⭐⭐⭐",
            Level::Moderate => "⭐⭐",
            Level::Watch => "⭐",
        }
    }

    /// Inverse of [`label`](Self::label).
    pub fn from_label(s: &str) -> Option<Self> {
        [Level::Strong, Level::Moderate, Level::Watch]
            .into_iter()
            .find(|l| l.label() == s)
    }
}

/// A screened entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub entity: String,
    pub code: Option<String>,
    /// Exchange derived from the code.
    pub market: Option<String>,
    pub sector: String,
    pub mention_count: u32,
    pub item_count: u32,
    pub sentiment_score: f64,
    /// Recommendation score in `0..=100`.
    pub score: f64,
    pub level: Level,
    /// Allow-listed sectors of the items mentioning the entity, sorted.
    pub focus_sectors: Vec<String>,
    /// Summaries of the first items mentioning the entity.
    pub key_news: Vec<String>,
}

/// Screening output for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningResult {
    pub date: NaiveDate,
    pub sector_filter: Option<String>,
    pub policy: ScreeningPolicy,
    pub candidates: Vec<Candidate>,
}

impl ScreeningResult {
    pub fn empty(date: NaiveDate, policy: &ScreeningPolicy, sector_filter: Option<&str>) -> Self {
        Self {
            date,
            sector_filter: sector_filter.map(str::to_string),
            policy: policy.clone(),
            candidates: Vec::new(),
        }
    }

    /// Candidates that break the policy the result claims to apply.
    pub fn violations(&self) -> Vec<&Candidate> {
        self.candidates
            .iter()
            .filter(|c| {
                c.mention_count < self.policy.min_mentions
                    || c.sentiment_score < self.policy.sentiment_threshold
                    || !self.policy.allows_sector(&c.sector)
                    || self
                        .sector_filter
                        .as_deref()
                        .is_some_and(|s| s != c.sector)
            })
            .collect()
    }

    pub fn count_level(&self, level: Level) -> usize {
        self.candidates.iter().filter(|c| c.level == level).count()
    }
}
