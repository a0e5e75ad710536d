//! Pipeline settings.
//!
//! Every threshold the skills consult lives here with its documented
//! default, so the binary can deserialize it from TOML and tests can build
//! it directly. Nothing is read from ambient context.

use serde::{Deserialize, Serialize};

use crate::models::Importance;

/// Sector allow-list used when no `[screening].sectors` is configured.
pub const DEFAULT_SECTORS: [&str; 6] = ["新能源", "半导体", "人工智能", "医疗健康", "消费", "金融"];

/// All settings consumed by [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub screening: ScreeningPolicy,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub insights: InsightSettings,
    /// Known entities matched by name in input text.
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

/// Filter policy applied by the screener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScreeningPolicy {
    /// Minimum total mentions for a candidate. Default `2`.
    #[serde(default = "default_min_mentions")]
    pub min_mentions: u32,
    /// Minimum mention-weighted sentiment (0..1). Default `0.6`.
    #[serde(default = "default_sentiment_threshold")]
    pub sentiment_threshold: f64,
    /// Sectors eligible for screening, in display order.
    #[serde(default = "default_sectors")]
    pub sectors: Vec<String>,
    /// Entity name prefixes that are never candidates (special treatment).
    #[serde(default = "default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,
}

fn default_min_mentions() -> u32 {
    2
}
fn default_sentiment_threshold() -> f64 {
    0.6
}
fn default_sectors() -> Vec<String> {
    DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect()
}
fn default_excluded_prefixes() -> Vec<String> {
    vec!["*ST".to_string(), "ST".to_string()]
}

impl Default for ScreeningPolicy {
    fn default() -> Self {
        Self {
            min_mentions: default_min_mentions(),
            sentiment_threshold: default_sentiment_threshold(),
            sectors: default_sectors(),
            excluded_prefixes: default_excluded_prefixes(),
        }
    }
}

impl ScreeningPolicy {
    pub fn allows_sector(&self, sector: &str) -> bool {
        self.sectors.iter().any(|s| s == sector)
    }

    pub fn is_excluded(&self, entity: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|p| !p.is_empty() && entity.starts_with(p.as_str()))
    }
}

/// Analyzer tuning.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AnalysisSettings {
    /// Key sentences kept per item. Default `5`.
    #[serde(default = "default_max_key_points")]
    pub max_key_points: usize,
    /// Key sentences folded into an item summary. Default `3`.
    #[serde(default = "default_summary_points")]
    pub summary_points: usize,
}

fn default_max_key_points() -> usize {
    5
}
fn default_summary_points() -> usize {
    3
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_key_points: default_max_key_points(),
            summary_points: default_summary_points(),
        }
    }
}

/// Insight extraction defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InsightSettings {
    /// Minimum importance copied into notes. Default `high`.
    #[serde(default = "default_importance")]
    pub importance: Importance,
}

fn default_importance() -> Importance {
    Importance::High
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            importance: default_importance(),
        }
    }
}

/// A catalogued entity (usually a listed company).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EntityDef {
    /// Display name, also matched in text.
    pub name: String,
    /// Sector the entity belongs to.
    pub sector: String,
    /// Six-digit exchange code; occurrences count as mentions.
    #[serde(default)]
    pub code: Option<String>,
    /// Alternative spellings counted as mentions of `name`.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl EntityDef {
    pub fn new(name: &str, sector: &str) -> Self {
        Self {
            name: name.to_string(),
            sector: sector.to_string(),
            code: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }
}
