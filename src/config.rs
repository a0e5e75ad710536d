//! TOML configuration.
//!
//! Every section is optional; a missing file at the default path falls back
//! to built-in defaults, while an explicit `--config` must exist. Pipeline
//! sections (`[screening]`, `[analysis]`, `[insights]`, `[[entities]]`)
//! deserialize straight into the core crate's settings types.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use news_pipeline_core::config::{AnalysisSettings, EntityDef, InsightSettings, ScreeningPolicy};
use news_pipeline_core::PipelineConfig;

/// Config path used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/np.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub stages: StagesConfig,
    #[serde(default)]
    pub screening: ScreeningPolicy,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub insights: InsightSettings,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub todos: TodosConfig,
}

/// Where the `input/`, `processing/` and `output/` folders live.
#[derive(Debug, Deserialize, Clone)]
pub struct StagesConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TodosConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/todos.sqlite")
}

impl Default for TodosConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Config {
    /// Settings handed to the core [`Pipeline`](news_pipeline_core::Pipeline).
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            screening: self.screening.clone(),
            analysis: self.analysis.clone(),
            insights: self.insights.clone(),
            entities: self.entities.clone(),
        }
    }
}

/// Load `path`, or the defaults when no path was given and the default
/// file is absent.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Screening
    if config.screening.min_mentions < 1 {
        bail!("screening.min_mentions must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.screening.sentiment_threshold) {
        bail!("screening.sentiment_threshold must be in [0.0, 1.0]");
    }
    if config.screening.sectors.is_empty() {
        bail!("screening.sectors must list at least one sector");
    }
    if let Some(sector) = config.screening.sectors.iter().find(|s| has_control(s)) {
        bail!("screening.sectors: {:?} contains a control character", sector);
    }

    // Analysis
    if config.analysis.max_key_points == 0 {
        bail!("analysis.max_key_points must be > 0");
    }

    // Entities
    let mut seen = HashSet::new();
    for entity in &config.entities {
        if entity.name.trim().is_empty() {
            bail!("entities: name must not be empty");
        }
        if entity.sector.trim().is_empty() {
            bail!("entities: '{}' has an empty sector", entity.name);
        }
        if !seen.insert(entity.name.as_str()) {
            bail!("entities: duplicate name '{}'", entity.name);
        }
        if has_control(&entity.name) || has_control(&entity.sector) {
            bail!("entities: {:?} contains a control character", entity.name);
        }
    }

    if config.stages.include_globs.is_empty() {
        bail!("stages.include_globs must not be empty");
    }

    Ok(())
}

fn has_control(s: &str) -> bool {
    s.chars().any(char::is_control)
}
