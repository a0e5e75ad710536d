//! Filesystem [`ContentStore`].
//!
//! Stages map to `<root>/input`, `<root>/processing` and `<root>/output`.
//! Keys are `/`-separated paths relative to the stage folder. Listing walks
//! the folder with `walkdir` and filters through the configured include and
//! exclude globs, so editor droppings and VCS folders never reach a skill.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use news_pipeline_core::naming;
use news_pipeline_core::store::validate_key;
use news_pipeline_core::{ContentStore, Stage, StoreError};

use crate::config::StagesConfig;

pub struct FsStore {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    follow_symlinks: bool,
}

impl FsStore {
    pub fn new(config: &StagesConfig) -> Result<Self> {
        let include = build_globset(&config.include_globs)?;

        let mut default_excludes = vec!["**/.git/**".to_string(), "**/.*".to_string()];
        default_excludes.extend(config.exclude_globs.clone());
        let exclude = build_globset(&default_excludes)?;

        Ok(Self {
            root: config.root.clone(),
            include,
            exclude,
            follow_symlinks: config.follow_symlinks,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.dir_name())
    }

    /// Create any missing stage folders (and `output/notes`). Returns the
    /// folders that were created.
    pub fn init_stages(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        let notes = self.stage_dir(Stage::Output).join(naming::NOTES_DIR);
        let dirs = Stage::ALL
            .iter()
            .map(|s| self.stage_dir(*s))
            .chain(std::iter::once(notes));
        for dir in dirs {
            if !dir.is_dir() {
                std::fs::create_dir_all(&dir)?;
                created.push(dir);
            }
        }
        Ok(created)
    }

    /// Path of `key` inside an existing stage folder.
    fn path_of(&self, stage: Stage, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        let dir = self.stage_dir(stage);
        if !dir.is_dir() {
            return Err(StoreError::MissingStage(stage));
        }
        Ok(key.split('/').fold(dir, |p, part| p.join(part)))
    }
}

fn io_error(stage: Stage, key: &str, err: std::io::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound {
            stage,
            key: key.to_string(),
        }
    } else {
        StoreError::Io {
            stage,
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

impl ContentStore for FsStore {
    fn read(&self, stage: Stage, key: &str) -> Result<String, StoreError> {
        let path = self.path_of(stage, key)?;
        std::fs::read_to_string(&path).map_err(|e| io_error(stage, key, e))
    }

    fn write(&self, stage: Stage, key: &str, content: &str) -> Result<(), StoreError> {
        let path = self.path_of(stage, key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(stage, key, e))?;
        }
        // Write beside the target and rename, so readers never see half a report.
        let tmp = path.with_extension("md.tmp");
        std::fs::write(&tmp, content).map_err(|e| io_error(stage, key, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_error(stage, key, e))
    }

    fn list(&self, stage: Stage) -> Result<Vec<String>, StoreError> {
        let dir = self.stage_dir(stage);
        if !dir.is_dir() {
            return Err(StoreError::MissingStage(stage));
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(self.follow_symlinks) {
            let entry = entry.map_err(|e| StoreError::Io {
                stage,
                key: String::new(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(&dir).unwrap_or(entry.path());
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if self.exclude.is_match(&key) || !self.include.is_match(&key) {
                continue;
            }
            if naming::is_ignored(&key) {
                continue;
            }
            keys.push(key);
        }

        // Sort for deterministic ordering
        keys.sort();
        Ok(keys)
    }

    fn exists(&self, stage: Stage, key: &str) -> Result<bool, StoreError> {
        let path = self.path_of(stage, key)?;
        Ok(path.is_file())
    }

    fn remove(&self, stage: Stage, key: &str) -> Result<(), StoreError> {
        let path = self.path_of(stage, key)?;
        std::fs::remove_file(&path).map_err(|e| io_error(stage, key, e))
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> FsStore {
        let cfg = StagesConfig {
            root: tmp.path().to_path_buf(),
            ..StagesConfig::default()
        };
        FsStore::new(&cfg).unwrap()
    }

    #[test]
    fn missing_stage_folders() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        assert_eq!(
            s.list(Stage::Input).unwrap_err(),
            StoreError::MissingStage(Stage::Input)
        );
        assert_eq!(
            s.write(Stage::Processing, "a.md", "x").unwrap_err(),
            StoreError::MissingStage(Stage::Processing)
        );
    }

    #[test]
    fn init_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        assert_eq!(s.init_stages().unwrap().len(), 4);
        assert!(s.init_stages().unwrap().is_empty());
        assert!(tmp.path().join("output/notes").is_dir());
    }

    #[test]
    fn write_read_list() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        s.init_stages().unwrap();

        s.write(Stage::Output, "notes/2026-01-05-投资笔记.md", "# 笔记")
            .unwrap();
        s.write(Stage::Output, "2026-01-04-a.md", "a").unwrap();
        std::fs::write(tmp.path().join("output/README.md"), "readme").unwrap();
        std::fs::write(tmp.path().join("output/notes.txt"), "not markdown").unwrap();
        std::fs::write(tmp.path().join("output/.hidden.md"), "hidden").unwrap();

        assert_eq!(
            s.list(Stage::Output).unwrap(),
            vec!["2026-01-04-a.md", "notes/2026-01-05-投资笔记.md"]
        );
        assert_eq!(
            s.read(Stage::Output, "notes/2026-01-05-投资笔记.md").unwrap(),
            "# 笔记"
        );
        assert!(s.exists(Stage::Output, "2026-01-04-a.md").unwrap());
        assert!(!s.exists(Stage::Output, "missing.md").unwrap());
        assert!(s
            .read(Stage::Output, "missing.md")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn archived_files_leave_the_listing() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        s.init_stages().unwrap();

        s.write(Stage::Processing, "2025-12-29-新闻分析.md", "old").unwrap();
        s.write(Stage::Processing, "archive/2025-12-29-新闻分析.md", "old")
            .unwrap();
        s.remove(Stage::Processing, "2025-12-29-新闻分析.md").unwrap();

        assert!(s.list(Stage::Processing).unwrap().is_empty());
        assert!(tmp.path().join("processing/archive/2025-12-29-新闻分析.md").is_file());
        assert!(s
            .remove(Stage::Processing, "2025-12-29-新闻分析.md")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn rejects_escaping_keys() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        s.init_stages().unwrap();
        assert!(matches!(
            s.write(Stage::Input, "../processing/x.md", "x"),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
