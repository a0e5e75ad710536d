//! Stage storage abstraction.
//!
//! The three pipeline folders are modelled as a keyed store addressed by
//! `(stage, key)`, where `key` is a `/`-separated path relative to the stage
//! folder (`2026-01-05-新闻分析.md`, `notes/2026-01-05-投资笔记.md`).
//! Skills never touch the filesystem directly; they receive a
//! [`ContentStore`] and, per workflow, a [`ScopedStore`] that only admits the
//! stages the workflow declares.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`read`](ContentStore::read) | Full text of one entry |
//! | [`write`](ContentStore::write) | Create or replace one entry |
//! | [`list`](ContentStore::list) | Sorted keys in a stage |
//! | [`exists`](ContentStore::exists) | Whether a key is present |
//! | [`remove`](ContentStore::remove) | Delete one entry |

pub mod memory;

use std::fmt;

use serde::Serialize;

use crate::error::StoreError;

/// One of the three pipeline folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Processing,
    Output,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Input, Stage::Processing, Stage::Output];

    /// Folder name under the stage root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Processing => "processing",
            Stage::Output => "output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Keyed access to the stage folders.
///
/// `list` returns keys in ascending byte order and never includes
/// `README.md` files or anything under `archive/`. Reading or removing a
/// missing key is [`StoreError::NotFound`];
/// touching a stage whose folder does not exist is
/// [`StoreError::MissingStage`].
pub trait ContentStore: Send + Sync {
    fn read(&self, stage: Stage, key: &str) -> Result<String, StoreError>;

    fn write(&self, stage: Stage, key: &str, content: &str) -> Result<(), StoreError>;

    fn list(&self, stage: Stage) -> Result<Vec<String>, StoreError>;

    fn exists(&self, stage: Stage, key: &str) -> Result<bool, StoreError>;

    fn remove(&self, stage: Stage, key: &str) -> Result<(), StoreError>;
}

impl<T: ContentStore + ?Sized> ContentStore for &T {
    fn read(&self, stage: Stage, key: &str) -> Result<String, StoreError> {
        (**self).read(stage, key)
    }

    fn write(&self, stage: Stage, key: &str, content: &str) -> Result<(), StoreError> {
        (**self).write(stage, key, content)
    }

    fn list(&self, stage: Stage) -> Result<Vec<String>, StoreError> {
        (**self).list(stage)
    }

    fn exists(&self, stage: Stage, key: &str) -> Result<bool, StoreError> {
        (**self).exists(stage, key)
    }

    fn remove(&self, stage: Stage, key: &str) -> Result<(), StoreError> {
        (**self).remove(stage, key)
    }
}

/// Reject keys that are empty, absolute, or climb out of the stage folder.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// A view over a store that only admits a workflow's declared stages.
///
/// Reads (`read`, `list`, `exists`) are allowed on `reads` and on the
/// write stage; writes only on `writes`.
pub struct ScopedStore<'a, S: ContentStore + ?Sized> {
    inner: &'a S,
    workflow: &'static str,
    reads: &'static [Stage],
    writes: Stage,
}

impl<'a, S: ContentStore + ?Sized> ScopedStore<'a, S> {
    pub fn new(
        inner: &'a S,
        workflow: &'static str,
        reads: &'static [Stage],
        writes: Stage,
    ) -> Self {
        Self {
            inner,
            workflow,
            reads,
            writes,
        }
    }

    fn check_read(&self, stage: Stage) -> Result<(), StoreError> {
        if stage == self.writes || self.reads.contains(&stage) {
            Ok(())
        } else {
            Err(StoreError::StageViolation {
                workflow: self.workflow,
                access: "read",
                stage,
            })
        }
    }

    fn check_write(&self, stage: Stage) -> Result<(), StoreError> {
        if stage == self.writes {
            Ok(())
        } else {
            Err(StoreError::StageViolation {
                workflow: self.workflow,
                access: "write",
                stage,
            })
        }
    }
}

impl<S: ContentStore + ?Sized> ContentStore for ScopedStore<'_, S> {
    fn read(&self, stage: Stage, key: &str) -> Result<String, StoreError> {
        self.check_read(stage)?;
        self.inner.read(stage, key)
    }

    fn write(&self, stage: Stage, key: &str, content: &str) -> Result<(), StoreError> {
        self.check_write(stage)?;
        self.inner.write(stage, key, content)
    }

    fn list(&self, stage: Stage) -> Result<Vec<String>, StoreError> {
        self.check_read(stage)?;
        self.inner.list(stage)
    }

    fn exists(&self, stage: Stage, key: &str) -> Result<bool, StoreError> {
        self.check_read(stage)?;
        self.inner.exists(stage, key)
    }

    fn remove(&self, stage: Stage, key: &str) -> Result<(), StoreError> {
        self.check_write(stage)?;
        self.inner.remove(stage, key)
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn key_validation() {
        assert!(validate_key("2026-01-05-a.md").is_ok());
        assert!(validate_key("notes/2026-01-05-投资笔记.md").is_ok());
        for bad in ["", "/abs.md", "../up.md", "a//b.md", "notes/./x.md", "a\\b.md"] {
            assert!(validate_key(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn scoped_store_rejects_undeclared_stages() {
        let store = MemoryStore::with_stages();
        store.write(Stage::Input, "2026-01-05-a.md", "x").unwrap();
        let scoped = ScopedStore::new(
            &store,
            "generate-weekly-report",
            &[Stage::Processing],
            Stage::Processing,
        );

        let err = scoped.read(Stage::Input, "2026-01-05-a.md").unwrap_err();
        assert!(matches!(
            err,
            StoreError::StageViolation { access: "read", stage: Stage::Input, .. }
        ));
        assert!(scoped.list(Stage::Input).is_err());
        assert!(scoped.write(Stage::Output, "x.md", "x").is_err());
        assert!(scoped.write(Stage::Processing, "x.md", "x").is_ok());
        assert_eq!(scoped.list(Stage::Processing).unwrap(), vec!["x.md"]);
        assert!(scoped.remove(Stage::Input, "2026-01-05-a.md").is_err());
        assert!(store.exists(Stage::Input, "2026-01-05-a.md").unwrap());
    }

    #[test]
    fn write_stage_is_readable() {
        let store = MemoryStore::with_stages();
        let scoped = ScopedStore::new(
            &store,
            "extract-insights",
            &[Stage::Processing],
            Stage::Output,
        );
        assert!(!scoped.exists(Stage::Output, "notes/x.md").unwrap());
        assert!(scoped.write(Stage::Processing, "x.md", "x").is_err());
    }
}
