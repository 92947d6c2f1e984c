/*
 * module_cache.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Session-scoped cache of script module sources.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use theta_engine::TemplateLoader;

use crate::error::{ThetaError, ThetaResult};

/// Raw module content keyed by resolved path.
///
/// Owned by one [`ReaderSession`](crate::ReaderSession): entries live for
/// the whole session and are never evicted, so repeated imports of the
/// same resolved path cost one read. A new session starts empty.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: HashMap<PathBuf, String>,
}

impl ModuleCache {
    pub fn new() -> ModuleCache {
        ModuleCache {
            entries: HashMap::new(),
        }
    }

    /// Content of the module at `path`, reading through `loader` on first
    /// use.
    pub fn fetch(&mut self, path: &Path, loader: &dyn TemplateLoader) -> ThetaResult<&str> {
        match self.entries.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_str()),
            Entry::Vacant(slot) => {
                tracing::debug!(path = %path.display(), "reading script module into cache");
                let content = loader.load(path).map_err(|source| ThetaError::Resource {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(slot.insert(content).as_str())
            }
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
