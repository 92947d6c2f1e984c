/*
 * resolver.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Template name resolution and source loading.
//!
//! This module provides the loader trait and implementations for reading
//! template and script-module sources from various places (filesystem,
//! memory, etc.). Names are resolved to paths first, so every cache and
//! error message works with the same resolved path.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Trait for loading template sources by resolved path.
///
/// Implementations are responsible for reading the source text at a path
/// produced by [`resolve_template_path`]. Failures carry the underlying
/// I/O error so callers can report the cause.
pub trait TemplateLoader {
    /// Read the source at `path`.
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Loader that reads from the filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader;

impl TemplateLoader for FileSystemLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Loader that never finds anything (for string-only rendering).
#[derive(Debug, Clone, Default)]
pub struct NullLoader;

impl TemplateLoader for NullLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no loader configured for {}", path.display()),
        ))
    }
}

/// Loader backed by an in-memory map.
///
/// Useful for testing and for scenarios where templates are bundled into
/// the application.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    /// Create a new empty memory loader.
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    /// Add a file to the loader.
    ///
    /// The path should match what name resolution will produce (e.g.
    /// "partial.theta" for the name "partial" under an empty root).
    pub fn add(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> &mut Self {
        self.files.insert(path.into(), source.into());
        self
    }

    /// Create a loader with the given files.
    pub fn with_files(
        files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (path, source) in files {
            loader.add(path, source);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not in the loader", path.display()),
            )
        })
    }
}

/// Resolve a template name to a path.
///
/// 1. The name is joined onto the views root
/// 2. If the name has no extension, the default extension is appended
/// 3. Names with an extension are used as-is
///
/// # Examples
///
/// ```ignore
/// // Root: /views, Name: "page" → /views/page.theta
/// // Root: /views, Name: "lib.js" → /views/lib.js
/// // Root: /views, Name: "inc/head" → /views/inc/head.theta
/// ```
pub fn resolve_template_path(root: &Path, name: &str, default_extension: &str) -> PathBuf {
    let mut path = root.join(name);
    if path.extension().is_none() {
        path.set_extension(default_extension);
    }
    path
}
