/*
 * error.rs
 * Copyright (c) 2026 Theta contributors
 */

use std::path::PathBuf;

use theta_engine::EngineError;
use thiserror::Error;

/// Errors raised while extracting configuration or rewriting directives.
#[derive(Debug, Error)]
pub enum ThetaError {
    /// A front matter header was opened but never closed.
    #[error("front matter header is not terminated (missing `***/%>`)")]
    UnterminatedHeader,

    /// The header body is not a valid YAML/JSON mapping.
    #[error("invalid front matter header: {source}")]
    InvalidHeader {
        #[source]
        source: serde_yaml::Error,
    },

    /// A legacy `@config(...)` block carries malformed JSON.
    #[error("invalid @config block: {source}")]
    InvalidConfigBlock {
        #[source]
        source: serde_json::Error,
    },

    /// An import alias (or derived file stem) is not a usable identifier.
    #[error("`{name}` is not a valid import binding name")]
    InvalidBindingName { name: String },

    /// A legacy import map entry maps a binding to something that is not a
    /// path string.
    #[error("import `{name}` must map to a script path")]
    InvalidImportPath { name: String },

    /// An imported script module failed pre-validation.
    #[error("invalid script module {}: {source}", .path.display())]
    ScriptError {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    /// A referenced file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template engine itself failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Coarse classification callers use to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The template author must fix the template, header, or script.
    Authoring,
    /// The environment failed: a missing or unreadable file.
    Resource,
}

impl ThetaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ThetaError::Resource { .. } => ErrorKind::Resource,
            ThetaError::Engine(EngineError::Load { .. }) => ErrorKind::Resource,
            _ => ErrorKind::Authoring,
        }
    }
}

pub type ThetaResult<T> = std::result::Result<T, ThetaError>;
