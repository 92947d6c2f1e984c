/*
 * error.rs
 * Copyright (c) 2026 Theta contributors
 */

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error a compile hook returns to abort a render. The engine wraps
/// it in [`EngineError::Hook`] without flattening, so callers can downcast
/// back to their own error type.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while compiling or rendering a template.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Template or expression syntax the scanner or parser cannot accept.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A tag expression or script failed to evaluate.
    #[error("Evaluation error: {message}")]
    Eval { message: String },

    /// A compile hook rejected the unit.
    #[error("{0}")]
    Hook(#[source] HookError),

    /// A template could not be read through the loader.
    #[error("Failed to load template {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

pub(crate) fn parse_error(message: impl Into<String>) -> EngineError {
    EngineError::Parse {
        message: message.into(),
    }
}

pub(crate) fn eval_error(message: impl Into<String>) -> EngineError {
    EngineError::Eval {
        message: message.into(),
    }
}
