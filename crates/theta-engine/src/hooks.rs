/*
 * hooks.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Compile-time extension points.
//!
//! The engine calls [`CompileHooks::on_raw_text`] with a unit's source
//! before scanning it, and [`CompileHooks::on_node_sequence`] with the
//! scanned nodes before evaluation. Both run for the root template and for
//! every include, so hooks see each unit exactly once per render.

use std::path::PathBuf;

use crate::ast::Node;
use crate::error::HookError;
use crate::options::TrimConfig;

/// Identity and per-unit settings of one template compilation.
///
/// Hooks may adjust the override fields; overrides apply to that unit
/// only. `auto_trim` takes effect only when set from `on_raw_text`, since
/// scanning happens between the two hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// Resolved path of the unit, when it came from the loader.
    pub path: Option<PathBuf>,
    /// True for the root template of a render, false for includes.
    pub is_root: bool,
    /// Whitespace-trim override for this unit.
    pub auto_trim: Option<TrimConfig>,
    /// Escape override for this unit.
    pub auto_escape: Option<bool>,
}

impl CompileUnit {
    pub fn root() -> CompileUnit {
        CompileUnit {
            path: None,
            is_root: true,
            auto_trim: None,
            auto_escape: None,
        }
    }

    pub fn root_at(path: PathBuf) -> CompileUnit {
        CompileUnit {
            path: Some(path),
            ..CompileUnit::root()
        }
    }

    pub fn include_at(path: PathBuf) -> CompileUnit {
        CompileUnit {
            path: Some(path),
            is_root: false,
            auto_trim: None,
            auto_escape: None,
        }
    }
}

/// Hooks into template compilation.
///
/// The node sequence is passed by value; the returned sequence replaces
/// it. An error from either hook aborts the render and surfaces unchanged
/// through [`EngineError::Hook`](crate::EngineError::Hook).
pub trait CompileHooks {
    /// Called with the raw source of a unit before scanning.
    fn on_raw_text(&mut self, text: String, unit: &mut CompileUnit) -> Result<String, HookError> {
        let _ = unit;
        Ok(text)
    }

    /// Called with the scanned nodes of a unit before evaluation.
    fn on_node_sequence(
        &mut self,
        nodes: Vec<Node>,
        unit: &mut CompileUnit,
    ) -> Result<Vec<Node>, HookError> {
        let _ = unit;
        Ok(nodes)
    }
}

/// Hooks that change nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl CompileHooks for NoHooks {}
