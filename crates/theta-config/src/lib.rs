//! Template configuration model for Theta.
//!
//! Copyright (c) 2026 Theta contributors
//!
//! This crate provides:
//! - The per-template configuration model ([`TemplateConfiguration`])
//! - A layered, type-tolerant merge (defaults, then workspace settings, then
//!   the template's own front matter)
//! - Workspace settings sources ([`WorkspaceSettings`] and its in-memory and
//!   YAML-file implementations)
//!
//! Merging never fails: a value of the wrong type for its field is dropped
//! and the previous layer's value survives, so a single bad header line does
//! not take the whole template down.

mod model;
mod settings;

pub use model::{SelectionKind, TemplateConfiguration, keys};
pub use settings::{
    FileSettings, MemorySettings, SettingsError, WorkspaceSettings, templates_path,
};
