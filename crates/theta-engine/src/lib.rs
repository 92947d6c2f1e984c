/*
 * lib.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Tag-based template engine with compile hooks.
//!
//! Templates mix literal text with `<% %>` code tags, `<%= %>` escaped
//! interpolation, and `<%~ %>` raw interpolation. Tag bodies use a small
//! JavaScript-shaped expression language; `include()` renders nested
//! templates through the engine's loader.
//!
//! Embedders customise compilation through [`CompileHooks`]: the raw
//! source of every unit passes through `on_raw_text`, and the scanned
//! node sequence through `on_node_sequence`, before anything evaluates.
//! Hooks can rewrite nodes, insert [`ScriptBinding`]s, and override
//! whitespace trimming and escaping per unit.
//!
//! ```
//! use theta_engine::Engine;
//!
//! let engine = Engine::default();
//! let out = engine
//!     .render("Hello <%= name %>", &serde_json::json!({"name": "Sam"}))
//!     .unwrap();
//! assert_eq!(out, "Hello Sam");
//! ```

mod ast;
mod engine;
mod error;
mod eval;
mod expr;
mod hooks;
mod options;
mod resolver;
mod scan;
mod value;

pub use ast::{Node, ScriptBinding, TagKind, TagNode};
pub use engine::Engine;
pub use error::{EngineError, EngineResult, HookError};
pub use hooks::{CompileHooks, CompileUnit, NoHooks};
pub use options::{EngineOptions, TrimConfig, TrimMode};
pub use resolver::{
    FileSystemLoader, MemoryLoader, NullLoader, TemplateLoader, resolve_template_path,
};
pub use value::{FunctionValue, MethodValue, Scope, Value};

/// Check that `src` parses as a single expression in the template
/// expression language, without evaluating it.
pub fn validate_expression(src: &str) -> EngineResult<()> {
    expr::parse_expression(src).map(|_| ())
}
