/*
 * rewriter.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Directive rewriting over scanned node sequences.
//!
//! Two directive forms are recognised inside code tags:
//!
//! - `@importJs "<path>" [as <identifier>]` anywhere in a unit. The path
//!   resolves the same way includes do, the module source is fetched
//!   through the session's [`ModuleCache`], pre-validated, and the node is
//!   replaced by a script binding named after the alias (or the file
//!   stem). One line break following the directive is trimmed so the
//!   directive line leaves no blank line behind.
//! - `@config(<json>)`, legacy, recognised only as the first node of a
//!   unit. The JSON object merges into the active configuration. The
//!   node is removed; its `import` map (post-merge) expands into script
//!   bindings at the same position.
//!
//! In config-only mode directives still parse and merge, but no module is
//! read or validated; matched nodes become empty text so node indices
//! stay stable for the caller.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use theta_config::TemplateConfiguration;
use theta_engine::{Engine, Node, ScriptBinding, TagKind};

use crate::error::{ThetaError, ThetaResult};
use crate::module_cache::ModuleCache;

/// Import directive: quoted path with same-quote escaping (`\"` inside a
/// double-quoted path, `\'` inside a single-quoted one), then an optional
/// `as <alias>`. The alias capture is deliberately loose so a malformed
/// alias is reported by name instead of silently not matching.
static IMPORT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^@importJs\s+(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')(?:\s+as\s+(.+))?$"#)
        .unwrap()
});

/// Legacy config directive: `@config(<json>)` with the body spanning any
/// number of lines.
static CONFIG_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^@config\s*\((.*)\)$").unwrap());

/// How a rewrite pass treats directives that touch the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Full render: modules are fetched, validated, and bound.
    Render,
    /// Configuration probe: directives merge configuration but no module
    /// is read; matched nodes become empty text to keep indices stable.
    ConfigOnly,
}

/// One import directive, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportDirective {
    path: String,
    alias: Option<String>,
}

/// Rewrites directive nodes in a unit's node sequence.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveRewriter {
    mode: RewriteMode,
}

impl DirectiveRewriter {
    pub fn new(mode: RewriteMode) -> DirectiveRewriter {
        DirectiveRewriter { mode }
    }

    pub fn mode(&self) -> RewriteMode {
        self.mode
    }

    /// Rewrite all directives in `nodes`, merging configuration changes
    /// into `config` and fetching modules through `cache`.
    ///
    /// The sequence is owned for the duration of the call; the returned
    /// sequence replaces it.
    pub fn rewrite(
        &self,
        mut nodes: Vec<Node>,
        engine: &Engine,
        cache: &mut ModuleCache,
        config: &mut TemplateConfiguration,
    ) -> ThetaResult<Vec<Node>> {
        self.apply_legacy_config(&mut nodes, engine, cache, config)?;

        let mut index = 0;
        while index < nodes.len() {
            let Some(directive) = import_directive_at(&nodes, index) else {
                index += 1;
                continue;
            };
            match self.mode {
                RewriteMode::ConfigOnly => {
                    // name problems should surface from a probe too
                    binding_name(&directive)?;
                    nodes[index] = Node::Text(String::new());
                }
                RewriteMode::Render => {
                    let name = binding_name(&directive)?;
                    let binding = load_binding(name, &directive.path, engine, cache)?;
                    nodes[index] = Node::Binding(binding);
                }
            }
            if let Some(next) = nodes.get_mut(index + 1) {
                trim_leading_newline(next);
            }
            index += 1;
        }
        Ok(nodes)
    }

    /// Handle a `@config(<json>)` directive in the first node.
    fn apply_legacy_config(
        &self,
        nodes: &mut Vec<Node>,
        engine: &Engine,
        cache: &mut ModuleCache,
        config: &mut TemplateConfiguration,
    ) -> ThetaResult<()> {
        let overrides = {
            let Some(Node::Tag(tag)) = nodes.first() else {
                return Ok(());
            };
            if tag.kind != TagKind::Code {
                return Ok(());
            }
            let Some(caps) = CONFIG_DIRECTIVE.captures(tag.src.trim()) else {
                return Ok(());
            };
            let body = caps.get(1).map_or("", |m| m.as_str());
            serde_json::from_str::<JsonValue>(body)
                .map_err(|source| ThetaError::InvalidConfigBlock { source })?
        };
        tracing::debug!("merging legacy @config block");
        *config = config.merged_with(&overrides);

        // the directive line must not leave a blank line behind
        let follower = match self.mode {
            RewriteMode::ConfigOnly => {
                nodes[0] = Node::Text(String::new());
                1
            }
            RewriteMode::Render => {
                let mut bindings = Vec::new();
                for (name, path) in config.import_entries() {
                    let Some(path) = path else {
                        return Err(ThetaError::InvalidImportPath { name });
                    };
                    bindings.push(Node::Binding(load_binding(
                        valid_binding_name(name)?,
                        &path,
                        engine,
                        cache,
                    )?));
                }
                let follower = bindings.len();
                nodes.splice(0..1, bindings);
                follower
            }
        };
        if let Some(next) = nodes.get_mut(follower) {
            trim_leading_newline(next);
        }
        Ok(())
    }
}

fn import_directive_at(nodes: &[Node], index: usize) -> Option<ImportDirective> {
    let Node::Tag(tag) = &nodes[index] else {
        return None;
    };
    // only code tags carry directives; interpolation reaches the evaluator
    if tag.kind != TagKind::Code {
        return None;
    }
    let caps = IMPORT_DIRECTIVE.captures(tag.src.trim())?;
    let (raw, quote) = match caps.get(1) {
        Some(m) => (m.as_str(), '"'),
        None => (caps.get(2).map_or("", |m| m.as_str()), '\''),
    };
    Some(ImportDirective {
        path: unescape_path(raw, quote),
        alias: caps.get(3).map(|m| m.as_str().trim().to_owned()),
    })
}

fn unescape_path(raw: &str, quote: char) -> String {
    raw.replace(&format!("\\{quote}"), &quote.to_string())
}

/// Binding name for an import: the alias when given, else the file stem.
fn binding_name(directive: &ImportDirective) -> ThetaResult<String> {
    let name = match &directive.alias {
        Some(alias) => alias.clone(),
        None => Path::new(&directive.path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    valid_binding_name(name)
}

fn valid_binding_name(name: String) -> ThetaResult<String> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(ThetaError::InvalidBindingName { name })
    }
}

/// Resolve, fetch, and pre-validate a script module, producing the
/// binding the evaluator will execute.
fn load_binding(
    name: String,
    path_text: &str,
    engine: &Engine,
    cache: &mut ModuleCache,
) -> ThetaResult<ScriptBinding> {
    let path = engine.resolve_path(path_text);
    let source = cache.fetch(&path, engine.loader())?;
    theta_engine::validate_expression(source).map_err(|source| ThetaError::ScriptError {
        path: path.clone(),
        source,
    })?;
    Ok(ScriptBinding::new(name, source))
}

/// Drop one line terminator from the start of the node that follows a
/// directive, whether it is plain text or a tag. Bindings are never
/// touched.
fn trim_leading_newline(node: &mut Node) {
    let text = match node {
        Node::Text(text) => text,
        Node::Tag(tag) => &mut tag.src,
        Node::Binding(_) => return,
    };
    let stripped = text
        .strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .or_else(|| text.strip_prefix('\r'))
        .map(str::to_owned);
    if let Some(rest) = stripped {
        *text = rest;
    }
}
