/*
 * ast.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Node model for compiled templates.
//!
//! Scanning a template produces a flat sequence of [`Node`]s: literal text
//! runs and tags. Compile hooks may splice in [`Node::Binding`] entries;
//! the scanner itself never produces those.

/// Kind of a template tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<% ... %>`: evaluated for effect, output discarded.
    Code,
    /// `<%= ... %>`: evaluated and written out, escaped when auto-escape
    /// is on for the unit.
    Interpolate,
    /// `<%~ ... %>`: evaluated and written out verbatim.
    Raw,
}

/// One tag scanned out of a template, sigils and padding removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    pub kind: TagKind,
    pub src: String,
}

impl TagNode {
    pub fn new(kind: TagKind, src: impl Into<String>) -> TagNode {
        TagNode {
            kind,
            src: src.into(),
        }
    }
}

/// A named script inserted by a compile hook.
///
/// At render time the engine evaluates `source` once, in a scope isolated
/// from the render data, and defines the result under `name` in the
/// unit's scope. Bindings produce no output of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBinding {
    pub name: String,
    pub source: String,
}

impl ScriptBinding {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> ScriptBinding {
        ScriptBinding {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// A node in the compiled form of one template unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal output.
    Text(String),
    /// A template tag.
    Tag(TagNode),
    /// A hook-inserted script binding.
    Binding(ScriptBinding),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Node {
        Node::Text(text.into())
    }

    pub fn code(src: impl Into<String>) -> Node {
        Node::Tag(TagNode::new(TagKind::Code, src))
    }

    pub fn interpolate(src: impl Into<String>) -> Node {
        Node::Tag(TagNode::new(TagKind::Interpolate, src))
    }

    pub fn raw(src: impl Into<String>) -> Node {
        Node::Tag(TagNode::new(TagKind::Raw, src))
    }
}
