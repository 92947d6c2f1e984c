/*
 * scan.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Template scanner.
//!
//! Splits a template into text runs and tags. Tags open with `<%` plus an
//! optional trim sigil (`-` for one newline, `_` for all whitespace) and an
//! optional flavor (`=` interpolate, `~` raw), and close with `%>`,
//! optionally preceded by a trim sigil. `<%%` escapes a literal `<%`.

use crate::ast::{Node, TagKind, TagNode};
use crate::error::{EngineResult, parse_error};
use crate::options::{TrimConfig, TrimMode};

enum Piece {
    Text(String),
    Tag {
        kind: TagKind,
        src: String,
        trim_before: Option<TrimMode>,
        trim_after: Option<TrimMode>,
    },
}

/// Scan a template into nodes, applying `trim` around every tag unless a
/// sigil overrides it. Empty text runs are dropped.
pub(crate) fn scan(src: &str, trim: TrimConfig) -> EngineResult<Vec<Node>> {
    let mut pieces = split(src)?;
    apply_trim(&mut pieces, trim);

    let mut nodes = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match piece {
            Piece::Text(text) => {
                if !text.is_empty() {
                    nodes.push(Node::Text(text));
                }
            }
            Piece::Tag { kind, src, .. } => nodes.push(Node::Tag(TagNode { kind, src })),
        }
    }
    Ok(nodes)
}

fn split(src: &str) -> EngineResult<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while let Some(offset) = src[pos..].find("<%") {
        let open = pos + offset;
        text.push_str(&src[pos..open]);

        // `<%%` is a literal `<%`
        if src[open + 2..].starts_with('%') {
            text.push_str("<%");
            pos = open + 3;
            continue;
        }

        let mut cursor = open + 2;
        let mut trim_before = None;
        match src[cursor..].chars().next() {
            Some('-') => {
                trim_before = Some(TrimMode::Newline);
                cursor += 1;
            }
            Some('_') => {
                trim_before = Some(TrimMode::Slurp);
                cursor += 1;
            }
            _ => {}
        }

        let Some(close_rel) = src[cursor..].find("%>") else {
            return Err(parse_error(format!("unclosed tag at byte {open}")));
        };
        let close = cursor + close_rel;
        let mut inner = &src[cursor..close];

        let mut trim_after = None;
        if let Some(stripped) = inner.strip_suffix('-') {
            trim_after = Some(TrimMode::Newline);
            inner = stripped;
        } else if let Some(stripped) = inner.strip_suffix('_') {
            trim_after = Some(TrimMode::Slurp);
            inner = stripped;
        }

        let flavored = inner.trim_start();
        let (kind, body) = if let Some(rest) = flavored.strip_prefix('=') {
            (TagKind::Interpolate, rest)
        } else if let Some(rest) = flavored.strip_prefix('~') {
            (TagKind::Raw, rest)
        } else {
            (TagKind::Code, flavored)
        };

        if !text.is_empty() {
            pieces.push(Piece::Text(std::mem::take(&mut text)));
        }
        pieces.push(Piece::Tag {
            kind,
            src: body.trim().to_owned(),
            trim_before,
            trim_after,
        });
        pos = close + 2;
    }

    text.push_str(&src[pos..]);
    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    Ok(pieces)
}

fn apply_trim(pieces: &mut [Piece], config: TrimConfig) {
    let mut trims = Vec::new();
    for (i, piece) in pieces.iter().enumerate() {
        if let Piece::Tag {
            trim_before,
            trim_after,
            ..
        } = piece
        {
            trims.push((
                i,
                trim_before.unwrap_or(config.before),
                trim_after.unwrap_or(config.after),
            ));
        }
    }
    for (i, before, after) in trims {
        if i > 0 {
            if let Piece::Text(prev) = &mut pieces[i - 1] {
                trim_text_end(prev, before);
            }
        }
        if let Some(Piece::Text(next)) = pieces.get_mut(i + 1) {
            trim_text_start(next, after);
        }
    }
}

fn trim_text_end(text: &mut String, mode: TrimMode) {
    match mode {
        TrimMode::Keep => {}
        TrimMode::Newline => {
            if text.ends_with("\r\n") {
                text.truncate(text.len() - 2);
            } else if text.ends_with('\n') || text.ends_with('\r') {
                text.truncate(text.len() - 1);
            }
        }
        TrimMode::Slurp => {
            text.truncate(text.trim_end().len());
        }
    }
}

fn trim_text_start(text: &mut String, mode: TrimMode) {
    match mode {
        TrimMode::Keep => {}
        TrimMode::Newline => {
            let stripped = text
                .strip_prefix("\r\n")
                .or_else(|| text.strip_prefix('\n'))
                .or_else(|| text.strip_prefix('\r'));
            if let Some(rest) = stripped {
                *text = rest.to_owned();
            }
        }
        TrimMode::Slurp => {
            let start = text.len() - text.trim_start().len();
            text.drain(..start);
        }
    }
}
