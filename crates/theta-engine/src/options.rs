/*
 * options.rs
 * Copyright (c) 2026 Theta contributors
 */

use std::path::PathBuf;

use serde_json::Value as JsonValue;

/// How much whitespace to strip from the text on one side of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Leave the text alone.
    Keep,
    /// Drop a single line terminator.
    Newline,
    /// Drop all adjacent whitespace.
    Slurp,
}

/// Whitespace trimming around tags: `before` applies to the text that ends
/// at a tag, `after` to the text that starts right after it. Sigils inside
/// a tag (`<%-`, `<%_`, `-%>`, `_%>`) override this per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimConfig {
    pub before: TrimMode,
    pub after: TrimMode,
}

impl TrimMode {
    fn from_json(value: &JsonValue) -> Option<TrimMode> {
        match value {
            JsonValue::Bool(false) => Some(TrimMode::Keep),
            JsonValue::Bool(true) => Some(TrimMode::Slurp),
            JsonValue::String(s) if s == "nl" => Some(TrimMode::Newline),
            JsonValue::String(s) if s == "slurp" => Some(TrimMode::Slurp),
            _ => None,
        }
    }
}

impl TrimConfig {
    pub const OFF: TrimConfig = TrimConfig {
        before: TrimMode::Keep,
        after: TrimMode::Keep,
    };

    /// Parse the configuration form of auto-trim: `false`, `true`, `"nl"`,
    /// `"slurp"`, or a two-element `[before, after]` array of those.
    /// Returns `None` for anything else so the caller can keep its default.
    pub fn from_config(value: &JsonValue) -> Option<TrimConfig> {
        match value {
            JsonValue::Array(items) if items.len() == 2 => {
                let before = TrimMode::from_json(&items[0])?;
                let after = TrimMode::from_json(&items[1])?;
                Some(TrimConfig { before, after })
            }
            other => {
                let mode = TrimMode::from_json(other)?;
                Some(TrimConfig {
                    before: mode,
                    after: mode,
                })
            }
        }
    }
}

/// Engine-wide settings. Compile hooks can override `auto_trim` and
/// `auto_escape` per unit.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Directory template names resolve against.
    pub views_root: PathBuf,
    /// Extension appended to template names that lack one.
    pub default_extension: String,
    /// Default whitespace trimming around tags.
    pub auto_trim: TrimConfig,
    /// Whether interpolation output is HTML-escaped.
    pub auto_escape: bool,
    /// Includes nested deeper than this abort the render.
    pub max_include_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            views_root: PathBuf::new(),
            default_extension: "theta".to_owned(),
            auto_trim: TrimConfig {
                before: TrimMode::Keep,
                after: TrimMode::Newline,
            },
            auto_escape: true,
            max_include_depth: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn trim_config_parses_scalar_forms() {
        assert_eq!(TrimConfig::from_config(&json!(false)), Some(TrimConfig::OFF));
        assert_eq!(
            TrimConfig::from_config(&json!("nl")),
            Some(TrimConfig {
                before: TrimMode::Newline,
                after: TrimMode::Newline,
            })
        );
        assert_eq!(
            TrimConfig::from_config(&json!(true)),
            Some(TrimConfig {
                before: TrimMode::Slurp,
                after: TrimMode::Slurp,
            })
        );
    }

    #[test]
    fn trim_config_parses_pair_form() {
        assert_eq!(
            TrimConfig::from_config(&json!([false, "slurp"])),
            Some(TrimConfig {
                before: TrimMode::Keep,
                after: TrimMode::Slurp,
            })
        );
    }

    #[test]
    fn trim_config_rejects_unknown_shapes() {
        assert_eq!(TrimConfig::from_config(&json!("everything")), None);
        assert_eq!(TrimConfig::from_config(&json!(3)), None);
        assert_eq!(TrimConfig::from_config(&json!(["nl"])), None);
        assert_eq!(TrimConfig::from_config(&json!(["nl", 7])), None);
    }
}
