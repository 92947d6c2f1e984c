/*
 * model.rs
 * Copyright (c) 2026 Theta contributors
 */

//! The template configuration model and its layered merge.
//!
//! Configuration arrives in up to three layers: built-in defaults, workspace
//! settings supplied by the embedding editor, and the template's own front
//! matter. Later layers win field by field. A value of the wrong type for its
//! field never wins; it is dropped so the earlier layer shows through, and
//! header processing continues.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::settings::WorkspaceSettings;

/// Settings keys recognized by [`TemplateConfiguration::from_workspace`].
///
/// These are the camelCase spellings used both in workspace settings files
/// and in template headers.
pub mod keys {
    pub const IS_SNIPPET: &str = "isSnippet";
    pub const DEFAULT_SELECTION: &str = "defaultSelection";
    pub const FORMAT_ON_PASTE: &str = "formatOnPaste";
    pub const TEMPLATES_PATH: &str = "templatesPath";
    pub const AUTO_TRIM: &str = "autoTrim";
    pub const AUTO_ESCAPE: &str = "autoEscape";
    pub const IMPORT: &str = "import";
}

/// Selection granularity applied when a snippet template is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    /// No implicit selection.
    None,
    /// Select the current line.
    #[default]
    Line,
    /// Select the word under the cursor.
    Word,
    /// Select the whole document.
    Document,
}

impl SelectionKind {
    /// Parse the header spelling of a selection kind.
    ///
    /// Returns `None` for anything but the four canonical lowercase forms.
    pub fn from_config_str(s: &str) -> Option<SelectionKind> {
        match s {
            "none" => Some(SelectionKind::None),
            "line" => Some(SelectionKind::Line),
            "word" => Some(SelectionKind::Word),
            "document" => Some(SelectionKind::Document),
            _ => None,
        }
    }

    /// The spelling used in template headers and settings files.
    pub fn as_config_str(&self) -> &'static str {
        match self {
            SelectionKind::None => "none",
            SelectionKind::Line => "line",
            SelectionKind::Word => "word",
            SelectionKind::Document => "document",
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_config_str())
    }
}

/// Effective configuration for one template.
///
/// Field names mirror the camelCase spellings used in template headers, so a
/// well-formed header body deserializes straight into this struct. Merging is
/// deliberately not serde-driven: [`merged_with`](Self::merged_with) applies
/// each layer field by field so one mis-typed value drops out without
/// poisoning the rest of the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateConfiguration {
    /// Whether the template behaves as an editor snippet rather than a
    /// standalone document.
    pub is_snippet: bool,

    /// Selection granularity used when the template is applied as a snippet.
    pub default_selection: SelectionKind,

    /// Whether the editor should reformat the inserted text after rendering.
    pub format_on_paste: bool,

    /// Engine whitespace-trim setting, forwarded verbatim. Any JSON shape is
    /// accepted here; the engine validates it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_trim: Option<JsonValue>,

    /// Engine auto-escape setting, forwarded verbatim like `auto_trim`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_escape: Option<JsonValue>,

    /// Legacy import map: binding name to script module path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<JsonValue>,
}

impl Default for TemplateConfiguration {
    fn default() -> Self {
        TemplateConfiguration {
            is_snippet: false,
            default_selection: SelectionKind::Line,
            format_on_paste: false,
            auto_trim: None,
            auto_escape: None,
            import: None,
        }
    }
}

impl TemplateConfiguration {
    /// Build the editor-defaults layer: built-in defaults overlaid with any
    /// recognized workspace settings.
    ///
    /// Only the keys in [`keys`] are consulted; values go through the same
    /// per-field tolerance as [`merged_with`](Self::merged_with).
    pub fn from_workspace(settings: &dyn WorkspaceSettings) -> TemplateConfiguration {
        let mut overrides = serde_json::Map::new();
        for key in [keys::IS_SNIPPET, keys::DEFAULT_SELECTION, keys::FORMAT_ON_PASTE] {
            if let Some(value) = settings.get(key) {
                overrides.insert(key.to_owned(), value);
            }
        }
        TemplateConfiguration::default().merged_with(&JsonValue::Object(overrides))
    }

    /// Overlay a JSON object onto this configuration, field by field.
    ///
    /// Unknown keys are ignored. A value of the wrong type for its field is
    /// dropped and the receiver's value survives. `autoTrim`, `autoEscape`
    /// and `import` accept any shape because the engine, not this layer,
    /// gives them meaning. A non-object argument leaves the configuration
    /// unchanged.
    pub fn merged_with(&self, overrides: &JsonValue) -> TemplateConfiguration {
        let mut merged = self.clone();
        let Some(fields) = overrides.as_object() else {
            return merged;
        };

        if let Some(flag) = fields.get(keys::IS_SNIPPET).and_then(JsonValue::as_bool) {
            merged.is_snippet = flag;
        }
        if let Some(flag) = fields.get(keys::FORMAT_ON_PASTE).and_then(JsonValue::as_bool) {
            merged.format_on_paste = flag;
        }
        if let Some(name) = fields.get(keys::DEFAULT_SELECTION).and_then(JsonValue::as_str) {
            match SelectionKind::from_config_str(name) {
                Some(kind) => merged.default_selection = kind,
                None => {
                    tracing::warn!(kind = name, "unknown defaultSelection in template configuration");
                }
            }
        }
        if let Some(value) = fields.get(keys::AUTO_TRIM) {
            merged.auto_trim = Some(value.clone());
        }
        if let Some(value) = fields.get(keys::AUTO_ESCAPE) {
            merged.auto_escape = Some(value.clone());
        }
        if let Some(value) = fields.get(keys::IMPORT) {
            merged.import = Some(value.clone());
        }
        merged
    }

    /// The entries of the legacy `import` map, in insertion order.
    ///
    /// Yields nothing when `import` is absent or not an object. Values that
    /// are not string paths yield `None` so the caller can reject them with
    /// the binding name attached.
    pub fn import_entries(&self) -> Vec<(String, Option<String>)> {
        let Some(JsonValue::Object(map)) = &self.import else {
            return Vec::new();
        };
        map.iter()
            .map(|(name, value)| (name.clone(), value.as_str().map(str::to_owned)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn defaults() -> TemplateConfiguration {
        TemplateConfiguration::default()
    }

    // === Defaults ===

    #[test]
    fn built_in_defaults() {
        let config = defaults();
        assert!(!config.is_snippet);
        assert_eq!(config.default_selection, SelectionKind::Line);
        assert!(!config.format_on_paste);
        assert_eq!(config.auto_trim, None);
        assert_eq!(config.auto_escape, None);
        assert_eq!(config.import, None);
    }

    // === Selection kinds ===

    #[test]
    fn selection_kind_round_trip() {
        for kind in [
            SelectionKind::None,
            SelectionKind::Line,
            SelectionKind::Word,
            SelectionKind::Document,
        ] {
            assert_eq!(SelectionKind::from_config_str(kind.as_config_str()), Some(kind));
        }
    }

    #[test]
    fn selection_kind_rejects_unknown_and_cased_forms() {
        assert_eq!(SelectionKind::from_config_str("paragraph"), None);
        assert_eq!(SelectionKind::from_config_str("Line"), None);
        assert_eq!(SelectionKind::from_config_str(""), None);
    }

    // === Field-by-field merge ===

    #[test]
    fn merge_applies_well_typed_overrides() {
        let merged = defaults().merged_with(&json!({
            "isSnippet": true,
            "defaultSelection": "word",
            "formatOnPaste": true,
        }));
        assert!(merged.is_snippet);
        assert_eq!(merged.default_selection, SelectionKind::Word);
        assert!(merged.format_on_paste);
    }

    #[test]
    fn merge_drops_mis_typed_bool() {
        // A string where a bool belongs loses; the earlier layer survives.
        let base = defaults().merged_with(&json!({ "isSnippet": true }));
        let merged = base.merged_with(&json!({ "isSnippet": "yes" }));
        assert!(merged.is_snippet);
    }

    #[test]
    fn merge_drops_unknown_selection_string() {
        let base = defaults().merged_with(&json!({ "defaultSelection": "word" }));
        let merged = base.merged_with(&json!({ "defaultSelection": "paragraph" }));
        assert_eq!(merged.default_selection, SelectionKind::Word);
    }

    #[test]
    fn merge_drops_non_string_selection() {
        let merged = defaults().merged_with(&json!({ "defaultSelection": 3 }));
        assert_eq!(merged.default_selection, SelectionKind::Line);
    }

    #[test]
    fn merge_ignores_unknown_keys() {
        let merged = defaults().merged_with(&json!({ "colorScheme": "dark" }));
        assert_eq!(merged, defaults());
    }

    #[test]
    fn merge_ignores_non_object_overrides() {
        assert_eq!(defaults().merged_with(&json!("isSnippet")), defaults());
        assert_eq!(defaults().merged_with(&json!(null)), defaults());
        assert_eq!(defaults().merged_with(&json!([true])), defaults());
    }

    #[test]
    fn opaque_fields_accept_any_shape() {
        let merged = defaults().merged_with(&json!({
            "autoTrim": [false, "nl"],
            "autoEscape": 0,
            "import": { "util": "util.js" },
        }));
        assert_eq!(merged.auto_trim, Some(json!([false, "nl"])));
        assert_eq!(merged.auto_escape, Some(json!(0)));
        assert_eq!(merged.import, Some(json!({ "util": "util.js" })));
    }

    #[test]
    fn later_layer_wins_per_field() {
        let editor = defaults().merged_with(&json!({ "isSnippet": true, "formatOnPaste": true }));
        let merged = editor.merged_with(&json!({ "formatOnPaste": false }));
        // Untouched fields carry the earlier layer forward.
        assert!(merged.is_snippet);
        assert!(!merged.format_on_paste);
    }

    // === Workspace layer ===

    #[test]
    fn from_workspace_reads_known_keys() {
        let settings = crate::MemorySettings::new()
            .with_value(keys::IS_SNIPPET, true)
            .with_value(keys::DEFAULT_SELECTION, "document");
        let config = TemplateConfiguration::from_workspace(&settings);
        assert!(config.is_snippet);
        assert_eq!(config.default_selection, SelectionKind::Document);
        assert!(!config.format_on_paste);
    }

    #[test]
    fn from_workspace_tolerates_bad_values() {
        let settings = crate::MemorySettings::new()
            .with_value(keys::IS_SNIPPET, "true")
            .with_value(keys::FORMAT_ON_PASTE, 1);
        let config = TemplateConfiguration::from_workspace(&settings);
        assert_eq!(config, defaults());
    }

    // === Header deserialization ===

    #[test]
    fn header_body_deserializes_directly() {
        let config: TemplateConfiguration =
            serde_yaml::from_str("isSnippet: true\ndefaultSelection: word\n")
                .expect("header should parse");
        assert!(config.is_snippet);
        assert_eq!(config.default_selection, SelectionKind::Word);
    }

    // === Import map access ===

    #[test]
    fn import_entries_preserve_order_and_flag_non_strings() {
        let config = defaults().merged_with(&json!({
            "import": { "util": "lib/util.js", "bad": 7 },
        }));
        let entries = config.import_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("util".to_owned(), Some("lib/util.js".to_owned())));
        assert_eq!(entries[1], ("bad".to_owned(), None));
    }

    #[test]
    fn import_entries_empty_when_absent_or_not_object() {
        assert!(defaults().import_entries().is_empty());
        let config = defaults().merged_with(&json!({ "import": "nope" }));
        assert!(config.import_entries().is_empty());
    }
}
