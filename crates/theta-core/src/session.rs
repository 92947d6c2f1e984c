/*
 * session.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Render sessions.
//!
//! A [`ReaderSession`] ties one engine, one module cache, and one
//! configuration lineage together. It registers the front matter parser
//! and the directive rewriter as compile hooks, so a plain engine render
//! picks up headers and directives without the engine knowing about
//! either. A session can be reused for any number of renders; the active
//! configuration is rebuilt from the session's base layers at the start
//! of every operation, so one template's header never bleeds into the
//! next render.

use std::path::PathBuf;

use serde_json::Value as JsonValue;
use theta_config::{TemplateConfiguration, WorkspaceSettings, keys};
use theta_engine::{
    CompileHooks, CompileUnit, Engine, EngineError, EngineOptions, FileSystemLoader, HookError,
    Node, TemplateLoader, TrimConfig,
};

use crate::error::{ThetaError, ThetaResult};
use crate::front_matter;
use crate::module_cache::ModuleCache;
use crate::rewriter::{DirectiveRewriter, RewriteMode};

/// What a full render hands back: the output text plus the configuration
/// that was in effect for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub output: String,
    pub config: TemplateConfiguration,
}

/// Per-render state shared between the session and its hooks.
#[derive(Debug)]
struct SessionState {
    /// The configuration the current operation has accumulated so far.
    config: TemplateConfiguration,
    /// Set once the first unit of the current render has been seen; gates
    /// front matter application so includes cannot overwrite the render's
    /// configuration.
    root_processed: bool,
    /// Script module sources, session-lived.
    cache: ModuleCache,
}

/// One configuration lineage over one engine.
pub struct ReaderSession {
    engine: Engine,
    /// Built-in defaults overlaid with the workspace layer. Every
    /// operation starts from this.
    base: TemplateConfiguration,
    state: SessionState,
}

impl ReaderSession {
    /// Session over a caller-built engine.
    ///
    /// Front matter controls trimming and escaping per template, so the
    /// engine handed in here usually has both disabled as its baseline;
    /// [`from_root`](Self::from_root) builds exactly that.
    pub fn new(engine: Engine) -> ReaderSession {
        let base = TemplateConfiguration::default();
        ReaderSession {
            engine,
            state: SessionState {
                config: base.clone(),
                root_processed: false,
                cache: ModuleCache::new(),
            },
            base,
        }
    }

    /// Filesystem-backed session rooted at `root`, with trimming and
    /// escaping off until a template's own configuration enables them.
    pub fn from_root(root: impl Into<PathBuf>) -> ReaderSession {
        ReaderSession::with_loader(root, Box::new(FileSystemLoader))
    }

    /// Like [`from_root`](Self::from_root) with a custom loader.
    pub fn with_loader(root: impl Into<PathBuf>, loader: Box<dyn TemplateLoader>) -> ReaderSession {
        let options = EngineOptions {
            views_root: root.into(),
            auto_trim: TrimConfig::OFF,
            auto_escape: false,
            ..EngineOptions::default()
        };
        ReaderSession::new(Engine::new(options, loader))
    }

    /// Overlay workspace settings onto the session's base configuration.
    pub fn with_workspace(mut self, settings: &dyn WorkspaceSettings) -> ReaderSession {
        self.base = TemplateConfiguration::from_workspace(settings);
        self.state.config = self.base.clone();
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The configuration in effect after the most recent operation.
    pub fn config(&self) -> &TemplateConfiguration {
        &self.state.config
    }

    /// Probe a template for its effective configuration without rendering.
    ///
    /// Front matter and directives contribute configuration exactly as in
    /// a render, but no tag evaluates, no output is produced, and no
    /// script module is read.
    pub fn read_config(&mut self, name: &str) -> ThetaResult<TemplateConfiguration> {
        tracing::debug!(template = name, "probing template configuration");
        self.reset();
        let engine = &self.engine;
        let mut hooks = SessionHooks::new(engine, &mut self.state, RewriteMode::ConfigOnly);
        engine.compile_file(name, &mut hooks).map_err(from_engine)?;
        Ok(self.state.config.clone())
    }

    /// Probe an in-memory template, as [`read_config`](Self::read_config).
    pub fn read_config_string(&mut self, source: &str) -> ThetaResult<TemplateConfiguration> {
        self.reset();
        let engine = &self.engine;
        let mut hooks = SessionHooks::new(engine, &mut self.state, RewriteMode::ConfigOnly);
        engine
            .compile_string(source, &mut hooks)
            .map_err(from_engine)?;
        Ok(self.state.config.clone())
    }

    /// Render a named template with `data` as the root scope.
    pub fn render(&mut self, name: &str, data: &JsonValue) -> ThetaResult<RenderOutcome> {
        tracing::debug!(template = name, "rendering template");
        self.reset();
        let output = {
            let engine = &self.engine;
            let mut hooks = SessionHooks::new(engine, &mut self.state, RewriteMode::Render);
            engine
                .render_file(name, data, &mut hooks)
                .map_err(from_engine)?
        };
        Ok(RenderOutcome {
            output,
            config: self.state.config.clone(),
        })
    }

    /// Render an in-memory template. Includes still resolve through the
    /// engine's loader.
    pub fn render_string(&mut self, source: &str, data: &JsonValue) -> ThetaResult<RenderOutcome> {
        self.reset();
        let output = {
            let engine = &self.engine;
            let mut hooks = SessionHooks::new(engine, &mut self.state, RewriteMode::Render);
            engine
                .render_string(source, data, &mut hooks)
                .map_err(from_engine)?
        };
        Ok(RenderOutcome {
            output,
            config: self.state.config.clone(),
        })
    }

    /// Per-operation state reset. The module cache survives; the active
    /// configuration and the root flag do not.
    fn reset(&mut self) {
        self.state.config = self.base.clone();
        self.state.root_processed = false;
    }
}

/// The compile hooks one session operation installs into the engine.
struct SessionHooks<'a> {
    engine: &'a Engine,
    state: &'a mut SessionState,
    rewriter: DirectiveRewriter,
}

impl<'a> SessionHooks<'a> {
    fn new(engine: &'a Engine, state: &'a mut SessionState, mode: RewriteMode) -> SessionHooks<'a> {
        SessionHooks {
            engine,
            state,
            rewriter: DirectiveRewriter::new(mode),
        }
    }
}

impl CompileHooks for SessionHooks<'_> {
    fn on_raw_text(&mut self, text: String, unit: &mut CompileUnit) -> Result<String, HookError> {
        let front = front_matter::extract(&text).map_err(hook_err)?;

        let first_unit = !self.state.root_processed;
        self.state.root_processed = true;

        let remainder = match front {
            Some(front) => {
                if first_unit {
                    self.state.config = self.state.config.merged_with(&front.overrides);
                } else {
                    // an include's header only tunes that unit
                    let fields = front.overrides.as_object();
                    apply_unit_overrides(
                        unit,
                        fields.and_then(|f| f.get(keys::AUTO_TRIM)),
                        fields.and_then(|f| f.get(keys::AUTO_ESCAPE)),
                    );
                }
                text[front.body_start..].to_owned()
            }
            None => text,
        };

        if first_unit {
            apply_unit_overrides(
                unit,
                self.state.config.auto_trim.as_ref(),
                self.state.config.auto_escape.as_ref(),
            );
        }
        Ok(remainder)
    }

    fn on_node_sequence(
        &mut self,
        nodes: Vec<Node>,
        _unit: &mut CompileUnit,
    ) -> Result<Vec<Node>, HookError> {
        self.rewriter
            .rewrite(nodes, self.engine, &mut self.state.cache, &mut self.state.config)
            .map_err(hook_err)
    }
}

/// Push configured trim/escape values into a unit's engine settings.
/// Shapes the engine does not recognise keep the engine's default.
fn apply_unit_overrides(
    unit: &mut CompileUnit,
    auto_trim: Option<&JsonValue>,
    auto_escape: Option<&JsonValue>,
) {
    if let Some(trim) = auto_trim.and_then(TrimConfig::from_config) {
        unit.auto_trim = Some(trim);
    }
    if let Some(flag) = auto_escape.and_then(JsonValue::as_bool) {
        unit.auto_escape = Some(flag);
    }
}

fn hook_err(err: ThetaError) -> HookError {
    Box::new(err)
}

/// Recover the session's own errors from the engine's hook wrapper.
fn from_engine(err: EngineError) -> ThetaError {
    match err {
        EngineError::Hook(cause) => match cause.downcast::<ThetaError>() {
            Ok(theta) => *theta,
            Err(cause) => ThetaError::Engine(EngineError::Hook(cause)),
        },
        other => ThetaError::Engine(other),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use theta_config::{MemorySettings, SelectionKind};
    use theta_engine::MemoryLoader;

    use super::*;

    fn session_with(files: &[(&str, &str)]) -> ReaderSession {
        ReaderSession::with_loader(
            "",
            Box::new(MemoryLoader::with_files(files.iter().copied())),
        )
    }

    // === Front matter application ===

    #[test]
    fn header_merges_into_the_render_configuration() {
        let mut session = session_with(&[]);
        let outcome = session
            .render_string(
                "<%/*** Theta\nisSnippet: true\n***/%>Hello <%= name %>",
                &json!({"name": "Sam"}),
            )
            .unwrap();
        assert_eq!(outcome.output, "Hello Sam");
        assert!(outcome.config.is_snippet);
    }

    #[test]
    fn include_headers_do_not_touch_the_configuration() {
        let mut session = session_with(&[(
            "partial.theta",
            "<%/*** Theta\nisSnippet: true\n***/%>from include",
        )]);
        let outcome = session
            .render_string("<%~ include('partial') %>", &json!({}))
            .unwrap();
        assert_eq!(outcome.output, "from include");
        assert!(!outcome.config.is_snippet);
    }

    #[test]
    fn include_headers_tune_their_own_escaping() {
        let mut session = session_with(&[(
            "loud.theta",
            "<%/*** Theta\nautoEscape: true\n***/%><%= html %>",
        )]);
        // root stays raw, the include escapes
        let outcome = session
            .render_string(
                "<%= html %>|<%~ include('loud', {html: html}) %>",
                &json!({"html": "<b>"}),
            )
            .unwrap();
        assert_eq!(outcome.output, "<b>|&lt;b&gt;");
    }

    #[test]
    fn header_auto_trim_applies_to_the_root_unit() {
        let mut session = session_with(&[]);
        let outcome = session
            .render_string(
                "<%/*** Theta\nautoTrim: [false, \"nl\"]\n***/%>\na<% 0 %>\nb",
                &json!({}),
            )
            .unwrap();
        // the newline after the code tag is trimmed, the one before is not
        assert_eq!(outcome.output, "\nab");
    }

    // === Layering ===

    #[test]
    fn workspace_layer_sits_under_front_matter() {
        let settings = MemorySettings::new()
            .with_value(keys::FORMAT_ON_PASTE, true)
            .with_value(keys::DEFAULT_SELECTION, "word");
        let mut session = session_with(&[]).with_workspace(&settings);
        let outcome = session
            .render_string(
                "<%/*** Theta\ndefaultSelection: document\n***/%>x",
                &json!({}),
            )
            .unwrap();
        assert_eq!(outcome.output, "x");
        // header wins where it speaks, workspace shows through elsewhere
        assert_eq!(outcome.config.default_selection, SelectionKind::Document);
        assert!(outcome.config.format_on_paste);
    }

    // === Per-render reset ===

    #[test]
    fn configuration_never_leaks_between_renders() {
        let mut session = session_with(&[]);
        let first = session
            .render_string("<%/*** Theta\nisSnippet: true\n***/%>a", &json!({}))
            .unwrap();
        assert!(first.config.is_snippet);
        let second = session.render_string("b", &json!({})).unwrap();
        assert!(!second.config.is_snippet);
        assert_eq!(second.config, TemplateConfiguration::default());
    }

    #[test]
    fn module_cache_survives_across_renders() {
        let mut session = session_with(&[("lib.js", "{n: 1}")]);
        session
            .render_string("<% @importJs \"lib.js\" %><%= lib.n %>", &json!({}))
            .unwrap();
        session
            .render_string("<% @importJs \"lib.js\" %><%= lib.n %>", &json!({}))
            .unwrap();
        assert_eq!(session.state.cache.len(), 1);
    }

    // === Configuration probes ===

    #[test]
    fn probe_reports_configuration_without_rendering() {
        let mut session = session_with(&[]);
        // rendering this would fail on the member access
        let config = session
            .read_config_string("<%/*** Theta\nisSnippet: true\n***/%><%= boom.x %>")
            .unwrap();
        assert!(config.is_snippet);
    }

    #[test]
    fn probe_reads_no_script_modules() {
        let mut session = session_with(&[]);
        let config = session
            .read_config_string("<% @config({\"formatOnPaste\": true}) %><% @importJs \"gone.js\" %>")
            .unwrap();
        assert!(config.format_on_paste);
        assert!(session.state.cache.is_empty());
    }

    // === Error flow ===

    #[test]
    fn header_errors_cross_the_engine_boundary_intact() {
        let mut session = session_with(&[]);
        let err = session
            .render_string("<%/*** Theta never closed", &json!({}))
            .unwrap_err();
        assert!(matches!(err, ThetaError::UnterminatedHeader));
        let err = session
            .read_config_string("<%/*** Theta never closed")
            .unwrap_err();
        assert!(matches!(err, ThetaError::UnterminatedHeader));
    }

    #[test]
    fn missing_template_is_an_engine_load_error() {
        let mut session = session_with(&[]);
        let err = session.render("absent", &json!({})).unwrap_err();
        assert!(matches!(
            err,
            ThetaError::Engine(EngineError::Load { .. })
        ));
        assert_eq!(err.kind(), crate::ErrorKind::Resource);
    }

    // === Directives end to end ===

    #[test]
    fn import_directive_binds_a_module() {
        let mut session = session_with(&[("lib.js", "{greet: n => 'hi ' + n}")]);
        let outcome = session
            .render_string(
                "<% @importJs \"lib.js\" as lib %>\n<%= lib.greet(name) %>",
                &json!({"name": "Kay"}),
            )
            .unwrap();
        assert_eq!(outcome.output, "hi Kay");
    }

    #[test]
    fn legacy_config_merges_and_expands_imports() {
        let mut session = session_with(&[("lib.js", "{greet: n => 'hi ' + n}")]);
        let outcome = session
            .render_string(
                "<% @config({\"isSnippet\": true, \"import\": {\"lib\": \"lib.js\"}}) %><%= lib.greet('Ada') %>",
                &json!({}),
            )
            .unwrap();
        assert_eq!(outcome.output, "hi Ada");
        assert!(outcome.config.is_snippet);
    }

    #[test]
    fn legacy_config_line_leaves_no_blank_line() {
        let mut session = session_with(&[]);
        let outcome = session
            .render_string("<% @config({\"isSnippet\": true}) %>\nbody", &json!({}))
            .unwrap();
        assert_eq!(outcome.output, "body");
        assert!(outcome.config.is_snippet);
    }
}
