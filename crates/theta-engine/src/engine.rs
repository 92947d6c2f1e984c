/*
 * engine.rs
 * Copyright (c) 2026 Theta contributors
 */

//! The engine ties resolution, scanning, hooks, and evaluation together.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::ast::Node;
use crate::error::{EngineError, EngineResult};
use crate::eval::{self, EvalEnv};
use crate::hooks::{CompileHooks, CompileUnit, NoHooks};
use crate::options::EngineOptions;
use crate::resolver::{self, FileSystemLoader, NullLoader, TemplateLoader};
use crate::scan;
use crate::value::{Scope, Value};

pub struct Engine {
    options: EngineOptions,
    loader: Box<dyn TemplateLoader>,
}

impl Engine {
    pub fn new(options: EngineOptions, loader: Box<dyn TemplateLoader>) -> Engine {
        Engine { options, loader }
    }

    /// Filesystem-backed engine rooted at `root`, with default options.
    pub fn with_root(root: impl Into<PathBuf>) -> Engine {
        let options = EngineOptions {
            views_root: root.into(),
            ..EngineOptions::default()
        };
        Engine::new(options, Box::new(FileSystemLoader))
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The loader, for callers that fetch sources outside a render (e.g.
    /// script modules).
    pub fn loader(&self) -> &dyn TemplateLoader {
        self.loader.as_ref()
    }

    /// Resolve a template or module name against the views root.
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        resolver::resolve_template_path(
            &self.options.views_root,
            name,
            &self.options.default_extension,
        )
    }

    /// Render an in-memory template with the default (no-op) hooks.
    pub fn render(&self, source: &str, data: &JsonValue) -> EngineResult<String> {
        self.render_string(source, data, &mut NoHooks)
    }

    /// Render an in-memory template as the root unit.
    pub fn render_string(
        &self,
        source: &str,
        data: &JsonValue,
        hooks: &mut dyn CompileHooks,
    ) -> EngineResult<String> {
        self.render_unit(source, CompileUnit::root(), Scope::from_data(data), hooks, 0)
    }

    /// Resolve, load, and render a named template as the root unit.
    pub fn render_file(
        &self,
        name: &str,
        data: &JsonValue,
        hooks: &mut dyn CompileHooks,
    ) -> EngineResult<String> {
        let path = self.resolve_path(name);
        let source = self.load_path(&path)?;
        self.render_unit(
            &source,
            CompileUnit::root_at(path),
            Scope::from_data(data),
            hooks,
            0,
        )
    }

    /// Compile an in-memory template through `hooks` without evaluating
    /// anything.
    pub fn compile_string(
        &self,
        source: &str,
        hooks: &mut dyn CompileHooks,
    ) -> EngineResult<Vec<Node>> {
        let mut unit = CompileUnit::root();
        self.compile_unit(source, &mut unit, hooks)
    }

    /// Resolve, load, and compile a named template without evaluating
    /// anything.
    pub fn compile_file(&self, name: &str, hooks: &mut dyn CompileHooks) -> EngineResult<Vec<Node>> {
        let path = self.resolve_path(name);
        let source = self.load_path(&path)?;
        let mut unit = CompileUnit::root_at(path);
        self.compile_unit(&source, &mut unit, hooks)
    }

    pub(crate) fn render_include(
        &self,
        name: &str,
        data: Value,
        hooks: &mut dyn CompileHooks,
        depth: usize,
    ) -> EngineResult<String> {
        if depth > self.options.max_include_depth {
            return Err(EngineError::Eval {
                message: format!("include depth exceeded rendering `{name}`"),
            });
        }
        let path = self.resolve_path(name);
        let source = self.load_path(&path)?;
        let unit = CompileUnit::include_at(path);
        self.render_unit(&source, unit, Scope::from_value(&data), hooks, depth)
    }

    fn render_unit(
        &self,
        source: &str,
        mut unit: CompileUnit,
        scope: Scope,
        hooks: &mut dyn CompileHooks,
        depth: usize,
    ) -> EngineResult<String> {
        let nodes = self.compile_unit(source, &mut unit, hooks)?;
        let escape = unit.auto_escape.unwrap_or(self.options.auto_escape);
        let mut env = EvalEnv {
            engine: self,
            hooks,
            depth,
        };
        eval::render_nodes(&nodes, &scope, escape, &mut env)
    }

    fn compile_unit(
        &self,
        source: &str,
        unit: &mut CompileUnit,
        hooks: &mut dyn CompileHooks,
    ) -> EngineResult<Vec<Node>> {
        let text = hooks
            .on_raw_text(source.to_owned(), unit)
            .map_err(EngineError::Hook)?;
        let trim = unit.auto_trim.unwrap_or(self.options.auto_trim);
        let nodes = scan::scan(&text, trim)?;
        hooks
            .on_node_sequence(nodes, unit)
            .map_err(EngineError::Hook)
    }

    fn load_path(&self, path: &Path) -> EngineResult<String> {
        self.loader.load(path).map_err(|source| EngineError::Load {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for Engine {
    /// Engine with default options and no loader, for string-only
    /// rendering.
    fn default() -> Engine {
        Engine::new(EngineOptions::default(), Box::new(NullLoader))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::ast::ScriptBinding;
    use crate::error::HookError;
    use crate::options::TrimConfig;
    use crate::resolver::MemoryLoader;

    fn string_engine() -> Engine {
        let options = EngineOptions {
            auto_trim: TrimConfig::OFF,
            auto_escape: false,
            ..EngineOptions::default()
        };
        Engine::new(options, Box::new(NullLoader))
    }

    fn memory_engine(files: &[(&str, &str)]) -> Engine {
        let loader = MemoryLoader::with_files(files.iter().copied());
        let options = EngineOptions {
            auto_trim: TrimConfig::OFF,
            auto_escape: false,
            ..EngineOptions::default()
        };
        Engine::new(options, Box::new(loader))
    }

    #[test]
    fn renders_interpolation_with_data() {
        let engine = string_engine();
        let output = engine.render("Hello <%= name %>", &json!({"name": "Sam"})).unwrap();
        assert_eq!(output, "Hello Sam");
    }

    #[test]
    fn code_tags_produce_no_output() {
        let engine = string_engine();
        let output = engine
            .render("<% let who = 'out' %>in<%= who %>", &json!({}))
            .unwrap();
        assert_eq!(output, "inout");
    }

    #[test]
    fn escape_applies_only_to_interpolation() {
        let options = EngineOptions {
            auto_trim: TrimConfig::OFF,
            ..EngineOptions::default()
        };
        let engine = Engine::new(options, Box::new(NullLoader));
        let data = json!({"html": "<b>hi</b>"});
        assert_eq!(
            engine.render("<%= html %>", &data).unwrap(),
            "&lt;b&gt;hi&lt;/b&gt;"
        );
        assert_eq!(engine.render("<%~ html %>", &data).unwrap(), "<b>hi</b>");
    }

    #[test]
    fn includes_render_with_their_own_data() {
        let engine = memory_engine(&[("greet.theta", "hi <%= who %>")]);
        let output = engine
            .render("<%~ include('greet', {who: 'Ada'}) %>!", &json!({}))
            .unwrap();
        assert_eq!(output, "hi Ada!");
    }

    #[test]
    fn include_depth_is_bounded() {
        let engine = memory_engine(&[("loop.theta", "<%~ include('loop') %>")]);
        let err = engine.render("<%~ include('loop') %>", &json!({})).unwrap_err();
        assert!(err.to_string().contains("include depth exceeded"));
    }

    #[test]
    fn missing_template_is_a_load_error() {
        let engine = memory_engine(&[]);
        let err = engine
            .render_file("absent", &json!({}), &mut NoHooks)
            .unwrap_err();
        match err {
            EngineError::Load { path, .. } => {
                assert_eq!(path, PathBuf::from("absent.theta"));
            }
            other => panic!("expected a load error, got {other}"),
        }
    }

    #[test]
    fn compile_does_not_evaluate() {
        let engine = string_engine();
        // rendering this would fail; compiling must not
        let nodes = engine
            .compile_string("<%= boom.field.deep %>", &mut NoHooks)
            .unwrap();
        assert_eq!(nodes, vec![Node::interpolate("boom.field.deep")]);
    }

    struct RecordingHooks {
        seen: Vec<(Option<PathBuf>, bool)>,
    }

    impl CompileHooks for RecordingHooks {
        fn on_raw_text(
            &mut self,
            text: String,
            unit: &mut CompileUnit,
        ) -> Result<String, HookError> {
            self.seen.push((unit.path.clone(), unit.is_root));
            Ok(text)
        }
    }

    #[test]
    fn hooks_run_for_root_and_includes() {
        let engine = memory_engine(&[("inner.theta", "deep")]);
        let mut hooks = RecordingHooks { seen: Vec::new() };
        let output = engine
            .render_string("<%~ include('inner') %>", &json!({}), &mut hooks)
            .unwrap();
        assert_eq!(output, "deep");
        assert_eq!(
            hooks.seen,
            vec![
                (None, true),
                (Some(PathBuf::from("inner.theta")), false),
            ]
        );
    }

    struct BindingHooks;

    impl CompileHooks for BindingHooks {
        fn on_node_sequence(
            &mut self,
            mut nodes: Vec<Node>,
            _unit: &mut CompileUnit,
        ) -> Result<Vec<Node>, HookError> {
            nodes.insert(
                0,
                Node::Binding(ScriptBinding::new("lib", "{greet: n => 'hi ' + n}")),
            );
            Ok(nodes)
        }
    }

    #[test]
    fn hook_inserted_bindings_are_defined_before_evaluation() {
        let engine = string_engine();
        let output = engine
            .render_string("<%= lib.greet(name) %>", &json!({"name": "Kay"}), &mut BindingHooks)
            .unwrap();
        assert_eq!(output, "hi Kay");
    }

    struct EscapeOverrideHooks;

    impl CompileHooks for EscapeOverrideHooks {
        fn on_raw_text(
            &mut self,
            text: String,
            unit: &mut CompileUnit,
        ) -> Result<String, HookError> {
            unit.auto_escape = Some(false);
            Ok(text)
        }
    }

    #[test]
    fn hooks_can_override_escaping_per_unit() {
        let engine = Engine::new(
            EngineOptions {
                auto_trim: TrimConfig::OFF,
                ..EngineOptions::default()
            },
            Box::new(NullLoader),
        );
        let output = engine
            .render_string("<%= html %>", &json!({"html": "<b>"}), &mut EscapeOverrideHooks)
            .unwrap();
        assert_eq!(output, "<b>");
    }

    #[derive(Debug, thiserror::Error)]
    #[error("rejected: {0}")]
    struct Rejection(String);

    struct FailingHooks;

    impl CompileHooks for FailingHooks {
        fn on_raw_text(
            &mut self,
            _text: String,
            _unit: &mut CompileUnit,
        ) -> Result<String, HookError> {
            Err(Box::new(Rejection("bad unit".to_owned())))
        }
    }

    #[test]
    fn hook_errors_surface_and_downcast() {
        let engine = string_engine();
        let err = engine
            .render_string("anything", &json!({}), &mut FailingHooks)
            .unwrap_err();
        match err {
            EngineError::Hook(inner) => {
                let rejection = inner.downcast::<Rejection>().unwrap();
                assert_eq!(rejection.0, "bad unit");
            }
            other => panic!("expected a hook error, got {other}"),
        }
    }
}
