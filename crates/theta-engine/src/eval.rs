/*
 * eval.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Node-sequence evaluator.
//!
//! Walks compiled nodes, evaluating tag expressions against a scope chain
//! and appending to the output. `include()` re-enters the engine so nested
//! units compile through the same hooks as the root.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::ast::{Node, TagKind};
use crate::engine::Engine;
use crate::error::{EngineResult, eval_error};
use crate::expr::{self, BinaryOp, Expr, Stmt, UnaryOp};
use crate::hooks::CompileHooks;
use crate::value::{FunctionValue, MethodValue, Scope, Value};

/// Per-render state threaded through evaluation.
pub(crate) struct EvalEnv<'a> {
    pub(crate) engine: &'a Engine,
    pub(crate) hooks: &'a mut dyn CompileHooks,
    pub(crate) depth: usize,
}

pub(crate) fn render_nodes(
    nodes: &[Node],
    scope: &Scope,
    escape: bool,
    env: &mut EvalEnv<'_>,
) -> EngineResult<String> {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Tag(tag) => match tag.kind {
                TagKind::Code => exec_code(&tag.src, scope, env)?,
                TagKind::Interpolate => {
                    let value = eval_source(&tag.src, scope, env)?;
                    let text = value.render();
                    if escape {
                        push_escaped(&mut out, &text);
                    } else {
                        out.push_str(&text);
                    }
                }
                TagKind::Raw => {
                    let value = eval_source(&tag.src, scope, env)?;
                    out.push_str(&value.render());
                }
            },
            Node::Binding(binding) => {
                let value = eval_module(&binding.source, env)?;
                scope.define(binding.name.clone(), value);
            }
        }
    }
    Ok(out)
}

/// Evaluate a script module's source as one expression in a scope isolated
/// from the render data.
pub(crate) fn eval_module(source: &str, env: &mut EvalEnv<'_>) -> EngineResult<Value> {
    let expr = expr::parse_expression(source)?;
    let scope = Scope::new();
    eval_expr(&expr, &scope, env)
}

fn eval_source(src: &str, scope: &Scope, env: &mut EvalEnv<'_>) -> EngineResult<Value> {
    let expr = expr::parse_expression(src)?;
    eval_expr(&expr, scope, env)
}

fn exec_code(src: &str, scope: &Scope, env: &mut EvalEnv<'_>) -> EngineResult<()> {
    for stmt in expr::parse_statement_list(src)? {
        match stmt {
            Stmt::Let { name, value } => {
                let value = eval_expr(&value, scope, env)?;
                scope.define(name, value);
            }
            Stmt::Expr(expr) => {
                eval_expr(&expr, scope, env)?;
            }
        }
    }
    Ok(())
}

fn eval_expr(expr: &Expr, scope: &Scope, env: &mut EvalEnv<'_>) -> EngineResult<Value> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Ident(name) => Ok(scope.get(name).unwrap_or(Value::Null)),
        Expr::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(item, scope, env)?);
            }
            Ok(Value::Array(values))
        }
        Expr::Object(entries) => {
            let mut map = std::collections::BTreeMap::new();
            for (key, value) in entries {
                map.insert(key.clone(), eval_expr(value, scope, env)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Member { object, property } => {
            let object = eval_expr(object, scope, env)?;
            member_of(&object, property)
        }
        Expr::Index { object, index } => {
            let object = eval_expr(object, scope, env)?;
            let index = eval_expr(index, scope, env)?;
            index_of(&object, &index)
        }
        Expr::Call { callee, args } => {
            if let Expr::Ident(name) = callee.as_ref() {
                if name == "include" && scope.get(name).is_none() {
                    return eval_include(args, scope, env);
                }
                // identity shim so script modules can be written as
                // Object({ ... })
                if name == "Object" && scope.get(name).is_none() {
                    let mut values = eval_args(args, scope, env)?;
                    return Ok(if values.is_empty() {
                        Value::Null
                    } else {
                        values.remove(0)
                    });
                }
            }
            let callee_value = eval_expr(callee, scope, env)?;
            let arg_values = eval_args(args, scope, env)?;
            call_value(&callee_value, arg_values, &describe_expr(callee), env)
        }
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, scope, env)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(eval_error(format!("cannot negate {}", other.type_name()))),
                },
            }
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, scope, env),
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            if eval_expr(condition, scope, env)?.is_truthy() {
                eval_expr(then_branch, scope, env)
            } else {
                eval_expr(else_branch, scope, env)
            }
        }
        Expr::Arrow { params, body } => Ok(Value::Function(Rc::new(FunctionValue {
            params: params.clone(),
            body: (**body).clone(),
            scope: scope.clone(),
        }))),
    }
}

fn eval_args(args: &[Expr], scope: &Scope, env: &mut EvalEnv<'_>) -> EngineResult<Vec<Value>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval_expr(arg, scope, env)?);
    }
    Ok(values)
}

fn eval_include(args: &[Expr], scope: &Scope, env: &mut EvalEnv<'_>) -> EngineResult<Value> {
    let mut values = eval_args(args, scope, env)?;
    if values.is_empty() {
        return Err(eval_error("include() needs a template name"));
    }
    let name = match values.remove(0) {
        Value::String(name) => name,
        other => {
            return Err(eval_error(format!(
                "include() name must be a string, got {}",
                other.type_name()
            )));
        }
    };
    let data = if values.is_empty() {
        Value::Null
    } else {
        values.remove(0)
    };
    let engine = env.engine;
    let output = engine.render_include(&name, data, env.hooks, env.depth + 1)?;
    Ok(Value::String(output))
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    scope: &Scope,
    env: &mut EvalEnv<'_>,
) -> EngineResult<Value> {
    match op {
        // && and || short-circuit and return the deciding value
        BinaryOp::And => {
            let lhs = eval_expr(left, scope, env)?;
            if !lhs.is_truthy() {
                return Ok(lhs);
            }
            eval_expr(right, scope, env)
        }
        BinaryOp::Or => {
            let lhs = eval_expr(left, scope, env)?;
            if lhs.is_truthy() {
                return Ok(lhs);
            }
            eval_expr(right, scope, env)
        }
        BinaryOp::Eq => {
            let (lhs, rhs) = eval_pair(left, right, scope, env)?;
            Ok(Value::Bool(lhs.loose_eq(&rhs)))
        }
        BinaryOp::Ne => {
            let (lhs, rhs) = eval_pair(left, right, scope, env)?;
            Ok(Value::Bool(!lhs.loose_eq(&rhs)))
        }
        BinaryOp::Add => {
            let (lhs, rhs) = eval_pair(left, right, scope, env)?;
            Ok(add_values(lhs, rhs))
        }
        BinaryOp::Sub => {
            let (lhs, rhs) = eval_pair(left, right, scope, env)?;
            numeric_op(&lhs, &rhs, "-", |a, b| a - b)
        }
        BinaryOp::Mul => {
            let (lhs, rhs) = eval_pair(left, right, scope, env)?;
            numeric_op(&lhs, &rhs, "*", |a, b| a * b)
        }
        BinaryOp::Div => {
            let (lhs, rhs) = eval_pair(left, right, scope, env)?;
            numeric_op(&lhs, &rhs, "/", |a, b| a / b)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (lhs, rhs) = eval_pair(left, right, scope, env)?;
            compare_values(&lhs, &rhs, op)
        }
    }
}

fn eval_pair(
    left: &Expr,
    right: &Expr,
    scope: &Scope,
    env: &mut EvalEnv<'_>,
) -> EngineResult<(Value, Value)> {
    let lhs = eval_expr(left, scope, env)?;
    let rhs = eval_expr(right, scope, env)?;
    Ok((lhs, rhs))
}

/// `+` adds numbers and concatenates everything else, like JavaScript.
fn add_values(lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (lhs, rhs) => Value::String(format!("{}{}", lhs.render(), rhs.render())),
    }
}

fn numeric_op(
    lhs: &Value,
    rhs: &Value,
    op_name: &str,
    apply: impl Fn(f64, f64) -> f64,
) -> EngineResult<Value> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(apply(*a, *b))),
        _ => Err(eval_error(format!(
            "cannot apply `{op_name}` to {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn compare_values(lhs: &Value, rhs: &Value, op: BinaryOp) -> EngineResult<Value> {
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let Some(ordering) = ordering else {
        return Err(eval_error(format!(
            "cannot compare {} with {}",
            lhs.type_name(),
            rhs.type_name()
        )));
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }))
}

const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "charAt",
    "includes",
    "split",
    "replace",
    "slice",
];

const ARRAY_METHODS: &[&str] = &["join", "map", "filter", "includes", "indexOf"];

fn member_of(value: &Value, property: &str) -> EngineResult<Value> {
    match value {
        Value::Null => Err(eval_error(format!("cannot read `{property}` of null"))),
        Value::Object(map) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
        Value::String(s) => {
            if property == "length" {
                return Ok(Value::Number(s.chars().count() as f64));
            }
            if STRING_METHODS.contains(&property) {
                return Ok(bind_method(value, property));
            }
            Ok(Value::Null)
        }
        Value::Array(items) => {
            if property == "length" {
                return Ok(Value::Number(items.len() as f64));
            }
            if ARRAY_METHODS.contains(&property) {
                return Ok(bind_method(value, property));
            }
            Ok(Value::Null)
        }
        _ => Ok(Value::Null),
    }
}

fn bind_method(receiver: &Value, name: &str) -> Value {
    Value::Method(Rc::new(MethodValue {
        receiver: receiver.clone(),
        name: name.to_owned(),
    }))
}

fn index_of(object: &Value, index: &Value) -> EngineResult<Value> {
    match (object, index) {
        (Value::Null, _) => Err(eval_error("cannot index null")),
        (Value::Array(items), Value::Number(n)) => {
            if *n < 0.0 {
                return Ok(Value::Null);
            }
            Ok(items.get(*n as usize).cloned().unwrap_or(Value::Null))
        }
        (Value::Object(map), Value::String(key)) => {
            Ok(map.get(key).cloned().unwrap_or(Value::Null))
        }
        (Value::String(s), Value::Number(n)) => {
            if *n < 0.0 {
                return Ok(Value::Null);
            }
            Ok(s.chars()
                .nth(*n as usize)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null))
        }
        _ => Ok(Value::Null),
    }
}

pub(crate) fn call_value(
    callee: &Value,
    args: Vec<Value>,
    callee_desc: &str,
    env: &mut EvalEnv<'_>,
) -> EngineResult<Value> {
    match callee {
        Value::Function(function) => {
            let frame = function.scope.child();
            for (index, param) in function.params.iter().enumerate() {
                frame.define(
                    param.clone(),
                    args.get(index).cloned().unwrap_or(Value::Null),
                );
            }
            eval_expr(&function.body, &frame, env)
        }
        Value::Method(method) => call_method(method, args, env),
        other => Err(eval_error(format!(
            "`{callee_desc}` is not a function, it is {}",
            other.type_name()
        ))),
    }
}

fn call_method(method: &MethodValue, args: Vec<Value>, env: &mut EvalEnv<'_>) -> EngineResult<Value> {
    match (&method.receiver, method.name.as_str()) {
        (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
        (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
        (Value::String(s), "trim") => Ok(Value::String(s.trim().to_owned())),
        (Value::String(s), "charAt") => {
            let index = number_arg(&args, 0).unwrap_or(0.0);
            let ch = if index >= 0.0 {
                s.chars().nth(index as usize)
            } else {
                None
            };
            Ok(Value::String(ch.map(String::from).unwrap_or_default()))
        }
        (Value::String(s), "includes") => {
            Ok(Value::Bool(s.contains(string_arg(&args, 0).as_str())))
        }
        (Value::String(s), "split") => {
            let sep = string_arg(&args, 0);
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str())
                    .map(|part| Value::String(part.to_owned()))
                    .collect()
            };
            Ok(Value::Array(parts))
        }
        (Value::String(s), "replace") => {
            let from = string_arg(&args, 0);
            let to = string_arg(&args, 1);
            Ok(Value::String(s.replacen(from.as_str(), &to, 1)))
        }
        (Value::String(s), "slice") => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as f64;
            let start = normalize_index(number_arg(&args, 0).unwrap_or(0.0), len);
            let end = normalize_index(number_arg(&args, 1).unwrap_or(len), len);
            let sliced: String = if start < end {
                chars[start..end].iter().collect()
            } else {
                String::new()
            };
            Ok(Value::String(sliced))
        }
        (Value::Array(items), "join") => {
            let sep = match args.first() {
                Some(value) => value.render(),
                None => ",".to_owned(),
            };
            let joined = items.iter().map(Value::render).collect::<Vec<_>>().join(&sep);
            Ok(Value::String(joined))
        }
        (Value::Array(items), "map") => {
            let Some(callback) = args.first() else {
                return Err(eval_error("map() needs a function argument"));
            };
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                mapped.push(call_value(
                    callback,
                    vec![item.clone(), Value::Number(index as f64)],
                    "map callback",
                    env,
                )?);
            }
            Ok(Value::Array(mapped))
        }
        (Value::Array(items), "filter") => {
            let Some(callback) = args.first() else {
                return Err(eval_error("filter() needs a function argument"));
            };
            let mut kept = Vec::new();
            for (index, item) in items.iter().enumerate() {
                let keep = call_value(
                    callback,
                    vec![item.clone(), Value::Number(index as f64)],
                    "filter callback",
                    env,
                )?;
                if keep.is_truthy() {
                    kept.push(item.clone());
                }
            }
            Ok(Value::Array(kept))
        }
        (Value::Array(items), "includes") => {
            let needle = args.into_iter().next().unwrap_or(Value::Null);
            Ok(Value::Bool(
                items.iter().any(|item| item.loose_eq(&needle)),
            ))
        }
        (Value::Array(items), "indexOf") => {
            let needle = args.into_iter().next().unwrap_or(Value::Null);
            let position = items.iter().position(|item| item.loose_eq(&needle));
            Ok(Value::Number(position.map_or(-1.0, |p| p as f64)))
        }
        (receiver, name) => Err(eval_error(format!(
            "{} has no method `{name}`",
            receiver.type_name()
        ))),
    }
}

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::render).unwrap_or_default()
}

fn number_arg(args: &[Value], index: usize) -> Option<f64> {
    match args.get(index) {
        Some(Value::Number(n)) => Some(*n),
        _ => None,
    }
}

fn normalize_index(raw: f64, len: f64) -> usize {
    let idx = if raw < 0.0 { len + raw } else { raw };
    idx.clamp(0.0, len) as usize
}

fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, property } => format!("{}.{property}", describe_expr(object)),
        Expr::Index { object, .. } => format!("{}[..]", describe_expr(object)),
        Expr::Call { callee, .. } => format!("{}()", describe_expr(callee)),
        _ => "expression".to_owned(),
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::hooks::NoHooks;

    fn eval_str(src: &str, scope: &Scope) -> EngineResult<Value> {
        let engine = Engine::default();
        let mut hooks = NoHooks;
        let mut env = EvalEnv {
            engine: &engine,
            hooks: &mut hooks,
            depth: 0,
        };
        eval_source(src, scope, &mut env)
    }

    fn eval_ok(src: &str) -> Value {
        eval_str(src, &Scope::new()).unwrap()
    }

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(eval_ok("1 + 2 * 3").render(), "7");
        assert_eq!(eval_ok("(1 + 2) * 3").render(), "9");
        assert_eq!(eval_ok("-2 + 5").render(), "3");
    }

    #[test]
    fn plus_concatenates_strings() {
        let scope = Scope::from_data(&json!({"name": "Kay"}));
        assert_eq!(eval_str("'hi ' + name", &scope).unwrap().render(), "hi Kay");
        assert_eq!(eval_ok("'n=' + 3").render(), "n=3");
    }

    #[test]
    fn missing_identifiers_evaluate_to_null() {
        assert_eq!(eval_ok("nothing").render(), "");
    }

    #[test]
    fn member_access_on_null_is_an_error() {
        let err = eval_str("missing.field", &Scope::new()).unwrap_err();
        assert!(err.to_string().contains("cannot read `field` of null"));
    }

    #[test]
    fn member_and_index_access() {
        let scope = Scope::from_data(&json!({
            "user": {"name": "Ada", "tags": ["x", "y"]}
        }));
        assert_eq!(eval_str("user.name", &scope).unwrap().render(), "Ada");
        assert_eq!(eval_str("user.tags[1]", &scope).unwrap().render(), "y");
        assert_eq!(eval_str("user.tags.length", &scope).unwrap().render(), "2");
        assert_eq!(eval_str("user.missing", &scope).unwrap().render(), "");
        assert_eq!(eval_str("user['name']", &scope).unwrap().render(), "Ada");
    }

    #[test]
    fn ternary_and_logic() {
        assert_eq!(eval_ok("true ? 'a' : 'b'").render(), "a");
        assert_eq!(eval_ok("'' || 'fallback'").render(), "fallback");
        assert_eq!(eval_ok("'set' && 'next'").render(), "next");
        assert_eq!(eval_ok("!0").render(), "true");
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(eval_ok("[1, 2] == [1, 2]").render(), "true");
        assert_eq!(eval_ok("{a: 1} == {a: 2}").render(), "false");
        assert_eq!(eval_ok("1 != '1'").render(), "true");
    }

    #[test]
    fn arrows_capture_their_scope() {
        assert_eq!(eval_ok("(a => b => a + b)(1)(2)").render(), "3");
    }

    #[test]
    fn function_values_ignore_extra_args_and_default_missing_to_null() {
        assert_eq!(eval_ok("((a, b) => '' + a + b)(1)").render(), "1");
        assert_eq!(eval_ok("(a => a)(1, 2, 3)").render(), "1");
    }

    #[test]
    fn calling_a_non_function_names_the_callee() {
        let scope = Scope::from_data(&json!({"lib": {"greet": 1}}));
        let err = eval_str("lib.greet(name)", &scope).unwrap_err();
        assert!(err.to_string().contains("lib.greet"));
    }

    #[test]
    fn string_methods() {
        assert_eq!(eval_ok("'abc'.toUpperCase()").render(), "ABC");
        assert_eq!(eval_ok("' x '.trim()").render(), "x");
        assert_eq!(eval_ok("'a-b-c'.split('-').length").render(), "3");
        assert_eq!(eval_ok("'hello'.replace('l', 'L')").render(), "heLlo");
        assert_eq!(eval_ok("'hello'.slice(1, 3)").render(), "el");
        assert_eq!(eval_ok("'hello'.slice(-2)").render(), "lo");
        assert_eq!(eval_ok("'hello'.charAt(1)").render(), "e");
        assert_eq!(eval_ok("'hello'.includes('ell')").render(), "true");
        assert_eq!(eval_ok("'héllo'.length").render(), "5");
    }

    #[test]
    fn array_methods() {
        assert_eq!(eval_ok("[1, 2, 3].map(n => n * 2).join('-')").render(), "2-4-6");
        assert_eq!(
            eval_ok("[1, 2, 3, 4].filter(n => n > 2).join(',')").render(),
            "3,4"
        );
        assert_eq!(eval_ok("['a', 'b'].includes('b')").render(), "true");
        assert_eq!(eval_ok("['a', 'b'].indexOf('b')").render(), "1");
        assert_eq!(eval_ok("['a', 'b'].indexOf('z')").render(), "-1");
    }

    #[test]
    fn object_shim_returns_its_argument() {
        assert_eq!(
            eval_ok("Object({greet: n => 'hi ' + n}).greet('Kay')").render(),
            "hi Kay"
        );
    }

    #[test]
    fn code_statements_define_variables() {
        let engine = Engine::default();
        let mut hooks = NoHooks;
        let mut env = EvalEnv {
            engine: &engine,
            hooks: &mut hooks,
            depth: 0,
        };
        let scope = Scope::new();
        exec_code("let x = 2; let y = x * 3", &scope, &mut env).unwrap();
        assert_eq!(scope.get("y").unwrap().render(), "6");
    }

    #[test]
    fn escaping_covers_html_significant_chars() {
        let mut out = String::new();
        push_escaped(&mut out, r#"<a href="x">&'"#);
        assert_eq!(out, "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
