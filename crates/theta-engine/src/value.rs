/*
 * value.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Runtime values and variable scopes.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::Value as JsonValue;

use crate::expr::Expr;

/// A runtime value in the template language.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// An arrow function with its captured scope.
    Function(Rc<FunctionValue>),
    /// A built-in method bound to its receiver, e.g. `"a,b".split`.
    Method(Rc<MethodValue>),
}

#[derive(Debug)]
pub struct FunctionValue {
    pub(crate) params: Vec<String>,
    pub(crate) body: Expr,
    pub(crate) scope: Scope,
}

#[derive(Debug)]
pub struct MethodValue {
    pub(crate) receiver: Value,
    pub(crate) name: String,
}

impl Value {
    /// Convert a JSON value into a runtime value.
    pub fn from_json(value: &JsonValue) -> Value {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON form of this value. Functions serialize as `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Function(_) | Value::Method(_) => JsonValue::Null,
        }
    }

    /// JavaScript-style truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Method(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) | Value::Method(_) => "function",
        }
    }

    /// The text a value interpolates as. `Null` renders empty, arrays and
    /// objects render as JSON, whole numbers drop the fraction.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self.to_json().to_string(),
            Value::Function(_) | Value::Method(_) => "[function]".to_owned(),
        }
    }

    /// Structural equality for `==` and `!=`. Functions are never equal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.loose_eq(w)))
            }
            _ => false,
        }
    }
}

/// A chain of variable frames. Cloning shares the frame; lookups fall
/// through to parent frames, definitions always land in the head frame.
#[derive(Debug, Clone)]
pub struct Scope {
    inner: Rc<Frame>,
}

#[derive(Debug)]
struct Frame {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Scope>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope {
            inner: Rc::new(Frame {
                vars: RefCell::new(HashMap::new()),
                parent: None,
            }),
        }
    }

    /// Root scope seeded from render data. Object fields become top-level
    /// variables and the whole value is also reachable as `it`. Non-object
    /// data contributes `it` only.
    pub fn from_data(data: &JsonValue) -> Scope {
        Scope::from_value(&Value::from_json(data))
    }

    pub fn from_value(data: &Value) -> Scope {
        let scope = Scope::new();
        if let Value::Object(map) = data {
            for (key, value) in map {
                scope.define(key.clone(), value.clone());
            }
        }
        scope.define("it", data.clone());
        scope
    }

    /// A child frame whose lookups fall through to this scope.
    pub fn child(&self) -> Scope {
        Scope {
            inner: Rc::new(Frame {
                vars: RefCell::new(HashMap::new()),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Look a name up through the frame chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.inner.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.inner.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Define (or overwrite) a name in the head frame.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.inner.vars.borrow_mut().insert(name.into(), value);
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::new()
    }
}
