//! Render context and identifier resolution.

use serde_json::{Map, Value};

use crate::error::{TemplateError, TemplateResult};

/// Caller-supplied data payload.
///
/// A JSON object whose top-level keys are the identifiers placeholders can
/// bind to. The renderer only ever reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    root: Map<String, Value>,
}

impl RenderContext {
    pub fn new(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Build a context from any JSON value; only objects are accepted.
    pub fn from_value(value: Value) -> TemplateResult<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(TemplateError::InvalidContext(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn from_json_str(json: &str) -> TemplateResult<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.root.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl From<Map<String, Value>> for RenderContext {
    fn from(root: Map<String, Value>) -> Self {
        Self::new(root)
    }
}

/// What an identifier is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// No key, `null`, or an empty list.
    Missing,
    /// A string or primitive, already in textual form.
    Scalar(String),
    /// An attachment-like value; carries its `url`.
    Asset(String),
    /// An object or list with no `url`, serialized as compact JSON.
    Structured(String),
}

impl Binding {
    /// Text substituted for a text tag, `None` when unbound.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Missing => None,
            Self::Scalar(text) | Self::Asset(text) | Self::Structured(text) => Some(text),
        }
    }

    /// Locator fetched for an image tag.
    ///
    /// Plain strings are taken as locators themselves; structured values
    /// without a `url` have none.
    pub fn locator(&self) -> Option<&str> {
        match self {
            Self::Asset(url) | Self::Scalar(url) => Some(url),
            Self::Missing | Self::Structured(_) => None,
        }
    }
}

/// Looks identifiers up in a render context.
///
/// Lookup is an exact match on top-level keys; there is no path syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeResolver;

impl ScopeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `identifier`. Never fails: every path ends in a binding.
    pub fn resolve(&self, identifier: &str, context: &RenderContext) -> Binding {
        match context.get(identifier) {
            None => Binding::Missing,
            Some(value) => Self::bind(value),
        }
    }

    fn bind(value: &Value) -> Binding {
        match value {
            Value::Null => Binding::Missing,
            Value::String(s) => Binding::Scalar(s.clone()),
            Value::Bool(b) => Binding::Scalar(b.to_string()),
            Value::Number(n) => Binding::Scalar(n.to_string()),
            Value::Object(map) => match attachment_url(map) {
                Some(url) => Binding::Asset(url.to_string()),
                None => Binding::Structured(value.to_string()),
            },
            Value::Array(items) => {
                let Some(first) = items.first() else {
                    return Binding::Missing;
                };
                if let Some(url) = first.as_object().and_then(attachment_url) {
                    return Binding::Asset(url.to_string());
                }
                if items.iter().all(is_primitive) {
                    let joined = items
                        .iter()
                        .filter_map(|item| match Self::bind(item) {
                            Binding::Scalar(text) => Some(text),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Binding::Scalar(joined);
                }
                Binding::Structured(value.to_string())
            }
        }
    }
}

fn attachment_url(map: &Map<String, Value>) -> Option<&str> {
    map.get("url").and_then(Value::as_str)
}

fn is_primitive(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_)
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
