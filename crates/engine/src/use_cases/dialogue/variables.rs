//! Template variable resolution.
//!
//! Replaces `{{dotted.path}}` placeholders in NPC messages and choice text
//! with values from the turn's [`VariableContext`]. A placeholder whose path
//! does not resolve is left exactly as written, so authoring mistakes show
//! up in-game instead of rendering as blank text.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde_json::Value;
use taleweave_domain::VariableContext;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("valid regex"));

#[derive(Debug, Default, Clone, Copy)]
pub struct VariableResolver;

impl VariableResolver {
    pub fn new() -> Self {
        Self
    }

    /// Substitute every placeholder in `text`. Never fails.
    pub fn resolve(&self, text: &str, context: &VariableContext) -> String {
        if !text.contains("{{") {
            return text.to_string();
        }

        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures<'_>| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let path = caps.get(1).map_or("", |m| m.as_str());
                match context.lookup(path) {
                    Some(value) => render(&value).unwrap_or_else(|| whole.to_string()),
                    None => {
                        tracing::debug!(path, "Unresolved template variable");
                        whole.to_string()
                    }
                }
            })
            .into_owned()
    }
}

/// Text form of a resolved value. `None` for null, which keeps the placeholder.
fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}
