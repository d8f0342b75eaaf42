//! Variable interpolation
//!
//! Replaces `{{name}}` tokens with values from a variable environment.
//! Unresolved references are left verbatim so they stay visible downstream
//! instead of silently disappearing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

// Cached regex to avoid recompilation in hot paths.
// Names may contain word characters, hyphens, and dots; surrounding
// whitespace inside the braces is tolerated.
static TEMPLATE_VAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([\w.-]+)\s*\}\}").unwrap()
});

/// Replace each `{{name}}` occurrence whose name exists in `variables` with
/// its value. Occurrences whose name is absent are left verbatim, braces
/// included.
pub fn interpolate(template: &str, variables: &HashMap<String, String>) -> String {
    if template.is_empty() || variables.is_empty() {
        return template.to_string();
    }

    TEMPLATE_VAR_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match variables.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Interpolate an optional template, treating `None` as an empty string.
pub fn interpolate_opt(template: Option<&str>, variables: &HashMap<String, String>) -> String {
    match template {
        Some(text) => interpolate(text, variables),
        None => String::new(),
    }
}

/// Interpolate every string scalar in a parsed JSON tree.
///
/// Object keys are left untouched; only values are rewritten. This keeps
/// variable values containing quotes or braces from corrupting the
/// structure of a JSON body.
pub fn interpolate_json(value: &JsonValue, variables: &HashMap<String, String>) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(interpolate(s, variables)),
        JsonValue::Array(items) => JsonValue::Array(
            items.iter().map(|v| interpolate_json(v, variables)).collect(),
        ),
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_json(v, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}
