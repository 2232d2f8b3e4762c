//! `{{ path }}` interpolation.

use std::sync::LazyLock;

use regex::{
    Captures,
    Regex,
};
use serde_json::Value;

use crate::error::TranslateError;
use crate::path::get_value;
use crate::types::{
    Params,
    Translation,
};

/// Matches `{{ path }}` placeholders; whitespace around the path is ignored.
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}\s]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Bare or single-quoted object keys: `name:` / `'name':`.
#[allow(clippy::expect_used)]
static RELAXED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(')?([a-zA-Z0-9_]+)(')?(\s)?:").expect("relaxed key pattern is valid")
});

/// Single-quoted values: `: 'text'`.
#[allow(clippy::expect_used)]
static RELAXED_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(\s)?(')(.*?)(')").expect("relaxed value pattern is valid")
});

/// Turns a translation leaf into its final text.
pub trait TranslateParser: Send + Sync {
    /// Interpolates a leaf. Returns `None` for values the parser cannot render
    /// (lists and maps with the default parser).
    fn interpolate(&self, expr: &Translation, params: Option<&Params>) -> Option<String>;
}

/// Substitutes `{{ path }}` placeholders from the parameter record and calls
/// template leaves with the parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParser;

impl TranslateParser for DefaultParser {
    fn interpolate(&self, expr: &Translation, params: Option<&Params>) -> Option<String> {
        match expr {
            Translation::Text(template) => Some(interpolate_string(template, params)),
            Translation::Template(template) => Some(template.call(params)),
            Translation::List(_) | Translation::Map(_) => None,
        }
    }
}

/// Replaces every placeholder whose path resolves in `params`.
///
/// Unresolved placeholders are left untouched, and without parameters the
/// template is returned as is.
#[must_use]
pub fn interpolate_string(template: &str, params: Option<&Params>) -> String {
    let Some(params) = params else {
        return template.to_string();
    };

    PLACEHOLDER
        .replace_all(template, |captures: &Captures<'_>| {
            let placeholder = captures.get(0).map_or("", |m| m.as_str());
            let path = captures.get(1).map_or("", |m| m.as_str());
            get_value(params, path)
                .map_or_else(|| placeholder.to_string(), |value| stringify(&value))
        })
        .into_owned()
}

/// Text form of a parameter value. Lists are joined with `", "`, objects
/// render as JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(", "),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Object(_) => value.to_string(),
    }
}

/// Interpolates a whole translation value.
///
/// Lists are mapped element-wise and maps value-wise; entries the parser
/// cannot render are dropped.
#[must_use]
pub fn run_interpolation(
    parser: &dyn TranslateParser,
    translation: &Translation,
    params: Option<&Params>,
) -> Option<Translation> {
    match translation {
        Translation::List(items) => Some(Translation::List(
            items.iter().filter_map(|item| run_interpolation(parser, item, params)).collect(),
        )),
        Translation::Map(map) => Some(Translation::Map(
            map.iter()
                .filter_map(|(key, value)| {
                    run_interpolation(parser, value, params).map(|value| (key.clone(), value))
                })
                .collect(),
        )),
        Translation::Text(_) | Translation::Template(_) => {
            parser.interpolate(translation, params).map(Translation::Text)
        }
    }
}

/// Parses interpolation parameters given as text.
///
/// Strict JSON is taken as is. Otherwise the relaxed form
/// `{name: 'Ann', count: 2}` is rewritten to JSON first. Blank input yields an
/// empty record.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use translate_core::parser::parse_params;
///
/// assert_eq!(parse_params("{name: 'Ann'}").ok(), Some(json!({ "name": "Ann" })));
/// assert!(parse_params("name").is_err());
/// ```
pub fn parse_params(raw: &str) -> Result<Params, TranslateError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    if let Ok(params @ Value::Object(_)) = serde_json::from_str::<Value>(raw) {
        return Ok(params);
    }

    let quoted_keys = RELAXED_KEY.replace_all(raw, "\"${2}\":");
    let normalized = RELAXED_VALUE.replace_all(&quoted_keys, ":\"${3}\"");

    match serde_json::from_str::<Value>(&normalized) {
        Ok(params @ Value::Object(_)) => Ok(params),
        Ok(_) | Err(_) => {
            tracing::debug!(raw, "Rejected interpolation parameters");
            Err(TranslateError::InvalidParams { raw: raw.to_string() })
        }
    }
}
