// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parses raw bytes into a [`Value`] according to a declared or inferred
//! format (the `!FORMAT` suffix in a secret location).

use std::io::Cursor;
use thiserror::Error;
use tw_core::Value;

/// Format tag recognized by the `!FORMAT` suffix of a secret location, or
/// inferred from content when none is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Raw text, used verbatim as a single string value.
    #[default]
    Text,
    Json,
    Yaml,
    /// `KEY=VALUE` lines, one per line, `#`-comments and quoting supported.
    Dotenv,
}

impl Format {
    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "TEXT" => Some(Format::Text),
            "JSON" => Some(Format::Json),
            "YAML" | "YML" => Some(Format::Yaml),
            "DOTENV" | "ENV" => Some(Format::Dotenv),
            _ => None,
        }
    }

    /// Best-effort sniff of a format from content when no `!FORMAT` suffix
    /// was given. Defaults to `Text` when nothing matches.
    pub fn sniff(content: &str) -> Self {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
                return Format::Json;
            }
        }
        if trimmed.contains('=') && !trimmed.contains(": ") && !trimmed.trim_start().starts_with('-')
        {
            return Format::Dotenv;
        }
        Format::Text
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid dotenv content: {0}")]
    Dotenv(String),
}

/// Parse `content` as `format` into a [`Value`].
pub fn parse(content: &str, format: Format) -> Result<Value, ParseError> {
    match format {
        Format::Text => Ok(Value::String(content.to_string())),
        Format::Json => {
            let v: serde_json::Value = serde_json::from_str(content)?;
            Ok(Value::from_json(v))
        }
        Format::Yaml => {
            let v: serde_yaml::Value = serde_yaml::from_str(content)?;
            Ok(yaml_to_value(v))
        }
        Format::Dotenv => parse_dotenv(content),
    }
}

fn parse_dotenv(content: &str) -> Result<Value, ParseError> {
    let mut map = std::collections::BTreeMap::new();
    for item in dotenvy::Iter::new(Cursor::new(content.as_bytes())) {
        let (k, v) = item.map_err(|e| ParseError::Dotenv(e.to_string()))?;
        map.insert(k, Value::String(v));
    }
    Ok(Value::Map(map))
}

fn yaml_to_value(v: serde_yaml::Value) -> Value {
    match v {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(s) => Value::List(s.into_iter().map(yaml_to_value).collect()),
        serde_yaml::Value::Mapping(m) => Value::Map(
            m.into_iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), yaml_to_value(v))))
                .collect(),
        ),
        serde_yaml::Value::Tagged(t) => yaml_to_value(t.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_json_object() {
        assert_eq!(Format::sniff(r#"{"a": 1}"#), Format::Json);
    }

    #[test]
    fn sniffs_dotenv() {
        assert_eq!(Format::sniff("A=1\nB=2\n"), Format::Dotenv);
    }

    #[test]
    fn sniffs_plain_text_as_fallback() {
        assert_eq!(Format::sniff("hello world"), Format::Text);
    }

    #[test]
    fn parses_json_object() {
        let v = parse(r#"{"a": 1, "b": "x"}"#, Format::Json).unwrap();
        assert_eq!(v.as_map().unwrap().get("b").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn parses_dotenv_with_quotes_and_comments() {
        let content = "# comment\nFOO=\"bar baz\"\nNUM=42\n";
        let v = parse(content, Format::Dotenv).unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(map.get("FOO").unwrap().as_str(), Some("bar baz"));
        assert_eq!(map.get("NUM").unwrap().as_str(), Some("42"));
    }

    #[test]
    fn parses_yaml_nested_mapping() {
        let content = "a:\n  b: 1\n  c: true\n";
        let v = parse(content, Format::Yaml).unwrap();
        let inner = v.as_map().unwrap().get("a").unwrap().as_map().unwrap();
        assert_eq!(inner.get("c").unwrap(), &Value::Bool(true));
    }

    #[test]
    fn text_format_is_passthrough() {
        let v = parse("raw value", Format::Text).unwrap();
        assert_eq!(v, Value::String("raw value".to_string()));
    }

    #[test]
    fn parse_tag_is_case_insensitive() {
        assert_eq!(Format::parse_tag("json"), Some(Format::Json));
        assert_eq!(Format::parse_tag("YAML"), Some(Format::Yaml));
        assert_eq!(Format::parse_tag("nope"), None);
    }
}
