// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projects a resolved config [`Value`] map into the flat `KEY=VALUE`
//! environment the child process sees, and the dotenv-quoted text form
//! used when materializing an env file for it.

use tw_core::Value;

/// Flatten a config map's top-level entries into environment variable
/// assignments using [`Value::to_canonical_string`]: bools become
/// `TRUE`/`FALSE`, lists/maps become compact JSON, null becomes the empty
/// string.
pub fn project(config: &Value) -> Vec<(String, String)> {
    match config.as_map() {
        Some(map) => map.iter().map(|(k, v)| (k.clone(), v.to_canonical_string())).collect(),
        None => Vec::new(),
    }
}

/// Render projected environment variables as dotenv text, quoting any
/// value that contains whitespace, a `#`, a quote, or is empty.
pub fn to_dotenv(vars: &[(String, String)]) -> String {
    let mut out = String::new();
    for (k, v) in vars {
        out.push_str(k);
        out.push('=');
        out.push_str(&quote_if_needed(v));
        out.push('\n');
    }
    out
}

fn quote_if_needed(v: &str) -> String {
    let needs_quoting = v.is_empty()
        || v.chars().any(|c| c.is_whitespace() || c == '#' || c == '"' || c == '\'' || c == '\n');
    if !needs_quoting {
        return v.to_string();
    }
    let escaped = v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn bool_projects_to_screaming_case() {
        let mut m = BTreeMap::new();
        m.insert("DEBUG".to_string(), Value::Bool(true));
        let vars = project(&Value::Map(m));
        assert_eq!(vars, vec![("DEBUG".to_string(), "TRUE".to_string())]);
    }

    #[test]
    fn null_projects_to_empty_string() {
        let mut m = BTreeMap::new();
        m.insert("MAYBE".to_string(), Value::Null);
        let vars = project(&Value::Map(m));
        assert_eq!(vars, vec![("MAYBE".to_string(), String::new())]);
    }

    #[test]
    fn list_projects_to_compact_json() {
        let mut m = BTreeMap::new();
        m.insert("ITEMS".to_string(), Value::List(vec![Value::Number(1.0), Value::Number(2.0)]));
        let vars = project(&Value::Map(m));
        assert_eq!(vars, vec![("ITEMS".to_string(), "[1,2]".to_string())]);
    }

    #[test]
    fn dotenv_quotes_values_with_whitespace() {
        let vars = vec![("GREETING".to_string(), "hello world".to_string())];
        assert_eq!(to_dotenv(&vars), "GREETING=\"hello world\"\n");
    }

    #[test]
    fn dotenv_leaves_simple_values_unquoted() {
        let vars = vec![("PORT".to_string(), "8080".to_string())];
        assert_eq!(to_dotenv(&vars), "PORT=8080\n");
    }

    #[test]
    fn dotenv_escapes_embedded_quotes() {
        let vars = vec![("MSG".to_string(), "she said \"hi\"".to_string())];
        assert_eq!(to_dotenv(&vars), "MSG=\"she said \\\"hi\\\"\"\n");
    }

    #[test]
    fn dotenv_quotes_empty_values() {
        let vars = vec![("EMPTY".to_string(), String::new())];
        assert_eq!(to_dotenv(&vars), "EMPTY=\"\"\n");
    }
}
