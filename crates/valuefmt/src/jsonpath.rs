// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal JSON-Path extractor for the `|JP:<path>` suffix of a secret
//! location and for config resolver field projection.
//!
//! Supports dotted field access (`a.b.c`), numeric array indices
//! (`a.b[0]`), and the wildcard (`a.b[*].c`). A wildcard step fans out
//! into a list of matches at every subsequent step. A single-element
//! result list is collapsed back down to its one element so that scalar
//! extraction does not force callers to unwrap a list — unless the path
//! itself ends with `[*]`, in which case the result stays a list even
//! when it holds exactly one element. The bare root path `$` matches the
//! whole value, unchanged.

use thiserror::Error;
use tw_core::Value;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JsonPathError {
    #[error("empty JSON-Path")]
    Empty,
    #[error("malformed path segment: {0:?}")]
    MalformedSegment(String),
    #[error("path {0:?} did not match any value")]
    NoMatch(String),
}

#[derive(Debug)]
enum Step {
    Field(String),
    Index(usize),
    Wildcard,
}

fn parse_path(path: &str) -> Result<Vec<Step>, JsonPathError> {
    let had_root_anchor = path.starts_with('$');
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        // Bare `$` (or `$.`) is the identity path: no steps, matches the
        // whole value. A truly empty string, with no root anchor at all,
        // is malformed.
        return if had_root_anchor { Ok(Vec::new()) } else { Err(JsonPathError::Empty) };
    }
    let mut steps = Vec::new();
    for raw in path.split('.') {
        if raw.is_empty() {
            return Err(JsonPathError::MalformedSegment(raw.to_string()));
        }
        let mut rest = raw;
        if let Some(bracket_start) = rest.find('[') {
            let field = &rest[..bracket_start];
            if !field.is_empty() {
                steps.push(Step::Field(field.to_string()));
            }
            rest = &rest[bracket_start..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped
                    .find(']')
                    .ok_or_else(|| JsonPathError::MalformedSegment(raw.to_string()))?;
                let inner = &stripped[..close];
                if inner == "*" {
                    steps.push(Step::Wildcard);
                } else {
                    let idx: usize = inner
                        .parse()
                        .map_err(|_| JsonPathError::MalformedSegment(raw.to_string()))?;
                    steps.push(Step::Index(idx));
                }
                rest = &stripped[close + 1..];
            }
        } else {
            steps.push(Step::Field(rest.to_string()));
        }
    }
    Ok(steps)
}

/// Extract the value(s) at `path` within `root`.
pub fn extract(root: &Value, path: &str) -> Result<Value, JsonPathError> {
    let steps = parse_path(path)?;
    let mut current = vec![root.clone()];
    for step in &steps {
        let mut next = Vec::new();
        for v in &current {
            match step {
                Step::Field(name) => {
                    if let Some(m) = v.as_map() {
                        if let Some(found) = m.get(name) {
                            next.push(found.clone());
                        }
                    }
                }
                Step::Index(idx) => {
                    if let Some(list) = v.as_list() {
                        if let Some(found) = list.get(*idx) {
                            next.push(found.clone());
                        }
                    }
                }
                Step::Wildcard => {
                    if let Some(list) = v.as_list() {
                        next.extend(list.iter().cloned());
                    } else if let Some(map) = v.as_map() {
                        next.extend(map.values().cloned());
                    }
                }
            }
        }
        current = next;
        if current.is_empty() {
            return Err(JsonPathError::NoMatch(path.to_string()));
        }
    }
    // List-collapsing rule: a single match is returned bare, not wrapped
    // in a one-element list — unless the path itself ends with `[*]`, in
    // which case the caller asked for a list and keeps one even with a
    // single element.
    let ends_with_wildcard = matches!(steps.last(), Some(Step::Wildcard));
    if current.len() == 1 && !ends_with_wildcard {
        Ok(current.into_iter().next().unwrap_or(Value::Null))
    } else {
        Ok(Value::List(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> Value {
        let mut inner = BTreeMap::new();
        inner.insert("name".to_string(), Value::String("db-password".to_string()));
        let mut entries = BTreeMap::new();
        entries.insert(
            "items".to_string(),
            Value::List(vec![
                Value::Map(inner.clone()),
                Value::Map({
                    let mut m = BTreeMap::new();
                    m.insert("name".to_string(), Value::String("api-key".to_string()));
                    m
                }),
            ]),
        );
        Value::Map(entries)
    }

    #[test]
    fn extracts_nested_field() {
        let v = extract(&sample(), "$.items[0].name").unwrap();
        assert_eq!(v.as_str(), Some("db-password"));
    }

    #[test]
    fn wildcard_collects_list_then_collapses_single_field_match() {
        let v = extract(&sample(), "$.items[*].name").unwrap();
        match v {
            Value::List(items) => {
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn single_match_collapses_out_of_list() {
        let v = extract(&sample(), "$.items[1].name").unwrap();
        assert_eq!(v, Value::String("api-key".to_string()));
    }

    #[test]
    fn root_path_returns_the_whole_value_unchanged() {
        assert_eq!(extract(&sample(), "$").unwrap(), sample());
    }

    #[test]
    fn trailing_wildcard_keeps_a_single_match_wrapped_in_a_list() {
        let mut one = BTreeMap::new();
        one.insert(
            "items".to_string(),
            Value::List(vec![Value::String("only".to_string())]),
        );
        let v = extract(&Value::Map(one), "$.items[*]").unwrap();
        assert_eq!(v, Value::List(vec![Value::String("only".to_string())]));
    }

    #[test]
    fn missing_field_errors() {
        let err = extract(&sample(), "$.missing").unwrap_err();
        assert_eq!(err, JsonPathError::NoMatch("$.missing".to_string()));
    }

    #[test]
    fn truly_empty_path_errors_but_bare_root_anchor_does_not() {
        assert_eq!(parse_path("").unwrap_err(), JsonPathError::Empty);
        assert!(parse_path("$").unwrap().is_empty());
    }
}
