// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merge strategies for combining an ordered list of config sources into
//! one resolved value.

use thiserror::Error;
use tw_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Incoming top-level map keys overwrite base keys; no recursion.
    Shallow,
    /// Maps merge recursively; non-map values (including lists) are
    /// replaced wholesale by the incoming value.
    Deep,
    /// The incoming value wholly replaces the base.
    Replace,
    /// Like `Deep`, but lists are concatenated (base items, then
    /// incoming items) instead of replaced.
    Additive,
    /// Like `Replace`, but errors if the incoming value's variant
    /// differs from the base's.
    TypesafeReplace,
    /// Like `Additive`, but errors if the incoming value's variant
    /// differs from the base's at any merged position.
    TypesafeAdditive,
}

#[derive(Debug, Error, PartialEq)]
#[error("type mismatch while merging at {path:?}: base is {base_kind}, incoming is {incoming_kind}")]
pub struct TypeMismatchError {
    pub path: String,
    pub base_kind: &'static str,
    pub incoming_kind: &'static str,
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::List(_) => "list",
        Value::Map(_) => "map",
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    kind(a) == kind(b)
}

pub fn merge(
    base: &Value,
    incoming: &Value,
    strategy: MergeStrategy,
) -> Result<Value, TypeMismatchError> {
    merge_at("$", base, incoming, strategy)
}

fn merge_at(
    path: &str,
    base: &Value,
    incoming: &Value,
    strategy: MergeStrategy,
) -> Result<Value, TypeMismatchError> {
    use MergeStrategy::*;
    match strategy {
        Replace => Ok(incoming.clone()),
        TypesafeReplace => {
            if base.is_null() || same_kind(base, incoming) {
                Ok(incoming.clone())
            } else {
                Err(TypeMismatchError {
                    path: path.to_string(),
                    base_kind: kind(base),
                    incoming_kind: kind(incoming),
                })
            }
        }
        Shallow => match (base, incoming) {
            (Value::Map(b), Value::Map(i)) => {
                let mut out = b.clone();
                for (k, v) in i {
                    out.insert(k.clone(), v.clone());
                }
                Ok(Value::Map(out))
            }
            _ => Ok(incoming.clone()),
        },
        Deep => deep_merge(path, base, incoming, false, false),
        Additive => deep_merge(path, base, incoming, true, false),
        TypesafeAdditive => deep_merge(path, base, incoming, true, true),
    }
}

fn deep_merge(
    path: &str,
    base: &Value,
    incoming: &Value,
    concat_lists: bool,
    typesafe: bool,
) -> Result<Value, TypeMismatchError> {
    match (base, incoming) {
        (Value::Map(b), Value::Map(i)) => {
            let mut out = b.clone();
            for (k, v) in i {
                let child_path = format!("{path}.{k}");
                match out.get(k) {
                    Some(existing) => {
                        out.insert(
                            k.clone(),
                            deep_merge(&child_path, existing, v, concat_lists, typesafe)?,
                        );
                    }
                    None => {
                        out.insert(k.clone(), v.clone());
                    }
                }
            }
            Ok(Value::Map(out))
        }
        (Value::List(b), Value::List(i)) if concat_lists => {
            let mut out = b.clone();
            out.extend(i.clone());
            Ok(Value::List(out))
        }
        (b, i) => {
            if typesafe && !b.is_null() && !same_kind(b, i) {
                Err(TypeMismatchError {
                    path: path.to_string(),
                    base_kind: kind(b),
                    incoming_kind: kind(i),
                })
            } else {
                Ok(i.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn shallow_overwrites_only_top_level_keys() {
        let base = map(&[("a", map(&[("x", Value::Number(1.0))])), ("b", Value::Number(1.0))]);
        let incoming = map(&[("a", map(&[("y", Value::Number(2.0))]))]);
        let merged = merge(&base, &incoming, MergeStrategy::Shallow).unwrap();
        let m = merged.as_map().unwrap();
        assert!(m.get("a").unwrap().as_map().unwrap().get("x").is_none());
        assert_eq!(m.get("b").unwrap(), &Value::Number(1.0));
    }

    #[test]
    fn deep_merges_nested_maps_and_replaces_scalars() {
        let base = map(&[("a", map(&[("x", Value::Number(1.0)), ("y", Value::Number(1.0))]))]);
        let incoming = map(&[("a", map(&[("y", Value::Number(2.0))]))]);
        let merged = merge(&base, &incoming, MergeStrategy::Deep).unwrap();
        let inner = merged.as_map().unwrap().get("a").unwrap().as_map().unwrap();
        assert_eq!(inner.get("x").unwrap(), &Value::Number(1.0));
        assert_eq!(inner.get("y").unwrap(), &Value::Number(2.0));
    }

    #[test]
    fn deep_replaces_lists_wholesale() {
        let base = map(&[("a", Value::List(vec![Value::Number(1.0)]))]);
        let incoming = map(&[("a", Value::List(vec![Value::Number(2.0)]))]);
        let merged = merge(&base, &incoming, MergeStrategy::Deep).unwrap();
        assert_eq!(
            merged.as_map().unwrap().get("a").unwrap().as_list().unwrap(),
            &[Value::Number(2.0)]
        );
    }

    #[test]
    fn additive_concatenates_lists() {
        let base = map(&[("a", Value::List(vec![Value::Number(1.0)]))]);
        let incoming = map(&[("a", Value::List(vec![Value::Number(2.0)]))]);
        let merged = merge(&base, &incoming, MergeStrategy::Additive).unwrap();
        assert_eq!(
            merged.as_map().unwrap().get("a").unwrap().as_list().unwrap(),
            &[Value::Number(1.0), Value::Number(2.0)]
        );
    }

    #[test]
    fn replace_wholly_discards_base() {
        let base = map(&[("a", Value::Number(1.0)), ("b", Value::Number(2.0))]);
        let incoming = map(&[("c", Value::Number(3.0))]);
        let merged = merge(&base, &incoming, MergeStrategy::Replace).unwrap();
        let m = merged.as_map().unwrap();
        assert!(m.get("a").is_none());
        assert_eq!(m.get("c").unwrap(), &Value::Number(3.0));
    }

    #[test]
    fn typesafe_replace_rejects_type_change() {
        let base = Value::Number(1.0);
        let incoming = Value::String("x".to_string());
        let err = merge(&base, &incoming, MergeStrategy::TypesafeReplace).unwrap_err();
        assert_eq!(err.base_kind, "number");
        assert_eq!(err.incoming_kind, "string");
    }

    #[test]
    fn typesafe_replace_allows_replacing_null() {
        let base = Value::Null;
        let incoming = Value::String("x".to_string());
        assert!(merge(&base, &incoming, MergeStrategy::TypesafeReplace).is_ok());
    }

    #[test]
    fn typesafe_additive_rejects_nested_type_change() {
        let base = map(&[("a", Value::Number(1.0))]);
        let incoming = map(&[("a", Value::List(vec![]))]);
        let err = merge(&base, &incoming, MergeStrategy::TypesafeAdditive).unwrap_err();
        assert_eq!(err.path, "$.a");
    }
}
