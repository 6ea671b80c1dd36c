//! Textual property paths
//!
//! Bind placeholders reference values by property path (`user.address.city`,
//! `ids[0]`, `map['key']`). This module parses those paths and resolves them
//! against a JSON value; the expression evaluator shares the same lookup
//! rules through its structured AST.

use serde_json::Value;

use crate::error::EvaluationError;

/// One step of a property path
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// `.name` property access
    Property(String),
    /// `[0]` positional access
    Index(usize),
    /// `['key']` keyed access
    Key(String),
}

/// Parse a textual property path into its segments
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, EvaluationError> {
    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;

    loop {
        let start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
            pos += 1;
        }
        if pos == start {
            return Err(malformed(path));
        }
        segments.push(PathSegment::Property(path[start..pos].to_string()));

        loop {
            match bytes.get(pos) {
                Some(b'[') => {
                    let close = path[pos..]
                        .find(']')
                        .map(|offset| pos + offset)
                        .ok_or_else(|| malformed(path))?;
                    let inner = path[pos + 1..close].trim();
                    if let Some(stripped) = inner
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                    {
                        segments.push(PathSegment::Key(stripped.to_string()));
                    } else {
                        let index: usize = inner.parse().map_err(|_| malformed(path))?;
                        segments.push(PathSegment::Index(index));
                    }
                    pos = close + 1;
                }
                Some(b'.') => {
                    pos += 1;
                    break;
                }
                None => return Ok(segments),
                Some(_) => return Err(malformed(path)),
            }
        }
    }
}

/// Walk `segments` down from `root`, returning `None` where the path leaves
/// the value
pub fn lookup<'v>(root: &'v Value, segments: &[PathSegment]) -> Option<&'v Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Property(name), Value::Object(map)) => map.get(name)?,
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

fn malformed(path: &str) -> EvaluationError {
    EvaluationError::expression(format!("malformed property path '{path}'"))
}
