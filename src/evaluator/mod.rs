//! Per-call evaluation of the node tree
//!
//! Every node answers `apply(context) -> contributed`: it appends whatever
//! text it produces into the accumulating context and reports whether it
//! contributed output. The tree itself is never mutated; all call state lives
//! in the [`DynamicContext`].

pub mod context;

pub use context::{DynamicContext, VariableScope};

use log::trace;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::ast::{
    BindNode, ChooseNode, ForeachNode, IfNode, MixedNode, SqlNode, TextNode, TrimNode,
};
use crate::error::EvaluationError;
use crate::expr::to_text;
use crate::parser::tokens::{self, BIND_OPEN, CLOSE, RAW_OPEN};

/// Leading tokens a `<where>` strips so clause fragments can always start
/// with their connective. Each token carries its trailing delimiter, so a
/// column named `ANDROID` is never mistaken for a connective.
static WHERE_PREFIX_OVERRIDES: Lazy<Vec<String>> = Lazy::new(|| {
    ["AND ", "OR ", "AND\t", "OR\t", "AND\n", "OR\n", "AND\r", "OR\r"]
        .iter()
        .map(|s| s.to_string())
        .collect()
});

/// `<set>` strips stray commas on either end of the assignment list
static SET_COMMA_OVERRIDES: Lazy<Vec<String>> = Lazy::new(|| vec![",".to_string()]);

/// Evaluate one node into the context, reporting whether it contributed
pub fn apply(node: &SqlNode, ctx: &mut DynamicContext<'_>) -> Result<bool, EvaluationError> {
    match node {
        SqlNode::StaticText(text) => {
            ctx.append(&text.text);
            Ok(!text.text.is_empty())
        }
        SqlNode::Text(text) => apply_text(text, ctx),
        SqlNode::Mixed(mixed) => apply_mixed(mixed, ctx),
        SqlNode::If(node) => apply_if(node, ctx),
        SqlNode::Choose(node) => apply_choose(node, ctx),
        SqlNode::Trim(node) => apply_trim(node, ctx),
        SqlNode::Where(node) => apply_trim_rules(
            ctx,
            &node.contents,
            Some("WHERE"),
            WHERE_PREFIX_OVERRIDES.as_slice(),
            None,
            &[],
        ),
        SqlNode::Set(node) => apply_trim_rules(
            ctx,
            &node.contents,
            Some("SET"),
            SET_COMMA_OVERRIDES.as_slice(),
            None,
            SET_COMMA_OVERRIDES.as_slice(),
        ),
        SqlNode::Foreach(node) => apply_foreach(node, ctx),
        SqlNode::Bind(node) => apply_bind(node, ctx),
    }
}

/// Evaluate a composite: children in order, contributed if any child was
pub fn apply_mixed(
    mixed: &MixedNode,
    ctx: &mut DynamicContext<'_>,
) -> Result<bool, EvaluationError> {
    let mut contributed = false;
    for child in &mixed.contents {
        if apply(child, ctx)? {
            contributed = true;
        }
    }
    Ok(contributed)
}

fn apply_text(node: &TextNode, ctx: &mut DynamicContext<'_>) -> Result<bool, EvaluationError> {
    // raw substitutions: evaluated against the scope and inserted verbatim,
    // never quoted or escaped
    let rendered = tokens::parse_markers(RAW_OPEN, CLOSE, &node.text, |expression| {
        let value = ctx.evaluate(expression.trim())?;
        Ok(to_text(&value))
    })?;
    let contributed = !rendered.is_empty();
    ctx.append(&rendered);
    Ok(contributed)
}

fn apply_if(node: &IfNode, ctx: &mut DynamicContext<'_>) -> Result<bool, EvaluationError> {
    if ctx.evaluate_boolean(&node.test)? {
        apply_mixed(&node.contents, ctx)
    } else {
        Ok(false)
    }
}

fn apply_choose(node: &ChooseNode, ctx: &mut DynamicContext<'_>) -> Result<bool, EvaluationError> {
    for when in &node.whens {
        if ctx.evaluate_boolean(&when.test)? {
            return apply_mixed(&when.contents, ctx);
        }
    }
    match &node.otherwise {
        Some(default) => apply_mixed(default, ctx),
        None => Ok(false),
    }
}

fn apply_trim(node: &TrimNode, ctx: &mut DynamicContext<'_>) -> Result<bool, EvaluationError> {
    apply_trim_rules(
        ctx,
        &node.contents,
        node.prefix.as_deref(),
        &node.prefix_overrides,
        node.suffix.as_deref(),
        &node.suffix_overrides,
    )
}

fn apply_trim_rules(
    ctx: &mut DynamicContext<'_>,
    contents: &MixedNode,
    prefix: Option<&str>,
    prefix_overrides: &[String],
    suffix: Option<&str>,
    suffix_overrides: &[String],
) -> Result<bool, EvaluationError> {
    let saved = ctx.swap_buffer(String::new());
    let applied = apply_mixed(contents, ctx);
    let isolated = ctx.swap_buffer(saved);
    applied?;

    let mut body = isolated.trim();
    if body.is_empty() {
        return Ok(false);
    }
    if let Some(token) = longest_match(body, prefix_overrides, true) {
        body = body[token.len()..].trim_start();
    }
    if let Some(token) = longest_match(body, suffix_overrides, false) {
        body = body[..body.len() - token.len()].trim_end();
    }
    if body.is_empty() {
        return Ok(false);
    }

    if let Some(prefix) = prefix {
        ctx.append(prefix);
        ctx.append(" ");
    }
    ctx.append(body);
    if let Some(suffix) = suffix {
        ctx.append(" ");
        ctx.append(suffix);
    }
    Ok(true)
}

/// Case-insensitive override-token match; the longest applicable token wins
fn longest_match<'t>(body: &str, override_tokens: &'t [String], at_start: bool) -> Option<&'t str> {
    override_tokens
        .iter()
        .map(String::as_str)
        .filter(|token| {
            token.len() <= body.len()
                && if at_start {
                    body.as_bytes()[..token.len()].eq_ignore_ascii_case(token.as_bytes())
                } else {
                    body.as_bytes()[body.len() - token.len()..]
                        .eq_ignore_ascii_case(token.as_bytes())
                }
        })
        .max_by_key(|token| token.len())
}

fn apply_foreach(
    node: &ForeachNode,
    ctx: &mut DynamicContext<'_>,
) -> Result<bool, EvaluationError> {
    let collection = ctx.evaluate(&node.collection)?;
    let entries: Vec<(Value, Value)> = match collection {
        Value::Null => {
            if node.nullable {
                Vec::new()
            } else {
                return Err(EvaluationError::null_collection(&node.collection));
            }
        }
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(position, item)| (Value::from(position), item))
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| (Value::String(key), item))
            .collect(),
        // single-valued array view: one iteration over the scalar itself
        single => vec![(Value::from(0), single)],
    };
    trace!(
        "foreach over '{}': {} elements",
        node.collection,
        entries.len()
    );

    let mut joined = String::new();
    let mut contributed = false;
    for (index_value, item_value) in entries {
        let n = ctx.unique_number();
        let item_key = decorated_name(&node.item, n);
        let index_key = node.index.as_deref().map(|name| decorated_name(name, n));

        ctx.scope_mut().push_frame();
        ctx.scope_mut().bind(&node.item, item_value.clone());
        if let Some(index_name) = node.index.as_deref() {
            ctx.scope_mut().bind(index_name, index_value.clone());
        }
        let saved = ctx.swap_buffer(String::new());
        let applied = apply_mixed(&node.contents, ctx);
        let body = ctx.swap_buffer(saved);
        ctx.scope_mut().pop_frame();
        applied?;

        let body = decorate_iteration(
            &body,
            &node.item,
            &item_key,
            node.index.as_deref(),
            index_key.as_deref(),
        )?;
        ctx.bind_additional(item_key, item_value);
        if let Some(key) = index_key {
            ctx.bind_additional(key, index_value);
        }

        if body.is_empty() {
            continue;
        }
        if contributed {
            if let Some(separator) = &node.separator {
                joined.push_str(separator);
            }
        }
        joined.push_str(&body);
        contributed = true;
    }

    if contributed {
        if let Some(open) = &node.open {
            ctx.append(open);
        }
        ctx.append(&joined);
        if let Some(close) = &node.close {
            ctx.append(close);
        }
    }
    Ok(contributed)
}

fn apply_bind(node: &BindNode, ctx: &mut DynamicContext<'_>) -> Result<bool, EvaluationError> {
    let value = ctx.evaluate(&node.value)?;
    ctx.scope_mut().bind(&node.name, value.clone());
    // placeholder extraction resolves #{name} against the additional map,
    // so bound variables must surface there as well
    ctx.bind_additional(node.name.clone(), value);
    Ok(false)
}

/// Decorated bind name for one loop iteration: a pure function of the loop
/// variable name and the context's unique counter, so repeated expressions
/// across iterations map to distinct, reproducible binding keys
fn decorated_name(name: &str, n: usize) -> String {
    format!("__frch_{name}_{n}")
}

/// Rewrite `#{...}` references to the loop variables inside one iteration's
/// output so each iteration binds its own value
fn decorate_iteration(
    body: &str,
    item: &str,
    item_key: &str,
    index: Option<&str>,
    index_key: Option<&str>,
) -> Result<String, EvaluationError> {
    if !tokens::contains_marker(BIND_OPEN, body) {
        return Ok(body.to_string());
    }
    tokens::parse_markers(BIND_OPEN, CLOSE, body, |marker| {
        let (expression_part, attrs_part) = match marker.find(',') {
            Some(split) => (&marker[..split], Some(&marker[split..])),
            None => (marker, None),
        };
        let expression = expression_part.trim();
        let segment_end = expression.find(['.', '[']).unwrap_or(expression.len());
        let (first, rest) = expression.split_at(segment_end);
        let rewritten = if first == item {
            format!("{item_key}{rest}")
        } else if index.is_some_and(|name| name == first) {
            format!("{}{rest}", index_key.unwrap_or(first))
        } else {
            expression.to_string()
        };
        let mut out = String::with_capacity(marker.len() + 12);
        out.push_str(BIND_OPEN);
        out.push_str(&rewritten);
        if let Some(attrs) = attrs_part {
            out.push_str(attrs);
        }
        out.push_str(CLOSE);
        Ok(out)
    })
}
