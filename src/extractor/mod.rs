//! Bind-placeholder extraction
//!
//! One pass over the fully rendered text replaces each `#{...}` marker with
//! a positional `?` and records a [`ParameterMapping`] in placeholder order.
//! The marker body is an expression plus optional comma-delimited
//! `name=value` annotations:
//!
//! ```text
//! #{amount, sqlType=DECIMAL, numericScale=2}
//! #{cursor, mode=OUT, resultMap=rows}
//! ```

use std::str::FromStr;

use crate::binding::{ParameterMapping, ParameterMode, RuntimeValues, SqlType};
use crate::error::EvaluationError;
use crate::metadata::TypeHints;
use crate::parser::tokens::{self, BIND_OPEN, CLOSE};

/// Extract placeholders from rendered text.
///
/// `runtime` carries the call's values for type inference on dynamic
/// templates; static templates extract at build time and pass `None`.
pub fn extract(
    sql: &str,
    parameter_type: Option<&str>,
    hints: &dyn TypeHints,
    runtime: Option<&RuntimeValues<'_>>,
) -> Result<(String, Vec<ParameterMapping>), EvaluationError> {
    let mut parameters = Vec::new();
    let text = tokens::parse_markers(BIND_OPEN, CLOSE, sql, |marker| {
        let mapping = parse_placeholder(marker, parameters.len(), parameter_type, hints, runtime)?;
        parameters.push(mapping);
        Ok("?".to_string())
    })?;
    Ok((text, parameters))
}

fn parse_placeholder(
    marker: &str,
    ordinal: usize,
    parameter_type: Option<&str>,
    hints: &dyn TypeHints,
    runtime: Option<&RuntimeValues<'_>>,
) -> Result<ParameterMapping, EvaluationError> {
    let mut parts = marker.split(',');
    let expression = parts
        .next()
        .unwrap_or_default()
        .trim();
    if expression.is_empty() {
        return Err(EvaluationError::empty_marker(BIND_OPEN));
    }

    let mut mapping = ParameterMapping::new(expression, ordinal);
    for attribute in parts {
        let (name, value) = attribute.split_once('=').ok_or_else(|| {
            EvaluationError::InvalidPlaceholderAttribute {
                attribute: attribute.trim().to_string(),
                value: String::new(),
                message: "expected name=value".to_string(),
            }
        })?;
        let (name, value) = (name.trim(), value.trim());
        match name {
            "sqlType" => {
                mapping.sql_type = Some(SqlType::from_str(value).map_err(|message| {
                    invalid_attribute(name, value, message)
                })?);
            }
            "mode" => {
                mapping.mode = ParameterMode::from_str(value).map_err(|message| {
                    invalid_attribute(name, value, message)
                })?;
            }
            "numericScale" => {
                mapping.numeric_scale = Some(value.parse().map_err(|_| {
                    invalid_attribute(name, value, "expected a non-negative integer")
                })?);
            }
            "resultMap" => mapping.result_map = Some(value.to_string()),
            "typeHandler" => mapping.type_handler = Some(value.to_string()),
            "length" => {
                mapping.length = Some(value.parse().map_err(|_| {
                    invalid_attribute(name, value, "expected a non-negative integer")
                })?);
            }
            other => {
                return Err(EvaluationError::UnknownPlaceholderAttribute {
                    attribute: other.to_string(),
                    placeholder: marker.to_string(),
                });
            }
        }
    }

    if mapping.sql_type.is_none() {
        // declared-type hint first, then runtime inspection of the value
        mapping.sql_type = parameter_type
            .and_then(|pt| hints.property_type(pt, expression))
            .or_else(|| {
                runtime
                    .and_then(|values| values.resolve(expression))
                    .map(|value| SqlType::of_value(&value))
            });
    }
    Ok(mapping)
}

fn invalid_attribute(
    attribute: &str,
    value: &str,
    message: impl Into<String>,
) -> EvaluationError {
    EvaluationError::InvalidPlaceholderAttribute {
        attribute: attribute.to_string(),
        value: value.to_string(),
        message: message.into(),
    }
}
