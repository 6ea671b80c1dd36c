//! Binding descriptors and the bound-SQL output contract
//!
//! Placeholder extraction turns the rendered text into `(sql, parameters)`;
//! the index correspondence between `?` positions and the parameters list is
//! the contract consumed by whatever executes the statement.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expr::path::{PathSegment, lookup, parse_path};

/// SQL type annotation for a binding, explicit or inferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    /// Character string
    Varchar,
    /// Fixed-length character string
    Char,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    Bigint,
    /// 16-bit integer
    Smallint,
    /// Double-precision floating point
    Double,
    /// Single-precision floating point
    Float,
    /// Exact decimal
    Decimal,
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time
    Timestamp,
    /// Binary large object
    Blob,
    /// Character large object
    Clob,
    /// Structured JSON document
    Json,
    /// SQL NULL
    Null,
    /// Anything the other variants do not cover
    Other,
}

impl SqlType {
    /// Infer a type from a runtime value
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => SqlType::Null,
            Value::Bool(_) => SqlType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => SqlType::Bigint,
            Value::Number(_) => SqlType::Double,
            Value::String(_) => SqlType::Varchar,
            Value::Array(_) | Value::Object(_) => SqlType::Json,
        }
    }
}

impl FromStr for SqlType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VARCHAR" => Ok(SqlType::Varchar),
            "CHAR" => Ok(SqlType::Char),
            "INTEGER" | "INT" => Ok(SqlType::Integer),
            "BIGINT" => Ok(SqlType::Bigint),
            "SMALLINT" => Ok(SqlType::Smallint),
            "DOUBLE" => Ok(SqlType::Double),
            "FLOAT" => Ok(SqlType::Float),
            "DECIMAL" | "NUMERIC" => Ok(SqlType::Decimal),
            "BOOLEAN" | "BOOL" => Ok(SqlType::Boolean),
            "DATE" => Ok(SqlType::Date),
            "TIME" => Ok(SqlType::Time),
            "TIMESTAMP" => Ok(SqlType::Timestamp),
            "BLOB" => Ok(SqlType::Blob),
            "CLOB" => Ok(SqlType::Clob),
            "JSON" => Ok(SqlType::Json),
            "NULL" => Ok(SqlType::Null),
            "OTHER" => Ok(SqlType::Other),
            other => Err(format!("unknown SQL type '{other}'")),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Varchar => "VARCHAR",
            SqlType::Char => "CHAR",
            SqlType::Integer => "INTEGER",
            SqlType::Bigint => "BIGINT",
            SqlType::Smallint => "SMALLINT",
            SqlType::Double => "DOUBLE",
            SqlType::Float => "FLOAT",
            SqlType::Decimal => "DECIMAL",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Blob => "BLOB",
            SqlType::Clob => "CLOB",
            SqlType::Json => "JSON",
            SqlType::Null => "NULL",
            SqlType::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Direction of a binding for statements with output parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterMode {
    /// Input value (the default)
    #[default]
    In,
    /// Output value, not supplied by the caller
    Out,
    /// Both directions
    InOut,
}

impl FromStr for ParameterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(ParameterMode::In),
            "OUT" => Ok(ParameterMode::Out),
            "INOUT" => Ok(ParameterMode::InOut),
            other => Err(format!("unknown parameter mode '{other}'")),
        }
    }
}

/// One placeholder's binding descriptor, in output order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    /// Raw expression text from inside the `#{...}` marker
    pub expression: String,
    /// Position in the output sequence (0-based, matches the `?` order)
    pub ordinal: usize,
    /// SQL type: explicit annotation, declared-type hint, or runtime guess
    pub sql_type: Option<SqlType>,
    /// Binding direction
    pub mode: ParameterMode,
    /// `numericScale` annotation for decimal out-parameters
    pub numeric_scale: Option<u32>,
    /// `resultMap` annotation for cursor out-parameters
    pub result_map: Option<String>,
    /// `typeHandler` annotation naming a caller-registered conversion
    pub type_handler: Option<String>,
    /// `length` annotation for sized character/binary parameters
    pub length: Option<usize>,
}

impl ParameterMapping {
    /// Create a plain input mapping with no annotations
    pub fn new(expression: impl Into<String>, ordinal: usize) -> Self {
        Self {
            expression: expression.into(),
            ordinal,
            sql_type: None,
            mode: ParameterMode::In,
            numeric_scale: None,
            result_map: None,
            type_handler: None,
            length: None,
        }
    }
}

/// Final SQL text plus its ordered bindings
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSql {
    /// SQL text with every placeholder replaced by `?`
    pub sql: String,
    /// Binding descriptors in placeholder order, left to right
    pub parameters: Vec<ParameterMapping>,
    /// Values produced during evaluation (loop-iteration bindings and
    /// `bind` variables), consulted before the parameter object
    pub additional: FxHashMap<String, Value>,
}

impl BoundSql {
    /// Resolve the ordered bind-value list against a parameter object.
    ///
    /// Output-mode parameters and unresolvable paths bind NULL.
    pub fn values(&self, parameter: &Value) -> Vec<Value> {
        let runtime = RuntimeValues {
            parameter,
            additional: &self.additional,
        };
        self.parameters
            .iter()
            .map(|mapping| {
                if mapping.mode == ParameterMode::Out {
                    Value::Null
                } else {
                    runtime.resolve(&mapping.expression).unwrap_or(Value::Null)
                }
            })
            .collect()
    }
}

/// Value resolution shared by extraction and [`BoundSql::values`]:
/// additional bindings first, then the parameter object's properties, with
/// `_parameter` naming the whole object
pub struct RuntimeValues<'a> {
    /// The call's parameter object
    pub parameter: &'a Value,
    /// Additional bindings from evaluation
    pub additional: &'a FxHashMap<String, Value>,
}

impl RuntimeValues<'_> {
    /// Resolve a property-path expression to a value, if the path exists
    pub fn resolve(&self, expression: &str) -> Option<Value> {
        let segments = parse_path(expression).ok()?;
        let (first, rest) = segments.split_first()?;
        if let PathSegment::Property(name) = first {
            if let Some(base) = self.additional.get(name) {
                return lookup(base, rest).cloned();
            }
            if name == "_parameter" {
                return lookup(self.parameter, rest).cloned();
            }
        }
        lookup(self.parameter, &segments).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sql_type_parsing() {
        assert_eq!("varchar".parse::<SqlType>().unwrap(), SqlType::Varchar);
        assert_eq!("TIMESTAMP".parse::<SqlType>().unwrap(), SqlType::Timestamp);
        assert!("VARCHAR2".parse::<SqlType>().is_err());
    }

    #[test]
    fn test_sql_type_of_value() {
        assert_eq!(SqlType::of_value(&json!(null)), SqlType::Null);
        assert_eq!(SqlType::of_value(&json!(true)), SqlType::Boolean);
        assert_eq!(SqlType::of_value(&json!(7)), SqlType::Bigint);
        assert_eq!(SqlType::of_value(&json!(7.5)), SqlType::Double);
        assert_eq!(SqlType::of_value(&json!("x")), SqlType::Varchar);
        assert_eq!(SqlType::of_value(&json!([1])), SqlType::Json);
    }

    #[test]
    fn test_values_resolve_additional_before_parameter() {
        let mut additional = FxHashMap::default();
        additional.insert("name".to_string(), json!("bound"));
        let bound = BoundSql {
            sql: "SELECT ?, ?".to_string(),
            parameters: vec![
                ParameterMapping::new("name", 0),
                ParameterMapping::new("age", 1),
            ],
            additional,
        };
        assert_eq!(
            bound.values(&json!({"name": "param", "age": 36})),
            vec![json!("bound"), json!(36)]
        );
    }

    #[test]
    fn test_values_for_out_and_missing() {
        let mut out_mapping = ParameterMapping::new("cursor", 0);
        out_mapping.mode = ParameterMode::Out;
        let bound = BoundSql {
            sql: "CALL sync(?, ?)".to_string(),
            parameters: vec![out_mapping, ParameterMapping::new("missing.deep", 1)],
            additional: FxHashMap::default(),
        };
        assert_eq!(
            bound.values(&json!({"cursor": 1})),
            vec![json!(null), json!(null)]
        );
    }

    #[test]
    fn test_whole_parameter_binding() {
        let bound = BoundSql {
            sql: "SELECT ?".to_string(),
            parameters: vec![ParameterMapping::new("_parameter", 0)],
            additional: FxHashMap::default(),
        };
        assert_eq!(bound.values(&json!(42)), vec![json!(42)]);
    }
}
