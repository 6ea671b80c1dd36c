//! Tree-walking evaluation of expression ASTs over JSON values

use serde_json::{Number, Value};

use super::ast::{BinaryOperator, ExprNode, LiteralValue, UnaryOperator};
use crate::error::EvaluationError;
use crate::evaluator::VariableScope;

/// Evaluate an expression AST against a variable scope
pub fn evaluate(expr: &ExprNode, scope: &VariableScope) -> Result<Value, EvaluationError> {
    match expr {
        ExprNode::Literal(literal) => literal_value(literal),
        // unknown names resolve to null so `x != null` tests stay writable
        ExprNode::Variable(name) => Ok(scope.resolve(name).unwrap_or(Value::Null)),
        ExprNode::Property { base, name } => match evaluate(base, scope)? {
            Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        },
        ExprNode::Index { base, index } => {
            let base = evaluate(base, scope)?;
            let index = evaluate(index, scope)?;
            Ok(match (&base, &index) {
                (Value::Array(items), Value::Number(n)) => n
                    .as_u64()
                    .and_then(|i| items.get(i as usize))
                    .cloned()
                    .unwrap_or(Value::Null),
                (Value::Object(map), Value::String(key)) => {
                    map.get(key).cloned().unwrap_or(Value::Null)
                }
                _ => Value::Null,
            })
        }
        ExprNode::Unary { op, operand } => {
            let value = evaluate(operand, scope)?;
            match op {
                UnaryOperator::Not => Ok(Value::Bool(!truthy(&value))),
                UnaryOperator::Neg => negate(value),
            }
        }
        ExprNode::Binary(data) => match data.op {
            BinaryOperator::And => {
                if !truthy(&evaluate(&data.left, scope)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(truthy(&evaluate(&data.right, scope)?)))
            }
            BinaryOperator::Or => {
                if truthy(&evaluate(&data.left, scope)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(truthy(&evaluate(&data.right, scope)?)))
            }
            op => {
                let left = evaluate(&data.left, scope)?;
                let right = evaluate(&data.right, scope)?;
                binary_op(op, left, right)
            }
        },
    }
}

/// Truthiness for boolean contexts: null is false, numbers are nonzero,
/// strings are non-empty, containers are always true
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a value as raw substitution text: null becomes the empty string,
/// strings are unquoted, everything else uses its JSON form
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn literal_value(literal: &LiteralValue) -> Result<Value, EvaluationError> {
    Ok(match literal {
        LiteralValue::Null => Value::Null,
        LiteralValue::Boolean(b) => Value::Bool(*b),
        LiteralValue::Integer(i) => Value::Number(Number::from(*i)),
        LiteralValue::Decimal(d) => Value::Number(
            Number::from_f64(*d)
                .ok_or_else(|| EvaluationError::expression("non-finite decimal literal"))?,
        ),
        LiteralValue::String(s) => Value::String(s.clone()),
    })
}

fn binary_op(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvaluationError> {
    match op {
        BinaryOperator::Eq => Ok(Value::Bool(loose_eq(&left, &right))),
        BinaryOperator::NotEq => Ok(Value::Bool(!loose_eq(&left, &right))),
        BinaryOperator::Lt | BinaryOperator::LtEq | BinaryOperator::Gt | BinaryOperator::GtEq => {
            compare(op, &left, &right)
        }
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Sub => arithmetic(op, left, right),
        BinaryOperator::Mul => arithmetic(op, left, right),
        BinaryOperator::Div => arithmetic(op, left, right),
        BinaryOperator::Mod => arithmetic(op, left, right),
        BinaryOperator::And | BinaryOperator::Or => {
            unreachable!("logical operators are short-circuited by the caller")
        }
    }
}

/// Equality with numeric coercion: `1 == 1.0` holds
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => l.cmp(r),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => l.partial_cmp(&r).ok_or_else(|| {
                EvaluationError::expression("cannot order non-finite numbers")
            })?,
            _ => {
                return Err(EvaluationError::expression(format!(
                    "cannot compare {} and {}",
                    type_name(left),
                    type_name(right)
                )));
            }
        },
    };
    Ok(Value::Bool(match op {
        BinaryOperator::Lt => ordering.is_lt(),
        BinaryOperator::LtEq => ordering.is_le(),
        BinaryOperator::Gt => ordering.is_gt(),
        BinaryOperator::GtEq => ordering.is_ge(),
        _ => unreachable!(),
    }))
}

/// `+` concatenates as soon as either side is a string
fn add(left: Value, right: Value) -> Result<Value, EvaluationError> {
    if left.is_string() || right.is_string() {
        return Ok(Value::String(format!("{}{}", to_text(&left), to_text(&right))));
    }
    arithmetic(BinaryOperator::Add, left, right)
}

fn arithmetic(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvaluationError> {
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        let result = match op {
            BinaryOperator::Add => l.checked_add(r),
            BinaryOperator::Sub => l.checked_sub(r),
            BinaryOperator::Mul => l.checked_mul(r),
            BinaryOperator::Div => l.checked_div(r),
            BinaryOperator::Mod => l.checked_rem(r),
            _ => unreachable!(),
        };
        return result.map(|v| Value::Number(Number::from(v))).ok_or_else(|| {
            EvaluationError::expression(format!(
                "integer arithmetic failed for {l} {} {r}",
                op_symbol(op)
            ))
        });
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => {
            let result = match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Sub => l - r,
                BinaryOperator::Mul => l * r,
                BinaryOperator::Div => l / r,
                BinaryOperator::Mod => l % r,
                _ => unreachable!(),
            };
            Number::from_f64(result)
                .map(Value::Number)
                .ok_or_else(|| EvaluationError::expression("non-finite arithmetic result"))
        }
        _ => Err(EvaluationError::expression(format!(
            "cannot apply '{}' to {} and {}",
            op_symbol(op),
            type_name(&left),
            type_name(&right)
        ))),
    }
}

fn negate(value: Value) -> Result<Value, EvaluationError> {
    if let Some(i) = value.as_i64() {
        return Ok(Value::Number(Number::from(-i)));
    }
    if let Some(f) = value.as_f64() {
        return Number::from_f64(-f)
            .map(Value::Number)
            .ok_or_else(|| EvaluationError::expression("non-finite arithmetic result"));
    }
    Err(EvaluationError::expression(format!(
        "cannot negate {}",
        type_name(&value)
    )))
}

fn op_symbol(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Add => "+",
        BinaryOperator::Sub => "-",
        BinaryOperator::Mul => "*",
        BinaryOperator::Div => "/",
        BinaryOperator::Mod => "%",
        _ => "?",
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_expression;
    use rstest::rstest;
    use serde_json::json;

    fn eval(expression: &str, parameter: Value) -> Result<Value, EvaluationError> {
        let scope = VariableScope::new(parameter);
        evaluate(&parse_expression(expression).unwrap(), &scope)
    }

    #[test]
    fn test_null_checks() {
        let param = json!({"name": "ada"});
        assert_eq!(eval("name != null", param.clone()).unwrap(), json!(true));
        assert_eq!(eval("missing != null", param).unwrap(), json!(false));
    }

    #[test]
    fn test_numeric_coercion_in_equality() {
        assert_eq!(eval("a == 1", json!({"a": 1.0})).unwrap(), json!(true));
        assert_eq!(eval("a == '1'", json!({"a": 1})).unwrap(), json!(false));
    }

    #[test]
    fn test_comparisons() {
        let param = json!({"age": 21, "name": "bo"});
        assert_eq!(eval("age >= 18", param.clone()).unwrap(), json!(true));
        assert_eq!(eval("name < 'z'", param.clone()).unwrap(), json!(true));
        assert!(eval("name > 3", param).is_err());
    }

    #[test]
    fn test_short_circuit_logic() {
        let param = json!({"user": {"age": 30}});
        // right side would error on comparing null, but is never reached
        assert_eq!(
            eval("missing != null and missing.age > 18", param.clone()).unwrap(),
            json!(false)
        );
        assert_eq!(
            eval("user != null and user.age > 18", param).unwrap(),
            json!(true)
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            eval("'%' + name + '%'", json!({"name": "li"})).unwrap(),
            json!("%li%")
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 1", json!({})).unwrap(), json!(2));
        assert_eq!(eval("7 / 2", json!({})).unwrap(), json!(3));
        assert_eq!(eval("7.0 / 2", json!({})).unwrap(), json!(3.5));
        assert_eq!(eval("-n", json!({"n": 4})).unwrap(), json!(-4));
        assert!(eval("1 / 0", json!({})).is_err());
    }

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!(false), false)]
    #[case(json!(0), false)]
    #[case(json!(""), false)]
    #[case(json!(1), true)]
    #[case(json!("x"), true)]
    #[case(json!([]), true)]
    #[case(json!({}), true)]
    fn test_truthiness(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(truthy(&value), expected);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&json!(null)), "");
        assert_eq!(to_text(&json!("name")), "name");
        assert_eq!(to_text(&json!(7)), "7");
        assert_eq!(to_text(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_index_access() {
        let param = json!({"ids": [10, 20, 30]});
        assert_eq!(eval("ids[1]", param.clone()).unwrap(), json!(20));
        assert_eq!(eval("ids[9]", param).unwrap(), json!(null));
    }
}
