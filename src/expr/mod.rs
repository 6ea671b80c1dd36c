//! Expression evaluation collaborator
//!
//! The templating engine treats expression evaluation as an opaque
//! collaborator behind [`ExpressionEvaluator`]; this module also ships the
//! default implementation: a hand-rolled tokenizer, a Pratt parser, and a
//! tree-walking evaluator over JSON values. Compiled expressions are cached
//! per evaluator instance — a template-level optimization that never spans a
//! single evaluation.

pub mod ast;
pub mod eval;
pub mod parser;
pub mod path;
pub mod tokenizer;

use std::sync::Mutex;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::EvaluationError;
use crate::evaluator::VariableScope;
pub use ast::{BinaryExprData, BinaryOperator, ExprNode, LiteralValue, UnaryOperator};
pub use eval::{to_text, truthy};
pub use parser::parse_expression;

/// Boolean/value expression evaluator, callable with a variable scope
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate an expression to a value
    fn evaluate(&self, expression: &str, scope: &VariableScope)
    -> Result<Value, EvaluationError>;

    /// Evaluate an expression as a boolean test
    fn evaluate_boolean(
        &self,
        expression: &str,
        scope: &VariableScope,
    ) -> Result<bool, EvaluationError> {
        Ok(truthy(&self.evaluate(expression, scope)?))
    }
}

/// Default expression evaluator with a bounded compiled-expression cache
pub struct DefaultExpressionEvaluator {
    compiled: Mutex<FxHashMap<String, ExprNode>>,
    max_cache_size: usize,
}

impl Default for DefaultExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultExpressionEvaluator {
    /// Create a new evaluator
    pub fn new() -> Self {
        Self {
            compiled: Mutex::new(FxHashMap::default()),
            max_cache_size: 1024,
        }
    }

    fn compile(&self, expression: &str) -> Result<ExprNode, EvaluationError> {
        let mut cache = self
            .compiled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(ast) = cache.get(expression) {
            return Ok(ast.clone());
        }
        let ast = parse_expression(expression).map_err(|e| e.in_expression(expression))?;
        if cache.len() >= self.max_cache_size {
            cache.clear();
        }
        cache.insert(expression.to_string(), ast.clone());
        Ok(ast)
    }
}

impl ExpressionEvaluator for DefaultExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        scope: &VariableScope,
    ) -> Result<Value, EvaluationError> {
        let ast = self.compile(expression)?;
        eval::evaluate(&ast, scope).map_err(|e| e.in_expression(expression))
    }
}
