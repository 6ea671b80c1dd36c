//! Call-scoped evaluation state
//!
//! One [`DynamicContext`] exists per template evaluation and is never shared
//! across concurrent calls, so nothing here needs synchronization.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::EvaluationError;
use crate::expr::ExpressionEvaluator;

/// Layered set of named values visible to expression evaluation.
///
/// The bottom layer is the call's parameter object: its properties resolve by
/// name, and `_parameter` resolves to the whole object. Frames stack on top
/// of it — `bind` writes into the innermost frame, `foreach` pushes a fresh
/// frame per element and pops it afterwards, giving loop variables nested
/// visibility while leaving outer bindings untouched.
#[derive(Debug, Clone)]
pub struct VariableScope {
    parameter: Value,
    frames: Vec<FxHashMap<String, Value>>,
}

impl VariableScope {
    /// Create a root scope over a parameter object
    pub fn new(parameter: Value) -> Self {
        Self {
            parameter,
            frames: vec![FxHashMap::default()],
        }
    }

    /// Push a nested frame (loop body entry)
    pub fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Pop the innermost frame (loop body exit)
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Bind a name in the innermost frame
    pub fn bind(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    /// Resolve a name: innermost frame first, then outer frames, then the
    /// parameter object's properties
    pub fn resolve(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value.clone());
            }
        }
        if name == "_parameter" {
            return Some(self.parameter.clone());
        }
        match &self.parameter {
            Value::Object(map) => map.get(name).cloned(),
            _ => None,
        }
    }

    /// The call's parameter object
    pub fn parameter(&self) -> &Value {
        &self.parameter
    }
}

/// Mutable per-call evaluation context: the accumulating SQL buffer, the
/// variable scope, and the bookkeeping `foreach` needs to decorate repeated
/// bind expressions.
pub struct DynamicContext<'a> {
    evaluator: &'a dyn ExpressionEvaluator,
    scope: VariableScope,
    sql: String,
    unique_number: usize,
    additional: FxHashMap<String, Value>,
}

impl<'a> DynamicContext<'a> {
    /// Create a fresh context for one evaluation
    pub fn new(evaluator: &'a dyn ExpressionEvaluator, parameter: Value) -> Self {
        Self {
            evaluator,
            scope: VariableScope::new(parameter),
            sql: String::new(),
            unique_number: 0,
            additional: FxHashMap::default(),
        }
    }

    /// Append text to the accumulating buffer
    pub fn append(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// The accumulated text so far
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Swap the accumulating buffer, returning the previous one.
    ///
    /// Trim and foreach evaluate their subtrees into isolated buffers; they
    /// swap an empty buffer in, apply, then swap back.
    pub fn swap_buffer(&mut self, buffer: String) -> String {
        std::mem::replace(&mut self.sql, buffer)
    }

    /// The variable scope
    pub fn scope(&self) -> &VariableScope {
        &self.scope
    }

    /// Mutable access to the variable scope
    pub fn scope_mut(&mut self) -> &mut VariableScope {
        &mut self.scope
    }

    /// Evaluate a value expression against the current scope
    pub fn evaluate(&self, expression: &str) -> Result<Value, EvaluationError> {
        self.evaluator.evaluate(expression, &self.scope)
    }

    /// Evaluate a boolean test against the current scope
    pub fn evaluate_boolean(&self, expression: &str) -> Result<bool, EvaluationError> {
        self.evaluator.evaluate_boolean(expression, &self.scope)
    }

    /// Next value of the per-call counter used to decorate loop bindings
    pub fn unique_number(&mut self) -> usize {
        let n = self.unique_number;
        self.unique_number += 1;
        n
    }

    /// Record a decorated loop binding for placeholder extraction
    pub fn bind_additional(&mut self, name: String, value: Value) {
        self.additional.insert(name, value);
    }

    /// Tear the context down into its final text and additional bindings
    pub fn into_parts(self) -> (String, FxHashMap<String, Value>) {
        (self.sql, self.additional)
    }
}
