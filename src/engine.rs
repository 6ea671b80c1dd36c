//! Engine facade: registry plus collaborators
//!
//! [`SqlScriptEngine`] wires the statement registry to the expression
//! evaluator and type-hint collaborators. Collaborators are injectable; the
//! defaults are the built-in expression evaluator and runtime-only type
//! inspection.

use std::sync::Arc;

use serde_json::Value;

use crate::binding::BoundSql;
use crate::error::{EvaluationError, Result};
use crate::expr::{DefaultExpressionEvaluator, ExpressionEvaluator};
use crate::metadata::{RuntimeTypeHints, TypeHints};
use crate::registry::StatementRegistry;
use crate::template::SqlTemplate;

/// Main entry point for registering and rendering statements
pub struct SqlScriptEngine {
    registry: StatementRegistry,
    evaluator: Arc<dyn ExpressionEvaluator>,
    hints: Arc<dyn TypeHints>,
}

impl Default for SqlScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlScriptEngine {
    /// Create an engine with the default collaborators
    pub fn new() -> Self {
        Self::with_collaborators(
            Arc::new(DefaultExpressionEvaluator::new()),
            Arc::new(RuntimeTypeHints),
        )
    }

    /// Create an engine with custom collaborators
    pub fn with_collaborators(
        evaluator: Arc<dyn ExpressionEvaluator>,
        hints: Arc<dyn TypeHints>,
    ) -> Self {
        Self {
            registry: StatementRegistry::new(),
            evaluator,
            hints,
        }
    }

    /// Register a statement body under an id
    pub fn register(&mut self, id: &str, body: &str) -> Result<()> {
        self.registry.register(id, body, None, self.hints.as_ref())
    }

    /// Register a statement body with a declared parameter type
    pub fn register_typed(&mut self, id: &str, body: &str, parameter_type: &str) -> Result<()> {
        self.registry
            .register(id, body, Some(parameter_type), self.hints.as_ref())
    }

    /// Load every statement from a `<mapper>` document
    pub fn load_mapper(&mut self, document: &str) -> Result<()> {
        self.registry.load_mapper(document, self.hints.as_ref())
    }

    /// Render a registered statement against a parameter object
    pub fn render(&self, id: &str, parameter: &Value) -> Result<BoundSql> {
        let template = self
            .registry
            .get(id)
            .ok_or_else(|| EvaluationError::unknown_statement(id))?;
        template.render(self.evaluator.as_ref(), self.hints.as_ref(), parameter)
    }

    /// Build and render a one-off statement body without registering it
    pub fn render_markup(&self, body: &str, parameter: &Value) -> Result<BoundSql> {
        let template = SqlTemplate::from_markup(body, None, self.hints.as_ref())?;
        template.render(self.evaluator.as_ref(), self.hints.as_ref(), parameter)
    }

    /// Look up a registered template
    pub fn statement(&self, id: &str) -> Option<Arc<SqlTemplate>> {
        self.registry.get(id)
    }

    /// The underlying registry
    pub fn registry(&self) -> &StatementRegistry {
        &self.registry
    }
}
