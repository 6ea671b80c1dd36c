//! Statement templates
//!
//! A [`SqlTemplate`] is the top-level artifact for one declared statement:
//! the immutable node tree, the declared parameter type, and the dynamic
//! flag. Templates build once at configuration load and are shared read-only
//! across arbitrarily many concurrent calls; each render allocates its own
//! context.

use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::ast::{MixedNode, SqlNode};
use crate::binding::{BoundSql, ParameterMapping, RuntimeValues};
use crate::error::{BuildError, Result};
use crate::evaluator::{self, DynamicContext};
use crate::expr::ExpressionEvaluator;
use crate::extractor;
use crate::markup::{self, Element};
use crate::metadata::TypeHints;
use crate::parser;

/// An immutable, shareable statement template
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    root: Arc<MixedNode>,
    parameter_type: Option<String>,
    is_dynamic: bool,
    /// For static templates, extraction runs once at build time and the
    /// result is reused verbatim for every call
    static_sql: Option<(String, Vec<ParameterMapping>)>,
}

impl SqlTemplate {
    /// Build a template from a markup fragment string
    pub fn from_markup(
        body: &str,
        parameter_type: Option<&str>,
        hints: &dyn TypeHints,
    ) -> Result<Self> {
        let element = markup::parse_fragment(body)?;
        Self::from_element(&element, parameter_type, hints)
    }

    /// Build a template from an already-parsed markup element
    pub fn from_element(
        element: &Element,
        parameter_type: Option<&str>,
        hints: &dyn TypeHints,
    ) -> Result<Self> {
        let root = parser::build_statement(element)?;
        let is_dynamic = root.is_dynamic();
        let static_sql = if is_dynamic {
            None
        } else {
            let text = collect_static_text(&root);
            let (sql, parameters) = extractor::extract(&text, parameter_type, hints, None)
                .map_err(|source| BuildError::StaticSql { source })?;
            Some((sql, parameters))
        };
        debug!(
            "built template from <{}>: dynamic: {is_dynamic}, parameter type: {parameter_type:?}",
            element.name
        );
        Ok(Self {
            root: Arc::new(root),
            parameter_type: parameter_type.map(str::to_string),
            is_dynamic,
            static_sql,
        })
    }

    /// Whether this template needs per-call evaluation
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// The declared parameter type hint, if any
    pub fn parameter_type(&self) -> Option<&str> {
        self.parameter_type.as_deref()
    }

    /// The root of the node tree
    pub fn root(&self) -> &MixedNode {
        &self.root
    }

    /// Evaluate the template against one parameter object
    pub fn render(
        &self,
        evaluator: &dyn ExpressionEvaluator,
        hints: &dyn TypeHints,
        parameter: &Value,
    ) -> Result<BoundSql> {
        if let Some((sql, parameters)) = &self.static_sql {
            return Ok(BoundSql {
                sql: sql.clone(),
                parameters: parameters.clone(),
                additional: FxHashMap::default(),
            });
        }

        let mut ctx = DynamicContext::new(evaluator, parameter.clone());
        evaluator::apply_mixed(&self.root, &mut ctx)?;
        let (text, additional) = ctx.into_parts();
        let runtime = RuntimeValues {
            parameter,
            additional: &additional,
        };
        let (sql, parameters) =
            extractor::extract(&text, self.parameter_type.as_deref(), hints, Some(&runtime))?;
        Ok(BoundSql {
            sql,
            parameters,
            additional,
        })
    }
}

/// Concatenate the text of a tree that contains only static nodes
fn collect_static_text(root: &MixedNode) -> String {
    fn walk(node: &SqlNode, out: &mut String) {
        match node {
            SqlNode::StaticText(text) => out.push_str(&text.text),
            SqlNode::Mixed(mixed) => {
                for child in &mixed.contents {
                    walk(child, out);
                }
            }
            // a static tree holds no other variants
            _ => {}
        }
    }
    let mut out = String::new();
    for child in &root.contents {
        walk(child, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlScriptError;
    use crate::expr::DefaultExpressionEvaluator;
    use crate::metadata::RuntimeTypeHints;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(markup: &str) -> Result<SqlTemplate> {
        SqlTemplate::from_markup(markup, None, &RuntimeTypeHints)
    }

    fn render(template: &SqlTemplate, parameter: Value) -> Result<BoundSql> {
        let evaluator = DefaultExpressionEvaluator::new();
        template.render(&evaluator, &RuntimeTypeHints, &parameter)
    }

    #[test]
    fn test_static_template_extracts_once() {
        let template =
            build("<select>SELECT * FROM users WHERE id = #{id}</select>").unwrap();
        assert!(!template.is_dynamic());

        let bound = render(&template, json!({"id": 7})).unwrap();
        assert_eq!(bound.sql, "SELECT * FROM users WHERE id = ?");
        assert_eq!(bound.parameters.len(), 1);
        assert_eq!(bound.values(&json!({"id": 7})), vec![json!(7)]);
    }

    #[test]
    fn test_static_template_with_bad_placeholder_fails_at_build() {
        let err = build("<select>SELECT #{</select>").unwrap_err();
        assert!(matches!(
            err,
            SqlScriptError::Build(BuildError::StaticSql { .. })
        ));
    }

    #[test]
    fn test_dynamic_template_renders_per_call() {
        let template = build(
            "<select>SELECT * FROM users<where>\
             <if test=\"name != null\"> AND name = #{name}</if>\
             </where></select>",
        )
        .unwrap();
        assert!(template.is_dynamic());

        let bound = render(&template, json!({"name": "ada"})).unwrap();
        assert_eq!(bound.sql, "SELECT * FROM usersWHERE name = ?");
        assert_eq!(bound.values(&json!({"name": "ada"})), vec![json!("ada")]);

        let bound = render(&template, json!({"name": null})).unwrap();
        assert_eq!(bound.sql, "SELECT * FROM users");
        assert!(bound.parameters.is_empty());
    }

    #[test]
    fn test_malformed_placeholder_in_dynamic_template_fails_per_call() {
        let template = build(
            "<select><if test=\"true\">SELECT #{</if></select>",
        )
        .unwrap();
        let err = render(&template, json!({})).unwrap_err();
        assert!(matches!(err, SqlScriptError::Evaluation(_)));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let template = build(
            "<select>SELECT * FROM t<where>\
             <foreach collection=\"ids\" item=\"id\" open=\" id IN (\" close=\")\" separator=\",\">#{id}</foreach>\
             </where></select>",
        )
        .unwrap();
        let parameter = json!({"ids": [3, 1, 2]});
        let first = render(&template, parameter.clone()).unwrap();
        let second = render(&template, parameter.clone()).unwrap();
        assert_eq!(first.sql, second.sql);
        assert_eq!(first.parameters, second.parameters);
        assert_eq!(first.values(&parameter), second.values(&parameter));
    }
}
