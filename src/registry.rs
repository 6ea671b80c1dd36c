//! Named statement registry
//!
//! Statements register once at configuration load and live for the process
//! lifetime of the registry. Registration reserves the id first, then builds
//! the template, rolling the reservation back on any build failure — a
//! failed build never leaves a partial registration behind.

use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use crate::error::{BuildError, Result};
use crate::markup::{self, Element, MarkupNode};
use crate::metadata::TypeHints;
use crate::template::SqlTemplate;

enum StatementEntry {
    /// Reserved while its template is being built
    Pending,
    Complete(Arc<SqlTemplate>),
}

/// Registry of built statement templates, keyed by id
#[derive(Default)]
pub struct StatementRegistry {
    statements: IndexMap<String, StatementEntry>,
}

impl StatementRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one statement from a markup fragment string
    pub fn register(
        &mut self,
        id: &str,
        body: &str,
        parameter_type: Option<&str>,
        hints: &dyn TypeHints,
    ) -> Result<()> {
        let element = markup::parse_fragment(body)?;
        self.register_element(id, &element, parameter_type, hints)
    }

    /// Register one statement from an already-parsed markup element
    pub fn register_element(
        &mut self,
        id: &str,
        element: &Element,
        parameter_type: Option<&str>,
        hints: &dyn TypeHints,
    ) -> Result<()> {
        if self.statements.contains_key(id) {
            return Err(BuildError::duplicate_statement(id).into());
        }
        self.statements
            .insert(id.to_string(), StatementEntry::Pending);
        match SqlTemplate::from_element(element, parameter_type, hints) {
            Ok(template) => {
                debug!(
                    "registered statement '{id}' (dynamic: {})",
                    template.is_dynamic()
                );
                self.statements
                    .insert(id.to_string(), StatementEntry::Complete(Arc::new(template)));
                Ok(())
            }
            Err(error) => {
                self.statements.shift_remove(id);
                Err(error)
            }
        }
    }

    /// Load every statement out of a `<mapper>` document.
    ///
    /// Recognized children are `<statement>` plus the four verb aliases
    /// `<select>`/`<insert>`/`<update>`/`<delete>`; each needs an `id`
    /// attribute and may declare a `parameterType`.
    pub fn load_mapper(&mut self, document: &str, hints: &dyn TypeHints) -> Result<()> {
        let root = markup::parse_fragment(document)?;
        if root.name != "mapper" {
            return Err(BuildError::markup(format!(
                "expected <mapper> root element, found <{}>",
                root.name
            ))
            .into());
        }
        for child in &root.children {
            match child {
                MarkupNode::Text(text) if text.trim().is_empty() => {}
                MarkupNode::Text(_) => {
                    return Err(BuildError::markup(
                        "text content is not allowed directly inside <mapper>",
                    )
                    .into());
                }
                MarkupNode::Element(element) => match element.name.as_str() {
                    "statement" | "select" | "insert" | "update" | "delete" => {
                        let id = element.required_attr("id")?.to_string();
                        let parameter_type = element.attr("parameterType");
                        self.register_element(&id, element, parameter_type, hints)?;
                    }
                    other => return Err(BuildError::unknown_element(other).into()),
                },
            }
        }
        Ok(())
    }

    /// Look up a completed statement
    pub fn get(&self, id: &str) -> Option<Arc<SqlTemplate>> {
        match self.statements.get(id) {
            Some(StatementEntry::Complete(template)) => Some(Arc::clone(template)),
            _ => None,
        }
    }

    /// Whether an id is taken (including a build in progress)
    pub fn contains(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    /// Registered statement ids, in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.statements.keys().map(String::as_str)
    }

    /// Number of registered statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
