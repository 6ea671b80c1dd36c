//! Dynamic SQL templating engine
//!
//! Statement bodies authored as markup fragments parse once into an
//! immutable node tree; each call evaluates the tree against a JSON
//! parameter object and produces final SQL text plus an ordered list of
//! bind descriptors.
//!
//! ```
//! use serde_json::json;
//! use sqlscript::SqlScriptEngine;
//!
//! let mut engine = SqlScriptEngine::new();
//! engine.register(
//!     "findActive",
//!     "<select>SELECT * FROM users<where>\
//!      <if test=\"name != null\"> AND name = #{name}</if>\
//!      <if test=\"minAge != null\"> AND age &gt;= #{minAge}</if>\
//!      </where></select>",
//! ).unwrap();
//!
//! let param = json!({"name": "ada", "minAge": null});
//! let bound = engine.render("findActive", &param).unwrap();
//! assert_eq!(bound.sql, "SELECT * FROM usersWHERE name = ?");
//! assert_eq!(bound.values(&param), vec![json!("ada")]);
//! ```

#![warn(missing_docs)]

pub mod ast;
pub mod binding;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod extractor;
pub mod markup;
pub mod metadata;
pub mod parser;
pub mod registry;
pub mod template;

// Re-export main types
pub use binding::{BoundSql, ParameterMapping, ParameterMode, SqlType};
pub use engine::SqlScriptEngine;
pub use error::{BuildError, EvaluationError, Result, SqlScriptError};
pub use evaluator::{DynamicContext, VariableScope};
pub use expr::{DefaultExpressionEvaluator, ExpressionEvaluator};
pub use markup::{Element, MarkupNode};
pub use metadata::{RuntimeTypeHints, StaticTypeHints, TypeHints};
pub use registry::StatementRegistry;
pub use template::SqlTemplate;
