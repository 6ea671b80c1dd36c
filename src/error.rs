//! Error types for statement building and template evaluation
//!
//! Build failures are detected once, when a statement is registered, and
//! block the statement from being registered at all. Evaluation failures are
//! per-call and never corrupt the shared template.

use thiserror::Error;

/// Result type alias for public engine operations
pub type Result<T> = std::result::Result<T, SqlScriptError>;

/// Top-level error type, splitting the two failure phases
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlScriptError {
    /// Fatal error while building a statement template
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Fatal error while evaluating a template for one call
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Errors raised while parsing markup and building the node tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The markup fragment itself could not be read
    #[error("Markup error: {message}")]
    Markup {
        /// Human-readable description of the markup failure
        message: String,
    },

    /// An element name outside the recognized tag set
    #[error("Unknown element <{name}> in statement body")]
    UnknownElement {
        /// The unrecognized tag name
        name: String,
    },

    /// A required attribute was absent
    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        /// Element the attribute belongs to
        element: String,
        /// Name of the missing attribute
        attribute: String,
    },

    /// An attribute was present but its value could not be used
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>: {message}")]
    InvalidAttribute {
        /// Element the attribute belongs to
        element: String,
        /// Attribute name
        attribute: String,
        /// Offending value
        value: String,
        /// Why the value was rejected
        message: String,
    },

    /// More than one `<otherwise>` inside a `<choose>`
    #[error("Too many default (otherwise) elements in <choose> statement")]
    TooManyDefaults,

    /// A `<choose>` child other than `<when>`/`<otherwise>`
    #[error("Unexpected element <{name}> in <choose>: only <when> and <otherwise> are allowed")]
    UnexpectedChooseChild {
        /// The offending tag name
        name: String,
    },

    /// A `<trim>` with no trimming rules at all
    #[error("<trim> requires at least one of prefix, prefixOverrides, suffix, suffixOverrides")]
    TrimWithoutRules,

    /// Statement id already present in the registry
    #[error("Statement '{id}' is already registered")]
    DuplicateStatement {
        /// The duplicated statement id
        id: String,
    },

    /// A static statement body failed placeholder extraction at build time
    #[error("Static statement text is malformed: {source}")]
    StaticSql {
        /// The underlying extraction failure
        source: EvaluationError,
    },
}

impl BuildError {
    /// Create a markup error
    pub fn markup(message: impl Into<String>) -> Self {
        Self::Markup {
            message: message.into(),
        }
    }

    /// Create an unknown element error
    pub fn unknown_element(name: impl Into<String>) -> Self {
        Self::UnknownElement { name: name.into() }
    }

    /// Create a missing attribute error
    pub fn missing_attribute(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Create an invalid attribute error
    pub fn invalid_attribute(
        element: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            element: element.into(),
            attribute: attribute.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate statement error
    pub fn duplicate_statement(id: impl Into<String>) -> Self {
        Self::DuplicateStatement { id: id.into() }
    }
}

/// Errors raised while evaluating a template against one parameter object
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// Expression tokenizing, parsing, or evaluation failure
    #[error("Expression error: {message}{}", expression.as_ref().map(|e| format!(" in '{e}'")).unwrap_or_default())]
    Expression {
        /// What went wrong
        message: String,
        /// The source expression text, when known
        expression: Option<String>,
    },

    /// A `foreach` collection expression resolved to null without `nullable="true"`
    #[error("The expression '{expression}' evaluated to a null collection; set nullable=\"true\" to allow it")]
    NullCollection {
        /// The collection expression
        expression: String,
    },

    /// A `${...}` or `#{...}` marker was opened but never closed
    #[error("Unclosed '{open}' marker in text starting at: {context}")]
    UnclosedMarker {
        /// The opening token
        open: String,
        /// The text around the unterminated marker
        context: String,
    },

    /// A marker with nothing inside it
    #[error("Empty '{open}...}}' marker: an expression is required")]
    EmptyMarker {
        /// The opening token
        open: String,
    },

    /// An unrecognized attribute inside a bind placeholder
    #[error("Unknown attribute '{attribute}' in bind placeholder '{placeholder}'")]
    UnknownPlaceholderAttribute {
        /// The unrecognized attribute name
        attribute: String,
        /// The full placeholder body
        placeholder: String,
    },

    /// A bind placeholder attribute whose value could not be used
    #[error("Invalid value '{value}' for attribute '{attribute}' in bind placeholder: {message}")]
    InvalidPlaceholderAttribute {
        /// Attribute name
        attribute: String,
        /// Offending value
        value: String,
        /// Why the value was rejected
        message: String,
    },

    /// Render was asked for a statement id the registry does not know
    #[error("Statement '{id}' is not registered")]
    UnknownStatement {
        /// The unknown statement id
        id: String,
    },
}

impl EvaluationError {
    /// Create an expression error without source text
    pub fn expression(message: impl Into<String>) -> Self {
        Self::Expression {
            message: message.into(),
            expression: None,
        }
    }

    /// Create a null collection error
    pub fn null_collection(expression: impl Into<String>) -> Self {
        Self::NullCollection {
            expression: expression.into(),
        }
    }

    /// Create an unclosed marker error, keeping a short context excerpt
    pub fn unclosed_marker(open: &str, text: &str) -> Self {
        let context: String = text.chars().take(48).collect();
        Self::UnclosedMarker {
            open: open.to_string(),
            context,
        }
    }

    /// Create an empty marker error
    pub fn empty_marker(open: &str) -> Self {
        Self::EmptyMarker {
            open: open.to_string(),
        }
    }

    /// Create an unknown statement error
    pub fn unknown_statement(id: impl Into<String>) -> Self {
        Self::UnknownStatement { id: id.into() }
    }

    /// Attach the source expression text to an expression error, if absent
    pub fn in_expression(mut self, expression: &str) -> Self {
        if let Self::Expression {
            expression: expr @ None,
            ..
        } = &mut self
        {
            *expr = Some(expression.to_string());
        }
        self
    }
}
