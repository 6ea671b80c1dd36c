//! Type-hint collaborator seam
//!
//! When a bind placeholder carries no explicit `sqlType`, the extractor asks
//! a [`TypeHints`] implementation for the static type of the referenced
//! property on the declared parameter type. Rich metadata readers live
//! outside this crate; the defaults here are the trait plus a runtime
//! fallback.

use rustc_hash::FxHashMap;

use crate::binding::SqlType;

/// Static property-type metadata for declared parameter types
pub trait TypeHints: Send + Sync {
    /// The static type of `path` on `parameter_type`, if known
    fn property_type(&self, parameter_type: &str, path: &str) -> Option<SqlType>;
}

/// No static metadata: every lookup defers to runtime value inspection
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeTypeHints;

impl TypeHints for RuntimeTypeHints {
    fn property_type(&self, _parameter_type: &str, _path: &str) -> Option<SqlType> {
        None
    }
}

/// Hand-registered property types, keyed by parameter type and path
#[derive(Debug, Clone, Default)]
pub struct StaticTypeHints {
    properties: FxHashMap<String, FxHashMap<String, SqlType>>,
}

impl StaticTypeHints {
    /// Create an empty hint table
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the type of one property path on a parameter type
    pub fn declare(
        &mut self,
        parameter_type: impl Into<String>,
        path: impl Into<String>,
        sql_type: SqlType,
    ) -> &mut Self {
        self.properties
            .entry(parameter_type.into())
            .or_default()
            .insert(path.into(), sql_type);
        self
    }
}

impl TypeHints for StaticTypeHints {
    fn property_type(&self, parameter_type: &str, path: &str) -> Option<SqlType> {
        self.properties
            .get(parameter_type)?
            .get(path)
            .copied()
    }
}
