//! Raw SQL expressions that bypass parameter binding.

use serde::Serialize;

/// An opaque SQL fragment emitted verbatim by grammars.
///
/// Wrapping a value as an `Expression` marks it as "already SQL": it is
/// never turned into a placeholder and [`clean_bindings`](crate::value::clean_bindings)
/// strips it from binding vectors before they reach the connection.
///
/// # Example
/// ```
/// use fluentq::raw;
///
/// let now = raw("NOW()");
/// assert_eq!(now.as_str(), "NOW()");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Expression(String);

impl Expression {
    /// Wrap a SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// The inner SQL fragment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`Expression::new`].
pub fn raw(sql: impl Into<String>) -> Expression {
    Expression::new(sql)
}
