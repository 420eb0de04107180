//! Scalar binding values.
//!
//! Every bindable argument to the builder converts into a [`Value`]. The
//! variants cover the scalar shapes a driver can bind; [`Value::Expr`] is
//! the odd one out: it carries a raw SQL fragment that grammars emit
//! verbatim, and [`clean_bindings`] removes it from any vector handed to a
//! connection.

use crate::expression::Expression;
use serde::Serialize;

/// A scalar query binding.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Text.
    Text(String),
    /// Raw SQL fragment; never bound (see [`clean_bindings`]).
    Expr(Expression),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for [`Value::Expr`].
    pub fn is_expression(&self) -> bool {
        matches!(self, Value::Expr(_))
    }

    /// Borrow the text content, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content widened from any numeric variant, if possible.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

/// Strip [`Value::Expr`] entries from a binding vector.
///
/// Expressions are inlined into the SQL by the grammar, so they must not be
/// handed to the connection as parameters. Called on every execution path.
pub fn clean_bindings(bindings: &[Value]) -> Vec<Value> {
    bindings
        .iter()
        .filter(|v| !v.is_expression())
        .cloned()
        .collect()
}

// ==================== Conversions ====================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! int_value {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

int_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Expression> for Value {
    fn from(v: Expression) -> Self {
        Value::Expr(v)
    }
}

impl From<chrono::NaiveDateTime> for Value {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::raw;

    #[test]
    fn scalar_conversions() {
        assert_eq!(Value::from(1i32), Value::Int(1));
        assert_eq!(Value::from(2u16), Value::Int(2));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("x"), Value::Text("x".to_string()));
        assert_eq!(Value::from(1.5f64), Value::Float(1.5));
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::from(Option::<i32>::None), Value::Null);
        assert_eq!(Value::from(Some(3i64)), Value::Int(3));
    }

    #[test]
    fn datetime_renders_as_text() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(
            Value::from(dt),
            Value::Text("2024-05-01 12:30:00".to_string())
        );
    }

    #[test]
    fn clean_bindings_strips_expressions() {
        let bindings = vec![
            Value::Int(1),
            Value::Expr(raw("NOW()")),
            Value::Text("a".to_string()),
        ];
        let cleaned = clean_bindings(&bindings);
        assert_eq!(cleaned, vec![Value::Int(1), Value::Text("a".to_string())]);
    }

    #[test]
    fn bindings_serialize_deterministically() {
        let bindings = vec![Value::Int(1), Value::Text("a".to_string()), Value::Null];
        let json = serde_json::to_string(&bindings).unwrap();
        assert_eq!(json, r#"[1,"a",null]"#);
    }
}
