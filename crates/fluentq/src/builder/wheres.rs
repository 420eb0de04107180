//! The where-clause family.
//!
//! Public methods come in `and`/`or` pairs and normalize their input the
//! same way: an operator outside the known set shifts into the value
//! position under `=`, a null value becomes a null check, and closures run
//! against fresh sub-builders whose bindings merge upward at predicate
//! insertion.

use super::{Boolean, Builder, WherePredicate};
use crate::error::{QueryError, QueryResult};
use crate::value::Value;
use heck::ToSnakeCase;

/// Operators the normalization step recognizes (matched case-insensitively).
const OPERATORS: &[&str] = &[
    "=", "<", ">", "<=", ">=", "<>", "!=", "like", "not like", "between", "ilike",
];

enum Segment {
    Column(String),
    Connector(Boolean),
}

/// Split a dynamic-where suffix around `And` / `Or` connectors.
///
/// A connector only counts when followed by an uppercase letter, so
/// multi-word columns like `Organization` survive intact.
fn split_finder(finder: &str) -> Vec<Segment> {
    let chars: Vec<char> = finder.chars().collect();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let connector = if chars[i..].starts_with(&['A', 'n', 'd'])
            && chars.get(i + 3).is_some_and(|c| c.is_ascii_uppercase())
        {
            Some((Boolean::And, 3))
        } else if chars[i..].starts_with(&['O', 'r'])
            && chars.get(i + 2).is_some_and(|c| c.is_ascii_uppercase())
        {
            Some((Boolean::Or, 2))
        } else {
            None
        };

        if let Some((boolean, len)) = connector {
            segments.push(Segment::Column(chars[start..i].iter().collect()));
            segments.push(Segment::Connector(boolean));
            i += len;
            start = i;
        } else {
            i += 1;
        }
    }
    segments.push(Segment::Column(chars[start..].iter().collect()));
    segments
}

impl Builder {
    pub(crate) fn add_binding(&mut self, value: Value) {
        self.bindings.push(value);
    }

    fn add_basic(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: Value,
        boolean: Boolean,
    ) -> Self {
        if !value.is_expression() {
            self.add_binding(value.clone());
        }
        self.wheres.push(WherePredicate::Basic {
            column: column.into(),
            operator: operator.into(),
            value,
            boolean,
        });
        self
    }

    fn where_op_boolean(
        self,
        column: impl Into<String>,
        operator: &str,
        value: Value,
        boolean: Boolean,
    ) -> Self {
        let lowered = operator.trim().to_lowercase();
        if !OPERATORS.contains(&lowered.as_str()) {
            // Unrecognized operator shifts into the value position under `=`.
            return self.add_basic(column, "=", Value::Text(operator.to_string()), boolean);
        }
        if value.is_null() {
            return self.where_null_boolean(column, lowered != "=", boolean);
        }
        self.add_basic(column, operator, value, boolean)
    }

    // ==================== Basic wheres ====================

    /// Add `column = value`. A null value becomes `column is null`.
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_op_boolean(column, "=", value.into(), Boolean::And)
    }

    /// `or`-joined [`where_eq`](Self::where_eq).
    pub fn or_where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_op_boolean(column, "=", value.into(), Boolean::Or)
    }

    /// Add `column <operator> value`.
    pub fn where_op(
        self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.where_op_boolean(column, operator, value.into(), Boolean::And)
    }

    /// `or`-joined [`where_op`](Self::where_op).
    pub fn or_where_op(
        self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.where_op_boolean(column, operator, value.into(), Boolean::Or)
    }

    /// Add `column = value` when the value is present; no-op on `None`.
    pub fn where_eq_opt<V: Into<Value>>(
        self,
        column: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(v) => self.where_eq(column, v),
            None => self,
        }
    }

    // ==================== Nested groups ====================

    /// Group the wheres accumulated by `f` in parentheses.
    ///
    /// The callback runs on a fresh sub-builder sharing this builder's
    /// table. An empty group adds no predicate and no bindings.
    pub fn where_nested(self, f: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_nested_boolean(f, Boolean::And)
    }

    /// `or`-joined [`where_nested`](Self::where_nested).
    pub fn or_where_nested(self, f: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_nested_boolean(f, Boolean::Or)
    }

    fn where_nested_boolean(
        mut self,
        f: impl FnOnce(Builder) -> Builder,
        boolean: Boolean,
    ) -> Self {
        let mut sub = self.new_query();
        sub.from = self.from.clone();
        let sub = f(sub);
        if !sub.wheres.is_empty() {
            self.merge_bindings(&sub);
            self.wheres.push(WherePredicate::Nested {
                query: Box::new(sub),
                boolean,
            });
        }
        self
    }

    // ==================== Sub-selects ====================

    /// Compare `column` against a sub-select built by `f`.
    pub fn where_sub(
        self,
        column: impl Into<String>,
        operator: impl Into<String>,
        f: impl FnOnce(Builder) -> Builder,
    ) -> Self {
        self.where_sub_boolean(column, operator, f, Boolean::And)
    }

    /// `or`-joined [`where_sub`](Self::where_sub).
    pub fn or_where_sub(
        self,
        column: impl Into<String>,
        operator: impl Into<String>,
        f: impl FnOnce(Builder) -> Builder,
    ) -> Self {
        self.where_sub_boolean(column, operator, f, Boolean::Or)
    }

    fn where_sub_boolean(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        f: impl FnOnce(Builder) -> Builder,
        boolean: Boolean,
    ) -> Self {
        let sub = f(self.new_query());
        self.merge_bindings(&sub);
        self.wheres.push(WherePredicate::Sub {
            column: column.into(),
            operator: operator.into(),
            query: Box::new(sub),
            boolean,
        });
        self
    }

    // ==================== Exists ====================

    /// Add `exists (sub-select)`.
    pub fn where_exists(self, f: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_exists_boolean(f, false, Boolean::And)
    }

    /// Add `not exists (sub-select)`.
    pub fn where_not_exists(self, f: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_exists_boolean(f, true, Boolean::And)
    }

    /// `or`-joined [`where_exists`](Self::where_exists).
    pub fn or_where_exists(self, f: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_exists_boolean(f, false, Boolean::Or)
    }

    /// `or`-joined [`where_not_exists`](Self::where_not_exists).
    pub fn or_where_not_exists(self, f: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_exists_boolean(f, true, Boolean::Or)
    }

    fn where_exists_boolean(
        mut self,
        f: impl FnOnce(Builder) -> Builder,
        negated: bool,
        boolean: Boolean,
    ) -> Self {
        let sub = f(self.new_query());
        self.merge_bindings(&sub);
        self.wheres.push(WherePredicate::Exists {
            query: Box::new(sub),
            negated,
            boolean,
        });
        self
    }

    // ==================== In lists ====================

    /// Add `column in (values...)`; bindings extend in value order.
    pub fn where_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.where_in_boolean(column, values, false, Boolean::And)
    }

    /// Add `column not in (values...)`.
    pub fn where_not_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.where_in_boolean(column, values, true, Boolean::And)
    }

    /// `or`-joined [`where_in`](Self::where_in).
    pub fn or_where_in<V: Into<Value>>(self, column: impl Into<String>, values: Vec<V>) -> Self {
        self.where_in_boolean(column, values, false, Boolean::Or)
    }

    /// `or`-joined [`where_not_in`](Self::where_not_in).
    pub fn or_where_not_in<V: Into<Value>>(
        self,
        column: impl Into<String>,
        values: Vec<V>,
    ) -> Self {
        self.where_in_boolean(column, values, true, Boolean::Or)
    }

    /// Add `column in (values...)` when present and non-empty.
    pub fn where_in_opt<V: Into<Value>>(
        self,
        column: impl Into<String>,
        values: Option<Vec<V>>,
    ) -> Self {
        match values {
            Some(v) if !v.is_empty() => self.where_in(column, v),
            _ => self,
        }
    }

    fn where_in_boolean<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: Vec<V>,
        negated: bool,
        boolean: Boolean,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.bindings.extend(values.iter().cloned());
        self.wheres.push(WherePredicate::In {
            column: column.into(),
            values,
            negated,
            boolean,
        });
        self
    }

    /// Add `column in (sub-select)` built by `f`.
    pub fn where_in_sub(
        self,
        column: impl Into<String>,
        f: impl FnOnce(Builder) -> Builder,
    ) -> Self {
        self.where_in_sub_boolean(column, f, false, Boolean::And)
    }

    /// Add `column not in (sub-select)` built by `f`.
    pub fn where_not_in_sub(
        self,
        column: impl Into<String>,
        f: impl FnOnce(Builder) -> Builder,
    ) -> Self {
        self.where_in_sub_boolean(column, f, true, Boolean::And)
    }

    fn where_in_sub_boolean(
        mut self,
        column: impl Into<String>,
        f: impl FnOnce(Builder) -> Builder,
        negated: bool,
        boolean: Boolean,
    ) -> Self {
        let sub = f(self.new_query());
        self.merge_bindings(&sub);
        self.wheres.push(WherePredicate::InSub {
            column: column.into(),
            query: Box::new(sub),
            negated,
            boolean,
        });
        self
    }

    // ==================== Null checks ====================

    /// Add `column is null`.
    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.where_null_boolean(column, false, Boolean::And)
    }

    /// Add `column is not null`.
    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.where_null_boolean(column, true, Boolean::And)
    }

    /// `or`-joined [`where_null`](Self::where_null).
    pub fn or_where_null(self, column: impl Into<String>) -> Self {
        self.where_null_boolean(column, false, Boolean::Or)
    }

    /// `or`-joined [`where_not_null`](Self::where_not_null).
    pub fn or_where_not_null(self, column: impl Into<String>) -> Self {
        self.where_null_boolean(column, true, Boolean::Or)
    }

    fn where_null_boolean(
        mut self,
        column: impl Into<String>,
        negated: bool,
        boolean: Boolean,
    ) -> Self {
        self.wheres.push(WherePredicate::Null {
            column: column.into(),
            negated,
            boolean,
        });
        self
    }

    // ==================== Between ====================

    /// Add `column between lo and hi`; both operands bind, in that order.
    pub fn where_between(
        self,
        column: impl Into<String>,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> Self {
        self.where_between_boolean(column, lo.into(), hi.into(), Boolean::And)
    }

    /// `or`-joined [`where_between`](Self::where_between).
    pub fn or_where_between(
        self,
        column: impl Into<String>,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> Self {
        self.where_between_boolean(column, lo.into(), hi.into(), Boolean::Or)
    }

    fn where_between_boolean(
        mut self,
        column: impl Into<String>,
        lo: Value,
        hi: Value,
        boolean: Boolean,
    ) -> Self {
        self.add_binding(lo);
        self.add_binding(hi);
        self.wheres.push(WherePredicate::Between {
            column: column.into(),
            boolean,
        });
        self
    }

    // ==================== Raw ====================

    /// Add a raw where fragment with its bindings.
    pub fn where_raw(self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.where_raw_boolean(sql, bindings, Boolean::And)
    }

    /// `or`-joined [`where_raw`](Self::where_raw).
    pub fn or_where_raw(self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.where_raw_boolean(sql, bindings, Boolean::Or)
    }

    fn where_raw_boolean(
        mut self,
        sql: impl Into<String>,
        bindings: Vec<Value>,
        boolean: Boolean,
    ) -> Self {
        self.bindings.extend(bindings);
        self.wheres.push(WherePredicate::Raw {
            sql: sql.into(),
            boolean,
        });
        self
    }

    // ==================== Dynamic wheres ====================

    /// Interpret a dynamic method name such as `whereFirstNameAndLastName`.
    ///
    /// The suffix after `where` splits around `And` / `Or` connectors; each
    /// remaining segment names an upper-camel column, converted to
    /// snake_case and paired with the next argument under the active
    /// connector (initially `and`).
    ///
    /// A name that does not start with `where` is
    /// [`QueryError::UnknownMethod`]; a segment/argument count mismatch is
    /// [`QueryError::BadArgument`].
    pub fn where_dynamic(mut self, method: &str, args: &[Value]) -> QueryResult<Self> {
        let finder = method
            .strip_prefix("where")
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| QueryError::unknown_method(method))?;

        let segments = split_finder(finder);
        let column_count = segments
            .iter()
            .filter(|s| matches!(s, Segment::Column(_)))
            .count();
        if column_count != args.len() {
            return Err(QueryError::bad_argument(format!(
                "{method} names {column_count} column(s) but received {} argument(s)",
                args.len()
            )));
        }

        let mut connector = Boolean::And;
        let mut args = args.iter();
        for segment in segments {
            match segment {
                Segment::Connector(boolean) => connector = boolean,
                Segment::Column(name) => {
                    if name.is_empty() {
                        return Err(QueryError::bad_argument(format!(
                            "{method} contains an empty column segment"
                        )));
                    }
                    let value = args.next().cloned().unwrap_or(Value::Null);
                    self = self.add_basic(name.to_snake_case(), "=", value, connector);
                }
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::builder;
    use super::*;

    #[test]
    fn unknown_operator_shifts_into_value_position() {
        let shifted = builder().from("users").where_op("name", "Alice", 0i64);
        let explicit = builder().from("users").where_eq("name", "Alice");
        assert_eq!(shifted.wheres(), explicit.wheres());
        assert_eq!(shifted.bindings(), explicit.bindings());
    }

    #[test]
    fn null_value_becomes_null_check() {
        let q = builder().from("users").where_eq("deleted_at", Value::Null);
        assert_eq!(
            q.wheres(),
            &[WherePredicate::Null {
                column: "deleted_at".to_string(),
                negated: false,
                boolean: Boolean::And,
            }]
        );
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn non_equality_null_negates_the_check() {
        let q = builder().from("users").where_op("deleted_at", "!=", Value::Null);
        assert_eq!(
            q.wheres(),
            &[WherePredicate::Null {
                column: "deleted_at".to_string(),
                negated: true,
                boolean: Boolean::And,
            }]
        );
    }

    #[test]
    fn empty_nested_group_adds_nothing() {
        let q = builder().from("users").where_nested(|q| q);
        assert!(q.wheres().is_empty());
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn nested_bindings_merge_in_document_order() {
        let q = builder()
            .from("users")
            .where_eq("active", 1i64)
            .or_where_nested(|sub| {
                sub.where_op("age", ">", 18i64).where_eq("verified", 1i64)
            });
        assert_eq!(
            q.bindings(),
            &[Value::Int(1), Value::Int(18), Value::Int(1)]
        );
    }

    #[test]
    fn between_appends_both_operands() {
        let q = builder().from("users").where_between("age", 18i64, 65i64);
        assert_eq!(q.bindings(), &[Value::Int(18), Value::Int(65)]);
        assert_eq!(
            q.wheres(),
            &[WherePredicate::Between {
                column: "age".to_string(),
                boolean: Boolean::And,
            }]
        );
    }

    #[test]
    fn expression_values_do_not_bind() {
        let q = builder()
            .from("users")
            .where_op("created_at", "<", crate::expression::raw("NOW()"));
        assert!(q.bindings().is_empty());
        assert_eq!(q.wheres().len(), 1);
    }

    #[test]
    fn dynamic_where_matches_explicit_chain() {
        let dynamic = builder()
            .from("users")
            .where_dynamic("whereFirstNameAndLastName", &["a".into(), "b".into()])
            .unwrap();
        let explicit = builder()
            .from("users")
            .where_eq("first_name", "a")
            .where_eq("last_name", "b");
        assert_eq!(dynamic.wheres(), explicit.wheres());
        assert_eq!(dynamic.bindings(), explicit.bindings());
    }

    #[test]
    fn dynamic_where_or_connector() {
        let dynamic = builder()
            .from("users")
            .where_dynamic("whereEmailOrPhone", &["e".into(), "p".into()])
            .unwrap();
        let explicit = builder()
            .from("users")
            .where_eq("email", "e")
            .or_where_eq("phone", "p");
        assert_eq!(dynamic.wheres(), explicit.wheres());
    }

    #[test]
    fn dynamic_where_keeps_multiword_columns_whole() {
        // `Organization` starts with `Or` followed by lowercase: not a connector
        let q = builder()
            .from("users")
            .where_dynamic("whereOrganization", &["acme".into()])
            .unwrap();
        assert_eq!(
            q.wheres(),
            builder().from("users").where_eq("organization", "acme").wheres()
        );
    }

    #[test]
    fn opt_helpers_skip_absent_values() {
        let q = builder()
            .from("users")
            .where_eq_opt("status", Some("active"))
            .where_eq_opt("name", Option::<&str>::None)
            .where_in_opt("id", Some(vec![1i64, 2]))
            .where_in_opt("role", Option::<Vec<i64>>::None)
            .where_in_opt("tag", Some(Vec::<i64>::new()));
        assert_eq!(q.wheres().len(), 2);
        assert_eq!(
            q.bindings(),
            &[
                Value::Text("active".to_string()),
                Value::Int(1),
                Value::Int(2)
            ]
        );
    }

    #[test]
    fn dynamic_where_rejects_unknown_method() {
        let err = builder()
            .from("users")
            .where_dynamic("orderByName", &["x".into()])
            .unwrap_err();
        assert!(err.is_unknown_method());
    }

    #[test]
    fn dynamic_where_rejects_arity_mismatch() {
        let err = builder()
            .from("users")
            .where_dynamic("whereNameAndEmail", &["only-one".into()])
            .unwrap_err();
        assert!(matches!(err, QueryError::BadArgument(_)));
    }
}
