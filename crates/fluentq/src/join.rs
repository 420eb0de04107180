//! Join clauses and their ON-predicate sub-builder.

use crate::builder::Boolean;
use crate::value::Value;

/// Join flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    /// The SQL spelling of the join keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
            JoinKind::Cross => "cross join",
        }
    }
}

/// The right-hand side of a join condition: another column, or a value to
/// be bound.
#[derive(Clone, Debug, PartialEq)]
pub enum JoinOperand {
    Column(String),
    Value(Value),
}

/// One `ON` conjunct of a join.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinCondition {
    pub first: String,
    pub operator: String,
    pub second: JoinOperand,
    pub boolean: Boolean,
}

/// Sub-builder for the ON-predicate conjunctions of a single join.
///
/// Used directly by the single-condition join shorthands and through the
/// callback form:
///
/// ```ignore
/// query.join_with("contacts", JoinKind::Left, |join| {
///     join.on("users.id", "=", "contacts.user_id")
///         .or_on("users.id", "=", "contacts.owner_id");
/// });
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub conditions: Vec<JoinCondition>,
}

impl JoinClause {
    /// Create an empty join clause on `table`.
    pub fn new(kind: JoinKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            conditions: Vec::new(),
        }
    }

    /// Add an `and`-joined column comparison.
    pub fn on(
        &mut self,
        first: impl Into<String>,
        operator: impl Into<String>,
        second: impl Into<String>,
    ) -> &mut Self {
        self.push(first, operator, JoinOperand::Column(second.into()), Boolean::And)
    }

    /// Add an `or`-joined column comparison.
    pub fn or_on(
        &mut self,
        first: impl Into<String>,
        operator: impl Into<String>,
        second: impl Into<String>,
    ) -> &mut Self {
        self.push(first, operator, JoinOperand::Column(second.into()), Boolean::Or)
    }

    /// Add an `and`-joined comparison against a bound value.
    pub fn on_where(
        &mut self,
        first: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push(first, operator, JoinOperand::Value(value.into()), Boolean::And)
    }

    /// Add an `or`-joined comparison against a bound value.
    pub fn or_on_where(
        &mut self,
        first: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push(first, operator, JoinOperand::Value(value.into()), Boolean::Or)
    }

    fn push(
        &mut self,
        first: impl Into<String>,
        operator: impl Into<String>,
        second: JoinOperand,
        boolean: Boolean,
    ) -> &mut Self {
        self.conditions.push(JoinCondition {
            first: first.into(),
            operator: operator.into(),
            second,
            boolean,
        });
        self
    }

    /// Bindable values of this join, in condition insertion order.
    pub fn binding_values(&self) -> impl Iterator<Item = &Value> {
        self.conditions.iter().filter_map(|c| match &c.second {
            JoinOperand::Value(v) => Some(v),
            JoinOperand::Column(_) => None,
        })
    }
}
