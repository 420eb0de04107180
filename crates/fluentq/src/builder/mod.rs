//! The fluent query builder.
//!
//! A [`Builder`] accumulates clause state through chained calls and is
//! consumed by terminal operations (`get`, `first`, `insert`, `update`,
//! `delete`, aggregates, `to_sql`). Clause-addition methods take `self` and
//! return it, the fluent form; terminals borrow, so a builder can run more
//! than once and keep composing afterwards.
//!
//! Binding positions are load-bearing: every clause that contributes a
//! bindable value appends it to the binding vector at insertion time, and
//! the grammar later emits placeholders in the matching traversal order.
//!
//! ```ignore
//! let users = Builder::new(conn, grammar, processor)
//!     .from("users")
//!     .where_eq("status", "active")
//!     .order_by("created_at")
//!     .take(20)
//!     .get()
//!     .await?;
//! ```

mod wheres;
mod exec;

use crate::connection::Connection;
use crate::grammar::Grammar;
use crate::join::{JoinClause, JoinKind};
use crate::processor::Processor;
use crate::value::Value;
use std::sync::Arc;

/// Connector between consecutive predicates.
///
/// Each predicate stores how it joins to the *preceding* one; the first
/// predicate's connector is dropped by the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boolean {
    And,
    Or,
}

impl Boolean {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Boolean::And => "and",
            Boolean::Or => "or",
        }
    }
}

/// Sort direction of an ORDER BY entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

/// One entry in the where sequence.
///
/// `Between` stores no values: its two operands live in the builder's
/// binding vector, appended at insertion time, and the grammar emits exactly
/// two placeholders for them.
#[derive(Clone, Debug, PartialEq)]
pub enum WherePredicate {
    Basic {
        column: String,
        operator: String,
        value: Value,
        boolean: Boolean,
    },
    Nested {
        query: Box<Builder>,
        boolean: Boolean,
    },
    Sub {
        column: String,
        operator: String,
        query: Box<Builder>,
        boolean: Boolean,
    },
    Exists {
        query: Box<Builder>,
        negated: bool,
        boolean: Boolean,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
        boolean: Boolean,
    },
    InSub {
        column: String,
        query: Box<Builder>,
        negated: bool,
        boolean: Boolean,
    },
    Null {
        column: String,
        negated: bool,
        boolean: Boolean,
    },
    Between {
        column: String,
        boolean: Boolean,
    },
    Raw {
        sql: String,
        boolean: Boolean,
    },
}

impl WherePredicate {
    /// The connector joining this predicate to its predecessor.
    pub fn boolean(&self) -> Boolean {
        match self {
            WherePredicate::Basic { boolean, .. }
            | WherePredicate::Nested { boolean, .. }
            | WherePredicate::Sub { boolean, .. }
            | WherePredicate::Exists { boolean, .. }
            | WherePredicate::In { boolean, .. }
            | WherePredicate::InSub { boolean, .. }
            | WherePredicate::Null { boolean, .. }
            | WherePredicate::Between { boolean, .. }
            | WherePredicate::Raw { boolean, .. } => *boolean,
        }
    }
}

/// One entry in the having sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum HavingPredicate {
    Basic {
        column: String,
        operator: String,
        value: Value,
    },
    Raw {
        sql: String,
        boolean: Boolean,
    },
}

/// Fluent SQL query builder.
///
/// Owns the clause state of one query under construction plus shared
/// handles to its connection, grammar, and processor. Single-owner and
/// single-threaded by design: concurrency is achieved with disjoint
/// builders (`Clone` is cheap; collaborators are shared through `Arc`).
#[derive(Clone)]
pub struct Builder {
    pub(crate) connection: Arc<dyn Connection>,
    pub(crate) grammar: Arc<dyn Grammar>,
    pub(crate) processor: Arc<dyn Processor>,

    pub(crate) from: Option<String>,
    pub(crate) columns: Option<Vec<String>>,
    pub(crate) distinct: bool,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) wheres: Vec<WherePredicate>,
    pub(crate) groups: Vec<String>,
    pub(crate) havings: Vec<HavingPredicate>,
    pub(crate) orders: Vec<(String, SortDir)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) unions: Vec<(Builder, bool)>,
    pub(crate) bindings: Vec<Value>,
    pub(crate) cache_minutes: Option<u64>,
    pub(crate) cache_key: Option<String>,
}

impl Builder {
    /// Create a builder bound to a connection, grammar, and processor.
    pub fn new(
        connection: Arc<dyn Connection>,
        grammar: Arc<dyn Grammar>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            connection,
            grammar,
            processor,
            from: None,
            columns: None,
            distinct: false,
            joins: Vec::new(),
            wheres: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            unions: Vec::new(),
            bindings: Vec::new(),
            cache_minutes: None,
            cache_key: None,
        }
    }

    /// A fresh builder sharing this one's connection, grammar, and
    /// processor, with empty clause state and bindings.
    pub fn new_query(&self) -> Builder {
        Builder::new(
            Arc::clone(&self.connection),
            Arc::clone(&self.grammar),
            Arc::clone(&self.processor),
        )
    }

    // ==================== Columns & table ====================

    /// Set the target table.
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Set the selected columns, replacing any prior selection.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Append one selected column.
    pub fn add_select(mut self, column: impl Into<String>) -> Self {
        self.columns.get_or_insert_with(Vec::new).push(column.into());
        self
    }

    /// Mark the selection as DISTINCT.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== Joins ====================

    /// Inner join with a single equi-condition.
    pub fn join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        operator: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        self.join_kind(table, JoinKind::Inner, first, operator, second)
    }

    /// Left join with a single equi-condition.
    pub fn left_join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        operator: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        self.join_kind(table, JoinKind::Left, first, operator, second)
    }

    /// Right join with a single equi-condition.
    pub fn right_join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        operator: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        self.join_kind(table, JoinKind::Right, first, operator, second)
    }

    /// Cross join; carries no conditions.
    pub fn cross_join(self, table: impl Into<String>) -> Self {
        self.add_join(JoinClause::new(JoinKind::Cross, table))
    }

    /// Inner join comparing a column against a bound value.
    pub fn join_where(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let mut clause = JoinClause::new(JoinKind::Inner, table);
        clause.on_where(first, operator, value);
        self.add_join(clause)
    }

    /// Join built through a callback, for multi-condition ON predicates.
    pub fn join_with(
        self,
        table: impl Into<String>,
        kind: JoinKind,
        f: impl FnOnce(&mut JoinClause),
    ) -> Self {
        let mut clause = JoinClause::new(kind, table);
        f(&mut clause);
        self.add_join(clause)
    }

    fn join_kind(
        self,
        table: impl Into<String>,
        kind: JoinKind,
        first: impl Into<String>,
        operator: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        let mut clause = JoinClause::new(kind, table);
        clause.on(first, operator, second);
        self.add_join(clause)
    }

    fn add_join(mut self, clause: JoinClause) -> Self {
        for value in clause.binding_values() {
            self.bindings.push(value.clone());
        }
        self.joins.push(clause);
        self
    }

    // ==================== Groups & havings ====================

    /// Append GROUP BY columns.
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.groups.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Append a basic HAVING predicate; a non-expression value binds.
    pub fn having(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let value = value.into();
        if !value.is_expression() {
            self.bindings.push(value.clone());
        }
        self.havings.push(HavingPredicate::Basic {
            column: column.into(),
            operator: operator.into(),
            value,
        });
        self
    }

    /// Append a raw HAVING fragment with its bindings.
    pub fn having_raw(self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.having_raw_boolean(sql, bindings, Boolean::And)
    }

    /// `or`-joined [`having_raw`](Self::having_raw).
    pub fn or_having_raw(self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.having_raw_boolean(sql, bindings, Boolean::Or)
    }

    fn having_raw_boolean(
        mut self,
        sql: impl Into<String>,
        bindings: Vec<Value>,
        boolean: Boolean,
    ) -> Self {
        self.bindings.extend(bindings);
        self.havings.push(HavingPredicate::Raw {
            sql: sql.into(),
            boolean,
        });
        self
    }

    // ==================== Ordering & paging ====================

    /// Order ascending by `column`.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.orders.push((column.into(), SortDir::Asc));
        self
    }

    /// Order descending by `column`.
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.orders.push((column.into(), SortDir::Desc));
        self
    }

    /// Set the row offset. Negative input clamps to zero.
    pub fn skip(mut self, count: i64) -> Self {
        self.offset = Some(count.max(0) as u64);
        self
    }

    /// Alias for [`skip`](Self::skip).
    pub fn offset(self, count: i64) -> Self {
        self.skip(count)
    }

    /// Set the row limit. Applied only for strictly positive `count`;
    /// anything else leaves the limit unchanged.
    pub fn take(mut self, count: i64) -> Self {
        if count > 0 {
            self.limit = Some(count as u64);
        }
        self
    }

    /// Alias for [`take`](Self::take).
    pub fn limit(self, count: i64) -> Self {
        self.take(count)
    }

    /// Limit/offset for the given 1-based page.
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let offset = page.saturating_sub(1) * per_page;
        self.skip(offset as i64).take(per_page as i64)
    }

    // ==================== Unions ====================

    /// Append `union` with a pre-built query; its bindings merge upward.
    pub fn union(self, query: Builder) -> Self {
        self.add_union(query, false)
    }

    /// Append `union all` with a pre-built query.
    pub fn union_all(self, query: Builder) -> Self {
        self.add_union(query, true)
    }

    /// Append `union` built by a callback on a fresh sub-builder.
    pub fn union_with(self, f: impl FnOnce(&mut Builder)) -> Self {
        let mut sub = self.new_query();
        f(&mut sub);
        self.add_union(sub, false)
    }

    /// Append `union all` built by a callback on a fresh sub-builder.
    pub fn union_all_with(self, f: impl FnOnce(&mut Builder)) -> Self {
        let mut sub = self.new_query();
        f(&mut sub);
        self.add_union(sub, true)
    }

    fn add_union(mut self, query: Builder, all: bool) -> Self {
        self.bindings.extend(query.bindings.iter().cloned());
        self.unions.push((query, all));
        self
    }

    // ==================== Caching directive ====================

    /// Memoize this query's SELECT results for `minutes`, under a derived
    /// key.
    pub fn remember(mut self, minutes: u64) -> Self {
        self.cache_minutes = Some(minutes);
        self
    }

    /// Memoize under an explicit cache key.
    pub fn remember_keyed(mut self, minutes: u64, key: impl Into<String>) -> Self {
        self.cache_minutes = Some(minutes);
        self.cache_key = Some(key.into());
        self
    }

    // ==================== Accessors ====================

    /// The target table, if set.
    pub fn table_name(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Accumulated bindings in append order (expressions included; they are
    /// cleaned on execution).
    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    /// The where sequence.
    pub fn wheres(&self) -> &[WherePredicate] {
        &self.wheres
    }

    /// The order sequence.
    pub fn orders(&self) -> &[(String, SortDir)] {
        &self.orders
    }

    pub(crate) fn merge_bindings(&mut self, other: &Builder) {
        self.bindings.extend(other.bindings.iter().cloned());
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("from", &self.from)
            .field("columns", &self.columns)
            .field("distinct", &self.distinct)
            .field("joins", &self.joins)
            .field("wheres", &self.wheres)
            .field("groups", &self.groups)
            .field("havings", &self.havings)
            .field("orders", &self.orders)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("unions", &self.unions)
            .field("bindings", &self.bindings)
            .finish()
    }
}

// Collaborator handles are identity, not state; equality compares clause
// state only.
impl PartialEq for Builder {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from
            && self.columns == other.columns
            && self.distinct == other.distinct
            && self.joins == other.joins
            && self.wheres == other.wheres
            && self.groups == other.groups
            && self.havings == other.havings
            && self.orders == other.orders
            && self.limit == other.limit
            && self.offset == other.offset
            && self.unions == other.unions
            && self.bindings == other.bindings
    }
}
