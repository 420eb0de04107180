//! SQL grammars: compilation from builder state to dialect SQL.
//!
//! [`Grammar`] is a family of pure functions from clause state to SQL
//! strings. The trait's default methods implement the base (ANSI-ish)
//! grammar; dialect types override the points of difference (identifier
//! quoting, operator support, ignore-duplicates form, truncate form).
//!
//! Compilation traverses sections in a canonical order — select/aggregate,
//! from, joins, wheres, groups, havings, orders, limit, offset, unions —
//! omits unset sections, and emits one `?` placeholder per non-expression
//! binding in exact append order. Sub-queries compile recursively to SQL
//! only: their bindings were merged into the parent when the predicate was
//! inserted.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use sqlite::SqliteGrammar;

use crate::builder::{Boolean, Builder, HavingPredicate, WherePredicate};
use crate::connection::Record;
use crate::join::{JoinClause, JoinKind, JoinOperand};
use crate::value::Value;

/// Per-call SELECT compile overrides.
///
/// Aggregates and pagination counts pass their adjustments here instead of
/// mutating the builder, so those operations are referentially transparent.
#[derive(Clone, Debug, Default)]
pub struct SelectOptions {
    /// Fallback column list, used only when the builder selected none.
    pub columns: Option<Vec<String>>,
    /// Aggregate `(function, columns)`; wins over any column selection.
    pub aggregate: Option<(String, Vec<String>)>,
    /// Omit the order-by section.
    pub without_orders: bool,
}

impl SelectOptions {
    /// Overrides for an aggregate call.
    pub fn aggregate(function: &str, columns: &[&str]) -> Self {
        Self {
            aggregate: Some((
                function.to_string(),
                columns.iter().map(|c| c.to_string()).collect(),
            )),
            ..Self::default()
        }
    }
}

/// Find the byte offset of a case-insensitive ` as ` separator.
fn find_as(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    bytes.windows(4).position(|w| {
        w[0] == b' ' && (w[1] | 0x20) == b'a' && (w[2] | 0x20) == b's' && w[3] == b' '
    })
}

/// Dialect-specific compiler from builder state to SQL.
pub trait Grammar: Send + Sync {
    // ==================== Dialect points ====================

    /// Quote a single identifier segment.
    fn quote_ident(&self, segment: &str) -> String {
        format!("\"{}\"", segment.replace('"', "\"\""))
    }

    /// Rewrite an operator the dialect does not support natively.
    fn translate_operator(&self, operator: &str) -> String {
        operator.to_string()
    }

    // ==================== Wrapping & placeholders ====================

    /// Quote an identifier.
    ///
    /// `*` passes through, identifiers containing parentheses are treated
    /// as raw SQL, dotted identifiers quote per segment, and ` as ` aliases
    /// wrap both sides.
    fn wrap(&self, value: &str) -> String {
        if value == "*" {
            return "*".to_string();
        }
        if value.contains('(') {
            return value.to_string();
        }
        if let Some(pos) = find_as(value) {
            let lhs = &value[..pos];
            let alias = &value[pos + 4..];
            return format!("{} as {}", self.wrap(lhs), self.wrap(alias));
        }
        value
            .split('.')
            .map(|segment| {
                if segment == "*" {
                    "*".to_string()
                } else {
                    self.quote_ident(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quote a table reference.
    fn wrap_table(&self, table: &str) -> String {
        self.wrap(table)
    }

    /// Quote and comma-join a column list.
    fn columnize(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.wrap(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The placeholder for one value; expressions emit verbatim.
    fn parameter(&self, value: &Value) -> String {
        match value {
            Value::Expr(e) => e.as_str().to_string(),
            _ => "?".to_string(),
        }
    }

    /// Comma-joined placeholders for a value list.
    fn parameterize(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.parameter(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ==================== SELECT ====================

    /// Compile a full SELECT.
    fn compile_select(&self, query: &Builder) -> String {
        self.compile_select_with(query, &SelectOptions::default())
    }

    /// Compile a SELECT with per-call overrides.
    fn compile_select_with(&self, query: &Builder, options: &SelectOptions) -> String {
        let mut sql = self.compile_columns(query, options);

        if let Some(from) = &query.from {
            sql.push_str(" from ");
            sql.push_str(&self.wrap_table(from));
        }

        for join in &query.joins {
            sql.push(' ');
            sql.push_str(&self.compile_join(join));
        }

        let wheres = self.compile_wheres(query);
        if !wheres.is_empty() {
            sql.push(' ');
            sql.push_str(&wheres);
        }

        if !query.groups.is_empty() {
            sql.push_str(" group by ");
            sql.push_str(&self.columnize(&query.groups));
        }

        let havings = self.compile_havings(query);
        if !havings.is_empty() {
            sql.push(' ');
            sql.push_str(&havings);
        }

        if !options.without_orders && !query.orders.is_empty() {
            let orders = query
                .orders
                .iter()
                .map(|(column, dir)| format!("{} {}", self.wrap(column), dir.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" order by ");
            sql.push_str(&orders);
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" limit {limit}"));
        }

        if let Some(offset) = query.offset {
            sql.push_str(&format!(" offset {offset}"));
        }

        for (union, all) in &query.unions {
            sql.push_str(" union ");
            if *all {
                sql.push_str("all ");
            }
            sql.push_str(&self.compile_select(union));
        }

        sql
    }

    /// The `select ...` head: aggregate if present, else the column list.
    fn compile_columns(&self, query: &Builder, options: &SelectOptions) -> String {
        if let Some((function, columns)) = &options.aggregate {
            let mut column = self.columnize(columns);
            if query.distinct && column != "*" {
                column = format!("distinct {column}");
            }
            return format!("select {function}({column}) as aggregate");
        }

        let columns = query
            .columns
            .as_ref()
            .or(options.columns.as_ref())
            .cloned()
            .unwrap_or_else(|| vec!["*".to_string()]);
        let head = if query.distinct {
            "select distinct "
        } else {
            "select "
        };
        format!("{head}{}", self.columnize(&columns))
    }

    fn compile_join(&self, join: &JoinClause) -> String {
        if join.kind == JoinKind::Cross {
            return format!("{} {}", join.kind.as_sql(), self.wrap_table(&join.table));
        }
        if join.conditions.is_empty() {
            // validate() rejects this state before execution; the constant
            // keeps to_sql well-formed
            return format!(
                "{} {} on 1 = 1",
                join.kind.as_sql(),
                self.wrap_table(&join.table)
            );
        }

        let mut conditions = String::new();
        for (i, condition) in join.conditions.iter().enumerate() {
            if i > 0 {
                conditions.push_str(condition.boolean.as_sql());
                conditions.push(' ');
            }
            let second = match &condition.second {
                JoinOperand::Column(column) => self.wrap(column),
                JoinOperand::Value(value) => self.parameter(value),
            };
            conditions.push_str(&format!(
                "{} {} {} ",
                self.wrap(&condition.first),
                condition.operator,
                second
            ));
        }

        format!(
            "{} {} on {}",
            join.kind.as_sql(),
            self.wrap_table(&join.table),
            conditions.trim_end()
        )
    }

    /// The `where ...` section, or empty.
    fn compile_wheres(&self, query: &Builder) -> String {
        let conditions = self.compile_where_conditions(&query.wheres);
        if conditions.is_empty() {
            String::new()
        } else {
            format!("where {conditions}")
        }
    }

    /// Predicates joined by their stored connectors, first connector
    /// dropped.
    fn compile_where_conditions(&self, wheres: &[WherePredicate]) -> String {
        let mut out = String::new();
        for (i, predicate) in wheres.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(predicate.boolean().as_sql());
                out.push(' ');
            }
            out.push_str(&self.compile_where(predicate));
        }
        out
    }

    fn compile_where(&self, predicate: &WherePredicate) -> String {
        match predicate {
            WherePredicate::Basic {
                column,
                operator,
                value,
                ..
            } => format!(
                "{} {} {}",
                self.wrap(column),
                self.translate_operator(operator),
                self.parameter(value)
            ),
            WherePredicate::Nested { query, .. } => {
                format!("({})", self.compile_where_conditions(&query.wheres))
            }
            WherePredicate::Sub {
                column,
                operator,
                query,
                ..
            } => format!(
                "{} {} ({})",
                self.wrap(column),
                self.translate_operator(operator),
                self.compile_select(query)
            ),
            WherePredicate::Exists { query, negated, .. } => {
                let not = if *negated { "not " } else { "" };
                format!("{not}exists ({})", self.compile_select(query))
            }
            WherePredicate::In {
                column,
                values,
                negated,
                ..
            } => {
                if values.is_empty() {
                    // constant predicate keeps the SQL well-formed
                    return if *negated { "1 = 1" } else { "0 = 1" }.to_string();
                }
                let keyword = if *negated { "not in" } else { "in" };
                format!(
                    "{} {} ({})",
                    self.wrap(column),
                    keyword,
                    self.parameterize(values)
                )
            }
            WherePredicate::InSub {
                column,
                query,
                negated,
                ..
            } => {
                let keyword = if *negated { "not in" } else { "in" };
                format!(
                    "{} {} ({})",
                    self.wrap(column),
                    keyword,
                    self.compile_select(query)
                )
            }
            WherePredicate::Null {
                column, negated, ..
            } => {
                let check = if *negated { "is not null" } else { "is null" };
                format!("{} {}", self.wrap(column), check)
            }
            WherePredicate::Between { column, .. } => {
                // the two operands live in the binding vector
                format!("{} between ? and ?", self.wrap(column))
            }
            WherePredicate::Raw { sql, .. } => sql.clone(),
        }
    }

    /// The `having ...` section, or empty. Basic havings join with `and`;
    /// raw havings use their stored connector.
    fn compile_havings(&self, query: &Builder) -> String {
        let mut out = String::new();
        for (i, having) in query.havings.iter().enumerate() {
            let (sql, boolean) = match having {
                HavingPredicate::Basic {
                    column,
                    operator,
                    value,
                } => (
                    format!(
                        "{} {} {}",
                        self.wrap(column),
                        self.translate_operator(operator),
                        self.parameter(value)
                    ),
                    Boolean::And,
                ),
                HavingPredicate::Raw { sql, boolean } => (sql.clone(), *boolean),
            };
            if i == 0 {
                out.push_str("having ");
            } else {
                out.push_str(&format!(" {} ", boolean.as_sql()));
            }
            out.push_str(&sql);
        }
        out
    }

    // ==================== INSERT ====================

    /// Compile a (possibly multi-row) INSERT.
    fn compile_insert(&self, query: &Builder, records: &[Record]) -> String {
        self.insert_statement("insert into", query, records)
    }

    /// Compile an INSERT that requests the generated key.
    ///
    /// The base form is a plain insert; dialects with `returning` override.
    fn compile_insert_get_id(
        &self,
        query: &Builder,
        record: &Record,
        sequence: Option<&str>,
    ) -> String {
        let _ = sequence;
        self.compile_insert(query, std::slice::from_ref(record))
    }

    /// Compile the dialect's ignore-duplicates INSERT.
    fn compile_insert_ignore(&self, query: &Builder, records: &[Record]) -> String;

    /// Compile the dialect's ignore-duplicates INSERT requesting the
    /// generated key, where the dialect can express both at once.
    fn compile_insert_ignore_get_id(
        &self,
        query: &Builder,
        record: &Record,
        sequence: Option<&str>,
    ) -> String {
        let _ = sequence;
        self.compile_insert_ignore(query, std::slice::from_ref(record))
    }

    /// Shared insert body under a dialect keyword.
    fn insert_statement(&self, verb: &str, query: &Builder, records: &[Record]) -> String {
        let table = self.query_table(query);
        let columns: Vec<String> = records
            .first()
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default();

        let rows = records
            .iter()
            .map(|record| {
                let values: Vec<Value> = record.values().cloned().collect();
                format!("({})", self.parameterize(&values))
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{verb} {table} ({}) values {rows}",
            self.columnize(&columns)
        )
    }

    // ==================== UPDATE / DELETE / TRUNCATE ====================

    /// Compile an UPDATE; joins are carried, wheres follow the set list.
    fn compile_update(&self, query: &Builder, values: &Record) -> String {
        let table = self.query_table(query);

        let mut joins = String::new();
        for join in &query.joins {
            joins.push(' ');
            joins.push_str(&self.compile_join(join));
        }

        let columns = values
            .iter()
            .map(|(column, value)| format!("{} = {}", self.wrap(column), self.parameter(value)))
            .collect::<Vec<_>>()
            .join(", ");

        let wheres = self.compile_wheres(query);
        let mut sql = format!("update {table}{joins} set {columns}");
        if !wheres.is_empty() {
            sql.push(' ');
            sql.push_str(&wheres);
        }
        sql
    }

    /// Compile a DELETE.
    fn compile_delete(&self, query: &Builder) -> String {
        let table = self.query_table(query);
        let wheres = self.compile_wheres(query);
        if wheres.is_empty() {
            format!("delete from {table}")
        } else {
            format!("delete from {table} {wheres}")
        }
    }

    /// Compile TRUNCATE as an ordered sequence of statements.
    fn compile_truncate(&self, query: &Builder) -> Vec<(String, Vec<Value>)> {
        vec![(format!("truncate {}", self.query_table(query)), Vec::new())]
    }

    /// The wrapped target table; empty when none was set (execution
    /// terminals validate before compiling).
    fn query_table(&self, query: &Builder) -> String {
        query
            .from
            .as_deref()
            .map(|t| self.wrap_table(t))
            .unwrap_or_default()
    }
}
