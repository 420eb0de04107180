//! Terminal operations: compilation, execution, caching, and pagination.
//!
//! Terminals borrow the builder, so running a query does not consume it and
//! further fluent calls can compose afterwards. Every execution path routes
//! bindings through [`clean_bindings`] and traces the compiled SQL.

use super::Builder;
use crate::connection::{Record, Row};
use crate::error::{QueryError, QueryResult};
use crate::expression::Expression;
use crate::grammar::SelectOptions;
use crate::join::JoinKind;
use crate::paginator::Paginator;
use crate::value::{clean_bindings, Value};
use sha2::{Digest, Sha256};

/// The row field a possibly-dotted selector refers to.
fn field_name(column: &str) -> &str {
    column.rsplit('.').next().unwrap_or(column)
}

fn flatten_records(records: &[Record]) -> Vec<Value> {
    records
        .iter()
        .flat_map(|record| record.values().cloned())
        .collect()
}

impl Builder {
    /// Compile this builder to SQL without executing it.
    pub fn to_sql(&self) -> String {
        self.grammar.compile_select(self)
    }

    pub(crate) fn validate(&self) -> QueryResult<()> {
        if self.from.is_none() {
            return Err(QueryError::validation(
                "no target table; call from() before executing",
            ));
        }
        for join in &self.joins {
            if join.kind != JoinKind::Cross && join.conditions.is_empty() {
                return Err(QueryError::validation(format!(
                    "{} on '{}' has no on-conditions",
                    join.kind.as_sql(),
                    join.table
                )));
            }
        }
        Ok(())
    }

    // ==================== SELECT terminals ====================

    /// Run the query and return its rows, honoring any caching directive.
    pub async fn get(&self) -> QueryResult<Vec<Row>> {
        self.execute_select(&SelectOptions::default()).await
    }

    /// Like [`get`](Self::get), selecting `columns` if none were chosen.
    pub async fn get_columns(&self, columns: &[&str]) -> QueryResult<Vec<Row>> {
        let options = SelectOptions {
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
            ..SelectOptions::default()
        };
        self.execute_select(&options).await
    }

    /// Run the query against the connection, bypassing the cache.
    pub async fn get_fresh(&self) -> QueryResult<Vec<Row>> {
        self.validate()?;
        self.fresh(&SelectOptions::default()).await
    }

    /// Run the query through the cache manager (`remember` contract).
    pub async fn get_cached(&self) -> QueryResult<Vec<Row>> {
        self.validate()?;
        self.cached(&SelectOptions::default()).await
    }

    async fn execute_select(&self, options: &SelectOptions) -> QueryResult<Vec<Row>> {
        self.validate()?;
        if self.cache_minutes.is_some() {
            self.cached(options).await
        } else {
            self.fresh(options).await
        }
    }

    async fn fresh(&self, options: &SelectOptions) -> QueryResult<Vec<Row>> {
        let sql = self.grammar.compile_select_with(self, options);
        let bindings = clean_bindings(&self.bindings);
        tracing::debug!(target: "fluentq", %sql, bindings = bindings.len(), "select");
        let rows = self.connection.select(&sql, &bindings).await?;
        Ok(self.processor.process_select(rows))
    }

    async fn cached(&self, options: &SelectOptions) -> QueryResult<Vec<Row>> {
        let Some(cache) = self.connection.cache() else {
            tracing::warn!(
                target: "fluentq",
                "cache directive set but connection has no cache manager"
            );
            return self.fresh(options).await;
        };

        let sql = self.grammar.compile_select_with(self, options);
        let key = match &self.cache_key {
            Some(key) => key.clone(),
            None => self.derive_cache_key(&sql),
        };

        match cache.get(&key).await {
            Ok(Some(rows)) => return Ok(rows),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(target: "fluentq", %key, error = %err, "cache read failed");
            }
        }

        let rows = self.fresh(options).await?;
        let minutes = self.cache_minutes.unwrap_or(0);
        if let Err(err) = cache.put(&key, rows.clone(), minutes).await {
            tracing::warn!(target: "fluentq", %key, error = %err, "cache write failed");
        }
        Ok(rows)
    }

    /// Deterministic key over connection name, SQL, and bindings.
    fn derive_cache_key(&self, sql: &str) -> String {
        let bindings = serde_json::to_string(&self.bindings).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(self.connection.name().as_bytes());
        hasher.update(sql.as_bytes());
        hasher.update(bindings.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// The first row, if any.
    pub async fn first(&self) -> QueryResult<Option<Row>> {
        let rows = self.clone().take(1).get().await?;
        Ok(rows.into_iter().next())
    }

    /// The first row with a column fallback, if any.
    pub async fn first_columns(&self, columns: &[&str]) -> QueryResult<Option<Row>> {
        let rows = self.clone().take(1).get_columns(columns).await?;
        Ok(rows.into_iter().next())
    }

    /// Shorthand for `where id = ? limit 1`.
    pub async fn find(&self, id: impl Into<Value>) -> QueryResult<Option<Row>> {
        self.clone().where_eq("id", id).first().await
    }

    /// The named field of the first row, if any.
    pub async fn pluck(&self, column: &str) -> QueryResult<Option<Value>> {
        let row = self.first_columns(&[column]).await?;
        Ok(row.and_then(|mut row| row.remove(field_name(column))))
    }

    /// An ordered vector of one column's values.
    ///
    /// A dotted selector such as `users.email` reads the `email` field of
    /// each returned row.
    pub async fn lists(&self, column: &str) -> QueryResult<Vec<Value>> {
        let rows = self.get_columns(&[column]).await?;
        let field = field_name(column);
        rows.into_iter()
            .map(|mut row| {
                row.remove(field)
                    .ok_or_else(|| QueryError::decode(field, "column missing from result row"))
            })
            .collect()
    }

    /// Ordered `(key, value)` pairs of two columns.
    pub async fn lists_keyed(
        &self,
        column: &str,
        key: &str,
    ) -> QueryResult<Vec<(Value, Value)>> {
        let rows = self.get_columns(&[column, key]).await?;
        let value_field = field_name(column);
        let key_field = field_name(key);
        rows.into_iter()
            .map(|mut row| {
                let key = row
                    .remove(key_field)
                    .ok_or_else(|| QueryError::decode(key_field, "column missing from result row"))?;
                let value = row.remove(value_field).ok_or_else(|| {
                    QueryError::decode(value_field, "column missing from result row")
                })?;
                Ok((key, value))
            })
            .collect()
    }

    // ==================== Aggregates ====================

    /// Run an aggregate function over `columns` and return the `aggregate`
    /// field of the first row.
    ///
    /// The aggregate is a per-call compile override; the builder's column
    /// selection is untouched and a later [`get`](Self::get) compiles
    /// without it.
    pub async fn aggregate(&self, function: &str, columns: &[&str]) -> QueryResult<Option<Value>> {
        self.validate()?;
        let options = SelectOptions::aggregate(function, columns);
        let rows = if self.cache_minutes.is_some() {
            self.cached(&options).await?
        } else {
            self.fresh(&options).await?
        };
        Ok(rows.into_iter().next().and_then(|mut row| row.remove("aggregate")))
    }

    /// `count(*)`; zero when the connection returns nothing.
    pub async fn count(&self) -> QueryResult<u64> {
        let value = self.aggregate("count", &["*"]).await?;
        Ok(value
            .and_then(|v| v.as_i64())
            .map(|n| n.max(0) as u64)
            .unwrap_or(0))
    }

    /// `min(column)`.
    pub async fn min(&self, column: &str) -> QueryResult<Option<Value>> {
        self.aggregate("min", &[column]).await
    }

    /// `max(column)`.
    pub async fn max(&self, column: &str) -> QueryResult<Option<Value>> {
        self.aggregate("max", &[column]).await
    }

    /// `sum(column)`.
    pub async fn sum(&self, column: &str) -> QueryResult<Option<Value>> {
        self.aggregate("sum", &[column]).await
    }

    /// `avg(column)`.
    pub async fn avg(&self, column: &str) -> QueryResult<Option<Value>> {
        self.aggregate("avg", &[column]).await
    }

    /// Whether any row matches.
    pub async fn exists(&self) -> QueryResult<bool> {
        Ok(self.count().await? > 0)
    }

    // ==================== Pagination ====================

    /// The total row count for pagination, compiled without the order-by
    /// section. The builder's orders are untouched.
    pub async fn pagination_count(&self) -> QueryResult<u64> {
        self.validate()?;
        let options = SelectOptions {
            aggregate: Some(("count".to_string(), vec!["*".to_string()])),
            without_orders: true,
            ..SelectOptions::default()
        };
        let rows = self.fresh(&options).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove("aggregate"))
            .and_then(|v| v.as_i64())
            .map(|n| n.max(0) as u64)
            .unwrap_or(0))
    }

    /// One page of results, with the current page supplied by the
    /// connection's paginator environment.
    ///
    /// Grouped queries fetch the full result set and slice in memory (the
    /// caller opted into that cost by grouping); ungrouped queries count
    /// separately and fetch only the page.
    pub async fn paginate(&self, per_page: u64) -> QueryResult<Paginator> {
        self.validate()?;
        let page = self.connection.paginator().current_page().max(1);

        if !self.groups.is_empty() {
            let rows = self.get().await?;
            let total = rows.len() as u64;
            let start = (page.saturating_sub(1) * per_page) as usize;
            let items: Vec<Row> = rows
                .into_iter()
                .skip(start)
                .take(per_page as usize)
                .collect();
            return Ok(Paginator::new(items, total, per_page, page));
        }

        let total = self.pagination_count().await?;
        let items = self.clone().for_page(page, per_page).get().await?;
        Ok(Paginator::new(items, total, per_page, page))
    }

    // ==================== INSERT ====================

    /// Insert one record.
    pub async fn insert(&self, record: Record) -> QueryResult<bool> {
        self.insert_many(vec![record]).await
    }

    /// Insert a batch of records as a single multi-row statement.
    ///
    /// Bindings flatten each record's values in column order, record by
    /// record. An empty batch is a no-op.
    pub async fn insert_many(&self, records: Vec<Record>) -> QueryResult<bool> {
        self.validate()?;
        if records.is_empty() {
            return Ok(true);
        }
        let sql = self.grammar.compile_insert(self, &records);
        let bindings = clean_bindings(&flatten_records(&records));
        tracing::debug!(target: "fluentq", %sql, bindings = bindings.len(), "insert");
        self.connection.insert(&sql, &bindings).await
    }

    /// Insert one record and return its generated key.
    pub async fn insert_get_id(
        &self,
        record: Record,
        sequence: Option<&str>,
    ) -> QueryResult<Value> {
        self.validate()?;
        let sql = self.grammar.compile_insert_get_id(self, &record, sequence);
        let bindings = clean_bindings(&flatten_records(std::slice::from_ref(&record)));
        tracing::debug!(target: "fluentq", %sql, bindings = bindings.len(), "insert_get_id");
        let id = self
            .processor
            .process_insert_get_id(self.connection.as_ref(), &sql, &bindings, sequence)
            .await?;
        id.ok_or_else(|| {
            QueryError::decode(
                sequence.unwrap_or("id"),
                "insert returned no generated key",
            )
        })
    }

    /// Insert one record in the dialect's ignore-duplicates form.
    pub async fn insert_ignore(&self, record: Record) -> QueryResult<bool> {
        self.insert_ignore_many(vec![record]).await
    }

    /// Batch variant of [`insert_ignore`](Self::insert_ignore).
    pub async fn insert_ignore_many(&self, records: Vec<Record>) -> QueryResult<bool> {
        self.validate()?;
        if records.is_empty() {
            return Ok(true);
        }
        let sql = self.grammar.compile_insert_ignore(self, &records);
        let bindings = clean_bindings(&flatten_records(&records));
        tracing::debug!(target: "fluentq", %sql, bindings = bindings.len(), "insert_ignore");
        self.connection.insert(&sql, &bindings).await
    }

    /// Ignore-duplicates insert returning the generated key, or `None`
    /// when the row was ignored.
    pub async fn insert_ignore_get_id(
        &self,
        record: Record,
        sequence: Option<&str>,
    ) -> QueryResult<Option<Value>> {
        self.validate()?;
        let sql = self
            .grammar
            .compile_insert_ignore_get_id(self, &record, sequence);
        let bindings = clean_bindings(&flatten_records(std::slice::from_ref(&record)));
        tracing::debug!(target: "fluentq", %sql, bindings = bindings.len(), "insert_ignore_get_id");
        self.processor
            .process_insert_get_id(self.connection.as_ref(), &sql, &bindings, sequence)
            .await
    }

    // ==================== UPDATE ====================

    /// Update matched rows; returns the affected-row count.
    ///
    /// The update values' bindings go in front of the accumulated where
    /// bindings, matching the compiled `set ... where ...` order.
    pub async fn update(&self, values: Record) -> QueryResult<u64> {
        self.validate()?;
        let sql = self.grammar.compile_update(self, &values);
        let mut bindings: Vec<Value> = values.values().cloned().collect();
        bindings.extend(self.bindings.iter().cloned());
        let bindings = clean_bindings(&bindings);
        tracing::debug!(target: "fluentq", %sql, bindings = bindings.len(), "update");
        self.connection.update(&sql, &bindings).await
    }

    /// `column = column + amount` on matched rows.
    pub async fn increment(&self, column: &str, amount: i64) -> QueryResult<u64> {
        self.increment_extra(column, amount, Record::new()).await
    }

    /// [`increment`](Self::increment) merged with extra column updates.
    pub async fn increment_extra(
        &self,
        column: &str,
        amount: i64,
        extra: Record,
    ) -> QueryResult<u64> {
        self.crement(column, amount, "+", extra).await
    }

    /// `column = column - amount` on matched rows.
    pub async fn decrement(&self, column: &str, amount: i64) -> QueryResult<u64> {
        self.decrement_extra(column, amount, Record::new()).await
    }

    /// [`decrement`](Self::decrement) merged with extra column updates.
    pub async fn decrement_extra(
        &self,
        column: &str,
        amount: i64,
        extra: Record,
    ) -> QueryResult<u64> {
        self.crement(column, amount, "-", extra).await
    }

    async fn crement(
        &self,
        column: &str,
        amount: i64,
        sign: &str,
        mut values: Record,
    ) -> QueryResult<u64> {
        let wrapped = self.grammar.wrap(column);
        values.insert(
            column.to_string(),
            Value::Expr(Expression::new(format!("{wrapped} {sign} {amount}"))),
        );
        self.update(values).await
    }

    // ==================== DELETE / TRUNCATE ====================

    /// Delete matched rows; returns the affected-row count.
    pub async fn delete(&self) -> QueryResult<u64> {
        self.validate()?;
        let sql = self.grammar.compile_delete(self);
        let bindings = clean_bindings(&self.bindings);
        tracing::debug!(target: "fluentq", %sql, bindings = bindings.len(), "delete");
        self.connection.delete(&sql, &bindings).await
    }

    /// Delete the row with the given id.
    pub async fn delete_by_id(&self, id: impl Into<Value>) -> QueryResult<u64> {
        self.clone().where_eq("id", id).delete().await
    }

    /// Empty the table, running every statement the grammar produces in
    /// order.
    pub async fn truncate(&self) -> QueryResult<()> {
        self.validate()?;
        for (sql, bindings) in self.grammar.compile_truncate(self) {
            tracing::debug!(target: "fluentq", %sql, bindings = bindings.len(), "truncate");
            self.connection.statement(&sql, &bindings).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::builder;
    use crate::value::Value;

    #[test]
    fn to_sql_is_pure() {
        let q = builder().from("users").where_eq("id", 1i64);
        assert_eq!(q.to_sql(), "select * from \"users\" where \"id\" = ?");
        // repeated compilation is stable
        assert_eq!(q.to_sql(), q.to_sql());
    }

    #[tokio::test]
    async fn terminals_require_a_table() {
        let err = builder().get().await.unwrap_err();
        assert!(err.is_validation());
        let err = builder().delete().await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn non_cross_joins_require_on_conditions() {
        let err = builder()
            .from("users")
            .join_with("contacts", crate::join::JoinKind::Inner, |_| {})
            .get()
            .await
            .unwrap_err();
        assert!(err.is_validation());

        // cross joins carry no conditions and stay valid
        builder()
            .from("sizes")
            .cross_join("colors")
            .get()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn count_is_zero_on_empty_result() {
        // the noop connection returns no rows
        assert_eq!(builder().from("users").count().await.unwrap(), 0);
        assert!(!builder().from("users").exists().await.unwrap());
    }

    #[tokio::test]
    async fn first_is_none_on_empty_result() {
        assert!(builder().from("users").first().await.unwrap().is_none());
        assert!(builder().from("users").pluck("id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn terminal_does_not_consume_the_builder() {
        let q = builder().from("users").where_eq("a", 1i64);
        q.get().await.unwrap();
        // still composable afterwards
        let q = q.where_eq("b", 2i64);
        assert_eq!(q.bindings(), &[Value::Int(1), Value::Int(2)]);
    }
}
