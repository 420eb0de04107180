//! The connection trait the builder executes through.
//!
//! A [`Connection`] is the external collaborator that actually talks to a
//! database: it receives `(sql, bindings)` pairs and returns rows or
//! affected-row counts. It also hands out the optional collaborators a
//! builder may consult (cache manager, paginator environment). The core
//! issues sequential calls only; pooling and thread-safety are the
//! connection's concern.

use crate::cache::CacheManager;
use crate::error::QueryResult;
use crate::paginator::{PaginatorEnvironment, StaticPage};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A result row: column name to value.
pub type Row = HashMap<String, Value>;

/// An input record for inserts and updates.
///
/// Ordered by column name, which makes binding order deterministic across
/// records of a multi-row insert.
pub type Record = BTreeMap<String, Value>;

/// Executes compiled SQL with its ordered bindings.
///
/// Failures propagate unchanged to the caller: the core does not retry and
/// does not swallow.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a SELECT and return its rows.
    async fn select(&self, sql: &str, bindings: &[Value]) -> QueryResult<Vec<Row>>;

    /// Run an INSERT; `true` on success.
    async fn insert(&self, sql: &str, bindings: &[Value]) -> QueryResult<bool>;

    /// Run an UPDATE and return the affected-row count.
    async fn update(&self, sql: &str, bindings: &[Value]) -> QueryResult<u64>;

    /// Run a DELETE and return the affected-row count.
    async fn delete(&self, sql: &str, bindings: &[Value]) -> QueryResult<u64>;

    /// Run any other statement; `true` on success.
    async fn statement(&self, sql: &str, bindings: &[Value]) -> QueryResult<bool>;

    /// Connection name, used in derived cache keys.
    fn name(&self) -> &str {
        "default"
    }

    /// The cache manager backing `remember`-directed SELECTs, if any.
    fn cache(&self) -> Option<Arc<dyn CacheManager>> {
        None
    }

    /// The paginator environment supplying the current page.
    fn paginator(&self) -> Arc<dyn PaginatorEnvironment> {
        Arc::new(StaticPage::default())
    }
}
