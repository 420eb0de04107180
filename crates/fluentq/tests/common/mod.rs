//! Shared fixtures: a recording mock connection with queued responses.

#![allow(dead_code)]

use async_trait::async_trait;
use fluentq::{
    BasicProcessor, Builder, CacheManager, Connection, MemoryCache, PaginatorEnvironment,
    PostgresGrammar, QueryResult, Record, Row, StaticPage, Value,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One recorded connection call.
#[derive(Clone, Debug)]
pub struct Call {
    pub kind: &'static str,
    pub sql: String,
    pub bindings: Vec<Value>,
}

/// Records every call and replays queued SELECT responses in order.
#[derive(Default)]
pub struct MockConnection {
    pub calls: Mutex<Vec<Call>>,
    responses: Mutex<VecDeque<Vec<Row>>>,
    cache: Option<Arc<MemoryCache>>,
    page: u64,
    affected: u64,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            page: 1,
            affected: 1,
            ..Self::default()
        })
    }

    pub fn with_cache() -> Arc<Self> {
        Arc::new(Self {
            page: 1,
            affected: 1,
            cache: Some(Arc::new(MemoryCache::new())),
            ..Self::default()
        })
    }

    pub fn on_page(page: u64) -> Arc<Self> {
        Arc::new(Self {
            page,
            affected: 1,
            ..Self::default()
        })
    }

    /// Queue the response for the next SELECT.
    pub fn queue(&self, rows: Vec<Row>) {
        self.responses.lock().unwrap().push_back(rows);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &'static str, sql: &str, bindings: &[Value]) {
        self.calls.lock().unwrap().push(Call {
            kind,
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
        });
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn select(&self, sql: &str, bindings: &[Value]) -> QueryResult<Vec<Row>> {
        self.record("select", sql, bindings);
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn insert(&self, sql: &str, bindings: &[Value]) -> QueryResult<bool> {
        self.record("insert", sql, bindings);
        Ok(true)
    }

    async fn update(&self, sql: &str, bindings: &[Value]) -> QueryResult<u64> {
        self.record("update", sql, bindings);
        Ok(self.affected)
    }

    async fn delete(&self, sql: &str, bindings: &[Value]) -> QueryResult<u64> {
        self.record("delete", sql, bindings);
        Ok(self.affected)
    }

    async fn statement(&self, sql: &str, bindings: &[Value]) -> QueryResult<bool> {
        self.record("statement", sql, bindings);
        Ok(true)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn cache(&self) -> Option<Arc<dyn CacheManager>> {
        self.cache
            .as_ref()
            .map(|c| Arc::clone(c) as Arc<dyn CacheManager>)
    }

    fn paginator(&self) -> Arc<dyn PaginatorEnvironment> {
        Arc::new(StaticPage(self.page))
    }
}

/// A builder over the mock connection with the Postgres grammar.
pub fn query(conn: &Arc<MockConnection>) -> Builder {
    Builder::new(
        Arc::clone(conn) as Arc<dyn Connection>,
        Arc::new(PostgresGrammar),
        Arc::new(BasicProcessor),
    )
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
