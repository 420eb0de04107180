//! Cached SELECT behavior: the remember contract and its failure modes.

mod common;

use async_trait::async_trait;
use common::{query, row, MockConnection};
use fluentq::{
    BasicProcessor, Builder, CacheManager, Connection, PaginatorEnvironment, PostgresGrammar,
    QueryError, QueryResult, Row, StaticPage, Value,
};
use std::sync::Arc;

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let conn = MockConnection::with_cache();
    conn.queue(vec![row(&[("id", Value::Int(1))])]);

    let q = query(&conn).from("users").where_eq("active", 1i64).remember(5);
    let first = q.get().await.unwrap();
    let second = q.get().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(conn.calls().len(), 1, "second read never hit the connection");
}

#[tokio::test]
async fn identical_queries_share_a_derived_key() {
    let conn = MockConnection::with_cache();
    conn.queue(vec![row(&[("id", Value::Int(1))])]);

    let rows = query(&conn)
        .from("users")
        .where_eq("id", 1i64)
        .remember(5)
        .get()
        .await
        .unwrap();
    // a separately built but identical query hits the same entry
    let again = query(&conn)
        .from("users")
        .where_eq("id", 1i64)
        .remember(5)
        .get()
        .await
        .unwrap();

    assert_eq!(rows, again);
    assert_eq!(conn.calls().len(), 1);
}

#[tokio::test]
async fn different_bindings_miss_each_other() {
    let conn = MockConnection::with_cache();
    conn.queue(vec![row(&[("id", Value::Int(1))])]);
    conn.queue(vec![row(&[("id", Value::Int(2))])]);

    query(&conn)
        .from("users")
        .where_eq("id", 1i64)
        .remember(5)
        .get()
        .await
        .unwrap();
    query(&conn)
        .from("users")
        .where_eq("id", 2i64)
        .remember(5)
        .get()
        .await
        .unwrap();

    assert_eq!(conn.calls().len(), 2);
}

#[tokio::test]
async fn explicit_key_is_used_verbatim() {
    let conn = MockConnection::with_cache();
    conn.queue(vec![row(&[("id", Value::Int(1))])]);

    query(&conn)
        .from("users")
        .remember_keyed(5, "users:all")
        .get()
        .await
        .unwrap();

    let cache = conn.cache().unwrap();
    assert!(cache.get("users:all").await.unwrap().is_some());
}

#[tokio::test]
async fn get_fresh_bypasses_the_cache() {
    let conn = MockConnection::with_cache();
    conn.queue(vec![row(&[("id", Value::Int(1))])]);
    conn.queue(vec![row(&[("id", Value::Int(2))])]);

    let q = query(&conn).from("users").remember(5);
    q.get().await.unwrap();
    let fresh = q.get_fresh().await.unwrap();

    assert_eq!(fresh[0]["id"], Value::Int(2));
    assert_eq!(conn.calls().len(), 2);
}

#[tokio::test]
async fn directive_without_cache_manager_falls_back_to_fresh() {
    let conn = MockConnection::new();
    conn.queue(vec![row(&[("id", Value::Int(1))])]);

    let rows = query(&conn).from("users").remember(5).get().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(conn.calls().len(), 1);
}

// A cache whose reads and writes always fail.
struct BrokenCache;

#[async_trait]
impl CacheManager for BrokenCache {
    async fn get(&self, _key: &str) -> QueryResult<Option<Vec<Row>>> {
        Err(QueryError::Cache("backend offline".to_string()))
    }

    async fn put(&self, _key: &str, _rows: Vec<Row>, _minutes: u64) -> QueryResult<()> {
        Err(QueryError::Cache("backend offline".to_string()))
    }
}

struct BrokenCacheConnection {
    inner: Arc<MockConnection>,
    cache: Arc<BrokenCache>,
}

#[async_trait]
impl Connection for BrokenCacheConnection {
    async fn select(&self, sql: &str, bindings: &[Value]) -> QueryResult<Vec<Row>> {
        self.inner.select(sql, bindings).await
    }

    async fn insert(&self, sql: &str, bindings: &[Value]) -> QueryResult<bool> {
        self.inner.insert(sql, bindings).await
    }

    async fn update(&self, sql: &str, bindings: &[Value]) -> QueryResult<u64> {
        self.inner.update(sql, bindings).await
    }

    async fn delete(&self, sql: &str, bindings: &[Value]) -> QueryResult<u64> {
        self.inner.delete(sql, bindings).await
    }

    async fn statement(&self, sql: &str, bindings: &[Value]) -> QueryResult<bool> {
        self.inner.statement(sql, bindings).await
    }

    fn name(&self) -> &str {
        "broken-cache"
    }

    fn cache(&self) -> Option<Arc<dyn CacheManager>> {
        Some(Arc::clone(&self.cache) as Arc<dyn CacheManager>)
    }

    fn paginator(&self) -> Arc<dyn PaginatorEnvironment> {
        Arc::new(StaticPage::default())
    }
}

#[tokio::test]
async fn cache_failures_fall_back_to_a_fresh_read() {
    let inner = MockConnection::new();
    inner.queue(vec![row(&[("id", Value::Int(7))])]);
    let conn = Arc::new(BrokenCacheConnection {
        inner: Arc::clone(&inner),
        cache: Arc::new(BrokenCache),
    });

    let q = Builder::new(
        Arc::clone(&conn) as Arc<dyn Connection>,
        Arc::new(PostgresGrammar),
        Arc::new(BasicProcessor),
    )
    .from("users")
    .where_eq("id", 7i64)
    .remember(5);

    let rows = q.get().await.unwrap();
    assert_eq!(rows[0]["id"], Value::Int(7));
    // clause state survived the cache failure intact
    assert_eq!(q.bindings(), &[Value::Int(7)]);
    assert_eq!(q.to_sql(), "select * from \"users\" where \"id\" = ?");
}
