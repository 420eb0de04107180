//! Post-processing of raw connection results.

use crate::connection::{Connection, Row};
use crate::error::QueryResult;
use crate::value::Value;
use async_trait::async_trait;

/// Adapts raw rows from the connection to caller-facing shapes.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Transform the rows of a SELECT before they reach the caller.
    fn process_select(&self, rows: Vec<Row>) -> Vec<Row> {
        rows
    }

    /// Execute a compiled insert-get-id statement and extract the generated
    /// key.
    ///
    /// The default runs the statement through `select` and reads the
    /// sequence column (`id` when unnamed) from the first returned row, the
    /// `returning`-style contract. Returns `None` when the statement
    /// produced no row (e.g. an ignored duplicate).
    async fn process_insert_get_id(
        &self,
        connection: &dyn Connection,
        sql: &str,
        bindings: &[Value],
        sequence: Option<&str>,
    ) -> QueryResult<Option<Value>> {
        let rows = connection.select(sql, bindings).await?;
        let key = sequence.unwrap_or("id");
        Ok(rows.into_iter().next().and_then(|mut row| row.remove(key)))
    }
}

/// The stock processor: identity on rows, `returning`-based key extraction.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicProcessor;

#[async_trait]
impl Processor for BasicProcessor {}
