//! PostgreSQL grammar.

use super::Grammar;
use crate::builder::Builder;
use crate::connection::Record;
use crate::value::Value;

/// PostgreSQL: ANSI double-quoting, native `ilike`, `on conflict do
/// nothing` for ignore-duplicates, `returning` for generated keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostgresGrammar;

impl Grammar for PostgresGrammar {
    fn compile_insert_get_id(
        &self,
        query: &Builder,
        record: &Record,
        sequence: Option<&str>,
    ) -> String {
        format!(
            "{} returning {}",
            self.compile_insert(query, std::slice::from_ref(record)),
            self.wrap(sequence.unwrap_or("id"))
        )
    }

    fn compile_insert_ignore(&self, query: &Builder, records: &[Record]) -> String {
        format!("{} on conflict do nothing", self.compile_insert(query, records))
    }

    fn compile_insert_ignore_get_id(
        &self,
        query: &Builder,
        record: &Record,
        sequence: Option<&str>,
    ) -> String {
        // no row comes back when the insert was ignored
        format!(
            "{} returning {}",
            self.compile_insert_ignore(query, std::slice::from_ref(record)),
            self.wrap(sequence.unwrap_or("id"))
        )
    }

    fn compile_truncate(&self, query: &Builder) -> Vec<(String, Vec<Value>)> {
        vec![(
            format!("truncate {} restart identity", self.query_table(query)),
            Vec::new(),
        )]
    }
}
