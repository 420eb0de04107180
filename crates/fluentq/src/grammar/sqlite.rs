//! SQLite grammar.

use super::Grammar;
use crate::builder::Builder;
use crate::connection::Record;
use crate::value::Value;

/// SQLite: ANSI quoting, `insert or ignore`, truncate emulated by a
/// sequence reset plus a full delete.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteGrammar;

impl Grammar for SqliteGrammar {
    fn translate_operator(&self, operator: &str) -> String {
        if operator.eq_ignore_ascii_case("ilike") {
            "like".to_string()
        } else {
            operator.to_string()
        }
    }

    fn compile_insert_ignore(&self, query: &Builder, records: &[Record]) -> String {
        self.insert_statement("insert or ignore into", query, records)
    }

    fn compile_truncate(&self, query: &Builder) -> Vec<(String, Vec<Value>)> {
        let table = query.from.clone().unwrap_or_default();
        vec![
            (
                "delete from sqlite_sequence where name = ?".to_string(),
                vec![Value::Text(table)],
            ),
            (format!("delete from {}", self.query_table(query)), Vec::new()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::testing::builder;
    use crate::connection::Record;

    #[test]
    fn insert_or_ignore_keyword() {
        let mut record = Record::new();
        record.insert("email".to_string(), "a@b.c".into());
        let q = builder().from("users");
        assert_eq!(
            SqliteGrammar.compile_insert_ignore(&q, &[record]),
            "insert or ignore into \"users\" (\"email\") values (?)"
        );
    }

    #[test]
    fn truncate_resets_sequence_then_deletes() {
        let q = builder().from("users");
        let statements = SqliteGrammar.compile_truncate(&q);
        assert_eq!(
            statements,
            vec![
                (
                    "delete from sqlite_sequence where name = ?".to_string(),
                    vec![Value::Text("users".to_string())]
                ),
                ("delete from \"users\"".to_string(), Vec::new()),
            ]
        );
    }

    #[test]
    fn ilike_degrades_to_like() {
        let q = builder().from("users").where_op("name", "ilike", "%a%");
        assert_eq!(
            SqliteGrammar.compile_select(&q),
            "select * from \"users\" where \"name\" like ?"
        );
    }
}
