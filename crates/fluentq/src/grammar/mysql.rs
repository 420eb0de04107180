//! MySQL grammar.

use super::Grammar;
use crate::builder::Builder;
use crate::connection::Record;

/// MySQL: backtick quoting, `insert ignore`, no native `ilike`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MySqlGrammar;

impl Grammar for MySqlGrammar {
    fn quote_ident(&self, segment: &str) -> String {
        format!("`{}`", segment.replace('`', "``"))
    }

    fn translate_operator(&self, operator: &str) -> String {
        if operator.eq_ignore_ascii_case("ilike") {
            "like".to_string()
        } else {
            operator.to_string()
        }
    }

    fn compile_insert_ignore(&self, query: &Builder, records: &[Record]) -> String {
        self.insert_statement("insert ignore into", query, records)
    }
}
