//! # fluentq
//!
//! A fluent, dialect-aware SQL query builder.
//!
//! A [`Builder`] accumulates clause state through chained calls; a
//! [`Grammar`] compiles that state into a single SQL string whose `?`
//! placeholders match an ordered vector of [`Value`] bindings; a
//! [`Connection`] executes the pair. Rows come back as plain column → value
//! maps and pass through a [`Processor`] before reaching the caller.
//!
//! ## Features
//!
//! - **Ordered bindings**: every clause appends its bindable values at
//!   insertion time and placeholders are emitted in matching order
//! - **Nested composition**: closure-built groups, sub-selects, exists
//!   clauses, and unions, with bindings merged upward
//! - **Dialects**: Postgres, MySQL, and SQLite grammars over one base
//! - **Opportunistic caching**: `remember(minutes)` memoizes SELECT results
//!   through the connection's cache manager
//! - **Pagination**: grouped and ungrouped strategies with a paginator
//!   environment supplying the current page
//!
//! ## Example
//!
//! ```ignore
//! use fluentq::{Builder, PostgresGrammar, BasicProcessor};
//! use std::sync::Arc;
//!
//! let query = Builder::new(conn, Arc::new(PostgresGrammar), Arc::new(BasicProcessor))
//!     .from("users")
//!     .where_eq("active", true)
//!     .or_where_nested(|q| q.where_op("age", ">", 18).where_not_null("email"))
//!     .order_by("name")
//!     .take(20);
//!
//! assert_eq!(
//!     query.to_sql(),
//!     "select * from \"users\" where \"active\" = ? or (\"age\" > ? and \"email\" is not null) \
//!      order by \"name\" asc limit 20"
//! );
//! let users = query.get().await?;
//! ```

mod builder;
mod cache;
mod connection;
mod error;
mod expression;
mod grammar;
mod join;
mod paginator;
mod processor;
mod value;

pub use builder::{Boolean, Builder, HavingPredicate, SortDir, WherePredicate};
pub use cache::{CacheManager, MemoryCache};
pub use connection::{Connection, Record, Row};
pub use error::{QueryError, QueryResult};
pub use expression::{raw, Expression};
pub use grammar::{Grammar, MySqlGrammar, PostgresGrammar, SelectOptions, SqliteGrammar};
pub use join::{JoinClause, JoinCondition, JoinKind, JoinOperand};
pub use paginator::{Paginator, PaginatorEnvironment, StaticPage};
pub use processor::{BasicProcessor, Processor};
pub use value::{clean_bindings, Value};
