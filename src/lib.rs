//! flowsql - A fluent, driver-agnostic SQL query builder
//!
//! Chain accumulation calls on a [`QueryBuilder`], finish with a terminal
//! operation that compiles one parameterized statement, executes it through a
//! [`DatabaseDriver`], and resets the builder for the next query.
//!
//! # Example
//! ```ignore
//! use flowsql::{FlowSqlClient, Operator, SortOrder};
//!
//! // Connect to a database (PostgreSQL here; `open` for embedded SQLite)
//! let client = FlowSqlClient::connect("postgres://localhost/mydb").await?;
//! let mut qb = client.builder();
//!
//! let rows = qb
//!     .table("users")
//!     .select(&["id", "name"])
//!     .where_eq("active", true)
//!     .where_op("age", Operator::Ge, 18)
//!     .order_by("name", SortOrder::Asc)
//!     .limit(20)
//!     .get()
//!     .await?;
//!
//! for row in rows {
//!     let name = row.get("name")?;
//! }
//! ```
//!
//! # Trust boundary
//!
//! Only values bound through [`SqlValue`] parameters are injection-safe.
//! Identifiers and raw fragments (tables, columns, projections, join and
//! order expressions, raw SQL) are interpolated as trusted text and must
//! never carry user input.

pub mod builders;
pub mod clauses;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod traits;
pub mod types;

mod client;

// Re-export main types for convenient access
pub use builders::{Aggregate, QueryBuilder, SortOrder};
pub use clauses::{Condition, Operator};
pub use client::FlowSqlClient;
pub use dialect::Dialect;
pub use error::{FlowSqlError, Result};
pub use traits::DatabaseDriver;
pub use types::{RawQueryResult, Row, SqlValue};
