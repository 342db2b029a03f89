//! Domain Adapters
//!
//! Implementations of the domain ports backed by PostgreSQL.

pub mod postgres;

pub use postgres::{PgTx, PostgresStore};
