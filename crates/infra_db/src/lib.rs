//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the practice backend using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`] hold the SQL for one table family each. Every function
//!   takes a `&mut PgConnection`, so the same query runs on a pooled
//!   connection or inside a transaction.
//! - [`adapters::PostgresStore`] implements the domain ports. A billing or
//!   claims unit of work is one database transaction; rows read for update
//!   are locked with `SELECT ... FOR UPDATE`, and every header update checks
//!   the `version` column.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/practice")).await?;
//! run_migrations(&pool).await?;
//! let store = Arc::new(PostgresStore::new(pool));
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use adapters::{PgTx, PostgresStore};
