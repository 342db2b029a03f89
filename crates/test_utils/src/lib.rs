//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! practice billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Fixed dates, tenants, amounts and fake names
//! - `builders`: Command builders and an in-memory service harness
//! - `database`: PostgreSQL test containers for the store adapter
//! - `assertions`: Assertion helpers for invoices, claims and sessions
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
