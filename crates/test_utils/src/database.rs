//! Database Test Utilities
//!
//! Starts a PostgreSQL test container, applies the `infra_db` migrations and
//! hands out [`PostgresStore`] adapters over it. Setting `TEST_DATABASE_URL`
//! points the helpers at an existing database instead of a container.

use std::sync::Arc;

use once_cell::sync::Lazy;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresStore};

const POSTGRES_USER: &str = "practice";
const POSTGRES_PASSWORD: &str = "practice";
const POSTGRES_DB: &str = "practice_test";

/// Tables in child-first order for truncation
const TABLES: [&str; 6] = [
    "payments",
    "claim_items",
    "insurance_claims",
    "invoice_items",
    "invoices",
    "telehealth_sessions",
];

static EXTERNAL_URL: Lazy<Option<String>> = Lazy::new(|| std::env::var("TEST_DATABASE_URL").ok());

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A migrated PostgreSQL database for one test binary
pub struct TestDatabase {
    _container: Option<ContainerAsync<Postgres>>,
    pub url: String,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a container (unless `TEST_DATABASE_URL` is set) and migrates it
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start, the pool cannot
    /// connect, or a migration fails
    pub async fn new() -> Result<Self, BoxError> {
        let (container, url) = match EXTERNAL_URL.as_ref() {
            Some(url) => (None, url.clone()),
            None => {
                let container = Postgres::default()
                    .with_user(POSTGRES_USER)
                    .with_password(POSTGRES_PASSWORD)
                    .with_db_name(POSTGRES_DB)
                    .start()
                    .await?;
                let host = container.get_host().await?;
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!(
                    "postgres://{}:{}@{}:{}/{}",
                    POSTGRES_USER, POSTGRES_PASSWORD, host, port, POSTGRES_DB
                );
                (Some(container), url)
            }
        };

        let pool = create_pool(DatabaseConfig::new(url.clone()).max_connections(5)).await?;
        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A store adapter sharing this database's pool
    pub fn store(&self) -> Arc<PostgresStore> {
        Arc::new(PostgresStore::new(self.pool.clone()))
    }

    /// Removes all rows while keeping the schema
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        let statement = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", TABLES.join(", "));
        sqlx::query(&statement).execute(&self.pool).await?;
        Ok(())
    }
}

static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// A database shared by every test in the binary
///
/// Tests sharing it must use distinct tenants or clear the data first.
///
/// # Panics
///
/// Panics if the database fails to initialize
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("failed to create shared test database"),
            )
        })
        .await
        .clone()
}
