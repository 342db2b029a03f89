//! PostgreSQL Store Adapter
//!
//! `PostgresStore` implements every domain port on one connection pool.
//! Billing and claims units of work are database transactions wrapped in
//! [`PgTx`]; dropping a `PgTx` without committing rolls the transaction back.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::PostgresStore;
//! use domain_claims::ClaimsStore;
//!
//! let store = Arc::new(PostgresStore::new(pool));
//! let mut tx = ClaimsStore::begin(store.as_ref()).await?;
//! let claim = tx.get_claim(tenant_id, claim_id).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    ClaimId, ClaimItemId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, PaymentId,
    PortError, SessionId, TenantId,
};
use domain_billing::{
    BillingStore, BillingTx, Invoice, InvoiceInsert, InvoiceItem, InvoiceItemInsert, InvoiceQuery,
    Payment, PaymentInsert,
};
use domain_claims::{
    ClaimInsert, ClaimItem, ClaimItemInsert, ClaimQuery, ClaimsStore, ClaimsTx, InsuranceClaim,
};
use domain_telehealth::{SessionInsert, SessionQuery, TelehealthSession, TelehealthStore};

use crate::error::DatabaseError;
use crate::repositories::{claims, invoices, payments, sessions};

/// PostgreSQL-backed implementation of the billing, claims and telehealth ports
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_tx(&self) -> Result<PgTx, PortError> {
        let tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        debug!("Transaction started");
        Ok(PgTx { tx })
    }
}

impl DomainPort for PostgresStore {}

#[async_trait]
impl HealthCheckable for PostgresStore {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-store", latency_ms),
            Err(e) => HealthCheckResult::unhealthy(
                "postgres-store",
                latency_ms,
                format!("Database error: {}", e),
            ),
        }
    }
}

#[async_trait]
impl BillingStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn BillingTx>, PortError> {
        Ok(Box::new(self.begin_tx().await?))
    }
}

#[async_trait]
impl ClaimsStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn ClaimsTx>, PortError> {
        Ok(Box::new(self.begin_tx().await?))
    }
}

/// One database transaction serving as a billing and claims unit of work
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingTx for PgTx {
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %id))]
    async fn get_invoice(&mut self, tenant_id: TenantId, id: InvoiceId) -> Result<Invoice, PortError> {
        Ok(invoices::fetch(&mut self.tx, tenant_id, id, true).await?)
    }

    #[instrument(skip(self, query), fields(tenant_id = %tenant_id))]
    async fn list_invoices(
        &mut self,
        tenant_id: TenantId,
        query: &InvoiceQuery,
    ) -> Result<Vec<Invoice>, PortError> {
        Ok(invoices::list(&mut self.tx, tenant_id, query).await?)
    }

    #[instrument(skip(self, invoice), fields(tenant_id = %invoice.tenant_id))]
    async fn insert_invoice(&mut self, invoice: &InvoiceInsert) -> Result<Invoice, PortError> {
        Ok(invoices::insert(&mut self.tx, invoice).await?)
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id, version = invoice.version))]
    async fn save_invoice(&mut self, invoice: &Invoice) -> Result<Invoice, PortError> {
        Ok(invoices::update(&mut self.tx, invoice).await?)
    }

    #[instrument(skip(self, items), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    async fn replace_invoice_items(
        &mut self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        items: &[InvoiceItemInsert],
    ) -> Result<Vec<InvoiceItem>, PortError> {
        // Scopes the item rewrite to the tenant before touching child rows
        invoices::fetch(&mut self.tx, tenant_id, invoice_id, true).await?;
        if invoices::items_are_claimed(&mut self.tx, invoice_id.get()).await? {
            return Err(PortError::conflict(format!(
                "items of invoice {} are referenced by a claim",
                invoice_id
            )));
        }
        let removed = invoices::delete_items(&mut self.tx, invoice_id.get()).await?;
        debug!(removed, "Invoice items cleared");
        Ok(invoices::insert_items(&mut self.tx, invoice_id.get(), items).await?)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %id))]
    async fn delete_invoice(&mut self, tenant_id: TenantId, id: InvoiceId) -> Result<(), PortError> {
        Ok(invoices::delete(&mut self.tx, tenant_id, id).await?)
    }

    #[instrument(skip(self, payment), fields(invoice_id = %payment.invoice_id, amount = %payment.amount))]
    async fn insert_payment(&mut self, payment: &PaymentInsert) -> Result<Payment, PortError> {
        Ok(payments::insert(&mut self.tx, payment).await?)
    }

    async fn get_payment(&mut self, tenant_id: TenantId, id: PaymentId) -> Result<Payment, PortError> {
        Ok(payments::fetch(&mut self.tx, tenant_id, id).await?)
    }

    async fn list_payments(
        &mut self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, PortError> {
        Ok(payments::list_for_invoice(&mut self.tx, tenant_id, invoice_id).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        debug!("Transaction committed");
        Ok(())
    }
}

#[async_trait]
impl ClaimsTx for PgTx {
    #[instrument(skip(self), fields(tenant_id = %tenant_id, claim_id = %id))]
    async fn get_claim(&mut self, tenant_id: TenantId, id: ClaimId) -> Result<InsuranceClaim, PortError> {
        Ok(claims::fetch(&mut self.tx, tenant_id, id, true).await?)
    }

    #[instrument(skip(self, query), fields(tenant_id = %tenant_id))]
    async fn list_claims(
        &mut self,
        tenant_id: TenantId,
        query: &ClaimQuery,
    ) -> Result<Vec<InsuranceClaim>, PortError> {
        Ok(claims::list(&mut self.tx, tenant_id, query).await?)
    }

    #[instrument(skip(self, claim), fields(invoice_id = %claim.invoice_id))]
    async fn insert_claim(&mut self, claim: &ClaimInsert) -> Result<InsuranceClaim, PortError> {
        Ok(claims::insert(&mut self.tx, claim).await?)
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id, version = claim.version))]
    async fn save_claim(&mut self, claim: &InsuranceClaim) -> Result<InsuranceClaim, PortError> {
        Ok(claims::update(&mut self.tx, claim).await?)
    }

    #[instrument(skip(self, item), fields(claim_id = %claim_id, invoice_item_id = %item.invoice_item_id))]
    async fn insert_claim_item(
        &mut self,
        tenant_id: TenantId,
        claim_id: ClaimId,
        item: &ClaimItemInsert,
    ) -> Result<ClaimItem, PortError> {
        claims::fetch(&mut self.tx, tenant_id, claim_id, true).await?;
        claims::insert_item(&mut self.tx, claim_id.get(), item)
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(_) => PortError::conflict(format!(
                    "invoice item {} is already on claim {}",
                    item.invoice_item_id, claim_id
                )),
                other => other.into(),
            })
    }

    #[instrument(skip(self), fields(claim_id = %claim_id, item_id = %item_id))]
    async fn delete_claim_item(
        &mut self,
        tenant_id: TenantId,
        claim_id: ClaimId,
        item_id: ClaimItemId,
    ) -> Result<(), PortError> {
        claims::fetch(&mut self.tx, tenant_id, claim_id, true).await?;
        Ok(claims::delete_item(&mut self.tx, claim_id, item_id).await?)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, claim_id = %id))]
    async fn delete_claim(&mut self, tenant_id: TenantId, id: ClaimId) -> Result<(), PortError> {
        Ok(claims::delete(&mut self.tx, tenant_id, id).await?)
    }
}

#[async_trait]
impl TelehealthStore for PostgresStore {
    async fn get_session(&self, tenant_id: TenantId, id: SessionId) -> Result<TelehealthSession, PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        Ok(sessions::fetch(&mut conn, tenant_id, id).await?)
    }

    async fn list_sessions(
        &self,
        tenant_id: TenantId,
        query: &SessionQuery,
    ) -> Result<Vec<TelehealthSession>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        Ok(sessions::list(&mut conn, tenant_id, query).await?)
    }

    #[instrument(skip(self, session), fields(tenant_id = %session.tenant_id))]
    async fn insert_session(&self, session: &SessionInsert) -> Result<TelehealthSession, PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        Ok(sessions::insert(&mut conn, session).await?)
    }

    #[instrument(skip(self, session), fields(session_id = %session.id, version = session.version))]
    async fn save_session(&self, session: &TelehealthSession) -> Result<TelehealthSession, PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        Ok(sessions::update(&mut conn, session).await?)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, session_id = %id))]
    async fn delete_session(&self, tenant_id: TenantId, id: SessionId) -> Result<(), PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        Ok(sessions::delete(&mut conn, tenant_id, id).await?)
    }
}
