//! Billing Domain Ports
//!
//! This module defines the data-access port for invoices and payments.
//! Every read and write happens inside a unit of work (`BillingTx`) obtained
//! from a `BillingStore`. A unit of work either commits all of its writes or,
//! when dropped without `commit`, none of them.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut tx = store.begin().await?;
//! let mut invoice = tx.get_invoice(tenant_id, invoice_id).await?;
//! invoice.amount_paid += payment.amount;
//! tx.save_invoice(&invoice).await?;
//! tx.commit().await?;
//! ```
//!
//! Adapters:
//!
//! - **PostgreSQL**: `infra_db::PostgresStore`, one database transaction per unit of work
//! - **In-memory**: [`mock::MemoryBillingStore`], for tests and local runs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use core_kernel::{
    ClientId, Currency, DomainPort, HealthCheckable, InvoiceId, Page, PaymentId, PortError,
    TenantId,
};

use crate::invoice::{Invoice, InvoiceItem, InvoiceStatus};
use crate::payment::{Payment, PaymentInsert};

/// Query parameters for listing invoices
#[derive(Debug, Clone, Default)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<ClientId>,
    /// Only invoices due strictly before this date
    pub due_before: Option<NaiveDate>,
    /// `None` returns every match
    pub page: Option<Page>,
}

impl InvoiceQuery {
    pub fn by_status(status: InvoiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Returns true if the invoice passes every filter
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.status.map_or(true, |s| invoice.status == s)
            && self.client_id.map_or(true, |c| invoice.client_id == c)
            && self.due_before.map_or(true, |d| invoice.due_date < d)
    }
}

/// An invoice ready to be inserted by the store
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceInsert {
    pub tenant_id: TenantId,
    pub client_id: ClientId,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub total_amount: Decimal,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItemInsert>,
    pub created_at: DateTime<Utc>,
}

/// A line item ready to be inserted, with its total already computed
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceItemInsert {
    pub description: String,
    pub service_code: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A unit of work over invoices and payments
///
/// Reads of a single invoice lock it until the unit of work ends.
#[async_trait]
pub trait BillingTx: Send {
    /// Loads an invoice with its items and locks it for update
    async fn get_invoice(&mut self, tenant_id: TenantId, id: InvoiceId) -> Result<Invoice, PortError>;

    async fn list_invoices(
        &mut self,
        tenant_id: TenantId,
        query: &InvoiceQuery,
    ) -> Result<Vec<Invoice>, PortError>;

    /// Inserts an invoice and its items, assigning ids
    async fn insert_invoice(&mut self, invoice: &InvoiceInsert) -> Result<Invoice, PortError>;

    /// Writes the invoice header (not its items)
    ///
    /// Fails with `PortError::Conflict` when the stored version differs from
    /// `invoice.version`. Returns the invoice with its bumped version.
    async fn save_invoice(&mut self, invoice: &Invoice) -> Result<Invoice, PortError>;

    /// Deletes every item of the invoice and inserts the given ones
    async fn replace_invoice_items(
        &mut self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        items: &[InvoiceItemInsert],
    ) -> Result<Vec<InvoiceItem>, PortError>;

    /// Deletes the invoice and its items
    async fn delete_invoice(&mut self, tenant_id: TenantId, id: InvoiceId) -> Result<(), PortError>;

    async fn insert_payment(&mut self, payment: &PaymentInsert) -> Result<Payment, PortError>;

    async fn get_payment(&mut self, tenant_id: TenantId, id: PaymentId) -> Result<Payment, PortError>;

    /// Payments of an invoice, oldest first
    async fn list_payments(
        &mut self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, PortError>;

    /// Makes every write of this unit of work durable
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}

/// Entry point to the billing data source
#[async_trait]
pub trait BillingStore: DomainPort + HealthCheckable {
    async fn begin(&self) -> Result<Box<dyn BillingTx>, PortError>;
}

/// In-memory implementation of the billing port for testing
///
/// State lives behind one async mutex; a unit of work holds the lock for its
/// whole lifetime and edits a private copy that replaces the shared state on
/// commit.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::sync::{Mutex, OwnedMutexGuard};
    use core_kernel::{AdapterHealth, HealthCheckResult, InvoiceItemId};

    /// Invoice and payment tables
    #[derive(Debug, Clone, Default)]
    pub struct BillingTables {
        pub invoices: BTreeMap<InvoiceId, Invoice>,
        pub payments: BTreeMap<PaymentId, Payment>,
        next_id: i64,
    }

    impl BillingTables {
        /// Hands out ids from one sequence shared by every table
        pub fn next_id(&mut self) -> i64 {
            self.next_id += 1;
            self.next_id
        }

        pub fn invoice(&self, tenant_id: TenantId, id: InvoiceId) -> Result<&Invoice, PortError> {
            self.invoices
                .get(&id)
                .filter(|i| i.tenant_id == tenant_id)
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        fn invoice_mut(&mut self, tenant_id: TenantId, id: InvoiceId) -> Result<&mut Invoice, PortError> {
            self.invoices
                .get_mut(&id)
                .filter(|i| i.tenant_id == tenant_id)
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        pub fn list_invoices(&self, tenant_id: TenantId, query: &InvoiceQuery) -> Vec<Invoice> {
            let matching = self
                .invoices
                .values()
                .filter(|i| i.tenant_id == tenant_id && query.matches(i))
                .cloned();
            match query.page {
                Some(page) => page.slice(matching),
                None => matching.collect(),
            }
        }

        pub fn insert_invoice(&mut self, insert: &InvoiceInsert) -> Result<Invoice, PortError> {
            let duplicate = self.invoices.values().any(|i| {
                i.tenant_id == insert.tenant_id && i.invoice_number == insert.invoice_number
            });
            if duplicate {
                return Err(PortError::conflict(format!(
                    "invoice number {} already exists",
                    insert.invoice_number
                )));
            }

            let id = InvoiceId::new(self.next_id());
            let items = self.build_items(id, &insert.items);
            let invoice = Invoice {
                id,
                tenant_id: insert.tenant_id,
                client_id: insert.client_id,
                invoice_number: insert.invoice_number.clone(),
                issue_date: insert.issue_date,
                due_date: insert.due_date,
                currency: insert.currency,
                items,
                total_amount: insert.total_amount,
                amount_paid: Decimal::ZERO,
                status: insert.status,
                notes: insert.notes.clone(),
                version: 1,
                created_at: insert.created_at,
                updated_at: insert.created_at,
            };
            self.invoices.insert(id, invoice.clone());
            Ok(invoice)
        }

        fn build_items(&mut self, invoice_id: InvoiceId, items: &[InvoiceItemInsert]) -> Vec<InvoiceItem> {
            items
                .iter()
                .map(|item| InvoiceItem {
                    id: InvoiceItemId::new(self.next_id()),
                    invoice_id,
                    description: item.description.clone(),
                    service_code: item.service_code.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total,
                })
                .collect()
        }

        pub fn save_invoice(&mut self, invoice: &Invoice) -> Result<Invoice, PortError> {
            let stored = self.invoice_mut(invoice.tenant_id, invoice.id)?;
            if stored.version != invoice.version {
                return Err(PortError::stale("Invoice", invoice.id, invoice.version));
            }
            let items = std::mem::take(&mut stored.items);
            *stored = Invoice {
                items,
                version: invoice.version + 1,
                ..invoice.clone()
            };
            Ok(Invoice {
                items: invoice.items.clone(),
                ..stored.clone()
            })
        }

        pub fn replace_invoice_items(
            &mut self,
            tenant_id: TenantId,
            invoice_id: InvoiceId,
            items: &[InvoiceItemInsert],
        ) -> Result<Vec<InvoiceItem>, PortError> {
            self.invoice(tenant_id, invoice_id)?;
            let items = self.build_items(invoice_id, items);
            self.invoice_mut(tenant_id, invoice_id)?.items = items.clone();
            Ok(items)
        }

        pub fn delete_invoice(&mut self, tenant_id: TenantId, id: InvoiceId) -> Result<(), PortError> {
            self.invoice(tenant_id, id)?;
            if self.payments.values().any(|p| p.invoice_id == id) {
                return Err(PortError::conflict(format!("invoice {} has payments", id)));
            }
            self.invoices.remove(&id);
            Ok(())
        }

        pub fn insert_payment(&mut self, insert: &PaymentInsert) -> Result<Payment, PortError> {
            self.invoice(insert.tenant_id, insert.invoice_id)?;
            let id = PaymentId::new(self.next_id());
            let payment = Payment {
                id,
                tenant_id: insert.tenant_id,
                invoice_id: insert.invoice_id,
                claim_id: insert.claim_id,
                amount: insert.amount,
                method: insert.method,
                reference: insert.reference.clone(),
                notes: insert.notes.clone(),
                paid_at: insert.paid_at,
                created_at: insert.paid_at,
            };
            self.payments.insert(id, payment.clone());
            Ok(payment)
        }

        pub fn payment(&self, tenant_id: TenantId, id: PaymentId) -> Result<Payment, PortError> {
            self.payments
                .get(&id)
                .filter(|p| p.tenant_id == tenant_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Payment", id))
        }

        pub fn payments_for(&self, tenant_id: TenantId, invoice_id: InvoiceId) -> Vec<Payment> {
            self.payments
                .values()
                .filter(|p| p.tenant_id == tenant_id && p.invoice_id == invoice_id)
                .cloned()
                .collect()
        }
    }

    /// A table set that contains the billing tables
    ///
    /// Lets other domains' in-memory stores reuse the billing unit of work.
    pub trait HasBillingTables: Clone + Send + Sync + 'static {
        fn billing(&self) -> &BillingTables;
        fn billing_mut(&mut self) -> &mut BillingTables;

        /// True when another table still points at the invoice
        fn invoice_is_referenced(&self, _invoice_id: InvoiceId) -> bool {
            false
        }

        /// True when another table still points at one of the invoice's items
        fn invoice_items_are_referenced(&self, _invoice_id: InvoiceId) -> bool {
            false
        }
    }

    impl HasBillingTables for BillingTables {
        fn billing(&self) -> &BillingTables {
            self
        }

        fn billing_mut(&mut self) -> &mut BillingTables {
            self
        }
    }

    /// A unit of work over in-memory tables of type `S`
    pub struct MemoryTx<S> {
        guard: OwnedMutexGuard<S>,
        work: S,
    }

    impl<S: Clone + Send + 'static> MemoryTx<S> {
        /// Waits for exclusive access to the shared state
        pub async fn begin(shared: &Arc<Mutex<S>>) -> Self {
            let guard = shared.clone().lock_owned().await;
            let work = (*guard).clone();
            Self { guard, work }
        }

        pub fn state(&self) -> &S {
            &self.work
        }

        pub fn state_mut(&mut self) -> &mut S {
            &mut self.work
        }

        /// Publishes the working copy
        pub fn publish(self) {
            let MemoryTx { mut guard, work } = self;
            *guard = work;
        }
    }

    #[async_trait]
    impl<S: HasBillingTables> BillingTx for MemoryTx<S> {
        async fn get_invoice(&mut self, tenant_id: TenantId, id: InvoiceId) -> Result<Invoice, PortError> {
            self.work.billing().invoice(tenant_id, id).cloned()
        }

        async fn list_invoices(
            &mut self,
            tenant_id: TenantId,
            query: &InvoiceQuery,
        ) -> Result<Vec<Invoice>, PortError> {
            Ok(self.work.billing().list_invoices(tenant_id, query))
        }

        async fn insert_invoice(&mut self, invoice: &InvoiceInsert) -> Result<Invoice, PortError> {
            self.work.billing_mut().insert_invoice(invoice)
        }

        async fn save_invoice(&mut self, invoice: &Invoice) -> Result<Invoice, PortError> {
            self.work.billing_mut().save_invoice(invoice)
        }

        async fn replace_invoice_items(
            &mut self,
            tenant_id: TenantId,
            invoice_id: InvoiceId,
            items: &[InvoiceItemInsert],
        ) -> Result<Vec<InvoiceItem>, PortError> {
            self.work.billing().invoice(tenant_id, invoice_id)?;
            if self.work.invoice_items_are_referenced(invoice_id) {
                return Err(PortError::conflict(format!(
                    "items of invoice {} are referenced by a claim",
                    invoice_id
                )));
            }
            self.work
                .billing_mut()
                .replace_invoice_items(tenant_id, invoice_id, items)
        }

        async fn delete_invoice(&mut self, tenant_id: TenantId, id: InvoiceId) -> Result<(), PortError> {
            self.work.billing().invoice(tenant_id, id)?;
            if self.work.invoice_is_referenced(id) {
                return Err(PortError::conflict(format!("invoice {} is still referenced", id)));
            }
            self.work.billing_mut().delete_invoice(tenant_id, id)
        }

        async fn insert_payment(&mut self, payment: &PaymentInsert) -> Result<Payment, PortError> {
            self.work.billing_mut().insert_payment(payment)
        }

        async fn get_payment(&mut self, tenant_id: TenantId, id: PaymentId) -> Result<Payment, PortError> {
            self.work.billing().payment(tenant_id, id)
        }

        async fn list_payments(
            &mut self,
            tenant_id: TenantId,
            invoice_id: InvoiceId,
        ) -> Result<Vec<Payment>, PortError> {
            Ok(self.work.billing().payments_for(tenant_id, invoice_id))
        }

        async fn commit(self: Box<Self>) -> Result<(), PortError> {
            (*self).publish();
            Ok(())
        }
    }

    /// In-memory billing store
    #[derive(Debug, Clone, Default)]
    pub struct MemoryBillingStore {
        state: Arc<Mutex<BillingTables>>,
    }

    impl MemoryBillingStore {
        /// Creates a new empty store
        pub fn new() -> Self {
            Self::default()
        }

        /// Copies the committed state for assertions
        pub async fn snapshot(&self) -> BillingTables {
            self.state.lock().await.clone()
        }
    }

    impl DomainPort for MemoryBillingStore {}

    #[async_trait]
    impl HealthCheckable for MemoryBillingStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "memory-billing-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("In-memory store always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl BillingStore for MemoryBillingStore {
        async fn begin(&self) -> Result<Box<dyn BillingTx>, PortError> {
            Ok(Box::new(MemoryTx::begin(&self.state).await))
        }
    }
}
