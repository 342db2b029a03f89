//! Billing application services
//!
//! Services own the unit-of-work boundaries: each public method begins one
//! unit of work, runs every read and write of the operation inside it, and
//! commits at the end. Any error drops the unit of work and rolls back.
//!
//! The free functions `apply_payment` and `apply_insurance_status` run
//! inside a caller's unit of work so the claims domain can compose them into
//! its own transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use core_kernel::{Clock, Currency, InvoiceId, Money, PaymentId, TenantId};

use crate::error::BillingError;
use crate::invoice::{
    generate_invoice_number, Invoice, InvoiceStatus, NewInvoice, NewInvoiceItem, UpdateInvoice,
};
use crate::payment::{NewPayment, Payment, PaymentInsert};
use crate::ports::{BillingStore, BillingTx, InvoiceInsert, InvoiceItemInsert, InvoiceQuery};

/// Records a payment and reconciles the invoice inside `tx`
///
/// Rejects non-positive amounts and CANCELLED invoices. The amount is
/// rounded to the invoice currency before it is stored.
pub async fn apply_payment<T>(
    tx: &mut T,
    mut insert: PaymentInsert,
    now: DateTime<Utc>,
) -> Result<(Payment, Invoice), BillingError>
where
    T: BillingTx + ?Sized,
{
    let mut invoice = tx.get_invoice(insert.tenant_id, insert.invoice_id).await?;

    if invoice.status == InvoiceStatus::Cancelled {
        return Err(BillingError::InvalidState(format!(
            "invoice {} is cancelled and cannot take payments",
            invoice.id
        )));
    }

    let amount = Money::new(insert.amount, invoice.currency).round_to_currency();
    if !amount.is_positive() {
        return Err(BillingError::Validation(format!(
            "payment amount must be positive, got {}",
            insert.amount
        )));
    }
    let amount = amount.ensure_storable()?;
    let amount_paid = invoice.paid().checked_add(&amount)?.ensure_storable()?;
    insert.amount = amount.amount();

    let payment = tx.insert_payment(&insert).await?;

    invoice.amount_paid = amount_paid.amount();
    invoice.reconcile(now.date_naive());
    invoice.updated_at = now;
    let invoice = tx.save_invoice(&invoice).await?;

    debug!(
        payment_id = %payment.id,
        invoice_id = %invoice.id,
        amount_paid = %invoice.amount_paid,
        status = %invoice.status,
        "Payment applied"
    );

    Ok((payment, invoice))
}

/// Moves an invoice into an insurance status inside `tx`
///
/// PAID and CANCELLED invoices are left untouched; returns `None` then.
pub async fn apply_insurance_status<T>(
    tx: &mut T,
    tenant_id: TenantId,
    invoice_id: InvoiceId,
    status: InvoiceStatus,
    now: DateTime<Utc>,
) -> Result<Option<Invoice>, BillingError>
where
    T: BillingTx + ?Sized,
{
    let mut invoice = tx.get_invoice(tenant_id, invoice_id).await?;
    if invoice.status.is_settled() || invoice.status == status {
        return Ok(None);
    }
    invoice.status = status;
    invoice.updated_at = now;
    Ok(Some(tx.save_invoice(&invoice).await?))
}

fn build_items(
    items: &[NewInvoiceItem],
    currency: Currency,
) -> Result<Vec<InvoiceItemInsert>, BillingError> {
    items
        .iter()
        .map(|item| {
            item.validate()?;
            Ok(InvoiceItemInsert {
                description: item.description.trim().to_string(),
                service_code: item.service_code.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total(currency)?.amount(),
            })
        })
        .collect()
}

fn sum_lines(items: &[InvoiceItemInsert], currency: Currency) -> Result<Decimal, BillingError> {
    let lines: Vec<Money> = items
        .iter()
        .map(|item| Money::new(item.line_total, currency))
        .collect();
    Ok(Money::sum(&lines, currency)?.ensure_storable()?.amount())
}

/// Invoice use cases
#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn BillingStore>,
    clock: Arc<dyn Clock>,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn BillingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a DRAFT invoice with its items
    #[instrument(skip(self, cmd), fields(tenant_id = %tenant_id, client_id = %cmd.client_id))]
    pub async fn create_invoice(&self, tenant_id: TenantId, cmd: NewInvoice) -> Result<Invoice, BillingError> {
        let now = self.clock.now();
        let issue_date = cmd.issue_date.unwrap_or_else(|| self.clock.today());
        if cmd.due_date < issue_date {
            return Err(BillingError::Validation(format!(
                "due date {} is before issue date {}",
                cmd.due_date, issue_date
            )));
        }

        let items = build_items(&cmd.items, cmd.currency)?;
        let total_amount = sum_lines(&items, cmd.currency)?;
        let invoice_number = match cmd.invoice_number {
            Some(number) if !number.trim().is_empty() => number.trim().to_string(),
            _ => generate_invoice_number(now),
        };

        let insert = InvoiceInsert {
            tenant_id,
            client_id: cmd.client_id,
            invoice_number,
            issue_date,
            due_date: cmd.due_date,
            currency: cmd.currency,
            total_amount,
            status: InvoiceStatus::Draft,
            notes: cmd.notes,
            items,
            created_at: now,
        };

        let mut tx = self.store.begin().await?;
        let invoice = tx.insert_invoice(&insert).await?;
        tx.commit().await?;

        info!(invoice_id = %invoice.id, total = %invoice.total(), "Invoice created");
        Ok(invoice)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %id))]
    pub async fn get_invoice(&self, tenant_id: TenantId, id: InvoiceId) -> Result<Invoice, BillingError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.get_invoice(tenant_id, id).await?)
    }

    #[instrument(skip(self, query), fields(tenant_id = %tenant_id))]
    pub async fn list_invoices(
        &self,
        tenant_id: TenantId,
        query: InvoiceQuery,
    ) -> Result<Vec<Invoice>, BillingError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_invoices(tenant_id, &query).await?)
    }

    /// Applies an explicit update command
    #[instrument(skip(self, cmd), fields(tenant_id = %tenant_id, invoice_id = %id))]
    pub async fn update_invoice(
        &self,
        tenant_id: TenantId,
        id: InvoiceId,
        cmd: UpdateInvoice,
    ) -> Result<Invoice, BillingError> {
        let today = self.clock.today();
        let mut tx = self.store.begin().await?;
        let mut invoice = tx.get_invoice(tenant_id, id).await?;

        if let Some(items) = cmd.items {
            if invoice.status != InvoiceStatus::Draft {
                return Err(BillingError::InvalidState(format!(
                    "items of invoice {} can only be replaced while DRAFT (status is {})",
                    id, invoice.status
                )));
            }
            let inserts = build_items(&items, invoice.currency)?;
            sum_lines(&inserts, invoice.currency)?;
            invoice.items = tx.replace_invoice_items(tenant_id, id, &inserts).await?;
            invoice.recalculate_total()?;
        }

        if let Some(due_date) = cmd.due_date {
            if due_date < invoice.issue_date {
                return Err(BillingError::Validation(format!(
                    "due date {} is before issue date {}",
                    due_date, invoice.issue_date
                )));
            }
            invoice.due_date = due_date;
        }

        cmd.notes.apply_to(&mut invoice.notes);

        if let Some(status) = cmd.status {
            if status != invoice.status {
                invoice.check_manual_transition(status)?;
                invoice.status = status;
            }
        }

        if invoice.status != InvoiceStatus::Cancelled {
            invoice.reconcile(today);
        }
        invoice.updated_at = self.clock.now();

        let invoice = tx.save_invoice(&invoice).await?;
        tx.commit().await?;

        info!(status = %invoice.status, "Invoice updated");
        Ok(invoice)
    }

    /// Deletes a DRAFT or CANCELLED invoice that has no payments
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %id))]
    pub async fn delete_invoice(&self, tenant_id: TenantId, id: InvoiceId) -> Result<(), BillingError> {
        let mut tx = self.store.begin().await?;
        let invoice = tx.get_invoice(tenant_id, id).await?;

        if !matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Cancelled) {
            return Err(BillingError::InvalidState(format!(
                "invoice {} is {} and cannot be deleted",
                id, invoice.status
            )));
        }
        if !tx.list_payments(tenant_id, id).await?.is_empty() {
            return Err(BillingError::InvalidState(format!(
                "invoice {} has recorded payments and cannot be deleted",
                id
            )));
        }

        tx.delete_invoice(tenant_id, id).await?;
        tx.commit().await?;

        info!("Invoice deleted");
        Ok(())
    }

    /// Marks every SENT invoice past its due date with nothing paid as OVERDUE
    ///
    /// Returns the invoices that changed.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn sweep_overdue(&self, tenant_id: TenantId) -> Result<Vec<Invoice>, BillingError> {
        let today = self.clock.today();
        let now = self.clock.now();
        let query = InvoiceQuery {
            status: Some(InvoiceStatus::Sent),
            due_before: Some(today),
            ..Default::default()
        };

        let mut tx = self.store.begin().await?;
        let candidates = tx.list_invoices(tenant_id, &query).await?;

        let mut changed = Vec::new();
        for candidate in candidates {
            let mut invoice = tx.get_invoice(tenant_id, candidate.id).await?;
            if invoice.reconcile(today) {
                invoice.updated_at = now;
                changed.push(tx.save_invoice(&invoice).await?);
            }
        }
        tx.commit().await?;

        info!(count = changed.len(), "Overdue sweep finished");
        Ok(changed)
    }
}

/// Payment use cases
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn BillingStore>,
    clock: Arc<dyn Clock>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn BillingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Records a payment, raises `amount_paid` and reconciles the invoice
    #[instrument(
        skip(self, cmd),
        fields(tenant_id = %tenant_id, invoice_id = %invoice_id, amount = %cmd.amount, method = %cmd.method)
    )]
    pub async fn record_payment(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        cmd: NewPayment,
    ) -> Result<(Payment, Invoice), BillingError> {
        let now = self.clock.now();
        let insert = PaymentInsert::from_command(tenant_id, invoice_id, cmd, now);

        let mut tx = self.store.begin().await?;
        let (payment, invoice) = apply_payment(tx.as_mut(), insert, now).await?;
        tx.commit().await?;

        info!(payment_id = %payment.id, status = %invoice.status, "Payment recorded");
        Ok((payment, invoice))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, payment_id = %id))]
    pub async fn get_payment(&self, tenant_id: TenantId, id: PaymentId) -> Result<Payment, BillingError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.get_payment(tenant_id, id).await?)
    }

    /// Lists the payments of an invoice, failing if the invoice is unknown
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn list_payments(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, BillingError> {
        let mut tx = self.store.begin().await?;
        tx.get_invoice(tenant_id, invoice_id).await?;
        Ok(tx.list_payments(tenant_id, invoice_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::PaymentMethod;
    use crate::ports::mock::MemoryBillingStore;
    use chrono::NaiveDate;
    use core_kernel::{ClientId, FixedClock};
    use rust_decimal_macros::dec;

    fn services() -> (InvoiceService, PaymentService, Arc<MemoryBillingStore>) {
        let store = Arc::new(MemoryBillingStore::new());
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        (
            InvoiceService::new(store.clone(), clock.clone()),
            PaymentService::new(store.clone(), clock),
            store,
        )
    }

    fn new_invoice(total: Decimal) -> NewInvoice {
        NewInvoice {
            client_id: ClientId::new(7),
            invoice_number: Some(format!("T-{}", total)),
            issue_date: None,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            currency: Currency::USD,
            notes: None,
            items: vec![NewInvoiceItem::new("Consultation", dec!(1), total)],
        }
    }

    #[tokio::test]
    async fn test_payment_on_cancelled_invoice_is_rejected() {
        let (invoices, payments, store) = services();
        let tenant = TenantId::new(1);
        let invoice = invoices.create_invoice(tenant, new_invoice(dec!(80))).await.unwrap();
        invoices
            .update_invoice(
                tenant,
                invoice.id,
                UpdateInvoice {
                    status: Some(InvoiceStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = payments
            .record_payment(tenant, invoice.id, NewPayment::new(dec!(10), PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidState(_)));
        assert!(store.snapshot().await.payments.is_empty());
    }

    #[tokio::test]
    async fn test_zero_payment_is_rejected() {
        let (invoices, payments, _) = services();
        let tenant = TenantId::new(1);
        let invoice = invoices.create_invoice(tenant, new_invoice(dec!(80))).await.unwrap();
        let err = payments
            .record_payment(tenant, invoice.id, NewPayment::new(dec!(0.001), PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_see_invoice() {
        let (invoices, _, _) = services();
        let invoice = invoices
            .create_invoice(TenantId::new(1), new_invoice(dec!(80)))
            .await
            .unwrap();
        let err = invoices.get_invoice(TenantId::new(2), invoice.id).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
    }
}
