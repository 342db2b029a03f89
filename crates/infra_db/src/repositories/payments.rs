//! Payment queries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};

use core_kernel::{ClaimId, InvoiceId, PaymentId, TenantId};
use domain_billing::{Payment, PaymentInsert};

use super::parse_column;
use crate::error::DatabaseError;

const PAYMENT_COLUMNS: &str =
    "id, tenant_id, invoice_id, claim_id, amount, method, reference, notes, paid_at, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub tenant_id: i64,
    pub invoice_id: i64,
    pub claim_id: Option<i64>,
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DatabaseError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::new(row.id),
            tenant_id: TenantId::new(row.tenant_id),
            invoice_id: InvoiceId::new(row.invoice_id),
            claim_id: row.claim_id.map(ClaimId::new),
            amount: row.amount,
            method: parse_column("method", &row.method)?,
            reference: row.reference,
            notes: row.notes,
            paid_at: row.paid_at,
            created_at: row.created_at,
        })
    }
}

pub async fn insert(conn: &mut PgConnection, payment: &PaymentInsert) -> Result<Payment, DatabaseError> {
    let sql = format!(
        "INSERT INTO payments (tenant_id, invoice_id, claim_id, amount, method, reference, notes, paid_at, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now()) \
         RETURNING {PAYMENT_COLUMNS}"
    );
    let row: PaymentRow = sqlx::query_as(&sql)
        .bind(payment.tenant_id.get())
        .bind(payment.invoice_id.get())
        .bind(payment.claim_id.map(|id| id.get()))
        .bind(payment.amount)
        .bind(payment.method.as_str())
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.paid_at)
        .fetch_one(&mut *conn)
        .await?;
    row.try_into()
}

pub async fn fetch(conn: &mut PgConnection, tenant_id: TenantId, id: PaymentId) -> Result<Payment, DatabaseError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE tenant_id = $1 AND id = $2");
    sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(tenant_id.get())
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Payment", id))?
        .try_into()
}

/// Payments of one invoice, oldest first
pub async fn list_for_invoice(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    invoice_id: InvoiceId,
) -> Result<Vec<Payment>, DatabaseError> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE tenant_id = $1 AND invoice_id = $2 ORDER BY paid_at, id"
    );
    let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
        .bind(tenant_id.get())
        .bind(invoice_id.get())
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(Payment::try_from).collect()
}
