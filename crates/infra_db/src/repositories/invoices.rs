//! Invoice and invoice item queries

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};

use core_kernel::{ClientId, InvoiceId, InvoiceItemId, TenantId};
use domain_billing::{Invoice, InvoiceInsert, InvoiceItem, InvoiceItemInsert, InvoiceQuery};

use super::parse_column;
use crate::error::DatabaseError;

const INVOICE_COLUMNS: &str = "id, tenant_id, client_id, invoice_number, issue_date, due_date, \
     currency, total_amount, amount_paid, status, notes, version, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, invoice_id, description, service_code, quantity, unit_price, line_total";

/// Database row for an invoice header
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: i64,
    pub tenant_id: i64,
    pub client_id: i64,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    pub fn into_invoice(self, items: Vec<InvoiceItem>) -> Result<Invoice, DatabaseError> {
        Ok(Invoice {
            id: InvoiceId::new(self.id),
            tenant_id: TenantId::new(self.tenant_id),
            client_id: ClientId::new(self.client_id),
            invoice_number: self.invoice_number,
            issue_date: self.issue_date,
            due_date: self.due_date,
            currency: parse_column("currency", &self.currency)?,
            items,
            total_amount: self.total_amount,
            amount_paid: self.amount_paid,
            status: parse_column("status", &self.status)?,
            notes: self.notes,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InvoiceItemRow {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub service_code: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<InvoiceItemRow> for InvoiceItem {
    fn from(row: InvoiceItemRow) -> Self {
        InvoiceItem {
            id: InvoiceItemId::new(row.id),
            invoice_id: InvoiceId::new(row.invoice_id),
            description: row.description,
            service_code: row.service_code,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

/// Loads items for several invoices, grouped by invoice id
async fn items_by_invoice(
    conn: &mut PgConnection,
    invoice_ids: &[i64],
) -> Result<HashMap<i64, Vec<InvoiceItem>>, DatabaseError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ANY($1) ORDER BY id"
    );
    let rows: Vec<InvoiceItemRow> = sqlx::query_as(&sql)
        .bind(invoice_ids)
        .fetch_all(&mut *conn)
        .await?;

    let mut grouped: HashMap<i64, Vec<InvoiceItem>> = HashMap::new();
    for row in rows {
        grouped.entry(row.invoice_id).or_default().push(row.into());
    }
    Ok(grouped)
}

/// Fetches one invoice with its items, optionally locking the header row
pub async fn fetch(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    id: InvoiceId,
    for_update: bool,
) -> Result<Invoice, DatabaseError> {
    let sql = format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE tenant_id = $1 AND id = $2{}",
        if for_update { " FOR UPDATE" } else { "" }
    );
    let row: InvoiceRow = sqlx::query_as(&sql)
        .bind(tenant_id.get())
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Invoice", id))?;

    let mut items = items_by_invoice(conn, &[row.id]).await?;
    let items = items.remove(&row.id).unwrap_or_default();
    row.into_invoice(items)
}

pub async fn list(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    query: &InvoiceQuery,
) -> Result<Vec<Invoice>, DatabaseError> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE tenant_id = "));
    qb.push_bind(tenant_id.get());
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(client_id) = query.client_id {
        qb.push(" AND client_id = ").push_bind(client_id.get());
    }
    if let Some(due_before) = query.due_before {
        qb.push(" AND due_date < ").push_bind(due_before);
    }
    qb.push(" ORDER BY id");
    if let Some(page) = query.page {
        qb.push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.offset));
    }

    let rows: Vec<InvoiceRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut items = items_by_invoice(conn, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_invoice(lines)
        })
        .collect()
}

pub async fn insert(conn: &mut PgConnection, insert: &InvoiceInsert) -> Result<Invoice, DatabaseError> {
    let sql = format!(
        "INSERT INTO invoices (tenant_id, client_id, invoice_number, issue_date, due_date, \
             currency, total_amount, amount_paid, status, notes, version, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, 1, $10, $10) \
         RETURNING {INVOICE_COLUMNS}"
    );
    let row: InvoiceRow = sqlx::query_as(&sql)
        .bind(insert.tenant_id.get())
        .bind(insert.client_id.get())
        .bind(&insert.invoice_number)
        .bind(insert.issue_date)
        .bind(insert.due_date)
        .bind(insert.currency.code())
        .bind(insert.total_amount)
        .bind(insert.status.as_str())
        .bind(&insert.notes)
        .bind(insert.created_at)
        .fetch_one(&mut *conn)
        .await?;

    let items = insert_items(conn, row.id, &insert.items).await?;
    row.into_invoice(items)
}

pub async fn insert_items(
    conn: &mut PgConnection,
    invoice_id: i64,
    items: &[InvoiceItemInsert],
) -> Result<Vec<InvoiceItem>, DatabaseError> {
    let sql = format!(
        "INSERT INTO invoice_items (invoice_id, description, service_code, quantity, unit_price, line_total) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ITEM_COLUMNS}"
    );
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        let row: InvoiceItemRow = sqlx::query_as(&sql)
            .bind(invoice_id)
            .bind(&item.description)
            .bind(&item.service_code)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.line_total)
            .fetch_one(&mut *conn)
            .await?;
        created.push(row.into());
    }
    Ok(created)
}

/// True when a claim item points at one of the invoice's items
pub async fn items_are_claimed(conn: &mut PgConnection, invoice_id: i64) -> Result<bool, DatabaseError> {
    let claimed: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM claim_items ci \
             JOIN invoice_items ii ON ii.id = ci.invoice_item_id \
             WHERE ii.invoice_id = $1)",
    )
    .bind(invoice_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(claimed)
}

pub async fn delete_items(conn: &mut PgConnection, invoice_id: i64) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Writes the mutable header columns if `invoice.version` is still current
pub async fn update(conn: &mut PgConnection, invoice: &Invoice) -> Result<Invoice, DatabaseError> {
    let sql = format!(
        "UPDATE invoices SET due_date = $3, notes = $4, total_amount = $5, amount_paid = $6, \
             status = $7, updated_at = $8, version = version + 1 \
         WHERE tenant_id = $1 AND id = $2 AND version = $9 \
         RETURNING {INVOICE_COLUMNS}"
    );
    let row: Option<InvoiceRow> = sqlx::query_as(&sql)
        .bind(invoice.tenant_id.get())
        .bind(invoice.id.get())
        .bind(invoice.due_date)
        .bind(&invoice.notes)
        .bind(invoice.total_amount)
        .bind(invoice.amount_paid)
        .bind(invoice.status.as_str())
        .bind(invoice.updated_at)
        .bind(invoice.version)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => row.into_invoice(invoice.items.clone()),
        None => Err(missing_or_stale(conn, invoice).await),
    }
}

async fn missing_or_stale(conn: &mut PgConnection, invoice: &Invoice) -> DatabaseError {
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM invoices WHERE tenant_id = $1 AND id = $2")
        .bind(invoice.tenant_id.get())
        .bind(invoice.id.get())
        .fetch_optional(&mut *conn)
        .await;
    match exists {
        Ok(Some(_)) => DatabaseError::StaleVersion {
            entity: "Invoice",
            id: invoice.id.get(),
            expected: invoice.version,
        },
        Ok(None) => DatabaseError::not_found("Invoice", invoice.id),
        Err(e) => e.into(),
    }
}

/// Deletes the invoice; items cascade
pub async fn delete(conn: &mut PgConnection, tenant_id: TenantId, id: InvoiceId) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM invoices WHERE tenant_id = $1 AND id = $2")
        .bind(tenant_id.get())
        .bind(id.get())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Invoice", id));
    }
    Ok(())
}
