//! Insurance claim and claim item queries

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};

use core_kernel::{ClaimId, ClaimItemId, InvoiceId, InvoiceItemId, TenantId};
use domain_claims::{ClaimInsert, ClaimItem, ClaimItemInsert, ClaimQuery, InsuranceClaim};

use super::parse_column;
use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = "id, tenant_id, invoice_id, claim_number, payer_name, policy_number, \
     status, claim_amount, paid_amount, denial_reason, submitted_at, resolved_at, notes, version, \
     created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub id: i64,
    pub tenant_id: i64,
    pub invoice_id: i64,
    pub claim_number: String,
    pub payer_name: String,
    pub policy_number: Option<String>,
    pub status: String,
    pub claim_amount: Decimal,
    pub paid_amount: Option<Decimal>,
    pub denial_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClaimRow {
    pub fn into_claim(self, items: Vec<ClaimItem>) -> Result<InsuranceClaim, DatabaseError> {
        Ok(InsuranceClaim {
            id: ClaimId::new(self.id),
            tenant_id: TenantId::new(self.tenant_id),
            invoice_id: InvoiceId::new(self.invoice_id),
            claim_number: self.claim_number,
            payer_name: self.payer_name,
            policy_number: self.policy_number,
            status: parse_column("status", &self.status)?,
            claim_amount: self.claim_amount,
            paid_amount: self.paid_amount,
            denial_reason: self.denial_reason,
            submitted_at: self.submitted_at,
            resolved_at: self.resolved_at,
            notes: self.notes,
            items,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ClaimItemRow {
    pub id: i64,
    pub claim_id: i64,
    pub invoice_item_id: i64,
    pub amount: Decimal,
}

impl From<ClaimItemRow> for ClaimItem {
    fn from(row: ClaimItemRow) -> Self {
        ClaimItem {
            id: ClaimItemId::new(row.id),
            claim_id: ClaimId::new(row.claim_id),
            invoice_item_id: InvoiceItemId::new(row.invoice_item_id),
            amount: row.amount,
        }
    }
}

async fn items_by_claim(
    conn: &mut PgConnection,
    claim_ids: &[i64],
) -> Result<HashMap<i64, Vec<ClaimItem>>, DatabaseError> {
    let rows: Vec<ClaimItemRow> = sqlx::query_as(
        "SELECT id, claim_id, invoice_item_id, amount FROM claim_items WHERE claim_id = ANY($1) ORDER BY id",
    )
    .bind(claim_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<i64, Vec<ClaimItem>> = HashMap::new();
    for row in rows {
        grouped.entry(row.claim_id).or_default().push(row.into());
    }
    Ok(grouped)
}

pub async fn fetch(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    id: ClaimId,
    for_update: bool,
) -> Result<InsuranceClaim, DatabaseError> {
    let sql = format!(
        "SELECT {CLAIM_COLUMNS} FROM insurance_claims WHERE tenant_id = $1 AND id = $2{}",
        if for_update { " FOR UPDATE" } else { "" }
    );
    let row: ClaimRow = sqlx::query_as(&sql)
        .bind(tenant_id.get())
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("InsuranceClaim", id))?;

    let mut items = items_by_claim(conn, &[row.id]).await?;
    let items = items.remove(&row.id).unwrap_or_default();
    row.into_claim(items)
}

pub async fn list(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    query: &ClaimQuery,
) -> Result<Vec<InsuranceClaim>, DatabaseError> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {CLAIM_COLUMNS} FROM insurance_claims WHERE tenant_id = "
    ));
    qb.push_bind(tenant_id.get());
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(invoice_id) = query.invoice_id {
        qb.push(" AND invoice_id = ").push_bind(invoice_id.get());
    }
    qb.push(" ORDER BY id");
    if let Some(page) = query.page {
        qb.push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.offset));
    }

    let rows: Vec<ClaimRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut items = items_by_claim(conn, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_claim(lines)
        })
        .collect()
}

pub async fn insert(conn: &mut PgConnection, insert: &ClaimInsert) -> Result<InsuranceClaim, DatabaseError> {
    let sql = format!(
        "INSERT INTO insurance_claims (tenant_id, invoice_id, claim_number, payer_name, policy_number, \
             status, claim_amount, notes, version, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, $9, $9) \
         RETURNING {CLAIM_COLUMNS}"
    );
    let row: ClaimRow = sqlx::query_as(&sql)
        .bind(insert.tenant_id.get())
        .bind(insert.invoice_id.get())
        .bind(&insert.claim_number)
        .bind(&insert.payer_name)
        .bind(&insert.policy_number)
        .bind(insert.status.as_str())
        .bind(insert.claim_amount)
        .bind(&insert.notes)
        .bind(insert.created_at)
        .fetch_one(&mut *conn)
        .await?;

    let mut items = Vec::with_capacity(insert.items.len());
    for item in &insert.items {
        items.push(insert_item(conn, row.id, item).await?);
    }
    row.into_claim(items)
}

/// Duplicate invoice items surface as `DuplicateEntry`
pub async fn insert_item(
    conn: &mut PgConnection,
    claim_id: i64,
    item: &ClaimItemInsert,
) -> Result<ClaimItem, DatabaseError> {
    let row: ClaimItemRow = sqlx::query_as(
        "INSERT INTO claim_items (claim_id, invoice_item_id, amount) VALUES ($1, $2, $3) \
         RETURNING id, claim_id, invoice_item_id, amount",
    )
    .bind(claim_id)
    .bind(item.invoice_item_id.get())
    .bind(item.amount)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

pub async fn delete_item(
    conn: &mut PgConnection,
    claim_id: ClaimId,
    item_id: ClaimItemId,
) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM claim_items WHERE claim_id = $1 AND id = $2")
        .bind(claim_id.get())
        .bind(item_id.get())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("ClaimItem", item_id));
    }
    Ok(())
}

/// Writes the claim header if `claim.version` is still current
pub async fn update(conn: &mut PgConnection, claim: &InsuranceClaim) -> Result<InsuranceClaim, DatabaseError> {
    let sql = format!(
        "UPDATE insurance_claims SET payer_name = $3, policy_number = $4, status = $5, \
             claim_amount = $6, paid_amount = $7, denial_reason = $8, submitted_at = $9, \
             resolved_at = $10, notes = $11, updated_at = $12, version = version + 1 \
         WHERE tenant_id = $1 AND id = $2 AND version = $13 \
         RETURNING {CLAIM_COLUMNS}"
    );
    let row: Option<ClaimRow> = sqlx::query_as(&sql)
        .bind(claim.tenant_id.get())
        .bind(claim.id.get())
        .bind(&claim.payer_name)
        .bind(&claim.policy_number)
        .bind(claim.status.as_str())
        .bind(claim.claim_amount)
        .bind(claim.paid_amount)
        .bind(&claim.denial_reason)
        .bind(claim.submitted_at)
        .bind(claim.resolved_at)
        .bind(&claim.notes)
        .bind(claim.updated_at)
        .bind(claim.version)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => row.into_claim(claim.items.clone()),
        None => {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM insurance_claims WHERE tenant_id = $1 AND id = $2",
            )
            .bind(claim.tenant_id.get())
            .bind(claim.id.get())
            .fetch_optional(&mut *conn)
            .await?;
            Err(match exists {
                Some(_) => DatabaseError::StaleVersion {
                    entity: "InsuranceClaim",
                    id: claim.id.get(),
                    expected: claim.version,
                },
                None => DatabaseError::not_found("InsuranceClaim", claim.id),
            })
        }
    }
}

/// Deletes the claim; items cascade
pub async fn delete(conn: &mut PgConnection, tenant_id: TenantId, id: ClaimId) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM insurance_claims WHERE tenant_id = $1 AND id = $2")
        .bind(tenant_id.get())
        .bind(id.get())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("InsuranceClaim", id));
    }
    Ok(())
}
