//! Telehealth session queries

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};

use core_kernel::{ClientId, SessionId, TenantId};
use domain_telehealth::{SessionInsert, SessionQuery, TelehealthSession};

use super::parse_column;
use crate::error::DatabaseError;

const SESSION_COLUMNS: &str = "id, tenant_id, client_id, clinician_name, scheduled_start, \
     duration_minutes, status, started_at, ended_at, cancellation_reason, notes, version, \
     created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: i64,
    pub tenant_id: i64,
    pub client_id: i64,
    pub clinician_name: String,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for TelehealthSession {
    type Error = DatabaseError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(TelehealthSession {
            id: SessionId::new(row.id),
            tenant_id: TenantId::new(row.tenant_id),
            client_id: ClientId::new(row.client_id),
            clinician_name: row.clinician_name,
            scheduled_start: row.scheduled_start,
            duration_minutes: row.duration_minutes,
            status: parse_column("status", &row.status)?,
            started_at: row.started_at,
            ended_at: row.ended_at,
            cancellation_reason: row.cancellation_reason,
            notes: row.notes,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn fetch(conn: &mut PgConnection, tenant_id: TenantId, id: SessionId) -> Result<TelehealthSession, DatabaseError> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM telehealth_sessions WHERE tenant_id = $1 AND id = $2");
    sqlx::query_as::<_, SessionRow>(&sql)
        .bind(tenant_id.get())
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("TelehealthSession", id))?
        .try_into()
}

pub async fn list(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    query: &SessionQuery,
) -> Result<Vec<TelehealthSession>, DatabaseError> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {SESSION_COLUMNS} FROM telehealth_sessions WHERE tenant_id = "
    ));
    qb.push_bind(tenant_id.get());
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(client_id) = query.client_id {
        qb.push(" AND client_id = ").push_bind(client_id.get());
    }
    qb.push(" ORDER BY scheduled_start, id");
    if let Some(page) = query.page {
        qb.push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.offset));
    }

    let rows: Vec<SessionRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
    rows.into_iter().map(TelehealthSession::try_from).collect()
}

pub async fn insert(conn: &mut PgConnection, insert: &SessionInsert) -> Result<TelehealthSession, DatabaseError> {
    let sql = format!(
        "INSERT INTO telehealth_sessions (tenant_id, client_id, clinician_name, scheduled_start, \
             duration_minutes, status, notes, version, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, 'SCHEDULED', $6, 1, $7, $7) \
         RETURNING {SESSION_COLUMNS}"
    );
    sqlx::query_as::<_, SessionRow>(&sql)
        .bind(insert.tenant_id.get())
        .bind(insert.client_id.get())
        .bind(&insert.clinician_name)
        .bind(insert.scheduled_start)
        .bind(insert.duration_minutes)
        .bind(&insert.notes)
        .bind(insert.created_at)
        .fetch_one(&mut *conn)
        .await?
        .try_into()
}

/// Writes the session if `session.version` is still current
pub async fn update(conn: &mut PgConnection, session: &TelehealthSession) -> Result<TelehealthSession, DatabaseError> {
    let sql = format!(
        "UPDATE telehealth_sessions SET clinician_name = $3, scheduled_start = $4, \
             duration_minutes = $5, status = $6, started_at = $7, ended_at = $8, \
             cancellation_reason = $9, notes = $10, updated_at = $11, version = version + 1 \
         WHERE tenant_id = $1 AND id = $2 AND version = $12 \
         RETURNING {SESSION_COLUMNS}"
    );
    let row: Option<SessionRow> = sqlx::query_as(&sql)
        .bind(session.tenant_id.get())
        .bind(session.id.get())
        .bind(&session.clinician_name)
        .bind(session.scheduled_start)
        .bind(session.duration_minutes)
        .bind(session.status.as_str())
        .bind(session.started_at)
        .bind(session.ended_at)
        .bind(&session.cancellation_reason)
        .bind(&session.notes)
        .bind(session.updated_at)
        .bind(session.version)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => row.try_into(),
        None => {
            // Distinguish a concurrent edit from a missing row
            fetch(conn, session.tenant_id, session.id).await?;
            Err(DatabaseError::StaleVersion {
                entity: "TelehealthSession",
                id: session.id.get(),
                expected: session.version,
            })
        }
    }
}

pub async fn delete(conn: &mut PgConnection, tenant_id: TenantId, id: SessionId) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM telehealth_sessions WHERE tenant_id = $1 AND id = $2")
        .bind(tenant_id.get())
        .bind(id.get())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("TelehealthSession", id));
    }
    Ok(())
}
