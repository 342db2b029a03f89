//! Telehealth Domain Ports
//!
//! Sessions are single-row aggregates, so the port is a plain store without
//! a unit of work. Concurrent edits are caught by the `version` check in
//! `save_session`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{ClientId, DomainPort, HealthCheckable, Page, PortError, SessionId, TenantId};

use crate::session::{SessionStatus, TelehealthSession};

/// Query parameters for listing sessions
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    pub status: Option<SessionStatus>,
    pub client_id: Option<ClientId>,
    pub page: Option<Page>,
}

impl SessionQuery {
    pub fn matches(&self, session: &TelehealthSession) -> bool {
        self.status.map_or(true, |s| session.status == s)
            && self.client_id.map_or(true, |c| session.client_id == c)
    }
}

/// A validated session ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInsert {
    pub tenant_id: TenantId,
    pub client_id: ClientId,
    pub clinician_name: String,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Port for telehealth session persistence
#[async_trait]
pub trait TelehealthStore: DomainPort + HealthCheckable {
    async fn get_session(&self, tenant_id: TenantId, id: SessionId) -> Result<TelehealthSession, PortError>;

    /// Sessions ordered by scheduled start
    async fn list_sessions(
        &self,
        tenant_id: TenantId,
        query: &SessionQuery,
    ) -> Result<Vec<TelehealthSession>, PortError>;

    async fn insert_session(&self, session: &SessionInsert) -> Result<TelehealthSession, PortError>;

    /// Writes the session if its stored version still equals `session.version`
    async fn save_session(&self, session: &TelehealthSession) -> Result<TelehealthSession, PortError>;

    async fn delete_session(&self, tenant_id: TenantId, id: SessionId) -> Result<(), PortError>;
}

/// In-memory implementation of the telehealth port for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::HealthCheckResult;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Debug, Default)]
    struct Sessions {
        rows: BTreeMap<SessionId, TelehealthSession>,
        next_id: i64,
    }

    #[derive(Debug, Clone, Default)]
    pub struct MemoryTelehealthStore {
        state: Arc<Mutex<Sessions>>,
    }

    impl MemoryTelehealthStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn len(&self) -> usize {
            self.state.lock().await.rows.len()
        }
    }

    impl DomainPort for MemoryTelehealthStore {}

    #[async_trait]
    impl HealthCheckable for MemoryTelehealthStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("memory-telehealth-store", 0)
        }
    }

    #[async_trait]
    impl TelehealthStore for MemoryTelehealthStore {
        async fn get_session(&self, tenant_id: TenantId, id: SessionId) -> Result<TelehealthSession, PortError> {
            self.state
                .lock()
                .await
                .rows
                .get(&id)
                .filter(|s| s.tenant_id == tenant_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("TelehealthSession", id))
        }

        async fn list_sessions(
            &self,
            tenant_id: TenantId,
            query: &SessionQuery,
        ) -> Result<Vec<TelehealthSession>, PortError> {
            let state = self.state.lock().await;
            let mut matching: Vec<_> = state
                .rows
                .values()
                .filter(|s| s.tenant_id == tenant_id && query.matches(s))
                .cloned()
                .collect();
            matching.sort_by_key(|s| (s.scheduled_start, s.id));
            Ok(match query.page {
                Some(page) => page.slice(matching),
                None => matching,
            })
        }

        async fn insert_session(&self, insert: &SessionInsert) -> Result<TelehealthSession, PortError> {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            let session = TelehealthSession {
                id: SessionId::new(state.next_id),
                tenant_id: insert.tenant_id,
                client_id: insert.client_id,
                clinician_name: insert.clinician_name.clone(),
                scheduled_start: insert.scheduled_start,
                duration_minutes: insert.duration_minutes,
                status: SessionStatus::Scheduled,
                started_at: None,
                ended_at: None,
                cancellation_reason: None,
                notes: insert.notes.clone(),
                version: 1,
                created_at: insert.created_at,
                updated_at: insert.created_at,
            };
            state.rows.insert(session.id, session.clone());
            Ok(session)
        }

        async fn save_session(&self, session: &TelehealthSession) -> Result<TelehealthSession, PortError> {
            let mut state = self.state.lock().await;
            let stored = state
                .rows
                .get_mut(&session.id)
                .filter(|s| s.tenant_id == session.tenant_id)
                .ok_or_else(|| PortError::not_found("TelehealthSession", session.id))?;
            if stored.version != session.version {
                return Err(PortError::stale("TelehealthSession", session.id, session.version));
            }
            *stored = TelehealthSession {
                version: session.version + 1,
                ..session.clone()
            };
            Ok(stored.clone())
        }

        async fn delete_session(&self, tenant_id: TenantId, id: SessionId) -> Result<(), PortError> {
            let mut state = self.state.lock().await;
            match state.rows.get(&id) {
                Some(s) if s.tenant_id == tenant_id => {
                    state.rows.remove(&id);
                    Ok(())
                }
                _ => Err(PortError::not_found("TelehealthSession", id)),
            }
        }
    }
}
