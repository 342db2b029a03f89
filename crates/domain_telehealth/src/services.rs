//! Telehealth session service

use std::sync::Arc;

use tracing::{info, instrument};

use core_kernel::{Clock, SessionId, TenantId};

use crate::error::SessionError;
use crate::ports::{SessionInsert, SessionQuery, TelehealthStore};
use crate::session::{NewSession, Reschedule, SessionEvent, SessionStatus, TelehealthSession};

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn TelehealthStore>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(store: Arc<dyn TelehealthStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Books a SCHEDULED session
    #[instrument(skip(self, cmd), fields(tenant_id = %tenant_id, client_id = %cmd.client_id))]
    pub async fn schedule(&self, tenant_id: TenantId, cmd: NewSession) -> Result<TelehealthSession, SessionError> {
        let clinician_name = cmd.validate()?;
        let insert = SessionInsert {
            tenant_id,
            client_id: cmd.client_id,
            clinician_name,
            scheduled_start: cmd.scheduled_start,
            duration_minutes: cmd.duration_minutes,
            notes: cmd.notes,
            created_at: self.clock.now(),
        };
        let session = self.store.insert_session(&insert).await?;

        info!(session_id = %session.id, start = %session.scheduled_start, "Session scheduled");
        Ok(session)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, session_id = %id))]
    pub async fn get(&self, tenant_id: TenantId, id: SessionId) -> Result<TelehealthSession, SessionError> {
        Ok(self.store.get_session(tenant_id, id).await?)
    }

    #[instrument(skip(self, query), fields(tenant_id = %tenant_id))]
    pub async fn list(
        &self,
        tenant_id: TenantId,
        query: SessionQuery,
    ) -> Result<Vec<TelehealthSession>, SessionError> {
        Ok(self.store.list_sessions(tenant_id, &query).await?)
    }

    #[instrument(skip(self, cmd), fields(tenant_id = %tenant_id, session_id = %id))]
    pub async fn reschedule(
        &self,
        tenant_id: TenantId,
        id: SessionId,
        cmd: Reschedule,
    ) -> Result<TelehealthSession, SessionError> {
        let mut session = self.store.get_session(tenant_id, id).await?;
        session.reschedule(cmd, self.clock.now())?;
        let session = self.store.save_session(&session).await?;

        info!(start = %session.scheduled_start, minutes = session.duration_minutes, "Session rescheduled");
        Ok(session)
    }

    /// Applies a lifecycle event; `reason` is recorded on cancellation
    #[instrument(skip(self, reason), fields(tenant_id = %tenant_id, session_id = %id, event = %event))]
    pub async fn apply(
        &self,
        tenant_id: TenantId,
        id: SessionId,
        event: SessionEvent,
        reason: Option<String>,
    ) -> Result<TelehealthSession, SessionError> {
        let mut session = self.store.get_session(tenant_id, id).await?;
        let from = session.status;
        session.apply(event, reason, self.clock.now())?;
        let session = self.store.save_session(&session).await?;

        info!(from = %from, to = %session.status, "Session transitioned");
        Ok(session)
    }

    /// Deletes a session that never took place
    #[instrument(skip(self), fields(tenant_id = %tenant_id, session_id = %id))]
    pub async fn delete(&self, tenant_id: TenantId, id: SessionId) -> Result<(), SessionError> {
        let session = self.store.get_session(tenant_id, id).await?;
        if !matches!(session.status, SessionStatus::Scheduled | SessionStatus::Cancelled) {
            return Err(SessionError::InvalidState(format!(
                "session {} is {} and cannot be deleted",
                id, session.status
            )));
        }
        self.store.delete_session(tenant_id, id).await?;

        info!("Session deleted");
        Ok(())
    }
}
