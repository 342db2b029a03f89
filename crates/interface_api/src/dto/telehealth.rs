//! Telehealth session DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ClientId, Page, Patch, SessionId};
use domain_telehealth::{NewSession, Reschedule, SessionQuery, SessionStatus, TelehealthSession};

#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleSessionRequest {
    pub client_id: ClientId,
    #[validate(length(min = 1, max = 200))]
    pub clinician_name: String,
    pub scheduled_start: DateTime<Utc>,
    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: i32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<ScheduleSessionRequest> for NewSession {
    fn from(req: ScheduleSessionRequest) -> Self {
        NewSession {
            client_id: req.client_id,
            clinician_name: req.clinician_name,
            scheduled_start: req.scheduled_start,
            duration_minutes: req.duration_minutes,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RescheduleRequest {
    pub scheduled_start: Option<DateTime<Utc>>,
    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: Option<i32>,
    #[validate(length(min = 1, max = 200))]
    pub clinician_name: Option<String>,
    #[serde(default)]
    pub notes: Patch<String>,
}

impl From<RescheduleRequest> for Reschedule {
    fn from(req: RescheduleRequest) -> Self {
        Reschedule {
            scheduled_start: req.scheduled_start,
            duration_minutes: req.duration_minutes,
            clinician_name: req.clinician_name,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelSessionRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsParams {
    pub status: Option<SessionStatus>,
    pub client_id: Option<ClientId>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListSessionsParams> for SessionQuery {
    fn from(params: ListSessionsParams) -> Self {
        SessionQuery {
            status: params.status,
            client_id: params.client_id,
            page: Some(Page::new(params.limit, params.offset)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: SessionId,
    pub client_id: ClientId,
    pub clinician_name: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TelehealthSession> for SessionResponse {
    fn from(session: TelehealthSession) -> Self {
        Self {
            scheduled_end: session.scheduled_end(),
            id: session.id,
            client_id: session.client_id,
            clinician_name: session.clinician_name,
            scheduled_start: session.scheduled_start,
            duration_minutes: session.duration_minutes,
            status: session.status,
            started_at: session.started_at,
            ended_at: session.ended_at,
            cancellation_reason: session.cancellation_reason,
            notes: session.notes,
            version: session.version,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
