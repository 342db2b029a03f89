//! Telehealth session handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use core_kernel::SessionId;
use domain_telehealth::SessionEvent;

use crate::auth::Tenant;
use crate::dto::telehealth::*;
use crate::dto::ValidatedJson;
use crate::{error::ApiError, AppState};

pub async fn schedule_session(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    ValidatedJson(request): ValidatedJson<ScheduleSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = state.sessions.schedule(tenant_id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Lists sessions in start order
pub async fn list_sessions(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Query(params): Query<ListSessionsParams>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = state.sessions.list(tenant_id, params.into()).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

pub async fn get_session(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.sessions.get(tenant_id, id).await?;
    Ok(Json(session.into()))
}

/// Changes time, length or clinician of a SCHEDULED session
pub async fn reschedule_session(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<SessionId>,
    ValidatedJson(request): ValidatedJson<RescheduleRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.sessions.reschedule(tenant_id, id, request.into()).await?;
    Ok(Json(session.into()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    state.sessions.delete(tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn transition(
    state: &AppState,
    tenant: Tenant,
    id: SessionId,
    event: SessionEvent,
    reason: Option<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.sessions.apply(tenant.0, id, event, reason).await?;
    Ok(Json(session.into()))
}

pub async fn start_session(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionResponse>, ApiError> {
    transition(&state, tenant, id, SessionEvent::Start, None).await
}

pub async fn complete_session(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionResponse>, ApiError> {
    transition(&state, tenant, id, SessionEvent::Complete, None).await
}

/// Cancels a session; the body with a `reason` is optional
pub async fn cancel_session(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<SessionId>,
    body: Option<Json<CancelSessionRequest>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let reason = body.and_then(|Json(request)| request.reason);
    transition(&state, tenant, id, SessionEvent::Cancel, reason).await
}

pub async fn mark_no_show(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionResponse>, ApiError> {
    transition(&state, tenant, id, SessionEvent::MarkNoShow, None).await
}
