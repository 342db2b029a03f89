//! Insurance claim handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use core_kernel::{ClaimId, ClaimItemId};

use crate::auth::Tenant;
use crate::dto::claims::*;
use crate::dto::ValidatedJson;
use crate::{error::ApiError, AppState};

/// Creates a DRAFT or PENDING claim for an invoice
pub async fn create_claim(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    ValidatedJson(request): ValidatedJson<CreateClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    let claim = state.claims.create_claim(tenant_id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(claim.into())))
}

pub async fn list_claims(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Query(params): Query<ListClaimsParams>,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    let claims = state.claims.list_claims(tenant_id, params.into()).await?;
    Ok(Json(claims.into_iter().map(Into::into).collect()))
}

pub async fn get_claim(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<ClaimId>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state.claims.get_claim(tenant_id, id).await?;
    Ok(Json(claim.into()))
}

/// Updates claim fields; a `status` in the body runs the transition
pub async fn update_claim(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<ClaimId>,
    ValidatedJson(request): ValidatedJson<UpdateClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state.claims.update_claim(tenant_id, id, request.into()).await?;
    Ok(Json(claim.into()))
}

pub async fn delete_claim(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<ClaimId>,
) -> Result<StatusCode, ApiError> {
    state.claims.delete_claim(tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_item(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<ClaimId>,
    ValidatedJson(request): ValidatedJson<ClaimItemRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    let claim = state.claims.add_item(tenant_id, id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(claim.into())))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path((id, item_id)): Path<(ClaimId, ClaimItemId)>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state.claims.remove_item(tenant_id, id, item_id).await?;
    Ok(Json(claim.into()))
}
