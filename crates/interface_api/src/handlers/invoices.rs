//! Invoice handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use core_kernel::InvoiceId;

use crate::auth::Tenant;
use crate::dto::invoices::*;
use crate::dto::ValidatedJson;
use crate::{error::ApiError, AppState};

/// Creates a DRAFT invoice
pub async fn create_invoice(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    ValidatedJson(request): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    let invoice = state.invoices.create_invoice(tenant_id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

/// Lists invoices, filtered by status or client
pub async fn list_invoices(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Query(params): Query<ListInvoicesParams>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let invoices = state.invoices.list_invoices(tenant_id, params.into()).await?;
    Ok(Json(invoices.into_iter().map(Into::into).collect()))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<InvoiceId>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.invoices.get_invoice(tenant_id, id).await?;
    Ok(Json(invoice.into()))
}

/// Updates fields, items or status of an invoice
pub async fn update_invoice(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<InvoiceId>,
    ValidatedJson(request): ValidatedJson<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.invoices.update_invoice(tenant_id, id, request.into()).await?;
    Ok(Json(invoice.into()))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<InvoiceId>,
) -> Result<StatusCode, ApiError> {
    state.invoices.delete_invoice(tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Marks unpaid SENT invoices past their due date as OVERDUE
pub async fn sweep_overdue(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
) -> Result<Json<SweepResponse>, ApiError> {
    let changed = state.invoices.sweep_overdue(tenant_id).await?;
    Ok(Json(SweepResponse {
        updated: changed.len(),
        invoices: changed.into_iter().map(Into::into).collect(),
    }))
}
