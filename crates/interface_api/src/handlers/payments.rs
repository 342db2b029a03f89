//! Payment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use core_kernel::{InvoiceId, PaymentId};

use crate::auth::Tenant;
use crate::dto::payments::*;
use crate::dto::ValidatedJson;
use crate::{error::ApiError, AppState};

/// Records a payment against an invoice and reconciles its status
pub async fn record_payment(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(invoice_id): Path<InvoiceId>,
    ValidatedJson(request): ValidatedJson<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<RecordPaymentResponse>), ApiError> {
    let recorded = state
        .payments
        .record_payment(tenant_id, invoice_id, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(recorded.into())))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(invoice_id): Path<InvoiceId>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.payments.list_payments(tenant_id, invoice_id).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Path(id): Path<PaymentId>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = state.payments.get_payment(tenant_id, id).await?;
    Ok(Json(payment.into()))
}
