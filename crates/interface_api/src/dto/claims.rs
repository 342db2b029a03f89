//! Insurance claim DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ClaimId, ClaimItemId, InvoiceId, InvoiceItemId, Page, Patch};
use domain_claims::{ClaimItem, ClaimQuery, ClaimStatus, InsuranceClaim, NewClaim, NewClaimItem, UpdateClaim};

use super::{non_negative, positive};

#[derive(Debug, Deserialize, Validate)]
pub struct ClaimItemRequest {
    pub invoice_item_id: InvoiceItemId,
    /// Defaults to the invoice line total
    #[validate(custom(function = "positive"))]
    pub amount: Option<Decimal>,
}

impl From<ClaimItemRequest> for NewClaimItem {
    fn from(req: ClaimItemRequest) -> Self {
        NewClaimItem {
            invoice_item_id: req.invoice_item_id,
            amount: req.amount,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClaimRequest {
    pub invoice_id: InvoiceId,
    #[validate(length(min = 1, max = 50))]
    pub claim_number: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub payer_name: String,
    #[validate(length(max = 100))]
    pub policy_number: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// DRAFT unless PENDING is requested
    pub status: Option<ClaimStatus>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ClaimItemRequest>,
}

impl From<CreateClaimRequest> for NewClaim {
    fn from(req: CreateClaimRequest) -> Self {
        NewClaim {
            invoice_id: req.invoice_id,
            claim_number: req.claim_number,
            payer_name: req.payer_name,
            policy_number: req.policy_number,
            notes: req.notes,
            status: req.status,
            items: req.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Partial update, optionally moving the claim to a new status
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClaimRequest {
    #[validate(length(min = 1, max = 200))]
    pub payer_name: Option<String>,
    #[serde(default)]
    pub policy_number: Patch<String>,
    #[serde(default)]
    pub notes: Patch<String>,
    #[serde(default)]
    pub denial_reason: Patch<String>,
    pub status: Option<ClaimStatus>,
    #[validate(custom(function = "non_negative"))]
    pub paid_amount: Option<Decimal>,
    #[serde(default)]
    pub auto_generate_payment: bool,
}

impl From<UpdateClaimRequest> for UpdateClaim {
    fn from(req: UpdateClaimRequest) -> Self {
        UpdateClaim {
            payer_name: req.payer_name,
            policy_number: req.policy_number,
            notes: req.notes,
            denial_reason: req.denial_reason,
            status: req.status,
            paid_amount: req.paid_amount,
            auto_generate_payment: req.auto_generate_payment,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListClaimsParams {
    pub status: Option<ClaimStatus>,
    pub invoice_id: Option<InvoiceId>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListClaimsParams> for ClaimQuery {
    fn from(params: ListClaimsParams) -> Self {
        ClaimQuery {
            status: params.status,
            invoice_id: params.invoice_id,
            page: Some(Page::new(params.limit, params.offset)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimItemResponse {
    pub id: ClaimItemId,
    pub invoice_item_id: InvoiceItemId,
    pub amount: Decimal,
}

impl From<ClaimItem> for ClaimItemResponse {
    fn from(item: ClaimItem) -> Self {
        Self {
            id: item.id,
            invoice_item_id: item.invoice_item_id,
            amount: item.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub id: ClaimId,
    pub invoice_id: InvoiceId,
    pub claim_number: String,
    pub payer_name: String,
    pub policy_number: Option<String>,
    pub status: ClaimStatus,
    pub claim_amount: Decimal,
    pub paid_amount: Option<Decimal>,
    pub denial_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub items: Vec<ClaimItemResponse>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InsuranceClaim> for ClaimResponse {
    fn from(claim: InsuranceClaim) -> Self {
        Self {
            id: claim.id,
            invoice_id: claim.invoice_id,
            claim_number: claim.claim_number,
            payer_name: claim.payer_name,
            policy_number: claim.policy_number,
            status: claim.status,
            claim_amount: claim.claim_amount,
            paid_amount: claim.paid_amount,
            denial_reason: claim.denial_reason,
            submitted_at: claim.submitted_at,
            resolved_at: claim.resolved_at,
            notes: claim.notes,
            items: claim.items.into_iter().map(Into::into).collect(),
            version: claim.version,
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}
