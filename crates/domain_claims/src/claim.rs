//! Insurance claim aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, ClaimItemId, InvoiceId, InvoiceItemId, Patch, TenantId};

use crate::error::ClaimError;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Being prepared, items editable
    Draft,
    /// Ready to submit, items still editable
    Pending,
    /// Sent to the payer
    Submitted,
    /// Payer paid the claim
    Paid,
    /// Payer denied the claim
    Denied,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 5] = [
        ClaimStatus::Draft,
        ClaimStatus::Pending,
        ClaimStatus::Submitted,
        ClaimStatus::Paid,
        ClaimStatus::Denied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "DRAFT",
            ClaimStatus::Pending => "PENDING",
            ClaimStatus::Submitted => "SUBMITTED",
            ClaimStatus::Paid => "PAID",
            ClaimStatus::Denied => "DENIED",
        }
    }

    /// Line items can only be added or removed before submission
    pub fn allows_item_changes(&self) -> bool {
        matches!(self, ClaimStatus::Draft | ClaimStatus::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ClaimStatus::Paid | ClaimStatus::Denied)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ClaimError::Validation(format!("unknown claim status '{}'", s)))
    }
}

/// An insurance claim billed against one invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceClaim {
    pub id: ClaimId,
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub claim_number: String,
    pub payer_name: String,
    pub policy_number: Option<String>,
    pub status: ClaimStatus,
    /// Sum of the claim item amounts
    pub claim_amount: Decimal,
    /// Set when the payer pays
    pub paid_amount: Option<Decimal>,
    pub denial_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub items: Vec<ClaimItem>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsuranceClaim {
    /// Rejects item changes once the claim has been submitted
    pub fn ensure_items_mutable(&self) -> Result<(), ClaimError> {
        if self.status.allows_item_changes() {
            Ok(())
        } else {
            Err(ClaimError::InvalidState(format!(
                "items of claim {} cannot change while {}",
                self.id, self.status
            )))
        }
    }

    pub fn recalculate_amount(&mut self) {
        self.claim_amount = self.items.iter().map(|item| item.amount).sum();
    }

    /// Amount the payer paid, falling back to what was claimed
    pub fn settlement_amount(&self) -> Decimal {
        self.paid_amount.unwrap_or(self.claim_amount)
    }
}

/// Links one invoice line item to a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimItem {
    pub id: ClaimItemId,
    pub claim_id: ClaimId,
    pub invoice_item_id: InvoiceItemId,
    /// Claimed amount, defaults to the invoice item's line total
    pub amount: Decimal,
}

/// Command to create a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub invoice_id: InvoiceId,
    /// Generated when omitted
    #[serde(default)]
    pub claim_number: Option<String>,
    pub payer_name: String,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// DRAFT (default) or PENDING
    #[serde(default)]
    pub status: Option<ClaimStatus>,
    #[serde(default)]
    pub items: Vec<NewClaimItem>,
}

/// An invoice item to put on a claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewClaimItem {
    pub invoice_item_id: InvoiceItemId,
    /// Defaults to the invoice item's line total
    #[serde(default)]
    pub amount: Option<Decimal>,
}

impl NewClaimItem {
    pub fn for_item(invoice_item_id: InvoiceItemId) -> Self {
        Self {
            invoice_item_id,
            amount: None,
        }
    }
}

/// Explicit update command for a claim
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClaim {
    #[serde(default)]
    pub payer_name: Option<String>,
    #[serde(default)]
    pub policy_number: Patch<String>,
    #[serde(default)]
    pub notes: Patch<String>,
    #[serde(default)]
    pub denial_reason: Patch<String>,
    /// Target status, mapped onto a transition event
    #[serde(default)]
    pub status: Option<ClaimStatus>,
    /// Amount the payer paid; only with a move to PAID
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
    /// Record an INSURANCE payment on the invoice when the claim is paid
    #[serde(default)]
    pub auto_generate_payment: bool,
}

impl UpdateClaim {
    pub fn to_status(status: ClaimStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Generates a claim number from the creation instant
pub fn generate_claim_number(now: DateTime<Utc>) -> String {
    format!("CLM-{}", now.format("%Y%m%d-%H%M%S%3f"))
}
