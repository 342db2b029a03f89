//! Payment recording
//!
//! Payments are immutable once recorded. Each one raises the parent
//! invoice's `amount_paid` and triggers status reconciliation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, InvoiceId, PaymentId, TenantId};

use crate::error::BillingError;

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    /// Check/cheque
    Check,
    CreditCard,
    BankTransfer,
    /// Paid by an insurer against a claim
    Insurance,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Cash,
        PaymentMethod::Check,
        PaymentMethod::CreditCard,
        PaymentMethod::BankTransfer,
        PaymentMethod::Insurance,
        PaymentMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Check => "CHECK",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Insurance => "INSURANCE",
            PaymentMethod::Other => "OTHER",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BillingError::Validation(format!("unknown payment method '{}'", s)))
    }
}

/// A payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub tenant_id: TenantId,
    /// Invoice being paid
    pub invoice_id: InvoiceId,
    /// Set when the payment was generated by a paid insurance claim
    pub claim_id: Option<ClaimId>,
    pub amount: Decimal,
    pub method: PaymentMethod,
    /// External reference (bank ref, check number, payer remittance id)
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Command to record a payment against an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to now
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl NewPayment {
    pub fn new(amount: Decimal, method: PaymentMethod) -> Self {
        Self {
            amount,
            method,
            reference: None,
            notes: None,
            paid_at: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// A payment ready to be inserted by the store
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInsert {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub claim_id: Option<ClaimId>,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl PaymentInsert {
    pub fn from_command(
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        cmd: NewPayment,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            invoice_id,
            claim_id: None,
            amount: cmd.amount,
            method: cmd.method,
            reference: cmd.reference,
            notes: cmd.notes,
            paid_at: cmd.paid_at.unwrap_or(now),
        }
    }
}
