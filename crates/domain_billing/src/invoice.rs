//! Invoice management
//!
//! Invoices bill a client for one or more line items. The stored status is
//! derived from `amount_paid` against `total_amount` (see `reconcile`), with
//! a few manual moves (sending, cancelling) and insurance states driven by
//! the claims domain.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClientId, Currency, InvoiceId, InvoiceItemId, Money, MoneyError, Patch, TenantId, MAX_AMOUNT};

use crate::error::BillingError;
use crate::reconcile::reconcile_status;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Invoice is being drafted
    Draft,
    /// Invoice has been sent to the client
    Sent,
    /// Partial payment received
    PartiallyPaid,
    /// Fully paid
    Paid,
    /// Past due date with nothing paid
    Overdue,
    /// Cancelled/voided
    Cancelled,
    /// Waiting on an insurance claim
    PendingInsurance,
    /// The insurance claim was denied
    InsuranceDenied,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 8] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::PartiallyPaid,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
        InvoiceStatus::PendingInsurance,
        InvoiceStatus::InsuranceDenied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::PartiallyPaid => "PARTIALLY_PAID",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Cancelled => "CANCELLED",
            InvoiceStatus::PendingInsurance => "PENDING_INSURANCE",
            InvoiceStatus::InsuranceDenied => "INSURANCE_DENIED",
        }
    }

    /// PAID and CANCELLED invoices are never moved by insurance events
    pub fn is_settled(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BillingError::Validation(format!("unknown invoice status '{}'", s)))
    }
}

/// An invoice issued to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub tenant_id: TenantId,
    pub client_id: ClientId,
    /// Human-readable number, unique per tenant
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub items: Vec<InvoiceItem>,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    /// Optimistic concurrency version, bumped on every save
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn total(&self) -> Money {
        Money::new(self.total_amount, self.currency)
    }

    pub fn paid(&self) -> Money {
        Money::new(self.amount_paid, self.currency)
    }

    /// Returns the balance due
    pub fn balance_due(&self) -> Money {
        Money::new(self.total_amount - self.amount_paid, self.currency)
    }

    pub fn find_item(&self, item_id: InvoiceItemId) -> Option<&InvoiceItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Re-derives the status from the amounts. Returns true if it changed.
    pub fn reconcile(&mut self, today: NaiveDate) -> bool {
        let next = reconcile_status(
            self.total_amount,
            self.amount_paid,
            self.status,
            self.due_date,
            today,
        );
        let changed = next != self.status;
        self.status = next;
        changed
    }

    /// Sums the stored item line totals into `total_amount`
    pub fn recalculate_total(&mut self) -> Result<(), BillingError> {
        let lines: Vec<Money> = self
            .items
            .iter()
            .map(|item| Money::new(item.line_total, self.currency))
            .collect();
        self.total_amount = Money::sum(&lines, self.currency)?.ensure_storable()?.amount();
        Ok(())
    }

    /// Checks a manual status move requested through an update
    ///
    /// Only DRAFT → SENT and unpaid → CANCELLED are accepted; every other
    /// status is derived.
    pub fn check_manual_transition(&self, to: InvoiceStatus) -> Result<(), BillingError> {
        let allowed = match to {
            InvoiceStatus::Sent => self.status == InvoiceStatus::Draft,
            InvoiceStatus::Cancelled => {
                self.amount_paid.is_zero()
                    && !matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
            }
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(BillingError::InvalidState(format!(
                "invoice {} cannot move from {} to {}",
                self.id, self.status, to
            )))
        }
    }
}

/// A line item on an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub invoice_id: InvoiceId,
    pub description: String,
    /// Billing code for the service, such as a CPT code
    pub service_code: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// `quantity × unit_price`, rounded to the currency's minor unit
    pub line_total: Decimal,
}

/// Command to create an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub client_id: ClientId,
    /// Generated when omitted
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// Defaults to today
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewInvoiceItem>,
}

/// Largest quantity an invoice item column holds
pub const MAX_QUANTITY: Decimal = rust_decimal_macros::dec!(99999999.9999);

/// A line item supplied when creating an invoice or replacing its items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    #[serde(default)]
    pub service_code: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl NewInvoiceItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            service_code: None,
            quantity,
            unit_price,
        }
    }

    pub fn with_service_code(mut self, code: impl Into<String>) -> Self {
        self.service_code = Some(code.into());
        self
    }

    pub fn validate(&self) -> Result<(), BillingError> {
        if self.description.trim().is_empty() {
            return Err(BillingError::Validation("item description is required".into()));
        }
        if self.quantity.is_sign_negative() || self.quantity > MAX_QUANTITY {
            return Err(BillingError::Validation(format!(
                "item quantity must be between 0 and {}, got {}",
                MAX_QUANTITY, self.quantity
            )));
        }
        if self.unit_price.is_sign_negative() || self.unit_price > MAX_AMOUNT {
            return Err(BillingError::Validation(format!(
                "item unit price must be between 0 and {}, got {}",
                MAX_AMOUNT, self.unit_price
            )));
        }
        Ok(())
    }

    /// Computes the rounded line total in the invoice currency
    ///
    /// Fails with [`MoneyError::Overflow`] when the total does not fit a
    /// stored amount.
    pub fn line_total(&self, currency: Currency) -> Result<Money, MoneyError> {
        Money::new(self.unit_price, currency)
            .multiply(self.quantity)?
            .round_to_currency()
            .ensure_storable()
    }
}

/// Explicit update command for an invoice
///
/// Absent fields are left alone. `notes` distinguishes "absent" from `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInvoice {
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Patch<String>,
    /// Replaces every line item; only allowed while DRAFT
    #[serde(default)]
    pub items: Option<Vec<NewInvoiceItem>>,
    /// Manual status move (SENT or CANCELLED)
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

/// Generates an invoice number from the creation instant
pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    format!("INV-{}", now.format("%Y%m%d-%H%M%S%3f"))
}
