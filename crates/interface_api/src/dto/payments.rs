//! Payment DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ClaimId, InvoiceId, PaymentId};
use domain_billing::{Invoice, InvoiceStatus, NewPayment, Payment, PaymentMethod};

use super::positive;

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    #[validate(custom(function = "positive"))]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<RecordPaymentRequest> for NewPayment {
    fn from(req: RecordPaymentRequest) -> Self {
        NewPayment {
            amount: req.amount,
            method: req.method,
            reference: req.reference,
            notes: req.notes,
            paid_at: req.paid_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    /// Set for payments generated by an insurance claim
    pub claim_id: Option<ClaimId>,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            invoice_id: payment.invoice_id,
            claim_id: payment.claim_id,
            amount: payment.amount,
            method: payment.method,
            reference: payment.reference,
            notes: payment.notes,
            paid_at: payment.paid_at,
            created_at: payment.created_at,
        }
    }
}

/// A recorded payment with the invoice figures it produced
#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    #[serde(flatten)]
    pub payment: PaymentResponse,
    pub invoice_status: InvoiceStatus,
    pub invoice_amount_paid: Decimal,
    pub invoice_balance_due: Decimal,
}

impl From<(Payment, Invoice)> for RecordPaymentResponse {
    fn from((payment, invoice): (Payment, Invoice)) -> Self {
        Self {
            invoice_balance_due: invoice.balance_due().amount(),
            invoice_status: invoice.status,
            invoice_amount_paid: invoice.amount_paid,
            payment: payment.into(),
        }
    }
}
