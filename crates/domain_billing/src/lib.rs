//! Billing Domain - Invoices, Payments and Status Reconciliation
//!
//! This crate owns the invoice lifecycle for a practice: invoices with line
//! items, payments recorded against them, and the rule that derives an
//! invoice's status from what has been paid.
//!
//! # Status reconciliation
//!
//! - paid ≥ total → `PAID`
//! - 0 < paid < total → `PARTIALLY_PAID`
//! - nothing paid, past due, currently `SENT` → `OVERDUE`
//!
//! The rule runs whenever a payment is recorded, when items change, and from
//! the overdue sweep. Insurance states (`PENDING_INSURANCE`,
//! `INSURANCE_DENIED`) are set by the claims domain through
//! [`apply_insurance_status`].
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{NewPayment, PaymentMethod, PaymentService};
//!
//! let (payment, invoice) = payments
//!     .record_payment(tenant_id, invoice_id, NewPayment::new(dec!(40.00), PaymentMethod::Cash))
//!     .await?;
//! assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid);
//! ```

pub mod invoice;
pub mod payment;
pub mod reconcile;
pub mod ports;
pub mod services;
pub mod error;

pub use invoice::{Invoice, InvoiceItem, InvoiceStatus, NewInvoice, NewInvoiceItem, UpdateInvoice, MAX_QUANTITY};
pub use payment::{Payment, PaymentMethod, NewPayment, PaymentInsert};
pub use reconcile::reconcile_status;
pub use ports::{BillingStore, BillingTx, InvoiceQuery, InvoiceInsert, InvoiceItemInsert};
pub use services::{InvoiceService, PaymentService, apply_payment, apply_insurance_status};
pub use error::BillingError;
