//! Insurance Claims Domain
//!
//! This crate implements the insurance claim lifecycle for practice
//! invoices: building a claim from invoice line items, submitting it, and
//! recording the payer's decision.
//!
//! # Claim Lifecycle
//!
//! ```text
//! DRAFT -> PENDING -> SUBMITTED -> PAID / DENIED
//! ```
//!
//! Line items can change only while DRAFT or PENDING. Transitions are
//! defined in one table ([`transition::TRANSITIONS`]); their side effects
//! reach into billing (invoice status, generated INSURANCE payments) inside
//! the same unit of work.

pub mod claim;
pub mod transition;
pub mod ports;
pub mod services;
pub mod error;

pub use claim::{ClaimItem, ClaimStatus, InsuranceClaim, NewClaim, NewClaimItem, UpdateClaim};
pub use transition::{plan_transition, ClaimEffect, ClaimEvent, TransitionPlan, TransitionRule, TRANSITIONS};
pub use ports::{ClaimInsert, ClaimItemInsert, ClaimQuery, ClaimsStore, ClaimsTx};
pub use services::ClaimService;
pub use error::ClaimError;
