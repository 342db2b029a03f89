//! Core Kernel - Foundational types shared by every practice billing crate
//!
//! This crate provides the building blocks used across all domain modules:
//! - Strongly-typed 64-bit identifiers that travel as strings on the wire
//! - Money types with precise decimal arithmetic
//! - `Patch<T>` for update commands that distinguish "unset" from "null"
//! - Clocks so date-dependent rules can be tested
//! - Port errors and marker traits for the data-access seams

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod patch;
pub mod ports;

pub use money::{Money, Currency, MoneyError, MAX_AMOUNT};
pub use temporal::{Clock, SystemClock, FixedClock};
pub use identifiers::{
    TenantId, ClientId, InvoiceId, InvoiceItemId, PaymentId,
    ClaimId, ClaimItemId, SessionId, IdParseError,
};
pub use patch::Patch;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth, Page,
};
