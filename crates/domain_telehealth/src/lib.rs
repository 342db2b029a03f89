//! Telehealth Domain - Session Scheduling and Lifecycle
//!
//! A telehealth session is a scheduled video visit between a clinician and a
//! client. Sessions move through a small lifecycle:
//!
//! ```text
//! SCHEDULED ──Start──▶ IN_PROGRESS ──Complete──▶ COMPLETED
//!     │                     │
//!     ├──Cancel─────────────┴──Cancel──▶ CANCELLED
//!     └──MarkNoShow──▶ NO_SHOW
//! ```
//!
//! Only SCHEDULED sessions can be rescheduled. The video provider itself is
//! outside this crate.

pub mod session;
pub mod ports;
pub mod services;
pub mod error;

pub use session::{
    next_status, NewSession, Reschedule, SessionEvent, SessionStatus, TelehealthSession, LIFECYCLE,
    MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};
pub use ports::{SessionInsert, SessionQuery, TelehealthStore};
pub use services::SessionService;
pub use error::SessionError;
