//! Request handlers, one module per resource

pub mod claims;
pub mod health;
pub mod invoices;
pub mod payments;
pub mod telehealth;
