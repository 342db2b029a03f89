//! Request and response bodies
//!
//! Requests are checked with `validator` before they reach a service;
//! domain services still enforce their own rules.

pub mod claims;
pub mod invoices;
pub mod payments;
pub mod telehealth;

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use core_kernel::MAX_AMOUNT;
use domain_billing::MAX_QUANTITY;

use crate::error::ApiError;

/// JSON body that has passed `Validate`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
                ApiError::Validation(rejection.body_text())
            } else {
                ApiError::BadRequest(rejection.body_text())
            }
        })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn storable(value: &Decimal) -> Result<(), ValidationError> {
    if *value > MAX_AMOUNT {
        return Err(ValidationError::new("max_amount"));
    }
    Ok(())
}

/// Zero or more, up to the largest storable amount
pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative"));
    }
    storable(value)
}

/// Above zero, up to the largest storable amount
pub(crate) fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("positive"));
    }
    storable(value)
}

pub(crate) fn valid_quantity(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative"));
    }
    if *value > MAX_QUANTITY {
        return Err(ValidationError::new("max_quantity"));
    }
    Ok(())
}
