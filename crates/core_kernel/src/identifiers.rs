//! Strongly-typed identifiers for domain entities
//!
//! Identifiers are 64-bit integers assigned by the store. Newtype wrappers
//! prevent accidental mixing of different identifier types. On the wire they
//! are encoded as decimal strings so JavaScript clients never lose precision;
//! deserialization also accepts plain JSON integers.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an identifier cannot be parsed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {kind} identifier: '{value}'")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! define_id {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw 64-bit value
            pub const fn get(&self) -> i64 {
                self.0
            }

            /// Returns the entity kind used in error messages
            pub fn kind() -> &'static str {
                $kind
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .map(Self)
                    .ok_or_else(|| IdParseError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer
                    .deserialize_any(IdVisitor { kind: $kind })
                    .map(Self)
            }
        }
    };
}

/// Accepts either `"123"` or `123`
struct IdVisitor {
    kind: &'static str,
}

impl<'de> Visitor<'de> for IdVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a positive {} identifier as a string or integer", self.kind)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        if v > 0 {
            Ok(v)
        } else {
            Err(E::custom(format!("{} identifier must be positive", self.kind)))
        }
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v)
            .map_err(|_| E::custom(format!("{} identifier out of range", self.kind)))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        v.trim()
            .parse::<i64>()
            .map_err(|_| E::custom(format!("invalid {} identifier '{}'", self.kind, v)))
            .and_then(|v| self.visit_i64(v))
    }
}

// Tenancy
define_id!(TenantId, "tenant");

// Practice identifiers
define_id!(ClientId, "client");
define_id!(SessionId, "telehealth session");

// Billing domain identifiers
define_id!(InvoiceId, "invoice");
define_id!(InvoiceItemId, "invoice item");
define_id!(PaymentId, "payment");

// Claims domain identifiers
define_id!(ClaimId, "insurance claim");
define_id!(ClaimItemId, "claim item");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_id_display() {
        let id = InvoiceId::new(9_007_199_254_740_993);
        assert_eq!(id.to_string(), "9007199254740993");
    }

    #[test]
    fn test_id_parsing() {
        let parsed: ClaimId = "42".parse().unwrap();
        assert_eq!(parsed, ClaimId::new(42));
        assert!("abc".parse::<ClaimId>().is_err());
        assert!("0".parse::<ClaimId>().is_err());
    }

    #[test]
    fn test_i64_conversion() {
        let id = PaymentId::from(7);
        let back: i64 = id.into();
        assert_eq!(back, 7);
    }
}
