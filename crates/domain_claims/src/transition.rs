//! Claim status transitions
//!
//! Every allowed move is one row of [`TRANSITIONS`]: the current status, the
//! event, the next status, and the side effects the service must carry out
//! inside the same unit of work. Pairs missing from the table are rejected.
//!
//! ```text
//! DRAFT ──MarkPending──▶ PENDING ──Submit──▶ SUBMITTED ──Pay──▶ PAID
//!   └────────────Submit────────────────────▶     └──────Deny──▶ DENIED
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::claim::ClaimStatus;
use crate::error::ClaimError;

/// Something that happened to a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimEvent {
    MarkPending,
    Submit,
    Pay,
    Deny,
}

impl ClaimEvent {
    pub const ALL: [ClaimEvent; 4] = [
        ClaimEvent::MarkPending,
        ClaimEvent::Submit,
        ClaimEvent::Pay,
        ClaimEvent::Deny,
    ];

    /// Maps a requested target status onto the event that reaches it
    ///
    /// DRAFT has no event; nothing moves back to it.
    pub fn for_target(status: ClaimStatus) -> Option<ClaimEvent> {
        match status {
            ClaimStatus::Draft => None,
            ClaimStatus::Pending => Some(ClaimEvent::MarkPending),
            ClaimStatus::Submitted => Some(ClaimEvent::Submit),
            ClaimStatus::Paid => Some(ClaimEvent::Pay),
            ClaimStatus::Denied => Some(ClaimEvent::Deny),
        }
    }
}

impl fmt::Display for ClaimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Work a transition requires beyond changing the claim's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimEffect {
    /// Set the parent invoice to PENDING_INSURANCE
    MarkInvoicePendingInsurance,
    /// Set the parent invoice to INSURANCE_DENIED
    MarkInvoiceInsuranceDenied,
    StampSubmitted,
    StampResolved,
    /// Store the paid amount, defaulting to the claim amount
    RecordPaidAmount,
    /// Record an INSURANCE payment on the invoice and reconcile it.
    /// Only planned when the caller asked for automatic payment.
    GeneratePayment,
}

/// One row of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: ClaimStatus,
    pub event: ClaimEvent,
    pub to: ClaimStatus,
    pub effects: &'static [ClaimEffect],
}

pub const TRANSITIONS: [TransitionRule; 5] = [
    TransitionRule {
        from: ClaimStatus::Draft,
        event: ClaimEvent::MarkPending,
        to: ClaimStatus::Pending,
        effects: &[ClaimEffect::MarkInvoicePendingInsurance],
    },
    TransitionRule {
        from: ClaimStatus::Draft,
        event: ClaimEvent::Submit,
        to: ClaimStatus::Submitted,
        effects: &[ClaimEffect::MarkInvoicePendingInsurance, ClaimEffect::StampSubmitted],
    },
    TransitionRule {
        from: ClaimStatus::Pending,
        event: ClaimEvent::Submit,
        to: ClaimStatus::Submitted,
        effects: &[ClaimEffect::StampSubmitted],
    },
    TransitionRule {
        from: ClaimStatus::Submitted,
        event: ClaimEvent::Pay,
        to: ClaimStatus::Paid,
        effects: &[
            ClaimEffect::RecordPaidAmount,
            ClaimEffect::GeneratePayment,
            ClaimEffect::StampResolved,
        ],
    },
    TransitionRule {
        from: ClaimStatus::Submitted,
        event: ClaimEvent::Deny,
        to: ClaimStatus::Denied,
        effects: &[ClaimEffect::MarkInvoiceInsuranceDenied, ClaimEffect::StampResolved],
    },
];

/// The outcome of looking up a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: ClaimStatus,
    pub event: ClaimEvent,
    pub to: ClaimStatus,
    /// Effects to run, in order
    pub effects: Vec<ClaimEffect>,
}

/// Looks up `(from, event)` and returns the next status with its effects
pub fn plan_transition(
    from: ClaimStatus,
    event: ClaimEvent,
    auto_generate_payment: bool,
) -> Result<TransitionPlan, ClaimError> {
    let rule = TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.event == event)
        .ok_or(ClaimError::InvalidTransition { from, event })?;

    let effects = rule
        .effects
        .iter()
        .copied()
        .filter(|effect| auto_generate_payment || *effect != ClaimEffect::GeneratePayment)
        .collect();

    Ok(TransitionPlan {
        from,
        event,
        to: rule.to,
        effects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_row_is_reachable() {
        for rule in TRANSITIONS {
            let plan = plan_transition(rule.from, rule.event, true).unwrap();
            assert_eq!(plan.to, rule.to);
            assert_eq!(plan.effects, rule.effects.to_vec());
        }
    }

    #[test]
    fn test_pairs_outside_the_table_are_rejected() {
        for from in ClaimStatus::ALL {
            for event in ClaimEvent::ALL {
                let listed = TRANSITIONS
                    .iter()
                    .any(|rule| rule.from == from && rule.event == event);
                let result = plan_transition(from, event, false);
                assert_eq!(result.is_ok(), listed, "{} + {}", from, event);
                if !listed {
                    assert!(matches!(
                        result,
                        Err(ClaimError::InvalidTransition { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn test_payment_generation_is_opt_in() {
        let without = plan_transition(ClaimStatus::Submitted, ClaimEvent::Pay, false).unwrap();
        assert_eq!(
            without.effects,
            vec![ClaimEffect::RecordPaidAmount, ClaimEffect::StampResolved]
        );

        let with = plan_transition(ClaimStatus::Submitted, ClaimEvent::Pay, true).unwrap();
        assert!(with.effects.contains(&ClaimEffect::GeneratePayment));
    }

    #[test]
    fn test_first_move_from_draft_marks_invoice() {
        for event in [ClaimEvent::MarkPending, ClaimEvent::Submit] {
            let plan = plan_transition(ClaimStatus::Draft, event, false).unwrap();
            assert_eq!(plan.effects[0], ClaimEffect::MarkInvoicePendingInsurance);
        }
        let plan = plan_transition(ClaimStatus::Pending, ClaimEvent::Submit, false).unwrap();
        assert!(!plan.effects.contains(&ClaimEffect::MarkInvoicePendingInsurance));
    }

    #[test]
    fn test_for_target() {
        assert_eq!(ClaimEvent::for_target(ClaimStatus::Draft), None);
        for rule in TRANSITIONS {
            assert_eq!(ClaimEvent::for_target(rule.to), Some(rule.event));
        }
    }
}
