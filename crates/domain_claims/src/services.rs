//! Claim application service
//!
//! Every operation runs in one claims unit of work. Status updates look the
//! move up in the transition table and then carry out its effects in order;
//! the first failing effect aborts the whole update.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use core_kernel::{ClaimId, ClaimItemId, Clock, TenantId, MAX_AMOUNT};
use domain_billing::{
    apply_insurance_status, apply_payment, Invoice, InvoiceStatus, PaymentInsert, PaymentMethod,
};

use crate::claim::{
    generate_claim_number, ClaimStatus, InsuranceClaim, NewClaim, NewClaimItem, UpdateClaim,
};
use crate::error::ClaimError;
use crate::ports::{ClaimInsert, ClaimItemInsert, ClaimQuery, ClaimsStore, ClaimsTx};
use crate::transition::{plan_transition, ClaimEffect, ClaimEvent};

/// Resolves a requested item against the claim's invoice
fn resolve_item(invoice: &Invoice, item: &NewClaimItem) -> Result<ClaimItemInsert, ClaimError> {
    let line = invoice.find_item(item.invoice_item_id).ok_or_else(|| {
        ClaimError::Validation(format!(
            "invoice item {} does not belong to invoice {}",
            item.invoice_item_id, invoice.id
        ))
    })?;

    let amount = item.amount.unwrap_or(line.line_total);
    if amount <= Decimal::ZERO || amount > line.line_total {
        return Err(ClaimError::Validation(format!(
            "claimed amount {} must be positive and at most the line total {}",
            amount, line.line_total
        )));
    }

    Ok(ClaimItemInsert {
        invoice_item_id: line.id,
        amount,
    })
}

/// Insurance claim use cases
#[derive(Clone)]
pub struct ClaimService {
    store: Arc<dyn ClaimsStore>,
    clock: Arc<dyn Clock>,
}

impl ClaimService {
    pub fn new(store: Arc<dyn ClaimsStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a DRAFT or PENDING claim with its items
    ///
    /// A claim created PENDING has already left DRAFT, so its invoice moves
    /// to PENDING_INSURANCE in the same unit of work.
    #[instrument(skip(self, cmd), fields(tenant_id = %tenant_id, invoice_id = %cmd.invoice_id))]
    pub async fn create_claim(&self, tenant_id: TenantId, cmd: NewClaim) -> Result<InsuranceClaim, ClaimError> {
        let now = self.clock.now();
        let status = cmd.status.unwrap_or(ClaimStatus::Draft);
        if !matches!(status, ClaimStatus::Draft | ClaimStatus::Pending) {
            return Err(ClaimError::Validation(format!(
                "a claim must start as DRAFT or PENDING, not {}",
                status
            )));
        }
        let payer_name = cmd.payer_name.trim().to_string();
        if payer_name.is_empty() {
            return Err(ClaimError::Validation("payer name is required".into()));
        }

        let mut tx = self.store.begin().await?;
        let invoice = tx.get_invoice(tenant_id, cmd.invoice_id).await?;
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(ClaimError::InvalidState(format!(
                "invoice {} is cancelled",
                invoice.id
            )));
        }

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(cmd.items.len());
        for item in &cmd.items {
            if !seen.insert(item.invoice_item_id) {
                return Err(ClaimError::Conflict(format!(
                    "invoice item {} is listed twice",
                    item.invoice_item_id
                )));
            }
            items.push(resolve_item(&invoice, item)?);
        }
        let claim_amount = items.iter().map(|item| item.amount).sum();

        let insert = ClaimInsert {
            tenant_id,
            invoice_id: invoice.id,
            claim_number: cmd
                .claim_number
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| generate_claim_number(now)),
            payer_name,
            policy_number: cmd.policy_number,
            status,
            claim_amount,
            notes: cmd.notes,
            items,
            created_at: now,
        };
        let claim = tx.insert_claim(&insert).await?;

        if status == ClaimStatus::Pending {
            apply_insurance_status(tx.as_mut(), tenant_id, invoice.id, InvoiceStatus::PendingInsurance, now)
                .await?;
        }
        tx.commit().await?;

        info!(claim_id = %claim.id, status = %claim.status, amount = %claim.claim_amount, "Claim created");
        Ok(claim)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, claim_id = %id))]
    pub async fn get_claim(&self, tenant_id: TenantId, id: ClaimId) -> Result<InsuranceClaim, ClaimError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.get_claim(tenant_id, id).await?)
    }

    #[instrument(skip(self, query), fields(tenant_id = %tenant_id))]
    pub async fn list_claims(
        &self,
        tenant_id: TenantId,
        query: ClaimQuery,
    ) -> Result<Vec<InsuranceClaim>, ClaimError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_claims(tenant_id, &query).await?)
    }

    /// Applies an explicit update command, including a status transition
    #[instrument(
        skip(self, cmd),
        fields(tenant_id = %tenant_id, claim_id = %id, target = ?cmd.status)
    )]
    pub async fn update_claim(
        &self,
        tenant_id: TenantId,
        id: ClaimId,
        cmd: UpdateClaim,
    ) -> Result<InsuranceClaim, ClaimError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut claim = tx.get_claim(tenant_id, id).await?;

        if let Some(payer_name) = cmd.payer_name {
            let payer_name = payer_name.trim().to_string();
            if payer_name.is_empty() {
                return Err(ClaimError::Validation("payer name is required".into()));
            }
            claim.payer_name = payer_name;
        }
        cmd.policy_number.apply_to(&mut claim.policy_number);
        cmd.notes.apply_to(&mut claim.notes);
        cmd.denial_reason.apply_to(&mut claim.denial_reason);

        let target = cmd.status.filter(|status| *status != claim.status);
        if let Some(paid_amount) = cmd.paid_amount {
            if target != Some(ClaimStatus::Paid) {
                return Err(ClaimError::Validation(
                    "paid amount can only be given when marking the claim PAID".into(),
                ));
            }
            if paid_amount.is_sign_negative() || paid_amount > MAX_AMOUNT {
                return Err(ClaimError::Validation(format!(
                    "paid amount must be between 0 and {}, got {}",
                    MAX_AMOUNT, paid_amount
                )));
            }
        }

        if let Some(target) = target {
            let event = ClaimEvent::for_target(target).ok_or_else(|| {
                ClaimError::InvalidState(format!("claim {} cannot move back to {}", id, target))
            })?;
            let plan = plan_transition(claim.status, event, cmd.auto_generate_payment)?;
            for effect in &plan.effects {
                self.run_effect(tx.as_mut(), &mut claim, *effect, cmd.paid_amount, now)
                    .await?;
            }
            claim.status = plan.to;
            info!(from = %plan.from, to = %plan.to, "Claim transitioned");
        }

        claim.updated_at = now;
        let claim = tx.save_claim(&claim).await?;
        tx.commit().await?;
        Ok(claim)
    }

    async fn run_effect(
        &self,
        tx: &mut dyn ClaimsTx,
        claim: &mut InsuranceClaim,
        effect: ClaimEffect,
        paid_amount: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<(), ClaimError> {
        debug!(?effect, claim_id = %claim.id, "Running claim effect");
        match effect {
            ClaimEffect::MarkInvoicePendingInsurance => {
                apply_insurance_status(tx, claim.tenant_id, claim.invoice_id, InvoiceStatus::PendingInsurance, now)
                    .await?;
            }
            ClaimEffect::MarkInvoiceInsuranceDenied => {
                apply_insurance_status(tx, claim.tenant_id, claim.invoice_id, InvoiceStatus::InsuranceDenied, now)
                    .await?;
            }
            ClaimEffect::StampSubmitted => claim.submitted_at = Some(now),
            ClaimEffect::StampResolved => claim.resolved_at = Some(now),
            ClaimEffect::RecordPaidAmount => {
                claim.paid_amount = Some(paid_amount.unwrap_or(claim.claim_amount));
            }
            ClaimEffect::GeneratePayment => {
                let amount = claim.settlement_amount();
                if amount <= Decimal::ZERO {
                    info!(claim_id = %claim.id, "Payer paid nothing, no payment generated");
                    return Ok(());
                }
                let insert = PaymentInsert {
                    tenant_id: claim.tenant_id,
                    invoice_id: claim.invoice_id,
                    claim_id: Some(claim.id),
                    amount,
                    method: PaymentMethod::Insurance,
                    reference: Some(claim.claim_number.clone()),
                    notes: Some(format!("Insurance payment from {}", claim.payer_name)),
                    paid_at: now,
                };
                let (payment, invoice) = apply_payment(tx, insert, now).await?;
                info!(
                    payment_id = %payment.id,
                    invoice_status = %invoice.status,
                    "Insurance payment generated"
                );
            }
        }
        Ok(())
    }

    /// Adds an invoice line item to a DRAFT or PENDING claim
    #[instrument(skip(self, item), fields(tenant_id = %tenant_id, claim_id = %claim_id, invoice_item_id = %item.invoice_item_id))]
    pub async fn add_item(
        &self,
        tenant_id: TenantId,
        claim_id: ClaimId,
        item: NewClaimItem,
    ) -> Result<InsuranceClaim, ClaimError> {
        let mut tx = self.store.begin().await?;
        let mut claim = tx.get_claim(tenant_id, claim_id).await?;
        claim.ensure_items_mutable()?;

        let invoice = tx.get_invoice(tenant_id, claim.invoice_id).await?;
        let insert = resolve_item(&invoice, &item)?;
        let created = tx.insert_claim_item(tenant_id, claim_id, &insert).await?;

        claim.items.push(created);
        claim.recalculate_amount();
        claim.updated_at = self.clock.now();
        let claim = tx.save_claim(&claim).await?;
        tx.commit().await?;

        info!(amount = %claim.claim_amount, "Claim item added");
        Ok(claim)
    }

    /// Removes a line item from a DRAFT or PENDING claim
    #[instrument(skip(self), fields(tenant_id = %tenant_id, claim_id = %claim_id, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        tenant_id: TenantId,
        claim_id: ClaimId,
        item_id: ClaimItemId,
    ) -> Result<InsuranceClaim, ClaimError> {
        let mut tx = self.store.begin().await?;
        let mut claim = tx.get_claim(tenant_id, claim_id).await?;
        claim.ensure_items_mutable()?;

        tx.delete_claim_item(tenant_id, claim_id, item_id).await?;
        claim.items.retain(|item| item.id != item_id);
        claim.recalculate_amount();
        claim.updated_at = self.clock.now();
        let claim = tx.save_claim(&claim).await?;
        tx.commit().await?;

        info!(amount = %claim.claim_amount, "Claim item removed");
        Ok(claim)
    }

    /// Deletes a DRAFT claim and its items
    #[instrument(skip(self), fields(tenant_id = %tenant_id, claim_id = %id))]
    pub async fn delete_claim(&self, tenant_id: TenantId, id: ClaimId) -> Result<(), ClaimError> {
        let mut tx = self.store.begin().await?;
        let claim = tx.get_claim(tenant_id, id).await?;
        if claim.status != ClaimStatus::Draft {
            return Err(ClaimError::InvalidState(format!(
                "claim {} is {} and only DRAFT claims can be deleted",
                id, claim.status
            )));
        }
        tx.delete_claim(tenant_id, id).await?;
        tx.commit().await?;

        info!("Claim deleted");
        Ok(())
    }
}
