//! Claims Domain Ports
//!
//! The claims unit of work extends the billing one: a claim transition may
//! record a payment and move its invoice, and all of it must commit or roll
//! back together. Any adapter implementing `ClaimsStore` therefore also
//! serves invoices and payments through the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use core_kernel::{
    ClaimId, ClaimItemId, DomainPort, HealthCheckable, InvoiceId, InvoiceItemId, Page, PortError,
    TenantId,
};
use domain_billing::BillingTx;

use crate::claim::{ClaimItem, ClaimStatus, InsuranceClaim};

/// Query parameters for listing claims
#[derive(Debug, Clone, Default)]
pub struct ClaimQuery {
    pub status: Option<ClaimStatus>,
    pub invoice_id: Option<InvoiceId>,
    pub page: Option<Page>,
}

impl ClaimQuery {
    pub fn for_invoice(invoice_id: InvoiceId) -> Self {
        Self {
            invoice_id: Some(invoice_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, claim: &InsuranceClaim) -> bool {
        self.status.map_or(true, |s| claim.status == s)
            && self.invoice_id.map_or(true, |i| claim.invoice_id == i)
    }
}

/// A claim ready to be inserted by the store
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimInsert {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub claim_number: String,
    pub payer_name: String,
    pub policy_number: Option<String>,
    pub status: ClaimStatus,
    pub claim_amount: Decimal,
    pub notes: Option<String>,
    pub items: Vec<ClaimItemInsert>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimItemInsert {
    pub invoice_item_id: InvoiceItemId,
    pub amount: Decimal,
}

/// A unit of work over claims, invoices and payments
#[async_trait]
pub trait ClaimsTx: BillingTx {
    /// Loads a claim with its items and locks it for update
    async fn get_claim(&mut self, tenant_id: TenantId, id: ClaimId) -> Result<InsuranceClaim, PortError>;

    async fn list_claims(
        &mut self,
        tenant_id: TenantId,
        query: &ClaimQuery,
    ) -> Result<Vec<InsuranceClaim>, PortError>;

    /// Inserts a claim and its items, assigning ids
    async fn insert_claim(&mut self, claim: &ClaimInsert) -> Result<InsuranceClaim, PortError>;

    /// Writes the claim header (not its items), checking `claim.version`
    async fn save_claim(&mut self, claim: &InsuranceClaim) -> Result<InsuranceClaim, PortError>;

    /// Fails with `PortError::Conflict` if the invoice item is already on the claim
    async fn insert_claim_item(
        &mut self,
        tenant_id: TenantId,
        claim_id: ClaimId,
        item: &ClaimItemInsert,
    ) -> Result<ClaimItem, PortError>;

    async fn delete_claim_item(
        &mut self,
        tenant_id: TenantId,
        claim_id: ClaimId,
        item_id: ClaimItemId,
    ) -> Result<(), PortError>;

    /// Deletes the claim and its items
    async fn delete_claim(&mut self, tenant_id: TenantId, id: ClaimId) -> Result<(), PortError>;
}

/// Entry point to the claims data source
#[async_trait]
pub trait ClaimsStore: DomainPort + HealthCheckable {
    async fn begin(&self) -> Result<Box<dyn ClaimsTx>, PortError>;
}

/// In-memory implementation of the claims port for testing
///
/// Shares one state with the billing tables, so the same store can back
/// both `InvoiceService`/`PaymentService` and `ClaimService`.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use core_kernel::{AdapterHealth, HealthCheckResult};
    use domain_billing::ports::mock::{BillingTables, HasBillingTables, MemoryTx};
    use domain_billing::BillingStore;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Billing tables plus claims
    #[derive(Debug, Clone, Default)]
    pub struct ClaimsTables {
        pub billing: BillingTables,
        pub claims: BTreeMap<ClaimId, InsuranceClaim>,
    }

    impl HasBillingTables for ClaimsTables {
        fn billing(&self) -> &BillingTables {
            &self.billing
        }

        fn billing_mut(&mut self) -> &mut BillingTables {
            &mut self.billing
        }

        fn invoice_is_referenced(&self, invoice_id: InvoiceId) -> bool {
            self.claims.values().any(|c| c.invoice_id == invoice_id)
        }

        fn invoice_items_are_referenced(&self, invoice_id: InvoiceId) -> bool {
            self.claims
                .values()
                .any(|c| c.invoice_id == invoice_id && !c.items.is_empty())
        }
    }

    impl ClaimsTables {
        pub fn claim(&self, tenant_id: TenantId, id: ClaimId) -> Result<&InsuranceClaim, PortError> {
            self.claims
                .get(&id)
                .filter(|c| c.tenant_id == tenant_id)
                .ok_or_else(|| PortError::not_found("InsuranceClaim", id))
        }

        fn claim_mut(&mut self, tenant_id: TenantId, id: ClaimId) -> Result<&mut InsuranceClaim, PortError> {
            self.claims
                .get_mut(&id)
                .filter(|c| c.tenant_id == tenant_id)
                .ok_or_else(|| PortError::not_found("InsuranceClaim", id))
        }

        fn new_item(&mut self, claim_id: ClaimId, item: &ClaimItemInsert) -> ClaimItem {
            ClaimItem {
                id: ClaimItemId::new(self.billing.next_id()),
                claim_id,
                invoice_item_id: item.invoice_item_id,
                amount: item.amount,
            }
        }
    }

    #[async_trait]
    impl ClaimsTx for MemoryTx<ClaimsTables> {
        async fn get_claim(&mut self, tenant_id: TenantId, id: ClaimId) -> Result<InsuranceClaim, PortError> {
            self.state().claim(tenant_id, id).cloned()
        }

        async fn list_claims(
            &mut self,
            tenant_id: TenantId,
            query: &ClaimQuery,
        ) -> Result<Vec<InsuranceClaim>, PortError> {
            let matching = self
                .state()
                .claims
                .values()
                .filter(|c| c.tenant_id == tenant_id && query.matches(c))
                .cloned();
            Ok(match query.page {
                Some(page) => page.slice(matching),
                None => matching.collect(),
            })
        }

        async fn insert_claim(&mut self, insert: &ClaimInsert) -> Result<InsuranceClaim, PortError> {
            let tables = self.state_mut();
            tables.billing.invoice(insert.tenant_id, insert.invoice_id)?;
            if tables.claims.values().any(|c| {
                c.tenant_id == insert.tenant_id && c.claim_number == insert.claim_number
            }) {
                return Err(PortError::conflict(format!(
                    "claim number {} already exists",
                    insert.claim_number
                )));
            }

            let id = ClaimId::new(tables.billing.next_id());
            let items = insert
                .items
                .iter()
                .map(|item| tables.new_item(id, item))
                .collect();
            let claim = InsuranceClaim {
                id,
                tenant_id: insert.tenant_id,
                invoice_id: insert.invoice_id,
                claim_number: insert.claim_number.clone(),
                payer_name: insert.payer_name.clone(),
                policy_number: insert.policy_number.clone(),
                status: insert.status,
                claim_amount: insert.claim_amount,
                paid_amount: None,
                denial_reason: None,
                submitted_at: None,
                resolved_at: None,
                notes: insert.notes.clone(),
                items,
                version: 1,
                created_at: insert.created_at,
                updated_at: insert.created_at,
            };
            tables.claims.insert(id, claim.clone());
            Ok(claim)
        }

        async fn save_claim(&mut self, claim: &InsuranceClaim) -> Result<InsuranceClaim, PortError> {
            let stored = self.state_mut().claim_mut(claim.tenant_id, claim.id)?;
            if stored.version != claim.version {
                return Err(PortError::stale("InsuranceClaim", claim.id, claim.version));
            }
            let items = std::mem::take(&mut stored.items);
            *stored = InsuranceClaim {
                items,
                version: claim.version + 1,
                ..claim.clone()
            };
            Ok(InsuranceClaim {
                items: claim.items.clone(),
                ..stored.clone()
            })
        }

        async fn insert_claim_item(
            &mut self,
            tenant_id: TenantId,
            claim_id: ClaimId,
            item: &ClaimItemInsert,
        ) -> Result<ClaimItem, PortError> {
            let tables = self.state_mut();
            let duplicate = tables
                .claim(tenant_id, claim_id)?
                .items
                .iter()
                .any(|i| i.invoice_item_id == item.invoice_item_id);
            if duplicate {
                return Err(PortError::conflict(format!(
                    "invoice item {} is already on claim {}",
                    item.invoice_item_id, claim_id
                )));
            }
            let created = tables.new_item(claim_id, item);
            tables.claim_mut(tenant_id, claim_id)?.items.push(created.clone());
            Ok(created)
        }

        async fn delete_claim_item(
            &mut self,
            tenant_id: TenantId,
            claim_id: ClaimId,
            item_id: ClaimItemId,
        ) -> Result<(), PortError> {
            let claim = self.state_mut().claim_mut(tenant_id, claim_id)?;
            let before = claim.items.len();
            claim.items.retain(|i| i.id != item_id);
            if claim.items.len() == before {
                return Err(PortError::not_found("ClaimItem", item_id));
            }
            Ok(())
        }

        async fn delete_claim(&mut self, tenant_id: TenantId, id: ClaimId) -> Result<(), PortError> {
            let tables = self.state_mut();
            tables.claim(tenant_id, id)?;
            tables.claims.remove(&id);
            Ok(())
        }
    }

    /// In-memory store serving both billing and claims
    #[derive(Debug, Clone, Default)]
    pub struct MemoryClaimsStore {
        state: Arc<Mutex<ClaimsTables>>,
    }

    impl MemoryClaimsStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Copies the committed state for assertions
        pub async fn snapshot(&self) -> ClaimsTables {
            self.state.lock().await.clone()
        }
    }

    impl DomainPort for MemoryClaimsStore {}

    #[async_trait]
    impl HealthCheckable for MemoryClaimsStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "memory-claims-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("In-memory store always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl BillingStore for MemoryClaimsStore {
        async fn begin(&self) -> Result<Box<dyn BillingTx>, PortError> {
            Ok(Box::new(MemoryTx::begin(&self.state).await))
        }
    }

    #[async_trait]
    impl ClaimsStore for MemoryClaimsStore {
        async fn begin(&self) -> Result<Box<dyn ClaimsTx>, PortError> {
            Ok(Box::new(MemoryTx::begin(&self.state).await))
        }
    }
}
