//! Test Data Builders
//!
//! Builders for the create commands, with sensible defaults so tests set
//! only the fields they care about, plus [`TestServices`], every service
//! wired over the in-memory stores.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ClientId, Currency, FixedClock, InvoiceId, InvoiceItemId, TenantId};
use domain_billing::{InvoiceService, NewInvoice, NewInvoiceItem, PaymentService};
use domain_claims::ports::mock::MemoryClaimsStore;
use domain_claims::{ClaimService, ClaimStatus, NewClaim, NewClaimItem};
use domain_telehealth::ports::mock::MemoryTelehealthStore;
use domain_telehealth::{NewSession, SessionService};

use crate::fixtures::{unique_number, IdFixtures, StringFixtures, TemporalFixtures};

/// Builder for [`NewInvoice`]
pub struct InvoiceBuilder {
    client_id: ClientId,
    invoice_number: Option<String>,
    issue_date: Option<NaiveDate>,
    due_date: NaiveDate,
    currency: Currency,
    notes: Option<String>,
    items: Vec<NewInvoiceItem>,
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceBuilder {
    /// A USD invoice due in 30 days with no items and a unique number
    pub fn new() -> Self {
        Self {
            client_id: IdFixtures::client(),
            invoice_number: Some(unique_number("INV")),
            issue_date: None,
            due_date: TemporalFixtures::due_in_30_days(),
            currency: Currency::USD,
            notes: None,
            items: Vec::new(),
        }
    }

    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = Some(number.into());
        self
    }

    pub fn with_issue_date(mut self, date: NaiveDate) -> Self {
        self.issue_date = Some(date);
        self
    }

    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = date;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Adds a line of `quantity` x `unit_price`
    pub fn with_line(mut self, description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        self.items.push(NewInvoiceItem::new(description, quantity, unit_price));
        self
    }

    /// Adds a single line worth `amount`
    pub fn with_amount(self, amount: Decimal) -> Self {
        self.with_line("Therapy session", dec!(1), amount)
    }

    pub fn build(self) -> NewInvoice {
        NewInvoice {
            client_id: self.client_id,
            invoice_number: self.invoice_number,
            issue_date: self.issue_date,
            due_date: self.due_date,
            currency: self.currency,
            notes: self.notes,
            items: self.items,
        }
    }
}

/// Builder for [`NewClaim`]
pub struct ClaimBuilder {
    invoice_id: InvoiceId,
    claim_number: Option<String>,
    payer_name: String,
    policy_number: Option<String>,
    status: Option<ClaimStatus>,
    items: Vec<NewClaimItem>,
}

impl ClaimBuilder {
    /// A DRAFT claim on `invoice_id` with a fake payer and no items
    pub fn for_invoice(invoice_id: InvoiceId) -> Self {
        Self {
            invoice_id,
            claim_number: Some(unique_number("CLM")),
            payer_name: StringFixtures::payer_name(),
            policy_number: Some(StringFixtures::policy_number().to_string()),
            status: None,
            items: Vec::new(),
        }
    }

    pub fn with_payer(mut self, payer_name: impl Into<String>) -> Self {
        self.payer_name = payer_name.into();
        self
    }

    /// Claims the full line total of `item_id`
    pub fn with_item(mut self, item_id: InvoiceItemId) -> Self {
        self.items.push(NewClaimItem::for_item(item_id));
        self
    }

    pub fn with_partial_item(mut self, item_id: InvoiceItemId, amount: Decimal) -> Self {
        self.items.push(NewClaimItem {
            invoice_item_id: item_id,
            amount: Some(amount),
        });
        self
    }

    pub fn pending(mut self) -> Self {
        self.status = Some(ClaimStatus::Pending);
        self
    }

    pub fn build(self) -> NewClaim {
        NewClaim {
            invoice_id: self.invoice_id,
            claim_number: self.claim_number,
            payer_name: self.payer_name,
            policy_number: self.policy_number,
            notes: None,
            status: self.status,
            items: self.items,
        }
    }
}

/// Builder for [`NewSession`]
pub struct SessionBuilder {
    client_id: ClientId,
    clinician_name: String,
    scheduled_start: DateTime<Utc>,
    duration_minutes: i32,
    notes: Option<String>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// A 50 minute session tomorrow afternoon
    pub fn new() -> Self {
        Self {
            client_id: IdFixtures::client(),
            clinician_name: StringFixtures::clinician_name(),
            scheduled_start: TemporalFixtures::tomorrow_afternoon(),
            duration_minutes: 50,
            notes: None,
        }
    }

    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn starting_in(mut self, offset: Duration) -> Self {
        self.scheduled_start = TemporalFixtures::tomorrow_afternoon() + offset;
        self
    }

    pub fn with_duration(mut self, minutes: i32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn build(self) -> NewSession {
        NewSession {
            client_id: self.client_id,
            clinician_name: self.clinician_name,
            scheduled_start: self.scheduled_start,
            duration_minutes: self.duration_minutes,
            notes: self.notes,
        }
    }
}

/// Every service over shared in-memory stores and one fixed clock
pub struct TestServices {
    pub tenant: TenantId,
    pub clock: Arc<FixedClock>,
    pub store: Arc<MemoryClaimsStore>,
    pub session_store: Arc<MemoryTelehealthStore>,
    pub invoices: InvoiceService,
    pub payments: PaymentService,
    pub claims: ClaimService,
    pub sessions: SessionService,
}

impl Default for TestServices {
    fn default() -> Self {
        Self::new()
    }
}

impl TestServices {
    pub fn new() -> Self {
        let clock = Arc::new(TemporalFixtures::fixed_clock());
        let store = Arc::new(MemoryClaimsStore::new());
        let session_store = Arc::new(MemoryTelehealthStore::new());

        Self {
            tenant: IdFixtures::tenant(),
            invoices: InvoiceService::new(store.clone(), clock.clone()),
            payments: PaymentService::new(store.clone(), clock.clone()),
            claims: ClaimService::new(store.clone(), clock.clone()),
            sessions: SessionService::new(session_store.clone(), clock.clone()),
            clock,
            store,
            session_store,
        }
    }
}
