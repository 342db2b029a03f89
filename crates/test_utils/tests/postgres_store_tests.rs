//! PostgreSQL store adapter tests
//!
//! These need Docker (or `TEST_DATABASE_URL`) and are ignored by default:
//!
//! ```text
//! cargo test -p test_utils --test postgres_store_tests -- --ignored
//! ```

use std::sync::Arc;

use chrono::Duration;
use rust_decimal_macros::dec;

use core_kernel::{AdapterHealth, HealthCheckable, TenantId};
use domain_billing::{BillingError, BillingStore, BillingTx, InvoiceService, InvoiceStatus, NewPayment, PaymentMethod, PaymentService, UpdateInvoice};
use domain_claims::{ClaimError, ClaimService, ClaimStatus, ClaimsStore, ClaimsTx, UpdateClaim};
use domain_telehealth::{SessionEvent, SessionService, SessionStatus};
use test_utils::*;

struct PgServices {
    invoices: InvoiceService,
    payments: PaymentService,
    claims: ClaimService,
    sessions: SessionService,
}

async fn services() -> (Arc<TestDatabase>, PgServices) {
    let db = get_shared_test_database().await;
    let store = db.store();
    let clock = Arc::new(TemporalFixtures::fixed_clock());
    let services = PgServices {
        invoices: InvoiceService::new(store.clone(), clock.clone()),
        payments: PaymentService::new(store.clone(), clock.clone()),
        claims: ClaimService::new(store.clone(), clock.clone()),
        sessions: SessionService::new(store, clock),
    };
    (db, services)
}

/// Each test works in its own tenant so the shared database needs no reset
fn fresh_tenant() -> TenantId {
    use std::sync::atomic::{AtomicI64, Ordering};
    static NEXT: AtomicI64 = AtomicI64::new(1000);
    TenantId::new(NEXT.fetch_add(1, Ordering::Relaxed))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_health_check_reports_healthy() {
    let db = get_shared_test_database().await;
    let result = db.store().health_check().await;
    assert_eq!(result.status, AdapterHealth::Healthy);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_invoice_and_payments_persist() {
    let (_db, app) = services().await;
    let tenant = fresh_tenant();

    let invoice = app
        .invoices
        .create_invoice(
            tenant,
            InvoiceBuilder::new()
                .with_line("Family therapy", dec!(1.5), dec!(110.00))
                .with_notes("Sliding scale applied")
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(invoice.total_amount, dec!(165.00));
    assert_eq!(invoice.items.len(), 1);

    app.invoices
        .update_invoice(tenant, invoice.id, UpdateInvoice { status: Some(InvoiceStatus::Sent), ..Default::default() })
        .await
        .unwrap();
    app.payments
        .record_payment(tenant, invoice.id, NewPayment::new(dec!(65.00), PaymentMethod::BankTransfer))
        .await
        .unwrap();

    let reloaded = app.invoices.get_invoice(tenant, invoice.id).await.unwrap();
    assert_invoice_status(&reloaded, InvoiceStatus::PartiallyPaid);
    assert_invoice_paid(&reloaded, dec!(65.00));
    assert_eq!(reloaded.notes.as_deref(), Some("Sliding scale applied"));
    assert!(reloaded.version > invoice.version);

    let other = app.invoices.get_invoice(IdFixtures::other_tenant(), invoice.id).await;
    assert!(matches!(other, Err(BillingError::NotFound { .. })));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_duplicate_invoice_number_conflicts() {
    let (_db, app) = services().await;
    let tenant = fresh_tenant();
    let number = unique_number("INV-PG");

    app.invoices
        .create_invoice(tenant, InvoiceBuilder::new().with_number(number.clone()).build())
        .await
        .unwrap();
    let result = app
        .invoices
        .create_invoice(tenant, InvoiceBuilder::new().with_number(number).build())
        .await;
    assert!(matches!(result, Err(BillingError::Conflict(_))));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_stale_invoice_save_conflicts() {
    let (db, app) = services().await;
    let tenant = fresh_tenant();

    let invoice = app
        .invoices
        .create_invoice(tenant, InvoiceBuilder::new().with_amount(dec!(80.00)).build())
        .await
        .unwrap();
    app.invoices
        .update_invoice(tenant, invoice.id, UpdateInvoice { status: Some(InvoiceStatus::Sent), ..Default::default() })
        .await
        .unwrap();

    let store = db.store();
    let mut tx = BillingStore::begin(&*store).await.unwrap();
    let err = BillingError::from(tx.save_invoice(&invoice).await.unwrap_err());
    assert!(matches!(err, BillingError::Conflict(_)));
    drop(tx);

    let reloaded = app.invoices.get_invoice(tenant, invoice.id).await.unwrap();
    assert_eq!(reloaded.version, invoice.version + 1);
    assert_invoice_status(&reloaded, InvoiceStatus::Sent);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_stale_claim_save_conflicts() {
    let (db, app) = services().await;
    let tenant = fresh_tenant();

    let invoice = app
        .invoices
        .create_invoice(tenant, InvoiceBuilder::new().with_amount(dec!(80.00)).build())
        .await
        .unwrap();
    let claim = app
        .claims
        .create_claim(tenant, ClaimBuilder::for_invoice(invoice.id).build())
        .await
        .unwrap();
    app.claims
        .update_claim(tenant, claim.id, UpdateClaim::to_status(ClaimStatus::Submitted))
        .await
        .unwrap();

    let store = db.store();
    let mut tx = ClaimsStore::begin(&*store).await.unwrap();
    let err = ClaimError::from(tx.save_claim(&claim).await.unwrap_err());
    assert!(matches!(err, ClaimError::Conflict(_)));
    drop(tx);

    let reloaded = app.claims.get_claim(tenant, claim.id).await.unwrap();
    assert_eq!(reloaded.status, ClaimStatus::Submitted);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_claimed_items_cannot_be_replaced() {
    let (_db, app) = services().await;
    let tenant = fresh_tenant();

    let invoice = app
        .invoices
        .create_invoice(tenant, InvoiceBuilder::new().with_amount(dec!(90.00)).build())
        .await
        .unwrap();
    app.claims
        .create_claim(tenant, ClaimBuilder::for_invoice(invoice.id).with_item(invoice.items[0].id).build())
        .await
        .unwrap();

    let result = app
        .invoices
        .update_invoice(
            tenant,
            invoice.id,
            UpdateInvoice {
                items: Some(InvoiceBuilder::new().with_amount(dec!(120.00)).build().items),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(BillingError::Conflict(_))));

    let reloaded = app.invoices.get_invoice(tenant, invoice.id).await.unwrap();
    assert_eq!(reloaded.items, invoice.items);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_paid_claim_generates_payment_in_one_transaction() {
    let (_db, app) = services().await;
    let tenant = fresh_tenant();

    let invoice = app
        .invoices
        .create_invoice(tenant, InvoiceBuilder::new().with_amount(dec!(130.00)).build())
        .await
        .unwrap();
    let claim = app
        .claims
        .create_claim(tenant, ClaimBuilder::for_invoice(invoice.id).with_item(invoice.items[0].id).build())
        .await
        .unwrap();
    assert_claim_amount_matches_items(&claim);

    app.claims
        .update_claim(tenant, claim.id, UpdateClaim::to_status(ClaimStatus::Submitted))
        .await
        .unwrap();
    app.claims
        .update_claim(
            tenant,
            claim.id,
            UpdateClaim {
                status: Some(ClaimStatus::Paid),
                auto_generate_payment: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let payments = app.payments.list_payments(tenant, invoice.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].claim_id, Some(claim.id));

    let invoice = app.invoices.get_invoice(tenant, invoice.id).await.unwrap();
    assert_invoice_status(&invoice, InvoiceStatus::Paid);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_session_round_trip() {
    let (_db, app) = services().await;
    let tenant = fresh_tenant();

    let session = app
        .sessions
        .schedule(tenant, SessionBuilder::new().starting_in(Duration::hours(2)).build())
        .await
        .unwrap();
    let session = app
        .sessions
        .apply(tenant, session.id, SessionEvent::Cancel, Some("Client unwell".to_string()))
        .await
        .unwrap();
    assert_session_state(&session, SessionStatus::Cancelled);

    let reloaded = app.sessions.get(tenant, session.id).await.unwrap();
    assert_eq!(reloaded.cancellation_reason.as_deref(), Some("Client unwell"));
    app.sessions.delete(tenant, session.id).await.unwrap();
    assert!(app.sessions.get(tenant, session.id).await.is_err());
}
