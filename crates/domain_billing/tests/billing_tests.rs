//! Integration tests for domain_billing against the in-memory store

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Clock, ClientId, Currency, FixedClock, MoneyError, Patch, TenantId, MAX_AMOUNT};
use domain_billing::ports::mock::MemoryBillingStore;
use domain_billing::{
    reconcile_status, BillingError, BillingStore, BillingTx, InvoiceQuery, InvoiceService, InvoiceStatus, NewInvoice,
    NewInvoiceItem, NewPayment, PaymentMethod, PaymentService, UpdateInvoice,
};

const TENANT: TenantId = TenantId::new(1);

static SEQUENCE: AtomicU32 = AtomicU32::new(1);

struct Harness {
    invoices: InvoiceService,
    payments: PaymentService,
    clock: Arc<FixedClock>,
    store: Arc<MemoryBillingStore>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryBillingStore::new());
    let clock = Arc::new(FixedClock::at_date(date(2024, 3, 1)));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    Harness {
        invoices: InvoiceService::new(store.clone(), dyn_clock.clone()),
        payments: PaymentService::new(store.clone(), dyn_clock),
        clock,
        store,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn invoice_for(total: Decimal) -> NewInvoice {
    NewInvoice {
        client_id: ClientId::new(42),
        // generated numbers collide under a fixed clock
        invoice_number: Some(format!("T-{:04}", SEQUENCE.fetch_add(1, Ordering::Relaxed))),
        issue_date: None,
        due_date: date(2024, 3, 31),
        currency: Currency::USD,
        notes: None,
        items: vec![NewInvoiceItem::new("Initial assessment", dec!(1), total)],
    }
}

fn send() -> UpdateInvoice {
    UpdateInvoice {
        status: Some(InvoiceStatus::Sent),
        ..Default::default()
    }
}

// ============================================================================
// Reconciliation properties
// ============================================================================

proptest! {
    #[test]
    fn prop_paid_when_payments_cover_total(
        total in 1i64..10_000_000i64,
        extra in 0i64..10_000_000i64,
    ) {
        let total = Decimal::new(total, 2);
        let paid = total + Decimal::new(extra, 2);
        for current in InvoiceStatus::ALL {
            let status = reconcile_status(total, paid, current, date(2024, 1, 1), date(2024, 6, 1));
            prop_assert_eq!(status, InvoiceStatus::Paid);
        }
    }

    #[test]
    fn prop_partially_paid_when_payments_fall_short(
        (total, paid) in (2i64..10_000_000i64).prop_flat_map(|t| (Just(t), 1..t)),
    ) {
        let status = reconcile_status(
            Decimal::new(total, 2),
            Decimal::new(paid, 2),
            InvoiceStatus::Sent,
            date(2024, 1, 1),
            date(2024, 6, 1),
        );
        prop_assert_eq!(status, InvoiceStatus::PartiallyPaid);
    }
}

// ============================================================================
// Invoice tests
// ============================================================================

mod invoice_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_computes_total_and_starts_draft() {
        let h = harness();
        let mut cmd = invoice_for(dec!(0));
        cmd.invoice_number = None;
        cmd.items = vec![
            NewInvoiceItem::new("Therapy session", dec!(2), dec!(75.50)).with_service_code("90834"),
            NewInvoiceItem::new("Intake forms", dec!(1), dec!(10)),
        ];

        let invoice = h.invoices.create_invoice(TENANT, cmd).await.unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.total_amount, dec!(161.00));
        assert_eq!(invoice.amount_paid, Decimal::ZERO);
        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.items[0].line_total, dec!(151.00));
        assert_eq!(invoice.issue_date, date(2024, 3, 1));
        assert!(invoice.invoice_number.starts_with("INV-"));
    }

    #[tokio::test]
    async fn test_create_rejects_due_before_issue() {
        let h = harness();
        let mut cmd = invoice_for(dec!(10));
        cmd.due_date = date(2024, 2, 1);
        let err = h.invoices.create_invoice(TENANT, cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_line_total_out_of_range() {
        let h = harness();
        let mut cmd = invoice_for(dec!(0));
        cmd.items = vec![NewInvoiceItem::new("Therapy session", dec!(1000), MAX_AMOUNT)];

        let err = h.invoices.create_invoice(TENANT, cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::Money(MoneyError::Overflow(_))));
        assert!(h.store.snapshot().await.invoices.is_empty());

        let mut cmd = invoice_for(dec!(0));
        cmd.items = vec![NewInvoiceItem::new("Therapy session", Decimal::MAX, dec!(2))];
        let err = h.invoices.create_invoice(TENANT, cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_total_out_of_range() {
        let h = harness();
        let mut cmd = invoice_for(dec!(0));
        cmd.items = vec![
            NewInvoiceItem::new("Group program", dec!(1), dec!(600000000000.00)),
            NewInvoiceItem::new("Group program", dec!(1), dec!(600000000000.00)),
        ];

        let err = h.invoices.create_invoice(TENANT, cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::Money(MoneyError::Overflow(_))));
    }

    #[tokio::test]
    async fn test_replacing_items_out_of_range_is_rejected() {
        let h = harness();
        let invoice = h.invoices.create_invoice(TENANT, invoice_for(dec!(10))).await.unwrap();

        let err = h
            .invoices
            .update_invoice(
                TENANT,
                invoice.id,
                UpdateInvoice {
                    items: Some(vec![NewInvoiceItem::new("Visit", dec!(10), MAX_AMOUNT)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Money(MoneyError::Overflow(_))));

        let err = h
            .invoices
            .update_invoice(
                TENANT,
                invoice.id,
                UpdateInvoice {
                    items: Some(vec![
                        NewInvoiceItem::new("Visit", dec!(1), MAX_AMOUNT),
                        NewInvoiceItem::new("Visit", dec!(1), MAX_AMOUNT),
                    ]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Money(MoneyError::Overflow(_))));

        let stored = h.invoices.get_invoice(TENANT, invoice.id).await.unwrap();
        assert_eq!(stored.total_amount, dec!(10));
        assert_eq!(stored.items.len(), 1);
    }

    #[tokio::test]
    async fn test_saving_stale_copy_conflicts() {
        let h = harness();
        let invoice = h.invoices.create_invoice(TENANT, invoice_for(dec!(10))).await.unwrap();
        let stale = h.invoices.get_invoice(TENANT, invoice.id).await.unwrap();
        h.invoices.update_invoice(TENANT, invoice.id, send()).await.unwrap();

        let mut tx = h.store.begin().await.unwrap();
        let err = BillingError::from(tx.save_invoice(&stale).await.unwrap_err());
        assert!(matches!(err, BillingError::Conflict(_)));

        let current = tx.get_invoice(TENANT, invoice.id).await.unwrap();
        assert_eq!(current.version, stale.version + 1);
        let saved = tx.save_invoice(&current).await.unwrap();
        assert_eq!(saved.version, current.version + 1);
        let err = BillingError::from(tx.save_invoice(&current).await.unwrap_err());
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_conflicts() {
        let h = harness();
        let mut cmd = invoice_for(dec!(10));
        cmd.invoice_number = Some("A-1".into());
        h.invoices.create_invoice(TENANT, cmd.clone()).await.unwrap();
        let err = h.invoices.create_invoice(TENANT, cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_replace_items_only_while_draft() {
        let h = harness();
        let invoice = h.invoices.create_invoice(TENANT, invoice_for(dec!(10))).await.unwrap();

        let replaced = h
            .invoices
            .update_invoice(
                TENANT,
                invoice.id,
                UpdateInvoice {
                    items: Some(vec![NewInvoiceItem::new("Group session", dec!(3), dec!(40))]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(replaced.total_amount, dec!(120.00));
        assert_eq!(replaced.items.len(), 1);

        h.invoices.update_invoice(TENANT, invoice.id, send()).await.unwrap();
        let err = h
            .invoices
            .update_invoice(
                TENANT,
                invoice.id,
                UpdateInvoice {
                    items: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_notes_patch_sets_and_clears() {
        let h = harness();
        let invoice = h.invoices.create_invoice(TENANT, invoice_for(dec!(10))).await.unwrap();

        let set = h
            .invoices
            .update_invoice(
                TENANT,
                invoice.id,
                UpdateInvoice {
                    notes: Patch::Set("Sliding scale".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(set.notes.as_deref(), Some("Sliding scale"));

        let untouched = h
            .invoices
            .update_invoice(TENANT, invoice.id, UpdateInvoice::default())
            .await
            .unwrap();
        assert_eq!(untouched.notes.as_deref(), Some("Sliding scale"));

        let cleared = h
            .invoices
            .update_invoice(
                TENANT,
                invoice.id,
                UpdateInvoice {
                    notes: Patch::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.notes, None);
        assert_eq!(cleared.version, invoice.version + 3);
    }

    #[tokio::test]
    async fn test_manual_move_to_paid_is_rejected() {
        let h = harness();
        let invoice = h.invoices.create_invoice(TENANT, invoice_for(dec!(10))).await.unwrap();
        let err = h
            .invoices
            .update_invoice(
                TENANT,
                invoice.id,
                UpdateInvoice {
                    status: Some(InvoiceStatus::Paid),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let h = harness();
        let draft = h.invoices.create_invoice(TENANT, invoice_for(dec!(10))).await.unwrap();
        h.invoices.delete_invoice(TENANT, draft.id).await.unwrap();
        assert!(h.invoices.get_invoice(TENANT, draft.id).await.is_err());

        let sent = h.invoices.create_invoice(TENANT, invoice_for(dec!(10))).await.unwrap();
        h.invoices.update_invoice(TENANT, sent.id, send()).await.unwrap();
        let err = h.invoices.delete_invoice(TENANT, sent.id).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_overdue_sweep_only_touches_sent_unpaid_past_due() {
        let h = harness();
        let sent = h.invoices.create_invoice(TENANT, invoice_for(dec!(100))).await.unwrap();
        h.invoices.update_invoice(TENANT, sent.id, send()).await.unwrap();

        let draft = h.invoices.create_invoice(TENANT, invoice_for(dec!(100))).await.unwrap();

        let partial = h.invoices.create_invoice(TENANT, invoice_for(dec!(100))).await.unwrap();
        h.invoices.update_invoice(TENANT, partial.id, send()).await.unwrap();
        h.payments
            .record_payment(TENANT, partial.id, NewPayment::new(dec!(10), PaymentMethod::Cash))
            .await
            .unwrap();

        assert!(h.invoices.sweep_overdue(TENANT).await.unwrap().is_empty());

        h.clock.advance(Duration::days(31));
        let changed = h.invoices.sweep_overdue(TENANT).await.unwrap();

        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, sent.id);
        assert_eq!(changed[0].status, InvoiceStatus::Overdue);
        assert_eq!(
            h.invoices.get_invoice(TENANT, draft.id).await.unwrap().status,
            InvoiceStatus::Draft
        );
        assert_eq!(
            h.invoices.get_invoice(TENANT, partial.id).await.unwrap().status,
            InvoiceStatus::PartiallyPaid
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let h = harness();
        let a = h.invoices.create_invoice(TENANT, invoice_for(dec!(10))).await.unwrap();
        h.invoices.create_invoice(TENANT, invoice_for(dec!(20))).await.unwrap();
        h.invoices.update_invoice(TENANT, a.id, send()).await.unwrap();

        let sent = h
            .invoices
            .list_invoices(TENANT, InvoiceQuery::by_status(InvoiceStatus::Sent))
            .await
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, a.id);

        let all = h.invoices.list_invoices(TENANT, InvoiceQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}

// ============================================================================
// Payment tests
// ============================================================================

mod payment_tests {
    use super::*;

    #[tokio::test]
    async fn test_forty_then_sixty_pays_invoice() {
        let h = harness();
        let invoice = h.invoices.create_invoice(TENANT, invoice_for(dec!(100.00))).await.unwrap();
        h.invoices.update_invoice(TENANT, invoice.id, send()).await.unwrap();

        let (_, after_first) = h
            .payments
            .record_payment(TENANT, invoice.id, NewPayment::new(dec!(40.00), PaymentMethod::CreditCard))
            .await
            .unwrap();
        assert_eq!(after_first.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(after_first.amount_paid, dec!(40.00));

        let (_, after_second) = h
            .payments
            .record_payment(TENANT, invoice.id, NewPayment::new(dec!(60.00), PaymentMethod::Check))
            .await
            .unwrap();
        assert_eq!(after_second.status, InvoiceStatus::Paid);
        assert_eq!(after_second.amount_paid, dec!(100.00));

        let payments = h.payments.list_payments(TENANT, invoice.id).await.unwrap();
        assert_eq!(payments.len(), 2);
    }

    #[tokio::test]
    async fn test_get_payment() {
        let h = harness();
        let invoice = h.invoices.create_invoice(TENANT, invoice_for(dec!(50))).await.unwrap();
        let (payment, _) = h
            .payments
            .record_payment(
                TENANT,
                invoice.id,
                NewPayment::new(dec!(50), PaymentMethod::BankTransfer).with_reference("WIRE-9"),
            )
            .await
            .unwrap();

        let fetched = h.payments.get_payment(TENANT, payment.id).await.unwrap();
        assert_eq!(fetched, payment);
        assert_eq!(fetched.reference.as_deref(), Some("WIRE-9"));
        assert_eq!(fetched.claim_id, None);
    }

    #[tokio::test]
    async fn test_payment_beyond_storable_range_is_rejected() {
        let h = harness();
        let invoice = h.invoices.create_invoice(TENANT, invoice_for(dec!(100.00))).await.unwrap();

        let err = h
            .payments
            .record_payment(TENANT, invoice.id, NewPayment::new(Decimal::MAX, PaymentMethod::Check))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Money(MoneyError::Overflow(_))));

        let large = dec!(999999999999.00);
        h.payments
            .record_payment(TENANT, invoice.id, NewPayment::new(large, PaymentMethod::Check))
            .await
            .unwrap();
        let err = h
            .payments
            .record_payment(TENANT, invoice.id, NewPayment::new(large, PaymentMethod::Check))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Money(MoneyError::Overflow(_))));

        let stored = h.invoices.get_invoice(TENANT, invoice.id).await.unwrap();
        assert_eq!(stored.amount_paid, large);
        assert_eq!(h.payments.list_payments(TENANT, invoice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_payment_for_unknown_invoice_is_not_found() {
        let h = harness();
        let err = h
            .payments
            .record_payment(TENANT, core_kernel::InvoiceId::new(999), NewPayment::new(dec!(1), PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
        assert!(h.store.snapshot().await.payments.is_empty());
    }
}
