//! Cross-domain workflow tests
//!
//! Billing, claims and telehealth services wired over the shared in-memory
//! stores, exercised the way the API drives them.

use chrono::{Duration, NaiveDate};
use rust_decimal_macros::dec;

use domain_billing::{BillingError, InvoiceStatus, NewPayment, PaymentMethod, UpdateInvoice};
use domain_claims::{ClaimError, ClaimStatus, UpdateClaim};
use domain_telehealth::{Reschedule, SessionEvent, SessionStatus};
use test_utils::*;

mod invoice_to_payment {
    use super::*;

    /// Two lines, sent, then settled by two payments
    #[tokio::test]
    async fn test_invoice_settled_by_payments() {
        let app = TestServices::new();

        let invoice = app
            .invoices
            .create_invoice(
                app.tenant,
                InvoiceBuilder::new()
                    .with_line("Intake assessment", dec!(1), dec!(150.00))
                    .with_line("Follow-up session", dec!(2), dec!(95.50))
                    .build(),
            )
            .await
            .unwrap();
        assert_invoice_total_matches_items(&invoice);
        assert_eq!(invoice.total_amount, dec!(341.00));
        assert_invoice_status(&invoice, InvoiceStatus::Draft);

        let invoice = app
            .invoices
            .update_invoice(
                app.tenant,
                invoice.id,
                UpdateInvoice {
                    status: Some(InvoiceStatus::Sent),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_invoice_status(&invoice, InvoiceStatus::Sent);

        let (_, invoice) = app
            .payments
            .record_payment(app.tenant, invoice.id, NewPayment::new(dec!(200.00), PaymentMethod::CreditCard))
            .await
            .unwrap();
        assert_invoice_status(&invoice, InvoiceStatus::PartiallyPaid);
        assert_invoice_paid(&invoice, dec!(200.00));

        let (_, invoice) = app
            .payments
            .record_payment(app.tenant, invoice.id, NewPayment::new(dec!(141.00), PaymentMethod::Cash))
            .await
            .unwrap();
        assert_invoice_status(&invoice, InvoiceStatus::Paid);
        assert!(invoice.balance_due().is_zero());

        let payments = app.payments.list_payments(app.tenant, invoice.id).await.unwrap();
        assert_eq!(payments.len(), 2);
    }

    /// Items can only be replaced while the invoice is a draft
    #[tokio::test]
    async fn test_items_frozen_after_send() {
        let app = TestServices::new();
        let invoice = app
            .invoices
            .create_invoice(app.tenant, InvoiceBuilder::new().with_amount(dec!(80)).build())
            .await
            .unwrap();

        let replaced = app
            .invoices
            .update_invoice(
                app.tenant,
                invoice.id,
                UpdateInvoice {
                    items: Some(InvoiceBuilder::new().with_amount(dec!(120)).build().items),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(replaced.total_amount, dec!(120));

        app.invoices
            .update_invoice(app.tenant, invoice.id, UpdateInvoice { status: Some(InvoiceStatus::Sent), ..Default::default() })
            .await
            .unwrap();

        let result = app
            .invoices
            .update_invoice(
                app.tenant,
                invoice.id,
                UpdateInvoice {
                    items: Some(InvoiceBuilder::new().with_amount(dec!(10)).build().items),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(BillingError::InvalidState(_))));
    }
}

mod overdue_sweep {
    use super::*;

    #[tokio::test]
    async fn test_sweep_marks_unpaid_sent_invoices_overdue() {
        let app = TestServices::new();

        let overdue = app
            .invoices
            .create_invoice(
                app.tenant,
                InvoiceBuilder::new()
                    .with_issue_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
                    .with_due_date(TemporalFixtures::last_month())
                    .with_amount(dec!(60))
                    .build(),
            )
            .await
            .unwrap();
        let current = app
            .invoices
            .create_invoice(app.tenant, InvoiceBuilder::new().with_amount(dec!(60)).build())
            .await
            .unwrap();
        for id in [overdue.id, current.id] {
            app.invoices
                .update_invoice(app.tenant, id, UpdateInvoice { status: Some(InvoiceStatus::Sent), ..Default::default() })
                .await
                .unwrap();
        }

        let swept = app.invoices.sweep_overdue(app.tenant).await.unwrap();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id, overdue.id);
        assert_invoice_status(&swept[0], InvoiceStatus::Overdue);

        // Past the second due date both are overdue; the first is not swept twice
        app.clock.advance(Duration::days(45));
        let swept = app.invoices.sweep_overdue(app.tenant).await.unwrap();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id, current.id);
    }

    #[tokio::test]
    async fn test_payment_on_overdue_invoice_makes_it_partially_paid() {
        let app = TestServices::new();
        let invoice = app
            .invoices
            .create_invoice(
                app.tenant,
                InvoiceBuilder::new()
                    .with_issue_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
                    .with_due_date(TemporalFixtures::last_month())
                    .with_amount(dec!(100))
                    .build(),
            )
            .await
            .unwrap();
        app.invoices
            .update_invoice(app.tenant, invoice.id, UpdateInvoice { status: Some(InvoiceStatus::Sent), ..Default::default() })
            .await
            .unwrap();
        app.invoices.sweep_overdue(app.tenant).await.unwrap();

        let (_, invoice) = app
            .payments
            .record_payment(app.tenant, invoice.id, NewPayment::new(dec!(25), PaymentMethod::Check))
            .await
            .unwrap();
        assert_invoice_status(&invoice, InvoiceStatus::PartiallyPaid);
    }
}

mod insurance_claims {
    use super::*;

    /// PENDING marks the invoice, payment settles part of it
    #[tokio::test]
    async fn test_claim_paid_with_generated_payment() {
        let app = TestServices::new();
        let invoice = app
            .invoices
            .create_invoice(
                app.tenant,
                InvoiceBuilder::new()
                    .with_line("Psychotherapy, 45 min", dec!(1), dec!(100.00))
                    .with_line("Interactive complexity", dec!(1), dec!(20.00))
                    .build(),
            )
            .await
            .unwrap();
        let session_line = invoice.items[0].id;

        let claim = app
            .claims
            .create_claim(
                app.tenant,
                ClaimBuilder::for_invoice(invoice.id)
                    .with_payer("Blue Harbor Health")
                    .with_item(session_line)
                    .pending()
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_claim_amount_matches_items(&claim);
        assert_eq!(claim.claim_amount, dec!(100.00));

        let invoice_now = app.invoices.get_invoice(app.tenant, invoice.id).await.unwrap();
        assert_invoice_status(&invoice_now, InvoiceStatus::PendingInsurance);

        let claim = app
            .claims
            .update_claim(app.tenant, claim.id, UpdateClaim::to_status(ClaimStatus::Submitted))
            .await
            .unwrap();
        assert!(claim.submitted_at.is_some());

        let claim = app
            .claims
            .update_claim(
                app.tenant,
                claim.id,
                UpdateClaim {
                    status: Some(ClaimStatus::Paid),
                    paid_amount: Some(dec!(80.00)),
                    auto_generate_payment: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(claim.paid_amount, Some(dec!(80.00)));
        assert!(claim.resolved_at.is_some());

        let payments = app.payments.list_payments(app.tenant, invoice.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].method, PaymentMethod::Insurance);
        assert_eq!(payments[0].amount, dec!(80.00));
        assert_eq!(payments[0].reference.as_deref(), Some(claim.claim_number.as_str()));

        let invoice = app.invoices.get_invoice(app.tenant, invoice.id).await.unwrap();
        assert_invoice_status(&invoice, InvoiceStatus::PartiallyPaid);
        assert_invoice_paid(&invoice, dec!(80.00));
    }

    #[tokio::test]
    async fn test_denied_claim_marks_invoice() {
        let app = TestServices::new();
        let invoice = app
            .invoices
            .create_invoice(app.tenant, InvoiceBuilder::new().with_amount(dec!(140)).build())
            .await
            .unwrap();
        let claim = app
            .claims
            .create_claim(app.tenant, ClaimBuilder::for_invoice(invoice.id).with_item(invoice.items[0].id).build())
            .await
            .unwrap();

        app.claims
            .update_claim(app.tenant, claim.id, UpdateClaim::to_status(ClaimStatus::Submitted))
            .await
            .unwrap();
        let claim = app
            .claims
            .update_claim(app.tenant, claim.id, UpdateClaim::to_status(ClaimStatus::Denied))
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Denied);

        let invoice = app.invoices.get_invoice(app.tenant, invoice.id).await.unwrap();
        assert_invoice_status(&invoice, InvoiceStatus::InsuranceDenied);
        assert!(app.payments.list_payments(app.tenant, invoice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paid_claim_cannot_be_denied() {
        let app = TestServices::new();
        let invoice = app
            .invoices
            .create_invoice(app.tenant, InvoiceBuilder::new().with_amount(dec!(90)).build())
            .await
            .unwrap();
        let claim = app
            .claims
            .create_claim(app.tenant, ClaimBuilder::for_invoice(invoice.id).with_item(invoice.items[0].id).build())
            .await
            .unwrap();
        for status in [ClaimStatus::Submitted, ClaimStatus::Paid] {
            app.claims
                .update_claim(app.tenant, claim.id, UpdateClaim::to_status(status))
                .await
                .unwrap();
        }

        let result = app
            .claims
            .update_claim(app.tenant, claim.id, UpdateClaim::to_status(ClaimStatus::Denied))
            .await;
        assert!(matches!(
            result,
            Err(ClaimError::InvalidTransition { from: ClaimStatus::Paid, .. })
        ));
    }

    #[tokio::test]
    async fn test_partial_item_amount_over_line_total_rejected() {
        let app = TestServices::new();
        let invoice = app
            .invoices
            .create_invoice(app.tenant, InvoiceBuilder::new().with_amount(dec!(50)).build())
            .await
            .unwrap();

        let result = app
            .claims
            .create_claim(
                app.tenant,
                ClaimBuilder::for_invoice(invoice.id)
                    .with_partial_item(invoice.items[0].id, dec!(50.01))
                    .build(),
            )
            .await;
        assert!(matches!(result, Err(ClaimError::Validation(_))));
    }

    #[tokio::test]
    async fn test_claims_are_tenant_scoped() {
        let app = TestServices::new();
        let invoice = app
            .invoices
            .create_invoice(app.tenant, InvoiceBuilder::new().with_amount(dec!(75)).build())
            .await
            .unwrap();

        let result = app
            .claims
            .create_claim(IdFixtures::other_tenant(), ClaimBuilder::for_invoice(invoice.id).build())
            .await;
        assert!(result.is_err());
        assert!(app.store.snapshot().await.claims.is_empty());
    }
}

mod telehealth_sessions {
    use super::*;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = TestServices::new();
        let session = app.sessions.schedule(app.tenant, SessionBuilder::new().build()).await.unwrap();
        assert_session_state(&session, SessionStatus::Scheduled);

        let session = app
            .sessions
            .reschedule(
                app.tenant,
                session.id,
                Reschedule {
                    duration_minutes: Some(80),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(session.scheduled_end() - session.scheduled_start, Duration::minutes(80));

        let session = app.sessions.apply(app.tenant, session.id, SessionEvent::Start, None).await.unwrap();
        assert_session_state(&session, SessionStatus::InProgress);

        app.clock.advance(Duration::minutes(80));
        let session = app.sessions.apply(app.tenant, session.id, SessionEvent::Complete, None).await.unwrap();
        assert_session_state(&session, SessionStatus::Completed);

        let result = app.sessions.apply(app.tenant, session.id, SessionEvent::Cancel, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_no_show_cannot_be_deleted() {
        let app = TestServices::new();
        let session = app
            .sessions
            .schedule(app.tenant, SessionBuilder::new().starting_in(Duration::days(1)).build())
            .await
            .unwrap();
        app.sessions
            .apply(app.tenant, session.id, SessionEvent::MarkNoShow, None)
            .await
            .unwrap();

        assert!(app.sessions.delete(app.tenant, session.id).await.is_err());
        assert_eq!(app.session_store.len().await, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_duration_rejected() {
        let app = TestServices::new();
        let result = app.sessions.schedule(app.tenant, SessionBuilder::new().with_duration(481).build()).await;
        assert!(result.is_err());
        assert_eq!(app.session_store.len().await, 0);
    }
}
