//! HTTP API Layer
//!
//! This crate provides the REST API for practice billing using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for invoices, payments, claims and telehealth
//! - **Middleware**: Bearer authentication, request ids, tracing, audit logging
//! - **DTOs**: Validated request bodies and flat response bodies
//! - **Error Handling**: Domain errors mapped to consistent JSON responses
//!
//! Handlers only translate HTTP to service calls; the services come from
//! the domain crates and are built over whatever store backs [`AppState`].
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let store = Arc::new(PostgresStore::new(pool));
//! let state = AppState::new(store.clone(), store, Arc::new(SystemClock), config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{Clock, HealthCheckable};
use domain_billing::{BillingStore, InvoiceService, PaymentService};
use domain_claims::{ClaimService, ClaimsStore};
use domain_telehealth::{SessionService, TelehealthStore};

use crate::config::ApiConfig;
use crate::handlers::{claims, health, invoices, payments, telehealth};
use crate::middleware::{audit_middleware, auth_middleware, MakeRequestUuidV7};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub invoices: InvoiceService,
    pub payments: PaymentService,
    pub claims: ClaimService,
    pub sessions: SessionService,
    /// Probed by the readiness endpoint
    pub health: Arc<dyn HealthCheckable>,
    pub config: ApiConfig,
}

impl AppState {
    /// Builds every service over one billing/claims store and a telehealth store
    pub fn new<S>(
        store: Arc<S>,
        telehealth_store: Arc<dyn TelehealthStore>,
        clock: Arc<dyn Clock>,
        config: ApiConfig,
    ) -> Self
    where
        S: BillingStore + ClaimsStore + 'static,
    {
        let billing: Arc<dyn BillingStore> = store.clone();
        let claims: Arc<dyn ClaimsStore> = store.clone();
        Self {
            invoices: InvoiceService::new(billing.clone(), clock.clone()),
            payments: PaymentService::new(billing, clock.clone()),
            claims: ClaimService::new(claims, clock.clone()),
            sessions: SessionService::new(telehealth_store, clock),
            health: store,
            config,
        }
    }
}

/// Creates the main API router
///
/// `/health` routes are public; everything under `/api/v1` requires a
/// bearer token.
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let invoice_routes = Router::new()
        .route("/", post(invoices::create_invoice).get(invoices::list_invoices))
        .route("/overdue-sweep", post(invoices::sweep_overdue))
        .route(
            "/:id",
            get(invoices::get_invoice)
                .patch(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route(
            "/:id/payments",
            post(payments::record_payment).get(payments::list_payments),
        );

    let payment_routes = Router::new().route("/:id", get(payments::get_payment));

    let claim_routes = Router::new()
        .route("/", post(claims::create_claim).get(claims::list_claims))
        .route(
            "/:id",
            get(claims::get_claim)
                .patch(claims::update_claim)
                .delete(claims::delete_claim),
        )
        .route("/:id/items", post(claims::add_item))
        .route("/:id/items/:item_id", axum::routing::delete(claims::remove_item));

    let session_routes = Router::new()
        .route("/", post(telehealth::schedule_session).get(telehealth::list_sessions))
        .route(
            "/:id",
            get(telehealth::get_session)
                .patch(telehealth::reschedule_session)
                .delete(telehealth::delete_session),
        )
        .route("/:id/start", post(telehealth::start_session))
        .route("/:id/complete", post(telehealth::complete_session))
        .route("/:id/cancel", post(telehealth::cancel_session))
        .route("/:id/no-show", post(telehealth::mark_no_show));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .nest("/payments", payment_routes)
        .nest("/insurance-claims", claim_routes)
        .nest("/telehealth/sessions", session_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
