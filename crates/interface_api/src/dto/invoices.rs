//! Invoice DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ClientId, Currency, InvoiceId, InvoiceItemId, Page, Patch};
use domain_billing::{Invoice, InvoiceItem, InvoiceQuery, InvoiceStatus, NewInvoice, NewInvoiceItem, UpdateInvoice};

use super::{non_negative, valid_quantity};

#[derive(Debug, Deserialize, Validate)]
pub struct InvoiceItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(length(max = 50))]
    pub service_code: Option<String>,
    #[validate(custom(function = "valid_quantity"))]
    pub quantity: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub unit_price: Decimal,
}

impl From<InvoiceItemRequest> for NewInvoiceItem {
    fn from(req: InvoiceItemRequest) -> Self {
        NewInvoiceItem {
            description: req.description,
            service_code: req.service_code,
            quantity: req.quantity,
            unit_price: req.unit_price,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub client_id: ClientId,
    /// Generated from the clock when absent
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub currency: Option<Currency>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<InvoiceItemRequest>,
}

impl From<CreateInvoiceRequest> for NewInvoice {
    fn from(req: CreateInvoiceRequest) -> Self {
        NewInvoice {
            client_id: req.client_id,
            invoice_number: req.invoice_number,
            issue_date: req.issue_date,
            due_date: req.due_date,
            currency: req.currency.unwrap_or_default(),
            notes: req.notes,
            items: req.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Partial update; `notes: null` clears the notes
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Patch<String>,
    #[validate(nested)]
    pub items: Option<Vec<InvoiceItemRequest>>,
    pub status: Option<InvoiceStatus>,
}

impl From<UpdateInvoiceRequest> for UpdateInvoice {
    fn from(req: UpdateInvoiceRequest) -> Self {
        UpdateInvoice {
            due_date: req.due_date,
            notes: req.notes,
            items: req
                .items
                .map(|items| items.into_iter().map(Into::into).collect()),
            status: req.status,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesParams {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<ClientId>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListInvoicesParams> for InvoiceQuery {
    fn from(params: ListInvoicesParams) -> Self {
        InvoiceQuery {
            status: params.status,
            client_id: params.client_id,
            due_before: None,
            page: Some(Page::new(params.limit, params.offset)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceItemResponse {
    pub id: InvoiceItemId,
    pub description: String,
    pub service_code: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<InvoiceItem> for InvoiceItemResponse {
    fn from(item: InvoiceItem) -> Self {
        Self {
            id: item.id,
            description: item.description,
            service_code: item.service_code,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: InvoiceId,
    pub client_id: ClientId,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub items: Vec<InvoiceItemResponse>,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        let balance_due = invoice.balance_due().amount();
        Self {
            id: invoice.id,
            client_id: invoice.client_id,
            invoice_number: invoice.invoice_number,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            currency: invoice.currency,
            items: invoice.items.into_iter().map(Into::into).collect(),
            total_amount: invoice.total_amount,
            amount_paid: invoice.amount_paid,
            balance_due,
            status: invoice.status,
            notes: invoice.notes,
            version: invoice.version,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

/// Result of the overdue sweep
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub updated: usize,
    pub invoices: Vec<InvoiceResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_quantity_fails_validation() {
        let req: CreateInvoiceRequest = serde_json::from_value(serde_json::json!({
            "client_id": "4",
            "due_date": "2024-06-01",
            "items": [{ "description": "Session", "quantity": "-1", "unit_price": "80.00" }]
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let cleared: UpdateInvoiceRequest =
            serde_json::from_value(serde_json::json!({ "notes": null })).unwrap();
        let untouched: UpdateInvoiceRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cleared.notes, Patch::Clear);
        assert_eq!(untouched.notes, Patch::Unchanged);
    }
}
