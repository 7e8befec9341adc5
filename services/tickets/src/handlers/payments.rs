use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use oasis_domain::payment::{PaymentMethod, PaymentStatus};
use oasis_identity::Identity;

use crate::domain::types::Payment;
use crate::error::TicketsServiceError;
use crate::state::AppState;
use crate::usecase::payment::{InitiateGatewayPaymentUseCase, RecordCashierPaymentUseCase};
use crate::usecase::reconcile::{ReconcileOutcome, ReconcilePaymentUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub method: PaymentMethod,
    pub amount: i64,
    pub external_reference: String,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            order_id: p.order_id,
            user_id: p.user_id,
            method: p.method,
            amount: p.amount,
            external_reference: p.external_reference,
            transaction_id: p.transaction_id,
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// ── POST /orders/{id}/payments/cashier ───────────────────────────────────────

#[derive(Serialize)]
pub struct CashierPaymentResponse {
    pub payment: PaymentResponse,
    pub pdf_url: String,
}

pub async fn record_cashier_payment(
    identity: Identity,
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<(StatusCode, Json<CashierPaymentResponse>), TicketsServiceError> {
    let usecase = RecordCashierPaymentUseCase {
        orders: state.order_repo(),
        payments: state.payment_repo(),
        users: state.user_directory(),
        renderer: state.renderer.clone(),
        storage: state.storage.clone(),
        key_prefix: state.tickets_prefix.clone(),
    };
    let receipt = usecase.execute(&identity, order_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CashierPaymentResponse {
            payment: receipt.payment.into(),
            pdf_url: receipt.pdf_url,
        }),
    ))
}

// ── POST /orders/{id}/payments/gateway ───────────────────────────────────────

#[derive(Serialize)]
pub struct GatewayCheckoutResponse {
    pub redirect_url: String,
    pub payment: PaymentResponse,
}

pub async fn initiate_gateway_payment(
    identity: Identity,
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<(StatusCode, Json<GatewayCheckoutResponse>), TicketsServiceError> {
    let usecase = InitiateGatewayPaymentUseCase {
        orders: state.order_repo(),
        payments: state.payment_repo(),
        gateway: state.gateway.clone(),
    };
    let checkout = usecase.execute(&identity, order_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(GatewayCheckoutResponse {
            redirect_url: checkout.redirect_url,
            payment: checkout.payment.into(),
        }),
    ))
}

// ── POST /payments/gateway/notifications ─────────────────────────────────────

/// The gateway sends the payment id as a string or a bare number depending
/// on the notification version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GatewayPaymentId {
    Text(String),
    Number(i64),
}

impl GatewayPaymentId {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationData {
    pub id: GatewayPaymentId,
}

#[derive(Debug, Deserialize)]
pub struct GatewayNotification {
    /// Topic of the notification; only `payment` carries a payment id.
    #[serde(rename = "type", default)]
    pub topic: Option<String>,
    pub data: NotificationData,
}

/// Acknowledge every well-formed notification. The outcome only goes to the
/// log: a non-2xx answer would make the gateway redeliver forever.
pub async fn gateway_notification(
    State(state): State<AppState>,
    Json(body): Json<GatewayNotification>,
) -> StatusCode {
    if let Some(topic) = body.topic.as_deref().filter(|t| *t != "payment") {
        tracing::debug!(topic, "ignoring non-payment gateway notification");
        return StatusCode::OK;
    }
    let payment_id = body.data.id.into_string();
    if payment_id.trim().is_empty() {
        tracing::warn!("gateway notification without payment id");
        return StatusCode::OK;
    }

    let usecase = ReconcilePaymentUseCase {
        payments: state.payment_repo(),
        gateway: state.gateway.clone(),
    };
    log_reconcile_outcome(&payment_id, usecase.execute(&payment_id).await);
    StatusCode::OK
}

pub(crate) fn log_reconcile_outcome(
    gateway_payment_id: &str,
    outcome: Result<ReconcileOutcome, TicketsServiceError>,
) {
    match outcome {
        Ok(ReconcileOutcome::Applied {
            payment_id,
            order_id,
            from,
            to,
        }) => tracing::info!(
            gateway_payment_id,
            payment_id,
            order_id,
            %from,
            %to,
            "payment status reconciled"
        ),
        Ok(ReconcileOutcome::Unchanged { payment_id, status }) => tracing::info!(
            gateway_payment_id,
            payment_id,
            %status,
            "duplicate payment notification"
        ),
        Ok(ReconcileOutcome::Ignored {
            payment_id,
            from,
            to,
        }) => tracing::warn!(
            gateway_payment_id,
            payment_id,
            %from,
            %to,
            "out-of-order payment notification ignored"
        ),
        Err(e @ (TicketsServiceError::Internal(_) | TicketsServiceError::Upstream(_))) => {
            tracing::error!(gateway_payment_id, error = ?e, "payment reconciliation failed")
        }
        Err(e) => tracing::warn!(
            gateway_payment_id,
            kind = e.kind(),
            error = %e,
            "payment notification rejected"
        ),
    }
}
