use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use oasis_domain::payment::PaymentStatus;

/// Tickets service domain error variants.
///
/// Every state-machine rejection has its own kind so clients can tell a
/// not-paid ticket from one whose event has not started or already finished.
#[derive(Debug, thiserror::Error)]
pub enum TicketsServiceError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("forbidden")]
    Forbidden,
    #[error("event not found")]
    EventNotFound,
    #[error("order not found")]
    OrderNotFound,
    #[error("ticket not found")]
    TicketNotFound,
    #[error("payment not found")]
    PaymentNotFound,
    #[error("no sales recorded")]
    NoSales,
    #[error("event has already ended")]
    EventExpired,
    #[error("ticket already used")]
    AlreadyUsed,
    #[error("order already used")]
    OrderUsed,
    #[error("order not paid")]
    NotPaid,
    #[error("event has not started")]
    EventNotStarted,
    #[error("event has finished")]
    EventFinished,
    #[error("order already paid")]
    AlreadyPaid,
    #[error("payment in process")]
    PaymentProcessing,
    #[error("unknown gateway status: {0}")]
    UnknownGatewayStatus(String),
    #[error("upstream service error")]
    Upstream(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl TicketsServiceError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Wrap a gateway / storage / mail / PDF failure.
    pub fn upstream(err: impl Into<anyhow::Error>) -> Self {
        Self::Upstream(err.into())
    }

    /// Conflict raised when the order's current payment blocks a new attempt.
    pub fn payment_blocked(current: PaymentStatus) -> Self {
        match current {
            PaymentStatus::Processing => Self::PaymentProcessing,
            _ => Self::AlreadyPaid,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION",
            Self::Forbidden => "FORBIDDEN",
            Self::EventNotFound => "EVENT_NOT_FOUND",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::TicketNotFound => "TICKET_NOT_FOUND",
            Self::PaymentNotFound => "PAYMENT_NOT_FOUND",
            Self::NoSales => "NO_SALES",
            Self::EventExpired => "EVENT_EXPIRED",
            Self::AlreadyUsed => "ALREADY_USED",
            Self::OrderUsed => "ORDER_USED",
            Self::NotPaid => "NOT_PAID",
            Self::EventNotStarted => "EVENT_NOT_STARTED",
            Self::EventFinished => "EVENT_FINISHED",
            Self::AlreadyPaid => "ALREADY_PAID",
            Self::PaymentProcessing => "PAYMENT_PROCESSING",
            Self::UnknownGatewayStatus(_) => "UNKNOWN_GATEWAY_STATUS",
            Self::Upstream(_) => "UPSTREAM",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::EventNotFound
            | Self::OrderNotFound
            | Self::TicketNotFound
            | Self::PaymentNotFound
            | Self::NoSales => StatusCode::NOT_FOUND,
            Self::EventExpired
            | Self::AlreadyUsed
            | Self::OrderUsed
            | Self::NotPaid
            | Self::EventNotStarted
            | Self::EventFinished
            | Self::AlreadyPaid
            | Self::PaymentProcessing => StatusCode::CONFLICT,
            Self::UnknownGatewayStatus(_) | Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TicketsServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Log 5xx only. TraceLayer already records method/uri/status for every
        // request; the anyhow chain is what makes the root cause traceable.
        match &self {
            Self::Internal(e) => tracing::error!(error = ?e, kind = "INTERNAL", "internal error"),
            Self::Upstream(e) => tracing::error!(error = ?e, kind = "UPSTREAM", "upstream error"),
            _ => {}
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
