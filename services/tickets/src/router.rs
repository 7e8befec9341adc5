use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use oasis_core::health::healthz;
use oasis_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    events::{create_events, get_event, list_events},
    health::readyz,
    orders::{
        create_order, get_order, get_order_by_reference, get_order_by_transaction, get_order_pdf,
        list_orders, update_order, use_order,
    },
    payments::{gateway_notification, initiate_gateway_payment, record_cashier_payment},
    summaries::{get_cashier_summary, get_sales_summary},
    tickets::{
        delete_ticket, get_ticket, get_ticket_by_uuid, list_tickets, update_ticket_event,
        use_ticket,
    },
};
use crate::infra::gateway::NOTIFICATION_PATH;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Events
        .route("/events", post(create_events))
        .route("/events", get(list_events))
        .route("/events/{id}", get(get_event))
        // Orders
        .route("/orders", post(create_order))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}", patch(update_order))
        .route("/orders/{id}/use", post(use_order))
        .route("/orders/{id}/pdf", get(get_order_pdf))
        .route("/orders/by-reference/{reference}", get(get_order_by_reference))
        .route(
            "/orders/by-transaction/{transaction_id}",
            get(get_order_by_transaction),
        )
        // Payments
        .route("/orders/{id}/payments/cashier", post(record_cashier_payment))
        .route("/orders/{id}/payments/gateway", post(initiate_gateway_payment))
        .route(NOTIFICATION_PATH, post(gateway_notification))
        // Tickets
        .route("/tickets", get(list_tickets))
        .route("/tickets/{id}", get(get_ticket))
        .route("/tickets/{id}", patch(update_ticket_event))
        .route("/tickets/{id}", delete(delete_ticket))
        .route("/tickets/{id}/use", post(use_ticket))
        .route("/tickets/uuid/{uuid}", get(get_ticket_by_uuid))
        // Summaries
        .route("/summaries/sales", get(get_sales_summary))
        .route("/summaries/cashiers", get(get_cashier_summary))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
