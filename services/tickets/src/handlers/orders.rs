use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oasis_domain::payment::PaymentStatus;
use oasis_identity::Identity;

use crate::domain::types::{Order, OrderFilter};
use crate::error::TicketsServiceError;
use crate::handlers::payments::PaymentResponse;
use crate::handlers::tickets::{ChangeEventRequest, TicketResponse};
use crate::handlers::{day_end, day_start, page, parse_query};
use crate::state::AppState;
use crate::usecase::document::GetOrderPdfUseCase;
use crate::usecase::order::{
    CreateOrderInput, CreateOrderUseCase, FindOrderUseCase, GetOrderUseCase, ListOrdersUseCase,
    OrderLookup, UpdateOrderUseCase,
};
use crate::usecase::redemption::UseOrderUseCase;

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub client_id: i64,
    /// Sum of the ticket event prices.
    pub price: i64,
    pub paid: bool,
    pub used: bool,
    pub payment_status: Option<PaymentStatus>,
    pub payment: Option<PaymentResponse>,
    pub tickets: Vec<TicketResponse>,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let price = order.price();
        let paid = order.is_paid();
        let used = order.is_used();
        let payment_status = order.payment_status();
        let tickets = order
            .tickets
            .into_iter()
            .map(|t| TicketResponse::new(t, order.payment.as_ref()))
            .collect();
        Self {
            id: order.id,
            user_id: order.user_id,
            client_id: order.client_id,
            price,
            paid,
            used,
            payment_status,
            payment: order.payment.map(PaymentResponse::from),
            tickets,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// ── POST /orders ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub client_id: Option<i64>,
    /// One entry per ticket.
    pub event_ids: Vec<i64>,
}

pub async fn create_order(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), TicketsServiceError> {
    let usecase = CreateOrderUseCase {
        orders: state.order_repo(),
        events: state.event_repo(),
        users: state.user_directory(),
        clock: state.clock(),
    };
    let order = usecase
        .execute(
            &identity,
            CreateOrderInput {
                client_id: body.client_id,
                event_ids: body.event_ids,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

// ── GET /orders ──────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct OrderListQuery {
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub event_from: Option<NaiveDate>,
    pub event_to: Option<NaiveDate>,
    #[serde(default)]
    pub user_ids: Vec<i64>,
    #[serde(default)]
    pub client_ids: Vec<i64>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

pub async fn list_orders(
    identity: Identity,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<OrderResponse>>, TicketsServiceError> {
    let query: OrderListQuery = parse_query(raw_query.as_deref())?;
    let filter = OrderFilter {
        created_from: query.created_from.map(day_start),
        created_to: query.created_to.map(day_end),
        event_from: query.event_from.map(day_start),
        event_to: query.event_to.map(day_end),
        user_ids: query.user_ids,
        client_ids: query.client_ids,
    };
    let usecase = ListOrdersUseCase {
        orders: state.order_repo(),
    };
    let orders = usecase
        .execute(&identity, filter, page(query.per_page, query.page))
        .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

// ── GET /orders/{id} ─────────────────────────────────────────────────────────

pub async fn get_order(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, TicketsServiceError> {
    let usecase = GetOrderUseCase {
        orders: state.order_repo(),
    };
    let order = usecase.execute(&identity, id).await?;
    Ok(Json(order.into()))
}

// ── GET /orders/by-reference/{reference} ─────────────────────────────────────

pub async fn get_order_by_reference(
    identity: Identity,
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<OrderResponse>, TicketsServiceError> {
    let usecase = FindOrderUseCase {
        orders: state.order_repo(),
    };
    let order = usecase
        .execute(&identity, OrderLookup::ExternalReference(reference))
        .await?;
    Ok(Json(order.into()))
}

// ── GET /orders/by-transaction/{transaction_id} ──────────────────────────────

pub async fn get_order_by_transaction(
    identity: Identity,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<OrderResponse>, TicketsServiceError> {
    let usecase = FindOrderUseCase {
        orders: state.order_repo(),
    };
    let order = usecase
        .execute(&identity, OrderLookup::TransactionId(transaction_id))
        .await?;
    Ok(Json(order.into()))
}

// ── PATCH /orders/{id} ───────────────────────────────────────────────────────

pub async fn update_order(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ChangeEventRequest>,
) -> Result<Json<OrderResponse>, TicketsServiceError> {
    let usecase = UpdateOrderUseCase {
        orders: state.order_repo(),
        events: state.event_repo(),
        clock: state.clock(),
    };
    let order = usecase.execute(&identity, id, body.event_id).await?;
    Ok(Json(order.into()))
}

// ── POST /orders/{id}/use ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UseOrderResponse {
    pub redeemed_ticket_ids: Vec<i64>,
}

pub async fn use_order(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UseOrderResponse>, TicketsServiceError> {
    let usecase = UseOrderUseCase {
        orders: state.order_repo(),
        tickets: state.ticket_repo(),
        clock: state.clock(),
    };
    let redeemed_ticket_ids = usecase.execute(&identity, id).await?;
    Ok(Json(UseOrderResponse {
        redeemed_ticket_ids,
    }))
}

// ── GET /orders/{id}/pdf ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PdfResponse {
    pub url: String,
}

pub async fn get_order_pdf(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PdfResponse>, TicketsServiceError> {
    let usecase = GetOrderPdfUseCase {
        orders: state.order_repo(),
        users: state.user_directory(),
        renderer: state.renderer.clone(),
        storage: state.storage.clone(),
        key_prefix: state.orders_prefix.clone(),
    };
    let url = usecase.execute(&identity, id).await?;
    Ok(Json(PdfResponse { url }))
}
