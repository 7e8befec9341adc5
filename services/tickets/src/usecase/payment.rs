use std::collections::BTreeMap;

use uuid::Uuid;

use oasis_domain::payment::{PaymentMethod, PaymentStatus};
use oasis_identity::Identity;

use crate::domain::repository::{
    FileStorage, OrderRepository, PaymentGateway, PaymentRepository, TicketRenderer, UserDirectory,
};
use crate::domain::types::{
    NewPayment, Order, OutboxEvent, Payment, PreferenceItem, PreferenceRequest,
};
use crate::error::TicketsServiceError;
use crate::usecase::document::publish_tickets;
use crate::usecase::order::ensure_can_access;

/// Cheap pre-check; the repository repeats it under the order's row lock.
async fn ensure_no_active_payment<P: PaymentRepository>(
    payments: &P,
    order: &Order,
) -> Result<(), TicketsServiceError> {
    if order.tickets.is_empty() {
        return Err(TicketsServiceError::validation("order", "has no tickets"));
    }
    if let Some(current) = payments.latest_for_order(order.id).await? {
        if current.status.blocks_new_attempt() {
            return Err(TicketsServiceError::payment_blocked(current.status));
        }
    }
    Ok(())
}

/// One checkout line per event, quantity = tickets for it.
fn preference_items(order: &Order) -> Vec<PreferenceItem> {
    let mut by_event: BTreeMap<i64, PreferenceItem> = BTreeMap::new();
    for ticket in &order.tickets {
        let event = &ticket.event;
        by_event
            .entry(event.id)
            .and_modify(|item| item.quantity += 1)
            .or_insert_with(|| PreferenceItem {
                id: event.id.to_string(),
                title: format!("Admission: {}", event.event_type),
                description: format!(
                    "{} to {}",
                    event.start_at.format("%Y-%m-%d %H:%M"),
                    event.end_at.format("%H:%M")
                ),
                quantity: 1,
                unit_price: event.price,
            });
    }
    by_event.into_values().collect()
}

// ── InitiateGatewayPayment ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GatewayCheckout {
    pub redirect_url: String,
    pub payment: Payment,
}

pub struct InitiateGatewayPaymentUseCase<O, P, G>
where
    O: OrderRepository,
    P: PaymentRepository,
    G: PaymentGateway,
{
    pub orders: O,
    pub payments: P,
    pub gateway: G,
}

impl<O, P, G> InitiateGatewayPaymentUseCase<O, P, G>
where
    O: OrderRepository,
    P: PaymentRepository,
    G: PaymentGateway,
{
    /// Creates the gateway intent before the local row: a failure in between
    /// leaves an unused preference at the gateway, never a local `Created`
    /// payment with nothing behind it.
    pub async fn execute(
        &self,
        identity: &Identity,
        order_id: i64,
    ) -> Result<GatewayCheckout, TicketsServiceError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(TicketsServiceError::OrderNotFound)?;
        ensure_can_access(identity, &order)?;
        ensure_no_active_payment(&self.payments, &order).await?;

        let request = PreferenceRequest {
            order_id,
            external_reference: Uuid::new_v4().simple().to_string(),
            items: preference_items(&order),
        };
        let preference = self.gateway.create_preference(&request).await?;

        let payment = self
            .payments
            .insert(
                &NewPayment {
                    order_id,
                    user_id: identity.user_id,
                    method: PaymentMethod::Gateway,
                    amount: order.price(),
                    external_reference: preference.external_reference,
                    status: PaymentStatus::Created,
                },
                None,
            )
            .await?;
        tracing::info!(
            order_id,
            payment_id = payment.id,
            reference = %payment.external_reference,
            amount = payment.amount,
            "gateway payment initiated"
        );

        Ok(GatewayCheckout {
            redirect_url: preference.redirect_url,
            payment,
        })
    }
}

// ── RecordCashierPayment ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CashierReceipt {
    pub payment: Payment,
    pub pdf_url: String,
}

pub struct RecordCashierPaymentUseCase<O, P, U, R, S>
where
    O: OrderRepository,
    P: PaymentRepository,
    U: UserDirectory,
    R: TicketRenderer,
    S: FileStorage,
{
    pub orders: O,
    pub payments: P,
    pub users: U,
    pub renderer: R,
    pub storage: S,
    pub key_prefix: String,
}

impl<O, P, U, R, S> RecordCashierPaymentUseCase<O, P, U, R, S>
where
    O: OrderRepository,
    P: PaymentRepository,
    U: UserDirectory,
    R: TicketRenderer,
    S: FileStorage,
{
    /// Settle at the point of sale. The payment and its receipt job commit
    /// together; the PDF upload afterwards never undoes the payment.
    pub async fn execute(
        &self,
        identity: &Identity,
        order_id: i64,
    ) -> Result<CashierReceipt, TicketsServiceError> {
        if !identity.is_privileged() {
            return Err(TicketsServiceError::Forbidden);
        }
        let mut order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(TicketsServiceError::OrderNotFound)?;
        ensure_no_active_payment(&self.payments, &order).await?;

        let reference = Uuid::now_v7().simple().to_string();
        let receipt = OutboxEvent::receipt(order_id, &reference);
        let payment = self
            .payments
            .insert(
                &NewPayment {
                    order_id,
                    user_id: identity.user_id,
                    method: PaymentMethod::Cashier,
                    amount: order.price(),
                    external_reference: reference,
                    status: PaymentStatus::Approved,
                },
                Some(&receipt),
            )
            .await?;
        tracing::info!(
            order_id,
            payment_id = payment.id,
            cashier = identity.user_id,
            amount = payment.amount,
            "cashier payment recorded"
        );

        order.payment = Some(payment.clone());
        let key = format!("{}/{}.pdf", self.key_prefix, order_id);
        let pdf_url = publish_tickets(&self.users, &self.renderer, &self.storage, &order, &key)
            .await
            .inspect_err(|e| {
                tracing::error!(order_id, payment_id = payment.id, error = %e, "ticket pdf upload failed after payment");
            })?;

        Ok(CashierReceipt { payment, pdf_url })
    }
}
