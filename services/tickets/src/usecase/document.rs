use anyhow::anyhow;

use oasis_identity::Identity;

use crate::domain::repository::{FileStorage, OrderRepository, TicketRenderer, UserDirectory};
use crate::domain::types::{Contact, Order};
use crate::error::TicketsServiceError;
use crate::usecase::order::ensure_can_access;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Contact of the order's beneficiary. A missing user row is a broken
/// foreign key, not a caller error.
pub(crate) async fn client_contact<U: UserDirectory>(
    users: &U,
    order: &Order,
) -> Result<Contact, TicketsServiceError> {
    users
        .find_contact(order.client_id)
        .await?
        .ok_or_else(|| anyhow!("order {} references missing client {}", order.id, order.client_id).into())
}

/// Render the order's ticket bundle and store it under `key`.
pub(crate) async fn publish_tickets<U, R, S>(
    users: &U,
    renderer: &R,
    storage: &S,
    order: &Order,
    key: &str,
) -> Result<String, TicketsServiceError>
where
    U: UserDirectory,
    R: TicketRenderer,
    S: FileStorage,
{
    let contact = client_contact(users, order).await?;
    let pdf = renderer.render(order, &contact)?;
    storage.put(key, pdf, PDF_CONTENT_TYPE).await
}

// ── GetOrderPdf ──────────────────────────────────────────────────────────────

pub struct GetOrderPdfUseCase<O, U, R, S>
where
    O: OrderRepository,
    U: UserDirectory,
    R: TicketRenderer,
    S: FileStorage,
{
    pub orders: O,
    pub users: U,
    pub renderer: R,
    pub storage: S,
    pub key_prefix: String,
}

impl<O, U, R, S> GetOrderPdfUseCase<O, U, R, S>
where
    O: OrderRepository,
    U: UserDirectory,
    R: TicketRenderer,
    S: FileStorage,
{
    /// Only paid orders with no redeemed ticket get a printable bundle.
    pub async fn execute(&self, identity: &Identity, order_id: i64) -> Result<String, TicketsServiceError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(TicketsServiceError::OrderNotFound)?;
        ensure_can_access(identity, &order)?;
        if order.is_used() {
            return Err(TicketsServiceError::OrderUsed);
        }
        if !order.is_paid() {
            return Err(TicketsServiceError::NotPaid);
        }

        let key = format!("{}/{}/{}.pdf", self.key_prefix, order.client_id, order.id);
        let url = publish_tickets(&self.users, &self.renderer, &self.storage, &order, &key).await?;
        tracing::info!(order_id, %url, "order pdf published");
        Ok(url)
    }
}
