use chrono::{DateTime, Duration, Utc};

use oasis_domain::payment::PaymentStatus;

use crate::domain::repository::{
    Mailer, OrderRepository, OutboxRepository, PaymentRepository, TicketRenderer, UserDirectory,
};
use crate::domain::types::{
    MAX_OUTBOX_ATTEMPTS, OUTBOX_BASE_BACKOFF_SECS, OUTBOX_MAX_BACKOFF_SECS, PendingOutboxEvent,
    RECEIPT_EVENT_KIND, ReceiptEmail, ReceiptPayload,
};
use crate::error::TicketsServiceError;
use crate::usecase::document::client_contact;

/// Delay before retrying a row that has already failed `prior_attempts` times.
pub fn retry_delay(prior_attempts: i32) -> Duration {
    let exp = prior_attempts.clamp(0, 20) as u32;
    let secs = OUTBOX_BASE_BACKOFF_SECS.saturating_mul(1_i64 << exp);
    Duration::seconds(secs.min(OUTBOX_MAX_BACKOFF_SECS))
}

// ── DeliverReceipt ───────────────────────────────────────────────────────────

pub struct DeliverReceiptUseCase<O, P, U, R, M>
where
    O: OrderRepository,
    P: PaymentRepository,
    U: UserDirectory,
    R: TicketRenderer,
    M: Mailer,
{
    pub orders: O,
    pub payments: P,
    pub users: U,
    pub renderer: R,
    pub mailer: M,
}

impl<O, P, U, R, M> DeliverReceiptUseCase<O, P, U, R, M>
where
    O: OrderRepository,
    P: PaymentRepository,
    U: UserDirectory,
    R: TicketRenderer,
    M: Mailer,
{
    /// Render the tickets and mail them to the client. Returns `false` when
    /// the payment is no longer approved and nothing was sent.
    pub async fn execute(&self, payload: &ReceiptPayload) -> Result<bool, TicketsServiceError> {
        let payment = self
            .payments
            .find_by_external_reference(&payload.external_reference)
            .await?
            .ok_or(TicketsServiceError::PaymentNotFound)?;
        if payment.status != PaymentStatus::Approved {
            tracing::info!(
                order_id = payload.order_id,
                status = %payment.status,
                "payment no longer approved, receipt skipped"
            );
            return Ok(false);
        }

        let mut order = self
            .orders
            .find_by_id(payload.order_id)
            .await?
            .ok_or(TicketsServiceError::OrderNotFound)?;
        let contact = client_contact(&self.users, &order).await?;
        let total = payment.amount;
        let payment_method = payment.method;
        order.payment = Some(payment);
        let pdf = self.renderer.render(&order, &contact)?;

        self.mailer
            .send_receipt(&ReceiptEmail {
                to_email: contact.email.clone(),
                to_name: contact.full_name(),
                order_id: order.id,
                payment_method,
                total,
                pdf,
            })
            .await?;
        Ok(true)
    }
}

// ── ProcessReceiptOutbox ─────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutboxBatchReport {
    pub delivered: usize,
    pub retried: usize,
    pub failed: usize,
}

pub struct ProcessReceiptOutboxUseCase<X, O, P, U, R, M>
where
    X: OutboxRepository,
    O: OrderRepository,
    P: PaymentRepository,
    U: UserDirectory,
    R: TicketRenderer,
    M: Mailer,
{
    pub outbox: X,
    pub deliver: DeliverReceiptUseCase<O, P, U, R, M>,
    pub batch_size: u64,
}

impl<X, O, P, U, R, M> ProcessReceiptOutboxUseCase<X, O, P, U, R, M>
where
    X: OutboxRepository,
    O: OrderRepository,
    P: PaymentRepository,
    U: UserDirectory,
    R: TicketRenderer,
    M: Mailer,
{
    /// Attempt every due receipt once. Delivery errors are recorded on the
    /// row; only bookkeeping failures are returned.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<OutboxBatchReport, TicketsServiceError> {
        let due = self
            .outbox
            .fetch_due(RECEIPT_EVENT_KIND, now, self.batch_size)
            .await?;
        let mut report = OutboxBatchReport::default();

        for event in due {
            match self.attempt(&event).await {
                Ok(()) => {
                    self.outbox.mark_processed(event.id, now).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    let attempts = event.attempts + 1;
                    let error = e.to_string();
                    let permanent = matches!(e, TicketsServiceError::Validation { .. });
                    if permanent || attempts >= MAX_OUTBOX_ATTEMPTS {
                        tracing::error!(outbox_id = %event.id, attempts, error = ?e, "receipt delivery abandoned");
                        self.outbox.mark_failed(event.id, attempts, &error, now).await?;
                        report.failed += 1;
                    } else {
                        let next = now + retry_delay(event.attempts);
                        tracing::warn!(outbox_id = %event.id, attempts, %next, error = ?e, "receipt delivery failed, will retry");
                        self.outbox.mark_retry(event.id, attempts, &error, next).await?;
                        report.retried += 1;
                    }
                }
            }
        }
        Ok(report)
    }

    async fn attempt(&self, event: &PendingOutboxEvent) -> Result<(), TicketsServiceError> {
        let payload: ReceiptPayload = serde_json::from_value(event.payload.clone())
            .map_err(|e| TicketsServiceError::validation("payload", e.to_string()))?;
        if self.deliver.execute(&payload).await? {
            tracing::info!(order_id = payload.order_id, outbox_id = %event.id, "receipt sent");
        }
        Ok(())
    }
}
