use anyhow::anyhow;

use oasis_domain::payment::{PaymentMethod, PaymentStatus};

use crate::domain::repository::{PaymentGateway, PaymentRepository};
use crate::domain::status_map::map_gateway_status;
use crate::domain::types::{OutboxEvent, StatusChange};
use crate::error::TicketsServiceError;

/// Compare-and-set attempts before giving up on a payment whose status keeps
/// moving underneath us.
const MAX_CAS_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Status moved; a receipt job was enqueued when `to` is Approved.
    Applied {
        payment_id: i64,
        order_id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
    },
    /// Redelivery of a status already recorded.
    Unchanged { payment_id: i64, status: PaymentStatus },
    /// Transition not allowed from the current status (out-of-order delivery),
    /// or the payment is no longer the order's latest attempt.
    Ignored {
        payment_id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

pub struct ReconcilePaymentUseCase<P: PaymentRepository, G: PaymentGateway> {
    pub payments: P,
    pub gateway: G,
}

impl<P: PaymentRepository, G: PaymentGateway> ReconcilePaymentUseCase<P, G> {
    /// Pull the gateway's authoritative status for `gateway_payment_id` and
    /// apply it to the local payment carrying the echoed external reference.
    pub async fn execute(
        &self,
        gateway_payment_id: &str,
    ) -> Result<ReconcileOutcome, TicketsServiceError> {
        let remote = self.gateway.get_payment(gateway_payment_id).await?;
        let target = map_gateway_status(PaymentMethod::Gateway, &remote.status)
            .ok_or_else(|| TicketsServiceError::UnknownGatewayStatus(remote.status.clone()))?;

        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self
                .payments
                .find_by_external_reference(&remote.external_reference)
                .await?
                .ok_or(TicketsServiceError::PaymentNotFound)?;

            // Transitions land on the order's current attempt only. A newer
            // attempt that is already settled wins; otherwise the stale one
            // is left alone and no receipt goes out for it.
            let latest = self.payments.latest_for_order(current.order_id).await?;
            if let Some(latest) = latest.filter(|p| p.id != current.id) {
                if latest.status.blocks_new_attempt() {
                    return Err(TicketsServiceError::AlreadyPaid);
                }
                tracing::warn!(
                    payment_id = current.id,
                    current_payment_id = latest.id,
                    status = %target,
                    "notification for superseded payment attempt ignored"
                );
                return Ok(ReconcileOutcome::Ignored {
                    payment_id: current.id,
                    from: current.status,
                    to: target,
                });
            }

            if current.status == target {
                return Ok(ReconcileOutcome::Unchanged {
                    payment_id: current.id,
                    status: target,
                });
            }
            if !current.status.can_transition_to(target) {
                return Ok(ReconcileOutcome::Ignored {
                    payment_id: current.id,
                    from: current.status,
                    to: target,
                });
            }

            let receipt = (target == PaymentStatus::Approved)
                .then(|| OutboxEvent::receipt(current.order_id, &current.external_reference));
            let change = StatusChange {
                external_reference: current.external_reference.clone(),
                from: current.status,
                to: target,
                transaction_id: Some(gateway_payment_id.to_owned()),
            };
            if self.payments.update_status(&change, receipt.as_ref()).await? {
                return Ok(ReconcileOutcome::Applied {
                    payment_id: current.id,
                    order_id: current.order_id,
                    from: current.status,
                    to: target,
                });
            }
            tracing::debug!(
                payment_id = current.id,
                from = %current.status,
                to = %target,
                "payment status changed concurrently, re-reading"
            );
        }

        Err(anyhow!(
            "payment {} did not settle after {MAX_CAS_ATTEMPTS} attempts",
            remote.external_reference
        )
        .into())
    }
}
