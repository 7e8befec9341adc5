use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::domain::repository::Clock;
use crate::state::AppState;
use crate::usecase::receipt::{DeliverReceiptUseCase, ProcessReceiptOutboxUseCase};

/// Rows claimed per poll.
pub const RECEIPT_BATCH_SIZE: u64 = 20;

/// Background loop draining the receipt outbox. Runs beside the HTTP server
/// and shares nothing with request handling except the database pool.
pub struct ReceiptWorker {
    pub state: AppState,
    pub poll_interval: Duration,
}

impl ReceiptWorker {
    pub async fn run(self) {
        let usecase = ProcessReceiptOutboxUseCase {
            outbox: self.state.outbox_repo(),
            deliver: DeliverReceiptUseCase {
                orders: self.state.order_repo(),
                payments: self.state.payment_repo(),
                users: self.state.user_directory(),
                renderer: self.state.renderer.clone(),
                mailer: self.state.mailer.clone(),
            },
            batch_size: RECEIPT_BATCH_SIZE,
        };
        let clock = self.state.clock();

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(poll_secs = self.poll_interval.as_secs(), "receipt worker started");
        loop {
            ticker.tick().await;
            match usecase.execute(clock.now()).await {
                Ok(report) if report.delivered + report.retried + report.failed > 0 => {
                    tracing::info!(
                        delivered = report.delivered,
                        retried = report.retried,
                        failed = report.failed,
                        "receipt outbox batch processed"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "receipt outbox poll failed"),
            }
        }
    }
}
