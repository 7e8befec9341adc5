use sea_orm::DatabaseConnection;

use crate::infra::clock::SystemClock;
use crate::infra::db::{
    DbEventRepository, DbOrderRepository, DbTicketRepository, DbUserDirectory,
};
use crate::infra::gateway::MercadoPagoGateway;
use crate::infra::mailer::SmtpMailer;
use crate::infra::payments::{DbOutboxRepository, DbPaymentRepository};
use crate::infra::pdf::PdfTicketRenderer;
use crate::infra::storage::S3FileStorage;
use crate::infra::summary::DbSummaryRepository;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub gateway: MercadoPagoGateway,
    pub storage: S3FileStorage,
    pub mailer: SmtpMailer,
    pub renderer: PdfTicketRenderer,
    /// Key prefix for bundles produced at the cashier.
    pub tickets_prefix: String,
    /// Key prefix for bundles downloaded by clients.
    pub orders_prefix: String,
}

impl AppState {
    pub fn event_repo(&self) -> DbEventRepository {
        DbEventRepository {
            db: self.db.clone(),
        }
    }

    pub fn order_repo(&self) -> DbOrderRepository {
        DbOrderRepository {
            db: self.db.clone(),
        }
    }

    pub fn ticket_repo(&self) -> DbTicketRepository {
        DbTicketRepository {
            db: self.db.clone(),
        }
    }

    pub fn payment_repo(&self) -> DbPaymentRepository {
        DbPaymentRepository {
            db: self.db.clone(),
        }
    }

    pub fn outbox_repo(&self) -> DbOutboxRepository {
        DbOutboxRepository {
            db: self.db.clone(),
        }
    }

    pub fn summary_repo(&self) -> DbSummaryRepository {
        DbSummaryRepository {
            db: self.db.clone(),
        }
    }

    pub fn user_directory(&self) -> DbUserDirectory {
        DbUserDirectory {
            db: self.db.clone(),
        }
    }

    pub fn clock(&self) -> SystemClock {
        SystemClock
    }
}
