use std::collections::HashMap;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr, TransactionError, TransactionTrait, sea_query::Expr,
    sea_query::OnConflict,
};
use uuid::Uuid;

use oasis_domain::payment::PaymentStatus;
use oasis_tickets_schema::{orders, outbox_events, payments};

use crate::domain::repository::{OutboxRepository, PaymentRepository};
use crate::domain::types::{NewPayment, OutboxEvent, Payment, PendingOutboxEvent, StatusChange};
use crate::error::TicketsServiceError;

// ── Payment repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbPaymentRepository {
    pub db: DatabaseConnection,
}

enum InsertOutcome {
    Inserted(payments::Model),
    Blocked(PaymentStatus),
    OrderMissing,
}

impl PaymentRepository for DbPaymentRepository {
    async fn latest_for_order(
        &self,
        order_id: i64,
    ) -> Result<Option<Payment>, TicketsServiceError> {
        let model = payments::Entity::find()
            .filter(payments::Column::OrderId.eq(order_id))
            .order_by_desc(payments::Column::Id)
            .one(&self.db)
            .await
            .context("find latest payment for order")?;
        Ok(model.map(payment_from_model).transpose()?)
    }

    async fn latest_for_orders(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<i64, Payment>, TicketsServiceError> {
        Ok(latest_payments(&self.db, order_ids).await?)
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, TicketsServiceError> {
        let model = payments::Entity::find()
            .filter(payments::Column::ExternalReference.eq(reference))
            .one(&self.db)
            .await
            .context("find payment by external reference")?;
        Ok(model.map(payment_from_model).transpose()?)
    }

    async fn insert(
        &self,
        payment: &NewPayment,
        outbox: Option<&OutboxEvent>,
    ) -> Result<Payment, TicketsServiceError> {
        let order_id = payment.order_id;
        let result = self
            .db
            .transaction::<_, InsertOutcome, DbErr>(|txn| {
                let payment = payment.clone();
                let outbox = outbox.cloned();
                Box::pin(async move {
                    // Row lock on the order serializes concurrent attempts.
                    let order = orders::Entity::find_by_id(payment.order_id)
                        .lock_exclusive()
                        .one(txn)
                        .await?;
                    if order.is_none() {
                        return Ok(InsertOutcome::OrderMissing);
                    }

                    let current = payments::Entity::find()
                        .filter(payments::Column::OrderId.eq(payment.order_id))
                        .order_by_desc(payments::Column::Id)
                        .one(txn)
                        .await?;
                    if let Some(status) = current
                        .and_then(|m| m.status.parse::<PaymentStatus>().ok())
                        .filter(|s| s.blocks_new_attempt())
                    {
                        return Ok(InsertOutcome::Blocked(status));
                    }

                    let now = Utc::now();
                    let model = payments::ActiveModel {
                        id: NotSet,
                        order_id: Set(payment.order_id),
                        user_id: Set(payment.user_id),
                        method: Set(payment.method.as_str().to_owned()),
                        amount: Set(payment.amount),
                        external_reference: Set(payment.external_reference.clone()),
                        transaction_id: Set(None),
                        status: Set(payment.status.as_str().to_owned()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    if let Some(event) = &outbox {
                        insert_outbox_event(txn, event).await?;
                    }
                    Ok(InsertOutcome::Inserted(model))
                })
            })
            .await;

        match result {
            Ok(InsertOutcome::Inserted(model)) => Ok(payment_from_model(model)?),
            Ok(InsertOutcome::Blocked(status)) => Err(TicketsServiceError::payment_blocked(status)),
            Ok(InsertOutcome::OrderMissing) => Err(TicketsServiceError::OrderNotFound),
            // The partial unique index caught a concurrent approval.
            Err(TransactionError::Transaction(e)) if is_unique_violation(&e) => {
                let current = self.latest_for_order(order_id).await?;
                Err(TicketsServiceError::payment_blocked(
                    current.map_or(PaymentStatus::Approved, |p| p.status),
                ))
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert payment").into()),
        }
    }

    async fn update_status(
        &self,
        change: &StatusChange,
        outbox: Option<&OutboxEvent>,
    ) -> Result<bool, TicketsServiceError> {
        let result = self
            .db
            .transaction::<_, bool, DbErr>(|txn| {
                let change = change.clone();
                let outbox = outbox.cloned();
                Box::pin(async move {
                    let mut update = payments::Entity::update_many()
                        .col_expr(payments::Column::Status, Expr::value(change.to.as_str()))
                        .col_expr(payments::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(
                            payments::Column::ExternalReference
                                .eq(change.external_reference.as_str()),
                        )
                        .filter(payments::Column::Status.eq(change.from.as_str()))
                        .filter(Expr::cust(
                            "NOT EXISTS (SELECT 1 FROM payments newer \
                             WHERE newer.order_id = payments.order_id \
                             AND newer.id > payments.id)",
                        ));
                    if let Some(transaction_id) = change.transaction_id {
                        update = update
                            .col_expr(payments::Column::TransactionId, Expr::value(transaction_id));
                    }
                    if update.exec(txn).await?.rows_affected != 1 {
                        return Ok(false);
                    }
                    if let Some(event) = &outbox {
                        insert_outbox_event(txn, event).await?;
                    }
                    Ok(true)
                })
            })
            .await;

        match result {
            Ok(applied) => Ok(applied),
            // Another attempt of the same order is already approved or processing.
            Err(TransactionError::Transaction(e)) if is_unique_violation(&e) => {
                Err(TicketsServiceError::AlreadyPaid)
            }
            Err(e) => Err(anyhow::Error::new(e).context("update payment status").into()),
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn payment_from_model(model: payments::Model) -> anyhow::Result<Payment> {
    Ok(Payment {
        id: model.id,
        order_id: model.order_id,
        user_id: model.user_id,
        method: model.method.parse()?,
        amount: model.amount,
        external_reference: model.external_reference,
        transaction_id: model.transaction_id,
        status: model.status.parse()?,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// Highest-id payment per order.
pub(crate) async fn latest_payments<C: ConnectionTrait>(
    conn: &C,
    order_ids: &[i64],
) -> anyhow::Result<HashMap<i64, Payment>> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let models = payments::Entity::find()
        .filter(payments::Column::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(payments::Column::Id)
        .all(conn)
        .await
        .context("load payments for orders")?;

    let mut latest = HashMap::with_capacity(order_ids.len());
    for model in models {
        latest.insert(model.order_id, payment_from_model(model)?);
    }
    Ok(latest)
}

/// Duplicate idempotency keys are dropped, so a receipt is enqueued at most once
/// per payment attempt.
async fn insert_outbox_event(
    txn: &DatabaseTransaction,
    event: &OutboxEvent,
) -> Result<(), DbErr> {
    let now = Utc::now();
    let model = outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    };
    outbox_events::Entity::insert(model)
        .on_conflict(
            OnConflict::column(outbox_events::Column::IdempotencyKey)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await?;
    Ok(())
}

// ── Outbox repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl OutboxRepository for DbOutboxRepository {
    async fn fetch_due(
        &self,
        kind: &str,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<PendingOutboxEvent>, TicketsServiceError> {
        let models = outbox_events::Entity::find()
            .filter(outbox_events::Column::Kind.eq(kind))
            .filter(outbox_events::Column::ProcessedAt.is_null())
            .filter(outbox_events::Column::FailedAt.is_null())
            .filter(outbox_events::Column::NextAttemptAt.lte(now))
            .order_by_asc(outbox_events::Column::NextAttemptAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("fetch due outbox events")?;
        Ok(models
            .into_iter()
            .map(|m| PendingOutboxEvent {
                id: m.id,
                kind: m.kind,
                payload: m.payload,
                attempts: m.attempts,
            })
            .collect())
    }

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), TicketsServiceError> {
        outbox_events::Entity::update_many()
            .col_expr(outbox_events::Column::ProcessedAt, Expr::value(at))
            .filter(outbox_events::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("mark outbox event processed")?;
        Ok(())
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), TicketsServiceError> {
        outbox_events::Entity::update_many()
            .col_expr(outbox_events::Column::Attempts, Expr::value(attempts))
            .col_expr(outbox_events::Column::LastError, Expr::value(error))
            .col_expr(outbox_events::Column::NextAttemptAt, Expr::value(next_attempt_at))
            .filter(outbox_events::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("schedule outbox retry")?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TicketsServiceError> {
        outbox_events::Entity::update_many()
            .col_expr(outbox_events::Column::Attempts, Expr::value(attempts))
            .col_expr(outbox_events::Column::LastError, Expr::value(error))
            .col_expr(outbox_events::Column::FailedAt, Expr::value(at))
            .filter(outbox_events::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("mark outbox event failed")?;
        Ok(())
    }
}
