use axum::{
    Json,
    extract::{RawQuery, State},
};
use chrono::NaiveDate;
use serde::Deserialize;

use oasis_identity::Identity;

use crate::domain::types::{CashierSummary, SalesSummary};
use crate::error::TicketsServiceError;
use crate::handlers::parse_query;
use crate::state::AppState;
use crate::usecase::summary::{
    CashierSummaryQuery, GetCashierSummaryUseCase, GetSalesSummaryUseCase,
};

// ── GET /summaries/sales ─────────────────────────────────────────────────────

pub async fn get_sales_summary(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<SalesSummary>, TicketsServiceError> {
    let usecase = GetSalesSummaryUseCase {
        repo: state.summary_repo(),
        clock: state.clock(),
    };
    Ok(Json(usecase.execute(&identity).await?))
}

// ── GET /summaries/cashiers ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CashierSummaryParams {
    pub cashier_id: Option<i64>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

pub async fn get_cashier_summary(
    identity: Identity,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<CashierSummary>, TicketsServiceError> {
    let params: CashierSummaryParams = parse_query(raw_query.as_deref())?;
    let usecase = GetCashierSummaryUseCase {
        repo: state.summary_repo(),
    };
    let summary = usecase
        .execute(
            &identity,
            CashierSummaryQuery {
                cashier_id: params.cashier_id,
                date_from: params.date_from,
                date_to: params.date_to,
            },
        )
        .await?;
    Ok(Json(summary))
}
