use std::collections::BTreeMap;

use anyhow::anyhow;
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};

use oasis_identity::Identity;

use crate::domain::repository::{Clock, SummaryRepository};
use crate::domain::types::{
    CashierActivity, CashierSummary, MonthlyCount, MonthlyTotal, SaleRecord, SalesSummary,
};
use crate::error::TicketsServiceError;

/// Bucket approved sales against `now` (UTC calendar).
pub fn summarize_sales(records: &[SaleRecord], now: DateTime<Utc>) -> SalesSummary {
    let mut summary = SalesSummary {
        current_day: 0,
        current_month: 0,
        current_year: 0,
        monthly_current_year: [0; 12],
        monthly_last_year: [0; 12],
    };
    let today = now.date_naive();
    for record in records {
        let at = record.settled_at;
        let month = at.month0() as usize;
        if at.year() == now.year() {
            summary.current_year += record.amount;
            summary.monthly_current_year[month] += record.amount;
            if at.month() == now.month() {
                summary.current_month += record.amount;
            }
            if at.date_naive() == today {
                summary.current_day += record.amount;
            }
        } else if at.year() == now.year() - 1 {
            summary.monthly_last_year[month] += record.amount;
        }
    }
    summary
}

pub fn summarize_cashier(activity: &CashierActivity) -> CashierSummary {
    let mut sales: BTreeMap<(i32, u32), i64> = BTreeMap::new();
    for sale in &activity.sales {
        *sales
            .entry((sale.settled_at.year(), sale.settled_at.month()))
            .or_default() += sale.amount;
    }
    let mut uses: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for used_at in &activity.uses {
        *uses.entry((used_at.year(), used_at.month())).or_default() += 1;
    }

    CashierSummary {
        total_sales: activity.sales.iter().map(|s| s.amount).sum(),
        total_uses: activity.uses.len() as u64,
        monthly_sales: sales
            .into_iter()
            .map(|((year, month), total)| MonthlyTotal { year, month, total })
            .collect(),
        monthly_uses: uses
            .into_iter()
            .map(|((year, month), count)| MonthlyCount { year, month, count })
            .collect(),
    }
}

// ── GetSalesSummary ──────────────────────────────────────────────────────────

pub struct GetSalesSummaryUseCase<S: SummaryRepository, C: Clock> {
    pub repo: S,
    pub clock: C,
}

impl<S: SummaryRepository, C: Clock> GetSalesSummaryUseCase<S, C> {
    pub async fn execute(&self, identity: &Identity) -> Result<SalesSummary, TicketsServiceError> {
        if !identity.is_privileged() {
            return Err(TicketsServiceError::Forbidden);
        }
        let now = self.clock.now();
        let since = Utc
            .with_ymd_and_hms(now.year() - 1, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| anyhow!("no start of year {}", now.year() - 1))?;

        let records = self.repo.approved_sales_since(since).await?;
        if records.is_empty() {
            return Err(TicketsServiceError::NoSales);
        }
        Ok(summarize_sales(&records, now))
    }
}

// ── GetCashierSummary ────────────────────────────────────────────────────────

pub struct CashierSummaryQuery {
    pub cashier_id: Option<i64>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

pub struct GetCashierSummaryUseCase<S: SummaryRepository> {
    pub repo: S,
}

impl<S: SummaryRepository> GetCashierSummaryUseCase<S> {
    /// Admins may pick any cashier or omit it for everyone; cashiers always
    /// get their own activity.
    pub async fn execute(
        &self,
        identity: &Identity,
        query: CashierSummaryQuery,
    ) -> Result<CashierSummary, TicketsServiceError> {
        if !identity.is_privileged() {
            return Err(TicketsServiceError::Forbidden);
        }
        if query.date_from > query.date_to {
            return Err(TicketsServiceError::validation(
                "date-from",
                "must not be after date-to",
            ));
        }
        let cashier_id = if identity.is_admin() {
            query.cashier_id
        } else {
            Some(identity.user_id)
        };

        // Inclusive day range → half-open instant range.
        let from = query.date_from.and_time(chrono::NaiveTime::MIN).and_utc();
        let to = query
            .date_to
            .checked_add_days(Days::new(1))
            .ok_or_else(|| TicketsServiceError::validation("date-to", "out of range"))?
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();

        let activity = self.repo.cashier_activity(cashier_id, from, to).await?;
        Ok(summarize_cashier(&activity))
    }
}
