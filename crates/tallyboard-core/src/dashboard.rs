//! Dashboard views assembled from the order store.
//!
//! Every call fetches fresh documents and recomputes from scratch; nothing
//! is cached between calls.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{
    aggregate, month_long_label, summarize_partition, Aggregation, AggregationWindow,
    ChartSeries, Granularity, MONTHLY_LOOKBACK, YEARLY_LOOKBACK,
};
use crate::compare::ComparisonStat;
use crate::error::CoreError;
use crate::partition::PartitionKey;
use crate::store::{fetch_partition, fetch_partitions, OrderStore};

/// Default span of the daily chart.
pub const DEFAULT_DAILY_DAYS: u32 = 30;

/// Current month against the previous one.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyOverview {
    pub current_month_revenue: f64,
    pub previous_month_revenue: f64,
    pub total_orders: u64,
    pub previous_orders: u64,
    pub revenue_change: ComparisonStat,
    pub orders_change: ComparisonStat,
    pub current_month_label: String,
    pub previous_month_label: String,
    pub fallback_timestamps: usize,
}

/// One aggregated window plus its chart payload and fetch diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RangeReport {
    #[serde(flatten)]
    pub aggregation: Aggregation,
    pub chart: ChartSeries,
    /// Store paths that could not be read and were counted as empty.
    pub failed_partitions: Vec<String>,
    pub fallback_timestamps: usize,
}

pub struct Dashboard {
    store: Arc<dyn OrderStore>,
    restaurant_id: String,
    tz: Tz,
}

impl Dashboard {
    pub fn new(store: Arc<dyn OrderStore>, restaurant_id: impl Into<String>, tz: Tz) -> Self {
        Self {
            store,
            restaurant_id: restaurant_id.into(),
            tz,
        }
    }

    pub fn restaurant_id(&self) -> &str {
        &self.restaurant_id
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Whether the order store answers.
    pub async fn ping(&self) -> Result<(), CoreError> {
        self.store.ping().await.map_err(CoreError::Store)
    }

    /// Today's date in the dashboard's local zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Revenue and order count of this month and last month.
    ///
    /// Both partitions are summed whole. Unlike the chart views a store error
    /// here is returned to the caller.
    pub async fn monthly_overview(&self, today: NaiveDate) -> Result<MonthlyOverview, CoreError> {
        let current_key = PartitionKey::for_date(self.restaurant_id.as_str(), today);
        let previous_key = current_key.previous();
        let now = Utc::now();

        let ((current, current_fallbacks), (previous, previous_fallbacks)) = futures::try_join!(
            fetch_partition(self.store.as_ref(), &current_key, self.tz, now),
            fetch_partition(self.store.as_ref(), &previous_key, self.tz, now),
        )?;

        let current = summarize_partition(&current);
        let previous = summarize_partition(&previous);
        let previous_month_label = NaiveDate::from_ymd_opt(previous_key.year, previous_key.month, 1)
            .map(month_long_label)
            .unwrap_or_default();

        Ok(MonthlyOverview {
            current_month_revenue: current.revenue,
            previous_month_revenue: previous.revenue,
            total_orders: current.orders,
            previous_orders: previous.orders,
            revenue_change: ComparisonStat::new(current.revenue, previous.revenue),
            orders_change: ComparisonStat::new(current.orders as f64, previous.orders as f64),
            current_month_label: month_long_label(today),
            previous_month_label,
            fallback_timestamps: current_fallbacks + previous_fallbacks,
        })
    }

    /// Aggregate an already-validated window.
    pub async fn range(&self, window: &AggregationWindow) -> RangeReport {
        let keys = window.partitions(&self.restaurant_id);
        let outcome = fetch_partitions(self.store.as_ref(), &keys, self.tz, Utc::now()).await;

        if outcome.fallback_timestamps > 0 {
            warn!(
                count = outcome.fallback_timestamps,
                granularity = window.granularity().as_str(),
                "Orders with unrecognized createdAt were counted at the current time"
            );
        }

        let aggregation = aggregate(&outcome.records, window, self.tz);
        info!(
            granularity = window.granularity().as_str(),
            start = %window.start(),
            end = %window.end(),
            partitions = keys.len(),
            failed = outcome.failed_partitions.len(),
            orders = aggregation.summary.total_orders,
            "Aggregated orders"
        );

        let chart = aggregation.chart(window.granularity() == Granularity::Day);
        RangeReport {
            aggregation,
            chart,
            failed_partitions: outcome
                .failed_partitions
                .iter()
                .map(ToString::to_string)
                .collect(),
            fallback_timestamps: outcome.fallback_timestamps,
        }
    }

    /// Day-by-day view. Rejected before any fetch when the range is reversed
    /// or longer than 90 days.
    pub async fn daily(&self, start: NaiveDate, end: NaiveDate) -> Result<RangeReport, CoreError> {
        let window = AggregationWindow::daily(start, end)?;
        Ok(self.range(&window).await)
    }

    /// The trailing twelve months.
    pub async fn monthly(&self, today: NaiveDate) -> RangeReport {
        let window = AggregationWindow::trailing_months(today, MONTHLY_LOOKBACK);
        self.range(&window).await
    }

    /// The trailing five years.
    pub async fn yearly(&self, today: NaiveDate) -> RangeReport {
        let window = AggregationWindow::trailing_years(today, YEARLY_LOOKBACK);
        self.range(&window).await
    }
}
