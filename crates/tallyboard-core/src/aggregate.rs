//! Calendar bucketing of order records.
//!
//! A window is walked one calendar unit (day, month or year) at a time in
//! local time. Every unit yields a bucket, empty ones included, and the
//! period summary is accumulated during the same walk.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::order::{localize, OrderRecord};
use crate::partition::{partitions_for_range, PartitionKey};

/// Longest day-granularity window accepted, counted inclusively.
pub const MAX_DAILY_RANGE_DAYS: i64 = 90;
/// Lookback of the monthly chart and the longest month window accepted.
pub const MONTHLY_LOOKBACK: u32 = 12;
/// Lookback of the yearly chart and the longest year window accepted.
pub const YEARLY_LOOKBACK: u32 = 5;

const MONTH_ABBR_FR: [&str; 12] = [
    "Janv.", "Févr.", "Mars", "Avr.", "Mai", "Juin", "Juil.", "Août", "Sept.", "Oct.", "Nov.",
    "Déc.",
];

const MONTH_NAME_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.trim() {
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(CoreError::Validation(
                "granularity must be one of: day, month, year".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// One day, month or year, identified by its first local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarUnit {
    pub granularity: Granularity,
    pub first_day: NaiveDate,
}

impl CalendarUnit {
    /// The unit of `granularity` that contains `date`.
    pub fn containing(granularity: Granularity, date: NaiveDate) -> Self {
        let first_day = match granularity {
            Granularity::Day => date,
            Granularity::Month => date - Duration::days(i64::from(date.day0())),
            Granularity::Year => date - Duration::days(i64::from(date.ordinal0())),
        };
        Self {
            granularity,
            first_day,
        }
    }

    pub fn next(&self) -> Option<Self> {
        let first_day = match self.granularity {
            Granularity::Day => self.first_day.succ_opt()?,
            Granularity::Month => self.first_day.checked_add_months(Months::new(1))?,
            Granularity::Year => self.first_day.checked_add_months(Months::new(12))?,
        };
        Some(Self {
            granularity: self.granularity,
            first_day,
        })
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .and_then(|next| next.first_day.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// Inclusive UTC bounds of the unit in `tz`: local midnight of the first
    /// day through the millisecond before the next unit starts.
    pub fn bounds(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = localize(tz, self.first_day.and_time(NaiveTime::MIN));
        let end = match self.next() {
            Some(next) => {
                localize(tz, next.first_day.and_time(NaiveTime::MIN)) - Duration::milliseconds(1)
            }
            None => localize(tz, NaiveDate::MAX.and_time(NaiveTime::MIN)),
        };
        (start, end)
    }

    /// Stable ISO key: `2026-10-16`, `2026-10` or `2026`.
    pub fn key(&self) -> String {
        match self.granularity {
            Granularity::Day => self.first_day.format("%Y-%m-%d").to_string(),
            Granularity::Month => self.first_day.format("%Y-%m").to_string(),
            Granularity::Year => self.first_day.format("%Y").to_string(),
        }
    }

    /// Axis label: `16/10`, `Oct.` or `2026`.
    pub fn label(&self) -> String {
        match self.granularity {
            Granularity::Day => self.first_day.format("%d/%m").to_string(),
            Granularity::Month => MONTH_ABBR_FR[self.first_day.month0() as usize].to_string(),
            Granularity::Year => self.first_day.format("%Y").to_string(),
        }
    }

    /// Unambiguous label: `16/10/2026`, `octobre 2026` or `2026`.
    pub fn full_label(&self) -> String {
        match self.granularity {
            Granularity::Day => self.first_day.format("%d/%m/%Y").to_string(),
            Granularity::Month => month_long_label(self.first_day),
            Granularity::Year => self.first_day.format("%Y").to_string(),
        }
    }
}

/// Months since year 0, for counting calendar months between two dates.
fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// French `MMMM yyyy` label of the month containing `date`.
pub fn month_long_label(date: NaiveDate) -> String {
    format!("{} {}", MONTH_NAME_FR[date.month0() as usize], date.year())
}

/// A validated, inclusive range of local calendar dates at one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregationWindow {
    granularity: Granularity,
    start: NaiveDate,
    end: NaiveDate,
}

impl AggregationWindow {
    pub fn new(
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::Validation(
                "end_date must be on or after start_date".to_string(),
            ));
        }
        match granularity {
            Granularity::Day => {
                let days = (end - start).num_days() + 1;
                if days > MAX_DAILY_RANGE_DAYS {
                    return Err(CoreError::Validation(format!(
                        "please select a period of at most {MAX_DAILY_RANGE_DAYS} days \
                         (requested {days} days)"
                    )));
                }
            }
            Granularity::Month => {
                let months = month_index(end) - month_index(start) + 1;
                if months > i64::from(MONTHLY_LOOKBACK) {
                    return Err(CoreError::Validation(format!(
                        "please select a period of at most {MONTHLY_LOOKBACK} months \
                         (requested {months} months)"
                    )));
                }
            }
            Granularity::Year => {
                let years = i64::from(end.year()) - i64::from(start.year()) + 1;
                if years > i64::from(YEARLY_LOOKBACK) {
                    return Err(CoreError::Validation(format!(
                        "please select a period of at most {YEARLY_LOOKBACK} years \
                         (requested {years} years)"
                    )));
                }
            }
        }
        Ok(Self {
            granularity,
            start,
            end,
        })
    }

    pub fn daily(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        Self::new(Granularity::Day, start, end)
    }

    /// The last `days` days ending on `today`.
    pub fn last_days(today: NaiveDate, days: u32) -> Result<Self, CoreError> {
        let back = u64::from(days.max(1)) - 1;
        let start = today.checked_sub_days(Days::new(back)).ok_or_else(|| {
            CoreError::Validation(format!("no {days}-day period ends on {today}"))
        })?;
        Self::daily(start, today)
    }

    /// `months` whole calendar months ending with the month of `today`,
    /// capped at [`MONTHLY_LOOKBACK`].
    pub fn trailing_months(today: NaiveDate, months: u32) -> Self {
        let current = CalendarUnit::containing(Granularity::Month, today).first_day;
        let start = current
            .checked_sub_months(Months::new(months.clamp(1, MONTHLY_LOOKBACK) - 1))
            .unwrap_or(NaiveDate::MIN);
        Self {
            granularity: Granularity::Month,
            start,
            end: today,
        }
    }

    /// `years` whole calendar years ending with the year of `today`,
    /// capped at [`YEARLY_LOOKBACK`].
    pub fn trailing_years(today: NaiveDate, years: u32) -> Self {
        let current = CalendarUnit::containing(Granularity::Year, today).first_day;
        let start = current
            .checked_sub_months(Months::new((years.clamp(1, YEARLY_LOOKBACK) - 1) * 12))
            .unwrap_or(NaiveDate::MIN);
        Self {
            granularity: Granularity::Year,
            start,
            end: today,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Every calendar unit intersecting the window, oldest first.
    pub fn units(&self) -> Vec<CalendarUnit> {
        let last = CalendarUnit::containing(self.granularity, self.end);
        let mut units = Vec::new();
        let mut unit = Some(CalendarUnit::containing(self.granularity, self.start));
        while let Some(current) = unit {
            if current > last {
                break;
            }
            units.push(current);
            unit = current.next();
        }
        units
    }

    /// Month partitions holding orders for this window.
    pub fn partitions(&self, restaurant_id: &str) -> Vec<PartitionKey> {
        let first = CalendarUnit::containing(self.granularity, self.start).first_day;
        partitions_for_range(restaurant_id, first, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub key: String,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub revenue: f64,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestBucket {
    pub key: String,
    pub label: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub total_revenue: f64,
    pub total_orders: u64,
    pub average_order_value: f64,
    /// `None` when no bucket took any revenue.
    pub best_bucket: Option<BestBucket>,
}

/// Parallel, chronologically ordered arrays for a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub revenues: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<u64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub granularity: Granularity,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub buckets: Vec<TimeBucket>,
    pub summary: PeriodSummary,
}

impl Aggregation {
    pub fn chart(&self, include_orders: bool) -> ChartSeries {
        ChartSeries {
            labels: self.buckets.iter().map(|b| b.label.clone()).collect(),
            revenues: self.buckets.iter().map(|b| b.revenue).collect(),
            orders: include_orders.then(|| self.buckets.iter().map(|b| b.orders).collect()),
        }
    }
}

/// Bucket `records` over `window`.
///
/// Each record lands in the unit holding its local date in `tz`; records
/// outside the window are ignored. Deterministic for a given input.
pub fn aggregate(records: &[OrderRecord], window: &AggregationWindow, tz: Tz) -> Aggregation {
    let units = window.units();

    let mut tallies: HashMap<CalendarUnit, (f64, u64)> = HashMap::new();
    if let (Some(first), Some(last)) = (units.first().copied(), units.last().copied()) {
        for record in records {
            let local_date = record.created_at.with_timezone(&tz).date_naive();
            let unit = CalendarUnit::containing(window.granularity, local_date);
            if unit < first || unit > last {
                continue;
            }
            let tally = tallies.entry(unit).or_insert((0.0, 0));
            tally.0 += record.total;
            tally.1 += 1;
        }
    }

    let mut buckets = Vec::with_capacity(units.len());
    let mut total_revenue = 0.0;
    let mut total_orders = 0u64;
    let mut best_bucket: Option<BestBucket> = None;

    for unit in units {
        let (revenue, orders) = tallies.get(&unit).copied().unwrap_or((0.0, 0));
        let (start, end) = unit.bounds(tz);

        total_revenue += revenue;
        total_orders += orders;

        // Strictly greater: the earliest bucket keeps a tie.
        if revenue > best_bucket.as_ref().map_or(0.0, |b| b.revenue) {
            best_bucket = Some(BestBucket {
                key: unit.key(),
                label: unit.full_label(),
                revenue,
            });
        }

        buckets.push(TimeBucket {
            key: unit.key(),
            label: unit.label(),
            start,
            end,
            revenue,
            orders,
        });
    }

    let average_order_value = if total_orders > 0 {
        total_revenue / total_orders as f64
    } else {
        0.0
    };

    Aggregation {
        granularity: window.granularity,
        start_date: window.start,
        end_date: window.end,
        buckets,
        summary: PeriodSummary {
            total_revenue,
            total_orders,
            average_order_value,
            best_bucket,
        },
    }
}

/// Revenue and order count of a whole partition, ignoring timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PartitionTotals {
    pub revenue: f64,
    pub orders: u64,
}

pub fn summarize_partition(records: &[OrderRecord]) -> PartitionTotals {
    PartitionTotals {
        revenue: records.iter().map(|r| r.total).sum(),
        orders: records.len() as u64,
    }
}
