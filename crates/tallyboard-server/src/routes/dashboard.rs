use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use tallyboard_core::{
    aggregate::{AggregationWindow, Granularity},
    dashboard::DEFAULT_DAILY_DAYS,
};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub granularity: Option<String>,
}

fn parse_date(raw: Option<&str>, field: &'static str) -> Result<Option<NaiveDate>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|date| (1..=9999).contains(&date.year()))
        .map(Some)
        .ok_or_else(|| AppError::Validation {
            message: format!("{field} must be a date in YYYY-MM-DD format"),
            field: Some(field),
        })
}

/// `GET /api/dashboard`: month-over-month overview plus the default daily chart.
///
/// The overview reads the current and previous month partitions whole; a
/// store failure there fails the request. The daily view degrades to empty
/// buckets for partitions that cannot be read.
pub async fn overview(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let today = state.dashboard.today();

    let overview = state
        .dashboard
        .monthly_overview(today)
        .await
        .map_err(|e| {
            tracing::error!(
                restaurant = state.dashboard.restaurant_id(),
                error = %e,
                "Failed to load monthly overview"
            );
            AppError::from(e)
        })?;

    let window = AggregationWindow::last_days(today, DEFAULT_DAILY_DAYS)?;
    let daily = state.dashboard.range(&window).await;

    Ok(Json(json!({
        "data": {
            "restaurant_id": state.dashboard.restaurant_id(),
            "timezone": state.dashboard.timezone().name(),
            "overview": overview,
            "daily": daily,
        }
    })))
}

/// `GET /api/dashboard/daily?start_date=YYYY-MM-DD&end_date=YYYY-MM-DD`
///
/// Both bounds default to the last 30 days ending today. Ranges longer than
/// 90 days or ending before they start are rejected before any fetch.
pub async fn daily(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let today = state.dashboard.today();
    let end = parse_date(query.end_date.as_deref(), "end_date")?.unwrap_or(today);
    let start = match parse_date(query.start_date.as_deref(), "start_date")? {
        Some(start) => start,
        None => AggregationWindow::last_days(end, DEFAULT_DAILY_DAYS)?.start(),
    };

    let report = state
        .dashboard
        .daily(start, end)
        .await
        .map_err(|e| with_field(e.into(), "end_date"))?;

    Ok(Json(json!({ "data": report })))
}

/// `GET /api/dashboard/monthly`: the trailing twelve months.
pub async fn monthly(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let today = state.dashboard.today();
    let report = state.dashboard.monthly(today).await;
    Json(json!({ "data": report }))
}

/// `GET /api/dashboard/yearly`: the trailing five years.
pub async fn yearly(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let today = state.dashboard.today();
    let report = state.dashboard.yearly(today).await;
    Json(json!({ "data": report }))
}

/// `GET /api/dashboard/range?granularity=day|month|year&start_date&end_date`
///
/// Explicit range at any granularity. Both dates are required here. Windows
/// longer than 90 days, 12 months or 5 years are rejected before any fetch.
pub async fn range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let granularity = Granularity::parse(query.granularity.as_deref().unwrap_or("day"))
        .map_err(|e| with_field(e.into(), "granularity"))?;
    let start = parse_date(query.start_date.as_deref(), "start_date")?.ok_or_else(|| {
        AppError::Validation {
            message: "start_date is required".to_string(),
            field: Some("start_date"),
        }
    })?;
    let end = parse_date(query.end_date.as_deref(), "end_date")?.ok_or_else(|| {
        AppError::Validation {
            message: "end_date is required".to_string(),
            field: Some("end_date"),
        }
    })?;

    let window = AggregationWindow::new(granularity, start, end)
        .map_err(|e| with_field(e.into(), "end_date"))?;
    let report = state.dashboard.range(&window).await;

    Ok(Json(json!({ "data": report })))
}

/// Attach `field` to a field-less validation error.
fn with_field(err: AppError, field: &'static str) -> AppError {
    match err {
        AppError::Validation {
            message,
            field: None,
        } => AppError::Validation {
            message,
            field: Some(field),
        },
        other => other,
    }
}
