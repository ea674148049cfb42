use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use tallyboard_core::{order::normalize_timestamp, partition::PartitionKey};

use crate::{error::AppError, state::AppState};

/// Largest accepted batch.
pub const MAX_BATCH: usize = 500;

/// Body of `POST /api/orders`: one order document or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OrderOrBatch {
    Single(Box<Map<String, Value>>),
    Batch(Vec<Value>),
}

/// `POST /api/orders`: write order documents into their month partitions.
///
/// Documents are stored as given, with two additions: a missing `id` gets a
/// UUID and a missing `createdAt` gets the current time. The partition is
/// chosen from the local date of `createdAt` in the configured zone. A
/// `createdAt` that no known encoding matches lands in the current month and
/// is reported in `fallback_timestamps`. The whole batch is written in one
/// transaction.
///
/// ## Response
/// `201 Created` with `{ "data": { "inserted", "ids", "partitions", "fallback_timestamps" } }`.
#[tracing::instrument(skip(state, payload))]
pub async fn ingest_orders(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OrderOrBatch>,
) -> Result<impl IntoResponse, AppError> {
    let documents: Vec<Value> = match payload {
        OrderOrBatch::Single(doc) => vec![Value::Object(*doc)],
        OrderOrBatch::Batch(docs) => docs,
    };

    if documents.len() > MAX_BATCH {
        return Err(AppError::BatchTooLarge(documents.len()));
    }
    if documents.is_empty() {
        return Err(AppError::BadRequest("empty batch".to_string()));
    }

    let tz = state.config.timezone;
    let now = Utc::now();
    let restaurant_id = state.config.restaurant_id.as_str();

    let mut grouped: BTreeMap<PartitionKey, Vec<Value>> = BTreeMap::new();
    let mut ids = Vec::with_capacity(documents.len());
    let mut fallback_timestamps = 0usize;

    for (index, document) in documents.into_iter().enumerate() {
        let Value::Object(mut doc) = document else {
            return Err(AppError::Validation {
                message: format!("order at index {index} is not a JSON object"),
                field: None,
            });
        };

        let id = match doc.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            None | Some(Value::Null) => uuid::Uuid::new_v4().to_string(),
            Some(_) => {
                return Err(AppError::Validation {
                    message: format!("order at index {index} has an invalid id; expected a non-empty string"),
                    field: Some("id"),
                })
            }
        };
        doc.insert("id".to_string(), Value::String(id.clone()));

        if doc.get("createdAt").map_or(true, Value::is_null) {
            doc.insert(
                "createdAt".to_string(),
                Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }

        let created = normalize_timestamp(doc.get("createdAt"), tz, now);
        if created.fell_back {
            fallback_timestamps += 1;
            tracing::warn!(order_id = %id, "Unrecognized createdAt on ingest; filed under the current month");
        }
        let local_date = created.instant.with_timezone(&tz).date_naive();
        let key = PartitionKey::for_date(restaurant_id, local_date);

        ids.push(id);
        grouped.entry(key).or_default().push(Value::Object(doc));
    }

    let inserted = state
        .db
        .insert_partitioned(&grouped)
        .await
        .map_err(AppError::Internal)?;
    let partitions: Vec<String> = grouped.keys().map(ToString::to_string).collect();

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "data": {
                "inserted": inserted,
                "ids": ids,
                "partitions": partitions,
                "fallback_timestamps": fallback_timestamps,
            }
        })),
    ))
}
