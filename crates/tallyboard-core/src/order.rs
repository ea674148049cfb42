//! Order documents and their normalization into [`OrderRecord`]s.
//!
//! Store documents are loosely typed: `createdAt` arrives in one of several
//! encodings and the amount lives under `totalPrice` or `total`. Everything
//! downstream works on the normalized record only.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// An order document exactly as the store returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    pub id: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(rename = "totalPrice", default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Value>,
}

/// A normalized, immutable order fact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Always `>= 0`.
    pub total: f64,
}

/// The recognized `createdAt` encodings, in decode priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatedAt {
    /// Native store timestamp: `{"seconds": .., "nanoseconds": ..}`
    /// (SDK exports use `_seconds` / `_nanoseconds`).
    Timestamp { seconds: i64, nanoseconds: u32 },
    /// ISO-8601 / RFC 3339 string.
    Iso(String),
    /// Already-normalized instant in epoch milliseconds.
    Instant(i64),
    /// Missing, null, or any shape not listed above.
    Unrecognized,
}

impl CreatedAt {
    pub fn decode(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => {
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64);
                let nanoseconds = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .filter(|n| *n < 1_000_000_000)
                    .unwrap_or(0);
                match seconds {
                    Some(seconds) => Self::Timestamp {
                        seconds,
                        nanoseconds,
                    },
                    None => Self::Unrecognized,
                }
            }
            Some(Value::String(raw)) => Self::Iso(raw.clone()),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(millis) => Self::Instant(millis),
                // Fractional millisecond values are truncated.
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| Self::Instant(f as i64))
                    .unwrap_or(Self::Unrecognized),
            },
            _ => Self::Unrecognized,
        }
    }

    /// Resolve to a point in time. `None` means the fallback branch applies.
    pub fn resolve(&self, tz: Tz) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(*seconds, *nanoseconds),
            Self::Iso(raw) => parse_iso(raw, tz),
            Self::Instant(millis) => DateTime::from_timestamp_millis(*millis),
            Self::Unrecognized => None,
        }
    }
}

/// Result of running one `createdAt` value through the normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub instant: DateTime<Utc>,
    /// `true` when no encoding matched and `instant` is the supplied "now".
    pub fell_back: bool,
}

/// Normalize a heterogeneous `createdAt` value.
///
/// Unrecognized values resolve to `now`. That places the order in today's
/// bucket, which is almost certainly wrong, so callers must count and log
/// every fallback rather than hide it.
pub fn normalize_timestamp(value: Option<&Value>, tz: Tz, now: DateTime<Utc>) -> Normalized {
    match CreatedAt::decode(value).resolve(tz) {
        Some(instant) => Normalized {
            instant,
            fell_back: false,
        },
        None => Normalized {
            instant: now,
            fell_back: true,
        },
    }
}

/// `totalPrice` wins, then `total`, then 0.
///
/// A field is only used when it holds a positive finite number (or a string
/// that parses to one); zero, negative and non-numeric values fall through.
pub fn normalize_amount(total_price: Option<&Value>, total: Option<&Value>) -> f64 {
    amount_value(total_price)
        .or_else(|| amount_value(total))
        .unwrap_or(0.0)
}

fn amount_value(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    (n.is_finite() && n > 0.0).then_some(n)
}

impl OrderRecord {
    /// Normalize one raw document. The flag reports a timestamp fallback.
    pub fn from_raw(raw: &RawOrder, tz: Tz, now: DateTime<Utc>) -> (Self, bool) {
        let normalized = normalize_timestamp(raw.created_at.as_ref(), tz, now);
        let record = Self {
            id: raw.id.clone(),
            created_at: normalized.instant,
            total: normalize_amount(raw.total_price.as_ref(), raw.total.as_ref()),
        };
        (record, normalized.fell_back)
    }
}

/// Normalize a batch, returning the records and the number of fallbacks.
pub fn normalize_orders(
    raws: &[RawOrder],
    tz: Tz,
    now: DateTime<Utc>,
) -> (Vec<OrderRecord>, usize) {
    let mut fallbacks = 0;
    let records = raws
        .iter()
        .map(|raw| {
            let (record, fell_back) = OrderRecord::from_raw(raw, tz, now);
            if fell_back {
                fallbacks += 1;
                warn!(
                    order_id = %raw.id,
                    created_at = ?raw.created_at,
                    "Unrecognized createdAt; order counted at the current time"
                );
            }
            record
        })
        .collect();
    (records, fallbacks)
}

/// Map a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// DST gap are pushed forward by the gap length.
pub(crate) fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(local) = tz.from_local_datetime(&naive).earliest() {
        return local.with_timezone(&Utc);
    }
    match tz.from_local_datetime(&(naive + Duration::hours(1))).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

/// Parse an ISO-8601 string the way browsers' `Date` constructor does:
/// an explicit offset is honoured, a date-only form is UTC midnight and a
/// date-time without offset is local time.
fn parse_iso(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(localize(tz, naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
