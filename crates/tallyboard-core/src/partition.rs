use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One month sub-collection of a restaurant's orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub restaurant_id: String,
    pub year: i32,
    /// 1-based.
    pub month: u32,
}

impl PartitionKey {
    pub fn new(restaurant_id: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            year,
            month,
        }
    }

    pub fn for_date(restaurant_id: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(restaurant_id, date.year(), date.month())
    }

    pub fn previous(&self) -> Self {
        let (year, month) = if self.month <= 1 {
            (self.year - 1, 12)
        } else {
            (self.year, self.month - 1)
        };
        Self::new(self.restaurant_id.clone(), year, month)
    }

    pub fn next(&self) -> Self {
        let (year, month) = if self.month >= 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        Self::new(self.restaurant_id.clone(), year, month)
    }

    /// `yyyy/mm` suffix of the store path.
    pub fn year_month(&self) -> String {
        format!("{:04}/{:02}", self.year, self.month)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "restaurants/{}/orders/{}",
            self.restaurant_id,
            self.year_month()
        )
    }
}

/// Distinct month partitions intersecting the inclusive `[start, end]` range,
/// oldest first. Empty when `end < start`.
pub fn partitions_for_range(
    restaurant_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<PartitionKey> {
    let mut keys = Vec::new();
    if end < start {
        return keys;
    }
    let last = PartitionKey::for_date(restaurant_id, end);
    let mut key = PartitionKey::for_date(restaurant_id, start);
    loop {
        let done = key == last;
        keys.push(key.clone());
        if done {
            break;
        }
        key = key.next();
    }
    keys
}
