use serde::Serialize;

/// Period-over-period change of one scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonStat {
    pub current: f64,
    pub previous: f64,
    /// Signed percentage string, e.g. `"+12.5%"`.
    pub change: String,
    /// `current >= previous`; drives the green/red styling of a card.
    pub is_positive: bool,
}

impl ComparisonStat {
    pub fn new(current: f64, previous: f64) -> Self {
        Self {
            current,
            previous,
            change: calculate_change(current, previous),
            is_positive: current >= previous,
        }
    }
}

/// `(current - previous) / previous * 100` with one decimal and an explicit
/// `+` for growth. A zero `previous` always reports `"+100%"`.
pub fn calculate_change(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return "+100%".to_string();
    }
    let change = (current - previous) / previous * 100.0;
    let sign = if change > 0.0 { "+" } else { "" };
    format!("{sign}{change:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_previous_is_plus_hundred() {
        assert_eq!(calculate_change(100.0, 0.0), "+100%");
        assert_eq!(calculate_change(0.0, 0.0), "+100%");
    }

    #[test]
    fn growth_and_decline_are_signed() {
        assert_eq!(calculate_change(150.0, 100.0), "+50.0%");
        assert_eq!(calculate_change(50.0, 100.0), "-50.0%");
        assert_eq!(calculate_change(100.0, 100.0), "0.0%");
        assert_eq!(calculate_change(1.0, 3.0), "-66.7%");
    }

    #[test]
    fn stat_flags_non_negative_change_as_positive() {
        assert!(ComparisonStat::new(10.0, 10.0).is_positive);
        assert!(!ComparisonStat::new(9.0, 10.0).is_positive);
        assert_eq!(ComparisonStat::new(3.0, 2.0).change, "+50.0%");
    }
}
