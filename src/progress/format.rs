use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTier {
    Good,
    Warning,
    Critical,
}

/// Lower bounds (inclusive) of the `good` and `warning` tiers, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub good: f64,
    pub warning: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            good: 80.0,
            warning: 50.0,
        }
    }
}

impl Thresholds {
    pub fn tier(&self, percentage: f64) -> StatusTier {
        if percentage >= self.good {
            StatusTier::Good
        } else if percentage >= self.warning {
            StatusTier::Warning
        } else {
            StatusTier::Critical
        }
    }
}

/// Unrounded share in percent. A zero denominator yields 0.
fn raw_percentage(completed: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    f64::from(completed) * 100.0 / f64::from(denominator)
}

/// Percentage rounded to one decimal. A zero denominator yields 0.
pub fn percentage(completed: u32, denominator: u32) -> f64 {
    (raw_percentage(completed, denominator) * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rate {
    pub completed: u32,
    pub denominator: u32,
    pub percentage: f64,
    pub status: StatusTier,
}

impl Rate {
    pub fn new(completed: u32, denominator: u32, thresholds: &Thresholds) -> Self {
        // Tier from the exact share; rounding is for display only.
        Rate {
            completed,
            denominator,
            percentage: percentage(completed, denominator),
            status: thresholds.tier(raw_percentage(completed, denominator)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_inclusive_at_their_lower_bound() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.tier(100.0), StatusTier::Good);
        assert_eq!(thresholds.tier(80.0), StatusTier::Good);
        assert_eq!(thresholds.tier(79.9), StatusTier::Warning);
        assert_eq!(thresholds.tier(50.0), StatusTier::Warning);
        assert_eq!(thresholds.tier(49.9), StatusTier::Critical);
        assert_eq!(thresholds.tier(0.0), StatusTier::Critical);
    }

    #[test]
    fn zero_denominator_is_zero_percent() {
        let value = percentage(3, 0);
        assert_eq!(value, 0.0);
        assert!(!value.is_nan());

        let rate = Rate::new(0, 0, &Thresholds::default());
        assert_eq!(rate.percentage, 0.0);
        assert_eq!(rate.status, StatusTier::Critical);
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(3, 4), 75.0);
    }

    #[test]
    fn tier_uses_the_unrounded_share() {
        let thresholds = Thresholds::default();
        let below = Rate::new(359, 449, &thresholds);
        assert_eq!(below.percentage, 80.0);
        assert_eq!(below.status, StatusTier::Warning);

        let exact = Rate::new(4, 5, &thresholds);
        assert_eq!(exact.percentage, 80.0);
        assert_eq!(exact.status, StatusTier::Good);

        assert_eq!(Rate::new(1, 2, &thresholds).status, StatusTier::Warning);
    }

    #[test]
    fn serializes_status_in_snake_case() {
        let rate = Rate::new(1, 2, &Thresholds::default());
        let json = serde_json::to_value(rate).unwrap();
        assert_eq!(json["status"], "warning");
        assert_eq!(json["percentage"], 50.0);
    }
}
