use serde::{Deserialize, Serialize};

/// Vote tally over every review a user has written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpfulRatio {
    pub upvotes: u64,
    pub total: u64,
}

impl HelpfulRatio {
    pub fn new(upvotes: u64, total: u64) -> Self {
        debug_assert!(upvotes <= total, "upvotes cannot exceed total votes");
        Self { upvotes, total }
    }

    /// Exact check of `upvotes / total >= percent / 100`.
    ///
    /// A tally with no votes has no ratio and never qualifies.
    pub fn meets_percent(&self, percent: u32) -> bool {
        self.total > 0 && self.upvotes.saturating_mul(100) >= u64::from(percent) * self.total
    }

    /// Floor of the helpful percentage, `None` when no votes were cast.
    pub fn percent(&self) -> Option<u64> {
        (self.total > 0).then(|| self.upvotes.saturating_mul(100) / self.total)
    }
}

/// A user's current value for one criteria type.
///
/// `value` is the count (or rank) the threshold is compared against. `ratio`
/// is only populated for two-part criteria.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub value: u64,
    pub ratio: Option<HelpfulRatio>,
}

impl Aggregate {
    pub fn count(value: u64) -> Self {
        Self { value, ratio: None }
    }

    pub fn with_ratio(value: u64, ratio: HelpfulRatio) -> Self {
        Self {
            value,
            ratio: Some(ratio),
        }
    }

    /// Whether the user has any recorded activity toward this aggregate.
    pub fn is_started(&self) -> bool {
        self.value > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_boundary_is_inclusive() {
        let ratio = HelpfulRatio::new(3, 4);
        assert!(ratio.meets_percent(75));
        assert!(!ratio.meets_percent(76));
        assert_eq!(ratio.percent(), Some(75));
    }

    #[test]
    fn empty_tally_never_qualifies() {
        let ratio = HelpfulRatio::new(0, 0);
        assert!(!ratio.meets_percent(0));
        assert_eq!(ratio.percent(), None);
    }
}
