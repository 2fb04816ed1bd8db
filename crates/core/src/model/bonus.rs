use serde::{Deserialize, Serialize};

/// Courses finished in under 30 minutes earn the top tier.
pub const GOLD_THRESHOLD_SECS: u64 = 1800;
/// Courses finished in under an hour earn the middle tier.
pub const SILVER_THRESHOLD_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusTier {
    Gold,
    Silver,
    Bronze,
}

impl BonusTier {
    #[must_use]
    pub fn for_elapsed(elapsed_secs: u64) -> Self {
        if elapsed_secs < GOLD_THRESHOLD_SECS {
            BonusTier::Gold
        } else if elapsed_secs < SILVER_THRESHOLD_SECS {
            BonusTier::Silver
        } else {
            BonusTier::Bronze
        }
    }

    #[must_use]
    pub fn points(self) -> u32 {
        match self {
            BonusTier::Gold => 50,
            BonusTier::Silver => 25,
            BonusTier::Bronze => 10,
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            BonusTier::Gold => "Python Master (Gold)",
            BonusTier::Silver => "Agile Adventurer (Silver)",
            BonusTier::Bronze => "Dedicated Explorer (Bronze)",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            BonusTier::Gold => "🏆",
            BonusTier::Silver => "🥈",
            BonusTier::Bronze => "🥉",
        }
    }
}

/// Persisted record of the completion-time bonus.
///
/// Its presence in the store is what keeps the bonus from being computed twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBonus {
    pub points: u32,
    pub title: String,
    pub icon: String,
    pub time_string: String,
}

impl TimeBonus {
    #[must_use]
    pub fn from_elapsed(elapsed_secs: u64) -> Self {
        let tier = BonusTier::for_elapsed(elapsed_secs);
        Self {
            points: tier.points(),
            title: tier.title().to_owned(),
            icon: tier.icon().to_owned(),
            time_string: format!("{}m {}s", elapsed_secs / 60, elapsed_secs % 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(BonusTier::for_elapsed(0), BonusTier::Gold);
        assert_eq!(BonusTier::for_elapsed(1799), BonusTier::Gold);
        assert_eq!(BonusTier::for_elapsed(1800), BonusTier::Silver);
        assert_eq!(BonusTier::for_elapsed(3599), BonusTier::Silver);
        assert_eq!(BonusTier::for_elapsed(3600), BonusTier::Bronze);
        assert_eq!(BonusTier::for_elapsed(3601), BonusTier::Bronze);
    }

    #[test]
    fn bonus_record_carries_points_and_time() {
        let bonus = TimeBonus::from_elapsed(1799);
        assert_eq!(bonus.points, 50);
        assert_eq!(bonus.time_string, "29m 59s");

        assert_eq!(TimeBonus::from_elapsed(1800).points, 25);
        assert_eq!(TimeBonus::from_elapsed(3601).points, 10);
    }
}
