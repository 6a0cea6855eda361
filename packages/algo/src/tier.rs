//! Rating tiers shown next to a learner's rating.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingTier {
    Novice,
    Adept,
    Expert,
    Master,
    Archmage,
}

pub fn calculate_tier(rating: i32) -> RatingTier {
    match rating {
        r if r < 800 => RatingTier::Novice,
        r if r < 1400 => RatingTier::Adept,
        r if r < 1700 => RatingTier::Expert,
        r if r < 2000 => RatingTier::Master,
        _ => RatingTier::Archmage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(calculate_tier(0), RatingTier::Novice);
        assert_eq!(calculate_tier(799), RatingTier::Novice);
        assert_eq!(calculate_tier(800), RatingTier::Adept);
        assert_eq!(calculate_tier(1399), RatingTier::Adept);
        assert_eq!(calculate_tier(1400), RatingTier::Expert);
        assert_eq!(calculate_tier(1700), RatingTier::Master);
        assert_eq!(calculate_tier(2000), RatingTier::Archmage);
    }

    #[test]
    fn test_tier_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&RatingTier::Archmage).unwrap(),
            "\"ARCHMAGE\""
        );
    }
}
