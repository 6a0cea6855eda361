//! Band Selection
//!
//! Two-tier pick over a learner's unattempted items: uniformly inside the
//! difficulty band when possible, otherwise uniformly over everything left.
//! Callers are responsible for excluding already-attempted items before
//! handing candidates in.

use std::ops::RangeInclusive;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Anything the selector can rank by difficulty.
pub trait Candidate {
    fn difficulty(&self) -> i32;
}

impl Candidate for i32 {
    fn difficulty(&self) -> i32 {
        *self
    }
}

/// Inclusive difficulty window `[center - radius, center + radius]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyBand {
    pub min: i32,
    pub max: i32,
}

impl DifficultyBand {
    pub fn around(center: i32, radius: i32) -> Self {
        let radius = radius.max(0);
        Self {
            min: center.saturating_sub(radius),
            max: center.saturating_add(radius),
        }
    }

    pub fn contains(&self, difficulty: i32) -> bool {
        self.range().contains(&difficulty)
    }

    pub fn range(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickTier {
    InBand,
    Fallback,
}

#[derive(Debug)]
pub struct Pick<'a, C> {
    pub candidate: &'a C,
    pub tier: PickTier,
}

/// Picks one candidate for a learner at `rating`.
///
/// Returns `None` only when `candidates` is empty.
pub fn pick_candidate<'a, C, R>(
    rating: i32,
    candidates: &'a [C],
    band_radius: i32,
    rng: &mut R,
) -> Option<Pick<'a, C>>
where
    C: Candidate,
    R: Rng + ?Sized,
{
    let band = DifficultyBand::around(rating, band_radius);
    let in_band: Vec<&C> = candidates
        .iter()
        .filter(|c| band.contains(c.difficulty()))
        .collect();

    if let Some(&candidate) = in_band.choose(rng) {
        return Some(Pick {
            candidate,
            tier: PickTier::InBand,
        });
    }

    candidates.choose(rng).map(|candidate| Pick {
        candidate,
        tier: PickTier::Fallback,
    })
}
