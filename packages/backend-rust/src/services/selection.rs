use calibra_algo::{pick_candidate, PickTier};

use crate::db::models::{Item, ItemOwner, SkillUnit, Standing};
use crate::db::CalibrationStore;
use crate::services::calibration::CalibrationError;
use crate::services::standing::ensure_standing;

#[derive(Debug, Clone)]
pub struct Selection {
    pub item: Item,
    /// The learner's standing before answering.
    pub standing: Standing,
    pub tier: PickTier,
}

/// Picks an unseen item of `skill_unit` for the learner.
///
/// In-band items (within `band_radius` of the learner's rating) win; any
/// other unattempted item is the fallback. Attempted items are never
/// returned, so an exhausted skill unit yields `NoItemsAvailable`.
pub async fn select_item<S: CalibrationStore>(
    store: &S,
    learner_id: &str,
    skill_unit: &SkillUnit,
    initial_rating: i32,
    band_radius: i32,
) -> Result<Selection, CalibrationError> {
    let standing = ensure_standing(store, learner_id, &skill_unit.id, initial_rating).await?;
    let candidates = store
        .unattempted_candidates(learner_id, &skill_unit.id)
        .await?;

    let picked = {
        let mut rng = rand::rng();
        pick_candidate(standing.rating, &candidates, band_radius, &mut rng)
            .map(|pick| (pick.candidate.id.clone(), pick.tier))
    };
    let Some((item_id, tier)) = picked else {
        return Err(CalibrationError::NoItemsAvailable);
    };

    let item = store
        .find_item(&item_id)
        .await?
        .ok_or(CalibrationError::NotFound("problem"))?;

    // Ownership can change between the candidate query and this read.
    match &item.owner {
        ItemOwner::SkillUnit(owner) if owner == &skill_unit.id => {}
        ItemOwner::SkillUnit(_) | ItemOwner::Unowned => {
            return Err(CalibrationError::NotFound("problem"));
        }
    }

    tracing::debug!(
        learner_id,
        skill_unit = %skill_unit.slug,
        item_id = %item.id,
        rating = standing.rating,
        item_rating = item.rating,
        ?tier,
        "item selected"
    );

    Ok(Selection {
        item,
        standing,
        tier,
    })
}
