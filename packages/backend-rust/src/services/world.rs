use std::collections::HashMap;

use calibra_algo::{calculate_tier, RatingTier};
use serde::Serialize;

use crate::db::models::{Domain, SkillUnit, Standing, Subject, SubjectRating};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldView {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<RatingTier>,
    pub is_enrolled: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldList {
    pub enrolled: Vec<WorldView>,
    pub available: Vec<WorldView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub archetype_count: usize,
    pub enrolled_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    pub is_enrolled: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldDetail {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub domains: Vec<DomainSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillUnitView {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    /// 0 when the learner has no standing here.
    pub rating: i32,
    pub tier: RatingTier,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainDetail {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub is_enrolled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    pub archetypes: Vec<SkillUnitView>,
}

/// Splits subjects into the ones the learner has a positive standing in and
/// the rest. Enrolled worlds sort by rating (highest first), available ones
/// by authoring order, then title.
pub fn world_list(subjects: Vec<Subject>, ratings: &[SubjectRating]) -> WorldList {
    let best: HashMap<&str, i32> = ratings
        .iter()
        .filter(|r| r.rating > 0)
        .map(|r| (r.subject_id.as_str(), r.rating))
        .collect();

    let (mut enrolled, mut available): (Vec<WorldView>, Vec<WorldView>) = subjects
        .into_iter()
        .map(|subject| {
            let rating = best.get(subject.id.as_str()).copied();
            WorldView {
                id: subject.id,
                slug: subject.slug,
                title: subject.title,
                summary: subject.summary,
                rating,
                tier: rating.map(calculate_tier),
                is_enrolled: rating.is_some(),
                order: subject.order,
            }
        })
        .partition(|world| world.is_enrolled);

    enrolled.sort_by(|a, b| b.rating.cmp(&a.rating));
    available.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));

    WorldList {
        enrolled,
        available,
    }
}

/// A subject with per-domain enrolment counts. A domain counts as enrolled
/// once any of its skill units has a standing.
pub fn world_detail(
    subject: Subject,
    domains: Vec<Domain>,
    units: &[SkillUnit],
    standings: &[Standing],
) -> WorldDetail {
    let ratings: HashMap<&str, i32> = standings
        .iter()
        .map(|s| (s.skill_unit_id.as_str(), s.rating))
        .collect();

    let mut domains: Vec<DomainSummary> = domains
        .into_iter()
        .map(|domain| {
            let unit_ratings: Vec<Option<i32>> = units
                .iter()
                .filter(|unit| unit.domain_id == domain.id)
                .map(|unit| ratings.get(unit.id.as_str()).copied())
                .collect();
            let enrolled_count = unit_ratings.iter().flatten().count();
            let is_enrolled = enrolled_count > 0;
            let rating = is_enrolled.then(|| {
                unit_ratings
                    .iter()
                    .flatten()
                    .copied()
                    .fold(0, i32::max)
            });

            DomainSummary {
                id: domain.id,
                slug: domain.slug,
                title: domain.title,
                summary: domain.summary,
                archetype_count: unit_ratings.len(),
                enrolled_count,
                rating,
                is_enrolled,
                order: domain.order,
            }
        })
        .collect();
    domains.sort_by_key(|domain| domain.order);

    WorldDetail {
        id: subject.id,
        slug: subject.slug,
        title: subject.title,
        summary: subject.summary,
        domains,
    }
}

/// `units` are expected in authoring order.
pub fn domain_detail(domain: Domain, units: Vec<SkillUnit>, standings: &[Standing]) -> DomainDetail {
    let ratings: HashMap<&str, i32> = standings
        .iter()
        .map(|s| (s.skill_unit_id.as_str(), s.rating))
        .collect();

    let mut archetypes: Vec<(i32, SkillUnitView)> = units
        .into_iter()
        .map(|unit| {
            let rating = ratings.get(unit.id.as_str()).copied().unwrap_or(0);
            let view = SkillUnitView {
                id: unit.id,
                slug: unit.slug,
                title: unit.title,
                summary: unit.summary,
                rating,
                tier: calculate_tier(rating),
            };
            (unit.order, view)
        })
        .collect();
    archetypes.sort_by_key(|(order, _)| *order);
    let archetypes: Vec<SkillUnitView> = archetypes.into_iter().map(|(_, view)| view).collect();

    let is_enrolled = archetypes.iter().any(|a| a.rating > 0);
    let rating = is_enrolled
        .then(|| archetypes.iter().map(|a| a.rating).max())
        .flatten();

    DomainDetail {
        id: domain.id,
        slug: domain.slug,
        title: domain.title,
        summary: domain.summary,
        is_enrolled,
        rating,
        archetypes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, order: i32) -> SkillUnit {
        SkillUnit {
            id: id.into(),
            domain_id: "d1".into(),
            slug: format!("{id}-slug"),
            title: id.to_uppercase(),
            summary: None,
            elo_min: 0,
            elo_max: 3000,
            order,
        }
    }

    fn standing(unit: &str, rating: i32) -> Standing {
        Standing {
            id: format!("s-{unit}"),
            learner_id: "u1".into(),
            skill_unit_id: unit.into(),
            rating,
            attempt_count: 0,
            version: 0,
            last_played_at: None,
        }
    }

    fn domain() -> Domain {
        domain_in("d1", "algebra", 0)
    }

    fn domain_in(id: &str, slug: &str, order: i32) -> Domain {
        Domain {
            id: id.into(),
            subject_id: "math".into(),
            slug: slug.into(),
            title: slug.to_uppercase(),
            summary: None,
            order,
        }
    }

    fn subject(id: &str, title: &str, order: i32) -> Subject {
        Subject {
            id: id.into(),
            slug: id.into(),
            title: title.into(),
            summary: None,
            order,
        }
    }

    fn subject_rating(subject_id: &str, rating: i32) -> SubjectRating {
        SubjectRating {
            subject_id: subject_id.into(),
            rating,
        }
    }

    fn unit_in(id: &str, domain_id: &str) -> SkillUnit {
        SkillUnit {
            domain_id: domain_id.into(),
            ..unit(id, 0)
        }
    }

    #[test]
    fn test_world_list_splits_and_sorts() {
        let list = world_list(
            vec![
                subject("physics", "Physics", 2),
                subject("math", "Mathematics", 1),
                subject("chem", "Chemistry", 2),
                subject("bio", "Biology", 0),
                subject("art", "Art", 5),
            ],
            &[
                subject_rating("math", 450),
                subject_rating("physics", 1500),
                subject_rating("art", 0),
            ],
        );

        let enrolled: Vec<&str> = list.enrolled.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(enrolled, vec!["physics", "math"]);
        assert_eq!(list.enrolled[0].tier, Some(RatingTier::Expert));
        assert_eq!(list.enrolled[1].rating, Some(450));

        let available: Vec<&str> = list.available.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(available, vec!["bio", "chem", "art"]);
        assert!(list.available.iter().all(|w| !w.is_enrolled && w.tier.is_none()));
    }

    #[test]
    fn test_world_view_omits_rating_when_not_enrolled() {
        let list = world_list(vec![subject("math", "Mathematics", 1)], &[]);
        let body = serde_json::to_value(&list).unwrap();
        let world = &body["available"][0];
        assert_eq!(world["isEnrolled"], false);
        assert!(world.get("rating").is_none());
        assert!(world.get("tier").is_none());
    }

    #[test]
    fn test_world_detail_counts_enrolment_per_domain() {
        let detail = world_detail(
            subject("math", "Mathematics", 1),
            vec![domain_in("geo", "geometry", 2), domain_in("alg", "algebra", 1)],
            &[
                unit_in("a1", "alg"),
                unit_in("a2", "alg"),
                unit_in("a3", "alg"),
                unit_in("g1", "geo"),
            ],
            &[standing("a1", 300), standing("a3", 820)],
        );

        assert_eq!(detail.domains[0].id, "alg");
        assert_eq!(detail.domains[0].archetype_count, 3);
        assert_eq!(detail.domains[0].enrolled_count, 2);
        assert_eq!(detail.domains[0].rating, Some(820));
        assert!(detail.domains[0].is_enrolled);

        assert_eq!(detail.domains[1].id, "geo");
        assert_eq!(detail.domains[1].archetype_count, 1);
        assert_eq!(detail.domains[1].enrolled_count, 0);
        assert_eq!(detail.domains[1].rating, None);
        assert!(!detail.domains[1].is_enrolled);
    }

    #[test]
    fn test_unenrolled_domain() {
        let detail = domain_detail(domain(), vec![unit("a", 1), unit("b", 0)], &[]);
        assert!(!detail.is_enrolled);
        assert_eq!(detail.rating, None);
        assert_eq!(detail.archetypes[0].id, "b");
        assert_eq!(detail.archetypes[0].tier, RatingTier::Novice);
    }

    #[test]
    fn test_enrolled_domain_reports_max_rating() {
        let detail = domain_detail(
            domain(),
            vec![unit("a", 0), unit("b", 1)],
            &[standing("a", 900), standing("b", 1500)],
        );
        assert!(detail.is_enrolled);
        assert_eq!(detail.rating, Some(1500));
        assert_eq!(detail.archetypes[0].tier, RatingTier::Adept);
        assert_eq!(detail.archetypes[1].tier, RatingTier::Expert);
    }
}
