use calibra_algo::rating::RatingUpdate;
use calibra_algo::selection::Candidate;
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::types::Json;

use crate::db::StoreError;

/// A world ("realm"): the top of the subject > domain > skill unit tree.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub order: i32,
}

/// Highest standing a learner holds anywhere inside one subject.
#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct SubjectRating {
    pub subject_id: String,
    pub rating: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Domain {
    pub id: String,
    pub subject_id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub order: i32,
}

/// A skill unit ("archetype"). `elo_min`/`elo_max` belong to authoring and
/// are carried through untouched.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct SkillUnit {
    pub id: String,
    pub domain_id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub elo_min: i32,
    pub elo_max: i32,
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Mcq,
    Numeric,
    Expression,
    Open,
}

impl ItemKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MCQ" => Some(Self::Mcq),
            "NUMERIC" => Some(Self::Numeric),
            "EXPRESSION" => Some(Self::Expression),
            "OPEN" => Some(Self::Open),
            _ => None,
        }
    }

    /// MCQ compares choice ids exactly; the free-response kinds fall back to
    /// a trimmed exact match against the canonical answer.
    pub fn score(&self, canonical: &str, chosen: &str) -> bool {
        match self {
            Self::Mcq => canonical == chosen,
            Self::Numeric | Self::Expression | Self::Open => canonical.trim() == chosen.trim(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOwner {
    SkillUnit(String),
    Unowned,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub owner: ItemOwner,
    pub kind: ItemKind,
    pub rating: i32,
    pub correct_answer: String,
    pub prompt_latex: String,
    pub choices: serde_json::Value,
    pub tags: Vec<String>,
    pub topic: String,
    pub solutions: Option<String>,
    /// Order of the owning subject, when the item hangs off one.
    pub subject_order: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub(crate) struct ItemRow {
    pub id: String,
    pub archetype_id: Option<String>,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub rating: i32,
    pub correct_choice: String,
    pub prompt_latex: String,
    pub choices: Option<Json<serde_json::Value>>,
    pub tags: Json<Vec<String>>,
    pub topic: String,
    pub solutions: Option<String>,
    pub subject_order: Option<i32>,
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let kind = ItemKind::parse(&row.kind).ok_or_else(|| {
            StoreError::Corrupt(format!("problem {} has unknown type {}", row.id, row.kind))
        })?;
        let owner = match row.archetype_id {
            Some(id) if !id.is_empty() => ItemOwner::SkillUnit(id),
            _ => ItemOwner::Unowned,
        };

        Ok(Self {
            id: row.id,
            owner,
            kind,
            rating: row.rating,
            correct_answer: row.correct_choice,
            prompt_latex: row.prompt_latex,
            choices: row.choices.map(|c| c.0).unwrap_or(serde_json::Value::Null),
            tags: row.tags.0,
            topic: row.topic,
            solutions: row.solutions,
            subject_order: row.subject_order,
        })
    }
}

/// Just enough of an unattempted item to run the band pick.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemCandidate {
    pub id: String,
    pub rating: i32,
}

impl Candidate for ItemCandidate {
    fn difficulty(&self) -> i32 {
        self.rating
    }
}

/// Per-(learner, skill unit) rating record. `version` bumps on every
/// mutation and guards concurrent writers.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Standing {
    pub id: String,
    #[sqlx(rename = "userId")]
    pub learner_id: String,
    #[sqlx(rename = "archetypeId")]
    pub skill_unit_id: String,
    pub rating: i32,
    pub attempt_count: i32,
    pub version: i64,
    pub last_played_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    #[sqlx(rename = "userId")]
    pub learner_id: String,
    #[sqlx(rename = "problemId")]
    pub item_id: String,
    pub chosen: String,
    pub correct: bool,
    pub time_ms: i32,
    #[sqlx(rename = "deltaUser")]
    pub delta_learner: i32,
    #[sqlx(rename = "deltaProblem")]
    pub delta_item: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingReason {
    CalibrationAttempt,
    PipelineManualAdjustment,
}

impl RatingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalibrationAttempt => "CALIBRATION_ATTEMPT",
            Self::PipelineManualAdjustment => "PIPELINE_MANUAL_ADJUSTMENT",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct RatingEvent {
    pub id: String,
    #[sqlx(rename = "userId")]
    pub learner_id: String,
    #[sqlx(rename = "archetypeId")]
    pub skill_unit_id: String,
    #[sqlx(rename = "problemId")]
    pub item_id: Option<String>,
    pub before: i32,
    pub after: i32,
    pub delta: i32,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct SessionRecord {
    #[sqlx(rename = "userId")]
    pub learner_id: String,
    pub expires_at: NaiveDateTime,
}

/// Everything the store needs to write one scored attempt atomically.
#[derive(Debug, Clone)]
pub struct AttemptCommit {
    pub learner_id: String,
    pub item_id: String,
    pub standing_id: String,
    pub skill_unit_id: String,
    pub expected_version: i64,
    pub chosen: String,
    pub correct: bool,
    pub time_ms: i32,
    pub update: RatingUpdate,
}

#[derive(Debug, Clone)]
pub struct CommittedAttempt {
    pub attempt: Attempt,
    pub event: RatingEvent,
    pub standing: Standing,
}

#[derive(Debug, Clone)]
pub struct RatingOverride {
    pub standing_id: String,
    pub learner_id: String,
    pub skill_unit_id: String,
    pub expected_version: i64,
    pub before: i32,
    pub after: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, archetype_id: Option<&str>) -> ItemRow {
        ItemRow {
            id: "p1".to_string(),
            archetype_id: archetype_id.map(str::to_string),
            kind: kind.to_string(),
            rating: 400,
            correct_choice: "B".to_string(),
            prompt_latex: "$1+1$".to_string(),
            choices: None,
            tags: Json(vec!["arith".to_string()]),
            topic: "sums".to_string(),
            solutions: None,
            subject_order: Some(2),
        }
    }

    #[test]
    fn test_item_kind_parse() {
        assert_eq!(ItemKind::parse("mcq"), Some(ItemKind::Mcq));
        assert_eq!(ItemKind::parse("NUMERIC"), Some(ItemKind::Numeric));
        assert_eq!(ItemKind::parse("essay"), None);
    }

    #[test]
    fn test_mcq_scoring_is_exact() {
        assert!(ItemKind::Mcq.score("B", "B"));
        assert!(!ItemKind::Mcq.score("B", "b"));
        assert!(!ItemKind::Mcq.score("B", " B"));
        assert!(ItemKind::Numeric.score("42", " 42 "));
    }

    #[test]
    fn test_row_without_archetype_is_unowned() {
        let item = Item::try_from(row("MCQ", None)).unwrap();
        assert_eq!(item.owner, ItemOwner::Unowned);

        let item = Item::try_from(row("MCQ", Some(""))).unwrap();
        assert_eq!(item.owner, ItemOwner::Unowned);

        let item = Item::try_from(row("MCQ", Some("a1"))).unwrap();
        assert_eq!(item.owner, ItemOwner::SkillUnit("a1".to_string()));
        assert_eq!(item.subject_order, Some(2));
    }

    #[test]
    fn test_row_with_unknown_type_is_rejected() {
        let err = Item::try_from(row("ESSAY", Some("a1"))).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
