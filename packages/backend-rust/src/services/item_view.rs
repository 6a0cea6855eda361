use serde::Serialize;
use serde_json::Value;

use crate::db::models::{Item, ItemKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    pub id: String,
    pub content: String,
}

/// What a learner sees of an item. Carries no answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub prompt_latex: String,
    pub choices: Vec<ChoiceView>,
    pub topic: String,
    pub tags: Vec<String>,
    /// Item difficulty.
    pub rating: i32,
    pub user_rating: i32,
    pub attempt_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solutions: Option<String>,
    /// Order of the item's subject; 1 when it has none.
    pub subject_order: i32,
}

impl ProblemView {
    pub fn new(item: &Item, user_rating: i32, attempt_count: i32) -> Self {
        let choices = match item.kind {
            ItemKind::Mcq => normalize_choices(&item.choices),
            _ => Vec::new(),
        };

        Self {
            id: item.id.clone(),
            kind: item.kind,
            prompt_latex: item.prompt_latex.clone(),
            choices,
            topic: item.topic.clone(),
            tags: item.tags.clone(),
            rating: item.rating,
            user_rating,
            attempt_count,
            solutions: item.solutions.clone(),
            subject_order: item.subject_order.unwrap_or(1),
        }
    }
}

/// Accepts `{"A": ..., "B": ...}` or `[..., ...]` (ids `A`, `B`, ...).
pub fn normalize_choices(raw: &Value) -> Vec<ChoiceView> {
    match raw {
        Value::Object(map) => map
            .iter()
            .map(|(id, value)| ChoiceView {
                id: id.clone(),
                content: choice_content(value),
            })
            .collect(),
        Value::Array(values) => values
            .iter()
            .enumerate()
            .map(|(index, value)| ChoiceView {
                id: choice_label(index),
                content: choice_content(value),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn choice_label(index: usize) -> String {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .filter(u8::is_ascii_uppercase)
        .map(|b| char::from(b).to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

fn choice_content(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(fields) => ["content", "latex", "text"]
            .iter()
            .filter_map(|key| fields.get(*key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
