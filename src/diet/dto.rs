use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{CategoryRecord, Nutrients, SelectedMeal, Template};
use super::sessions::Session;

/// Template as handed over by the template-fetch API.
#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub categories: Vec<CategoryRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub client_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub gym_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub template: Template,
    pub selection: Vec<SelectedMeal>,
    pub selected_count: usize,
    pub totals: Nutrients,
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            created_at: s.created_at,
            template: s.engine.template().clone(),
            selection: s.engine.selection_set(),
            selected_count: s.engine.selected_count(),
            totals: s.engine.totals(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_id: Option<String>,
    pub selected: bool,
    pub category_selected: bool,
    pub selected_count: usize,
}
