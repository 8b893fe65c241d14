use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::lenient;

/// Per-serving nutrient values of a food.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    #[serde(default, deserialize_with = "lenient::number")]
    pub calories: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub protein: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fat: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fiber: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sugar: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub calcium: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub magnesium: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub iron: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sodium: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub potassium: f64,
}

impl Nutrients {
    /// Same values with anything non-finite or negative replaced by `0`.
    pub fn sanitized(&self) -> Self {
        let s = lenient::sanitize_number;
        Self {
            calories: s(self.calories),
            protein: s(self.protein),
            carbs: s(self.carbs),
            fat: s(self.fat),
            fiber: s(self.fiber),
            sugar: s(self.sugar),
            calcium: s(self.calcium),
            magnesium: s(self.magnesium),
            iron: s(self.iron),
            sodium: s(self.sodium),
            potassium: s(self.potassium),
        }
    }

    pub fn add_scaled(&mut self, other: &Nutrients, factor: f64) {
        let other = other.sanitized();
        self.calories += other.calories * factor;
        self.protein += other.protein * factor;
        self.carbs += other.carbs * factor;
        self.fat += other.fat * factor;
        self.fiber += other.fiber * factor;
        self.sugar += other.sugar * factor;
        self.calcium += other.calcium * factor;
        self.magnesium += other.magnesium * factor;
        self.iron += other.iron * factor;
        self.sodium += other.sodium * factor;
        self.potassium += other.potassium * factor;
    }
}

fn default_quantity() -> u32 {
    1
}

/// One food inside a template category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(flatten)]
    pub nutrients: Nutrients,
    #[serde(default = "default_quantity", deserialize_with = "lenient::quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub image_url: String,
    #[serde(default, deserialize_with = "lenient::unselected")]
    pub selected: bool,
    /// Server fields outside the selection contract, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MealRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nutrients: Nutrients::default(),
            quantity: 1,
            image_url: String::new(),
            selected: false,
            extra: Map::new(),
        }
    }
}

/// A time-of-day slot ("Breakfast", "Lunch", ...) owning its foods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub tagline: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub time_range: String,
    #[serde(default)]
    pub food_list: Vec<MealRecord>,
    #[serde(default, deserialize_with = "lenient::unselected")]
    pub selected: bool,
}

impl CategoryRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        food_list: Vec<MealRecord>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tagline: String::new(),
            time_range: String::new(),
            food_list,
            selected: false,
        }
    }

    /// True iff there is at least one food and every food is selected.
    pub fn all_meals_selected(&self) -> bool {
        !self.food_list.is_empty() && self.food_list.iter().all(|m| m.selected)
    }

    pub(crate) fn sync_selected(&mut self) {
        self.selected = self.all_meals_selected();
    }

    pub(crate) fn meal_mut(&mut self, meal_id: &str) -> Option<&mut MealRecord> {
        self.food_list.iter_mut().find(|m| m.id == meal_id)
    }
}

/// Categories of one diet log, as loaded for a single editing session.
///
/// Building a template (directly or through serde) clears every selection
/// flag, whatever the source data carried. Missing, blank or repeated ids are
/// replaced by positional ones (`category-2`, `<category>-meal-3`) so every
/// category and every food within it can be addressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CategoryRecord>", into = "Vec<CategoryRecord>")]
pub struct Template {
    categories: Vec<CategoryRecord>,
}

impl Template {
    pub fn new(mut categories: Vec<CategoryRecord>) -> Self {
        let mut category_ids = HashSet::new();
        for (index, category) in categories.iter_mut().enumerate() {
            category.id = claim_id(&mut category_ids, &category.id, || {
                format!("category-{}", index + 1)
            });
            category.selected = false;

            let mut meal_ids = HashSet::new();
            for (meal_index, meal) in category.food_list.iter_mut().enumerate() {
                meal.id = claim_id(&mut meal_ids, &meal.id, || {
                    format!("{}-meal-{}", category.id, meal_index + 1)
                });
                meal.selected = false;
                // Annotations belong to SelectedMeal, not to the stored food.
                meal.extra.remove("categoryId");
                meal.extra.remove("categoryTitle");
            }
        }
        Self { categories }
    }

    pub fn categories(&self) -> &[CategoryRecord] {
        &self.categories
    }

    pub fn category(&self, category_id: &str) -> Option<&CategoryRecord> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    pub(crate) fn category_mut(&mut self, category_id: &str) -> Option<&mut CategoryRecord> {
        self.categories.iter_mut().find(|c| c.id == category_id)
    }

    pub(crate) fn categories_mut(&mut self) -> impl Iterator<Item = &mut CategoryRecord> {
        self.categories.iter_mut()
    }

    pub fn meal_count(&self) -> usize {
        self.categories.iter().map(|c| c.food_list.len()).sum()
    }
}

/// Keep `id` if it is non-blank and unused, otherwise take the first free
/// positional id.
fn claim_id(seen: &mut HashSet<String>, id: &str, positional: impl Fn() -> String) -> String {
    let trimmed = id.trim();
    if !trimmed.is_empty() && seen.insert(trimmed.to_owned()) {
        return trimmed.to_owned();
    }

    let base = positional();
    let mut candidate = base.clone();
    let mut n = 1;
    while !seen.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{base}-{n}");
    }
    warn!(original = %id, assigned = %candidate, "template id missing or repeated");
    candidate
}

impl From<Vec<CategoryRecord>> for Template {
    fn from(categories: Vec<CategoryRecord>) -> Self {
        Self::new(categories)
    }
}

impl From<Template> for Vec<CategoryRecord> {
    fn from(template: Template) -> Self {
        template.categories
    }
}

/// A selected food annotated with the category it was picked from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedMeal {
    #[serde(flatten)]
    pub meal: MealRecord,
    #[serde(
        default,
        deserialize_with = "lenient::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_title: Option<String>,
}
