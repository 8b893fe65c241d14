//! Submission body for the diet-logging API.
//!
//! Selected foods are grouped under a fixed table of ten meal categories. The
//! table is authoritative: titles, taglines and time ranges come from here,
//! never from the template that was loaded.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use time::{macros::format_description, Date};
use tracing::debug;
use uuid::Uuid;

use super::model::{Nutrients, SelectedMeal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalCategory {
    pub id: &'static str,
    pub title: &'static str,
    pub tagline: &'static str,
    pub time_range: &'static str,
}

/// Category used for selections that do not name one.
pub const DEFAULT_CATEGORY_ID: &str = "5";

pub static CANONICAL_CATEGORIES: [CanonicalCategory; 10] = [
    CanonicalCategory {
        id: "1",
        title: "Early Morning Detox",
        tagline: "Wake up your metabolism",
        time_range: "5:30 AM - 6:00 AM",
    },
    CanonicalCategory {
        id: "2",
        title: "Pre-Breakfast Starter",
        tagline: "A light start to the day",
        time_range: "6:00 AM - 6:30 AM",
    },
    CanonicalCategory {
        id: "3",
        title: "Pre-Workout",
        tagline: "Fuel up before training",
        time_range: "6:30 AM - 7:00 AM",
    },
    CanonicalCategory {
        id: "4",
        title: "Post-Workout",
        tagline: "Recover and rebuild",
        time_range: "7:30 AM - 8:00 AM",
    },
    CanonicalCategory {
        id: "5",
        title: "Breakfast",
        tagline: "Start your day strong",
        time_range: "8:30 AM - 9:30 AM",
    },
    CanonicalCategory {
        id: "6",
        title: "Mid-Morning Snack",
        tagline: "Keep your energy steady",
        time_range: "10:30 AM - 11:00 AM",
    },
    CanonicalCategory {
        id: "7",
        title: "Lunch",
        tagline: "Balanced midday meal",
        time_range: "1:00 PM - 2:00 PM",
    },
    CanonicalCategory {
        id: "8",
        title: "Evening Snack",
        tagline: "Beat the afternoon slump",
        time_range: "4:00 PM - 5:00 PM",
    },
    CanonicalCategory {
        id: "9",
        title: "Dinner",
        tagline: "Light and nourishing",
        time_range: "7:30 PM - 8:30 PM",
    },
    CanonicalCategory {
        id: "10",
        title: "Bed Time",
        tagline: "Wind down for recovery",
        time_range: "10:00 PM - 10:30 PM",
    },
];

pub fn canonical_category(id: &str) -> Option<&'static CanonicalCategory> {
    CANONICAL_CATEGORIES.iter().find(|c| c.id == id)
}

/// Keys the wire food sets itself; passthrough fields never override them.
const RESERVED_FOOD_KEYS: &[&str] = &[
    "id",
    "name",
    "quantity",
    "image_url",
    "selected",
    "categoryId",
    "categoryTitle",
    "calories",
    "protein",
    "carbs",
    "fat",
    "fiber",
    "sugar",
    "calcium",
    "magnesium",
    "iron",
    "sodium",
    "potassium",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadFood {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub nutrients: Nutrients,
    /// `"<n> serving"`
    pub quantity: String,
    pub image_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadCategory {
    pub id: String,
    pub title: String,
    pub tagline: String,
    pub time_range: String,
    pub food_list: Vec<PayloadFood>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DietPayload {
    pub client_id: String,
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    pub diet_data: Vec<PayloadCategory>,
    pub gym_id: Option<String>,
}

fn serialize_date<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    let text = date
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]"))
}

fn to_payload_food(entry: &SelectedMeal) -> PayloadFood {
    let meal = &entry.meal;
    let extra = meal
        .extra
        .iter()
        .filter(|(k, _)| !RESERVED_FOOD_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    PayloadFood {
        id: Uuid::new_v4().to_string(),
        name: meal.name.clone(),
        nutrients: meal.nutrients.sanitized(),
        quantity: format!("{} serving", meal.quantity.max(1)),
        image_url: meal.image_url.clone(),
        extra,
    }
}

/// Group the selection under the canonical categories.
///
/// Entries without a category go to Breakfast; entries naming a category
/// outside the table are dropped. Categories that end up without foods are
/// left out. An empty selection gives an empty `diet_data`.
pub fn build_payload(
    selection: &[SelectedMeal],
    date: Date,
    client_id: impl Into<String>,
    gym_id: Option<String>,
) -> DietPayload {
    let mut grouped: HashMap<&str, Vec<&SelectedMeal>> = HashMap::new();
    for entry in selection {
        let category_id = entry
            .category_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_ID);
        grouped.entry(category_id).or_default().push(entry);
    }

    for (category_id, entries) in &grouped {
        if canonical_category(category_id).is_none() {
            debug!(%category_id, foods = entries.len(), "dropping foods of unknown category");
        }
    }

    let diet_data: Vec<PayloadCategory> = CANONICAL_CATEGORIES
        .iter()
        .filter_map(|category| {
            let entries = grouped.get(category.id)?;
            let food_list: Vec<PayloadFood> = entries.iter().map(|e| to_payload_food(e)).collect();
            if food_list.is_empty() {
                return None;
            }
            Some(PayloadCategory {
                id: category.id.to_owned(),
                title: category.title.to_owned(),
                tagline: category.tagline.to_owned(),
                time_range: category.time_range.to_owned(),
                food_list,
            })
        })
        .collect();

    debug!(
        foods = selection.len(),
        categories = diet_data.len(),
        "diet payload built"
    );

    DietPayload {
        client_id: client_id.into(),
        date,
        diet_data,
        gym_id,
    }
}
