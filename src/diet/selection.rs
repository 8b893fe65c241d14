//! Two-level (category -> meal) selection state over a loaded template.
//!
//! After every operation:
//! - a category is selected iff it has foods and all of them are selected;
//! - [`SelectionEngine::selection_set`] holds exactly the selected foods.
//!
//! The selection set is derived from the per-meal flags on every read, so it
//! cannot drift from the template.

use thiserror::Error;
use tracing::{debug, warn};

use super::model::{CategoryRecord, Nutrients, SelectedMeal, Template};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("category {0} not found")]
    CategoryNotFound(String),
    #[error("meal {meal_id} not found in category {category_id}")]
    MealNotFound {
        category_id: String,
        meal_id: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    template: Template,
}

impl SelectionEngine {
    pub fn new(template: Template) -> Self {
        // Meals are unselected after load; categories follow from them.
        let mut engine = Self { template };
        engine.template.categories_mut().for_each(CategoryRecord::sync_selected);
        engine
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Swap in a freshly fetched template; the previous selection is dropped with it.
    pub fn replace_template(&mut self, template: Template) {
        *self = Self::new(template);
    }

    /// Select every food of the category, or deselect them all if they already are.
    ///
    /// Returns the category's new `selected` flag. A category without foods stays
    /// unselected.
    pub fn toggle_category(&mut self, category_id: &str) -> Result<bool, SelectionError> {
        let Some(category) = self.template.category_mut(category_id) else {
            warn!(%category_id, "toggle_category: unknown category");
            return Err(SelectionError::CategoryNotFound(category_id.to_owned()));
        };

        if category.food_list.is_empty() {
            debug!(%category_id, "toggle_category on empty category");
            category.selected = false;
            return Ok(false);
        }

        let next = !category.all_meals_selected();
        for meal in &mut category.food_list {
            meal.selected = next;
        }
        category.selected = next;

        debug!(
            %category_id,
            selected = next,
            meals = category.food_list.len(),
            "category toggled"
        );
        Ok(next)
    }

    /// Flip one food and re-derive its category. Returns the food's new flag.
    pub fn toggle_meal(
        &mut self,
        category_id: &str,
        meal_id: &str,
    ) -> Result<bool, SelectionError> {
        let Some(category) = self.template.category_mut(category_id) else {
            warn!(%category_id, %meal_id, "toggle_meal: unknown category");
            return Err(SelectionError::CategoryNotFound(category_id.to_owned()));
        };
        let Some(meal) = category.meal_mut(meal_id) else {
            warn!(%category_id, %meal_id, "toggle_meal: unknown meal");
            return Err(SelectionError::MealNotFound {
                category_id: category_id.to_owned(),
                meal_id: meal_id.to_owned(),
            });
        };

        meal.selected = !meal.selected;
        let next = meal.selected;
        category.sync_selected();

        debug!(
            %category_id,
            %meal_id,
            selected = next,
            category_selected = category.selected,
            "meal toggled"
        );
        Ok(next)
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        for category in self.template.categories_mut() {
            for meal in &mut category.food_list {
                meal.selected = false;
            }
            category.selected = false;
        }
    }

    /// Currently selected foods with their category id and title, in template order.
    pub fn selection_set(&self) -> Vec<SelectedMeal> {
        self.template
            .categories()
            .iter()
            .flat_map(|category| {
                category
                    .food_list
                    .iter()
                    .filter(|m| m.selected)
                    .map(move |meal| SelectedMeal {
                        meal: meal.clone(),
                        category_id: Some(category.id.clone()),
                        category_title: Some(category.title.clone()),
                    })
            })
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.template
            .categories()
            .iter()
            .map(|c| c.food_list.iter().filter(|m| m.selected).count())
            .sum()
    }

    pub fn has_selection(&self) -> bool {
        self.template
            .categories()
            .iter()
            .any(|c| c.food_list.iter().any(|m| m.selected))
    }

    /// Nutrients of the current selection, each food scaled by its serving count.
    pub fn totals(&self) -> Nutrients {
        let mut totals = Nutrients::default();
        for category in self.template.categories() {
            for meal in category.food_list.iter().filter(|m| m.selected) {
                totals.add_scaled(&meal.nutrients, f64::from(meal.quantity));
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::diet::model::MealRecord;

    fn meal(id: &str, calories: f64) -> MealRecord {
        let mut m = MealRecord::new(id, format!("food {id}"));
        m.nutrients.calories = calories;
        m
    }

    fn engine() -> SelectionEngine {
        SelectionEngine::new(Template::new(vec![
            CategoryRecord::new(
                "5",
                "Breakfast",
                vec![meal("b1", 100.0), meal("b2", 50.0), meal("b3", 10.0)],
            ),
            CategoryRecord::new("7", "Lunch", vec![meal("l1", 400.0), meal("l2", 80.0)]),
            CategoryRecord::new("8", "Evening Snack", Vec::new()),
        ]))
    }

    fn flagged(engine: &SelectionEngine) -> BTreeSet<(String, String)> {
        engine
            .template()
            .categories()
            .iter()
            .flat_map(|c| {
                c.food_list
                    .iter()
                    .filter(|m| m.selected)
                    .map(move |m| (c.id.clone(), m.id.clone()))
            })
            .collect()
    }

    fn in_selection(engine: &SelectionEngine) -> BTreeSet<(String, String)> {
        engine
            .selection_set()
            .into_iter()
            .map(|s| (s.category_id.unwrap(), s.meal.id))
            .collect()
    }

    fn assert_consistent(engine: &SelectionEngine) {
        for c in engine.template().categories() {
            let expected = !c.food_list.is_empty() && c.food_list.iter().all(|m| m.selected);
            assert_eq!(c.selected, expected, "category {} flag out of sync", c.id);
        }
        let selection = engine.selection_set();
        assert_eq!(selection.len(), engine.selected_count());
        assert_eq!(flagged(engine), in_selection(engine));
    }

    #[test]
    fn category_toggle_selects_then_clears_every_meal() {
        let mut engine = engine();

        assert_eq!(engine.toggle_category("5"), Ok(true));
        let breakfast = engine.template().category("5").unwrap();
        assert!(breakfast.selected);
        assert!(breakfast.food_list.iter().all(|m| m.selected));
        assert_eq!(engine.selected_count(), 3);

        assert_eq!(engine.toggle_category("5"), Ok(false));
        let breakfast = engine.template().category("5").unwrap();
        assert!(!breakfast.selected);
        assert!(breakfast.food_list.iter().all(|m| !m.selected));
        assert!(engine.selection_set().is_empty());
    }

    #[test]
    fn category_toggle_on_partial_selection_selects_all() {
        let mut engine = engine();
        engine.toggle_meal("5", "b2").unwrap();

        assert_eq!(engine.toggle_category("5"), Ok(true));
        assert_eq!(engine.selected_count(), 3);
        assert_consistent(&engine);
    }

    #[test]
    fn meal_toggle_updates_parent() {
        let mut engine = engine();

        assert_eq!(engine.toggle_meal("7", "l1"), Ok(true));
        assert!(!engine.template().category("7").unwrap().selected);
        let selection = engine.selection_set();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection[0].meal.id, "l1");
        assert_eq!(selection[0].category_id.as_deref(), Some("7"));
        assert_eq!(selection[0].category_title.as_deref(), Some("Lunch"));

        assert_eq!(engine.toggle_meal("7", "l2"), Ok(true));
        assert!(engine.template().category("7").unwrap().selected);
        let ids: BTreeSet<_> = engine.selection_set().into_iter().map(|s| s.meal.id).collect();
        assert_eq!(ids, BTreeSet::from(["l1".to_owned(), "l2".to_owned()]));
    }

    #[test]
    fn double_meal_toggle_restores_template() {
        let mut engine = engine();
        engine.toggle_meal("5", "b1").unwrap();
        let before = engine.template().clone();

        engine.toggle_meal("7", "l2").unwrap();
        engine.toggle_meal("7", "l2").unwrap();
        assert_eq!(engine.template(), &before);

        engine.toggle_meal("5", "b1").unwrap();
        engine.toggle_meal("5", "b1").unwrap();
        assert_eq!(engine.template(), &before);
    }

    #[test]
    fn selection_matches_flags_after_every_step() {
        let mut engine = engine();
        let steps: [(&str, Option<&str>); 10] = [
            ("5", Some("b1")),
            ("7", None),
            ("5", None),
            ("7", Some("l1")),
            ("5", Some("b3")),
            ("8", None),
            ("5", None),
            ("7", Some("l1")),
            ("7", None),
            ("5", Some("b2")),
        ];
        for (category_id, meal_id) in steps {
            let toggled = match meal_id {
                Some(meal_id) => engine.toggle_meal(category_id, meal_id),
                None => engine.toggle_category(category_id),
            };
            toggled.unwrap();
            assert_consistent(&engine);
        }
    }

    #[test]
    fn empty_category_stays_unselected() {
        let mut engine = engine();
        assert_eq!(engine.toggle_category("8"), Ok(false));
        assert_eq!(engine.toggle_category("8"), Ok(false));
        assert!(!engine.template().category("8").unwrap().selected);
        assert_consistent(&engine);
    }

    #[test]
    fn unknown_ids_are_reported_and_ignored() {
        let mut engine = engine();
        engine.toggle_meal("5", "b1").unwrap();
        let before = engine.template().clone();

        assert_eq!(
            engine.toggle_category("99"),
            Err(SelectionError::CategoryNotFound("99".into()))
        );
        assert_eq!(
            engine.toggle_meal("99", "b1"),
            Err(SelectionError::CategoryNotFound("99".into()))
        );
        assert_eq!(
            engine.toggle_meal("5", "nope"),
            Err(SelectionError::MealNotFound {
                category_id: "5".into(),
                meal_id: "nope".into()
            })
        );
        assert_eq!(engine.template(), &before);
    }

    #[test]
    fn clear_and_replace_drop_the_selection() {
        let mut engine = engine();
        engine.toggle_category("5").unwrap();
        engine.toggle_meal("7", "l1").unwrap();

        engine.clear();
        assert!(!engine.has_selection());
        assert_consistent(&engine);

        engine.toggle_category("7").unwrap();
        engine.replace_template(Template::new(vec![CategoryRecord::new(
            "9",
            "Dinner",
            vec![meal("d1", 300.0)],
        )]));
        assert!(!engine.has_selection());
        assert!(engine.template().category("7").is_none());
        assert_eq!(engine.toggle_meal("9", "d1"), Ok(true));
    }

    #[test]
    fn totals_scale_by_quantity() {
        let mut template = vec![CategoryRecord::new(
            "5",
            "Breakfast",
            vec![meal("b1", 100.0), meal("b2", 50.0)],
        )];
        template[0].food_list[0].quantity = 2;
        let mut engine = SelectionEngine::new(Template::new(template));

        engine.toggle_category("5").unwrap();
        assert_eq!(engine.totals().calories, 250.0);

        engine.toggle_meal("5", "b1").unwrap();
        assert_eq!(engine.totals().calories, 50.0);
    }
}
