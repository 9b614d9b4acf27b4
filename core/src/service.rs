use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::db::Database;
use crate::error::CatalogError;
use crate::export::write_csv;
use crate::models::{
    ExportTable, Meal, MealStats, NewMeal, Recipe, RecipeFilter, RecipeForm, RecipeOverview,
};

/// Catalog operations as called by the CLI and the HTTP API.
///
/// Every method takes its whole input as arguments; nothing is remembered
/// between calls apart from the open database.
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(Self { db })
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Recipes ---

    /// Validate a form and store it as a new recipe.
    pub fn save_recipe(&self, form: &RecipeForm) -> Result<Recipe> {
        let new = form.normalize()?;
        self.db.add_recipe(&new)
    }

    /// Replace every field of an existing recipe with the form's values.
    pub fn edit_recipe(&self, id: i64, form: &RecipeForm) -> Result<Recipe> {
        let new = form.normalize()?;
        if !self.db.update_recipe(id, &new)? {
            return Err(CatalogError::RecipeNotFound(id).into());
        }
        self.get_recipe(id)
    }

    pub fn get_recipe(&self, id: i64) -> Result<Recipe> {
        self.db
            .get_recipe(id)?
            .ok_or_else(|| CatalogError::RecipeNotFound(id).into())
    }

    pub fn recipe_overview(&self, id: i64) -> Result<RecipeOverview> {
        let recipe = self.get_recipe(id)?;
        let stats = self.db.meal_stats(id)?;
        Ok(RecipeOverview::new(recipe, stats))
    }

    pub fn delete_recipe(&self, id: i64) -> Result<()> {
        if !self.db.delete_recipe(id)? {
            return Err(CatalogError::RecipeNotFound(id).into());
        }
        Ok(())
    }

    /// Filtered recipes with freshly computed meal statistics.
    pub fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<RecipeOverview>> {
        self.db
            .list_recipes(filter)?
            .into_iter()
            .map(|recipe| {
                let stats = self.db.meal_stats(recipe.id)?;
                Ok::<_, anyhow::Error>(RecipeOverview::new(recipe, stats))
            })
            .collect()
    }

    // --- Meals ---

    pub fn log_meal(&self, recipe_id: i64, ate_on: NaiveDate, notes: &str) -> Result<Meal> {
        self.db.log_meal(&NewMeal {
            recipe_id,
            ate_on,
            notes: notes.trim().to_string(),
        })
    }

    pub fn meal_history(&self, recipe_id: i64) -> Result<Vec<Meal>> {
        self.get_recipe(recipe_id)?;
        self.db.meals_for_recipe(recipe_id)
    }

    pub fn meal_stats(&self, recipe_id: i64) -> Result<MealStats> {
        self.db.meal_stats(recipe_id)
    }

    // --- Suggestions ---

    pub fn likers(&self) -> Result<Vec<String>> {
        self.db.distinct_likers()
    }

    pub fn tags(&self) -> Result<Vec<String>> {
        self.db.distinct_tags()
    }

    // --- Export ---

    pub fn export_csv<W: Write>(&self, table: ExportTable, writer: W) -> Result<()> {
        let dump = self.db.export_table(table)?;
        write_csv(&dump, writer).with_context(|| format!("Failed to export {table}"))
    }
}
