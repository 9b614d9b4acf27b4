use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::names::{merge_names, split_csv};

/// Shown in place of a last-eaten date for recipes that were never logged.
pub const NEVER_EATEN: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub ingredients: String,
    pub instructions: String,
    pub tags: String,
    pub liked_by: String,
}

impl Recipe {
    #[must_use]
    pub fn ingredient_lines(&self) -> Vec<&str> {
        self.ingredients
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }

    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        split_csv(&self.tags)
    }

    #[must_use]
    pub fn liker_list(&self) -> Vec<String> {
        split_csv(&self.liked_by)
    }
}

/// Column values for an insert or a full-replace update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub ingredients: String,
    pub instructions: String,
    pub tags: String,
    pub liked_by: String,
}

/// What a user filled in when adding or editing a recipe.
///
/// `selected_likers` are names picked from the existing liker list,
/// `new_likers` is free text with additional comma-separated names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeForm {
    pub name: String,
    pub ingredients: String,
    pub instructions: String,
    pub tags: String,
    pub selected_likers: Vec<String>,
    pub new_likers: String,
}

impl RecipeForm {
    /// Pre-fill an edit form from a stored recipe.
    #[must_use]
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
            tags: recipe.tags.clone(),
            selected_likers: recipe.liker_list(),
            new_likers: String::new(),
        }
    }

    /// Trim every field, require a name and merge the liker lists.
    pub fn normalize(&self) -> Result<NewRecipe> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CatalogError::EmptyName.into());
        }
        Ok(NewRecipe {
            name: name.to_string(),
            ingredients: self.ingredients.trim().to_string(),
            instructions: self.instructions.trim().to_string(),
            tags: self.tags.trim().to_string(),
            liked_by: merge_names(&self.selected_likers, &self.new_likers),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub recipe_id: i64,
    pub ate_on: NaiveDate,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct NewMeal {
    pub recipe_id: i64,
    pub ate_on: NaiveDate,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MealStats {
    pub count: i64,
    pub last_eaten: Option<NaiveDate>,
}

impl MealStats {
    #[must_use]
    pub fn last_eaten_display(&self) -> String {
        self.last_eaten
            .map_or_else(|| NEVER_EATEN.to_string(), |d| d.format("%Y-%m-%d").to_string())
    }
}

/// A recipe together with its meal statistics, as listed to users.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeOverview {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub times_eaten: i64,
    pub last_eaten: Option<NaiveDate>,
}

impl RecipeOverview {
    #[must_use]
    pub fn new(recipe: Recipe, stats: MealStats) -> Self {
        Self {
            recipe,
            times_eaten: stats.count,
            last_eaten: stats.last_eaten,
        }
    }

    #[must_use]
    pub fn stats(&self) -> MealStats {
        MealStats {
            count: self.times_eaten,
            last_eaten: self.last_eaten,
        }
    }
}

/// Optional filters for listing recipes. Empty strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecipeFilter {
    /// Substring of name, ingredients, instructions or tags.
    #[serde(rename = "q")]
    pub text: String,
    /// Substring of the liked-by list.
    pub liked_by: String,
}

impl RecipeFilter {
    #[must_use]
    pub fn new(text: Option<&str>, liked_by: Option<&str>) -> Self {
        Self {
            text: text.unwrap_or_default().to_string(),
            liked_by: liked_by.unwrap_or_default().to_string(),
        }
    }
}

/// The tables that may be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTable {
    Recipes,
    Meals,
}

impl ExportTable {
    pub const ALL: [ExportTable; 2] = [ExportTable::Recipes, ExportTable::Meals];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recipes => "recipes",
            Self::Meals => "meals",
        }
    }

    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for ExportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportTable {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CatalogError::UnknownTable(s.to_string()))
    }
}

/// Raw contents of one table: column names plus every row as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDump {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
