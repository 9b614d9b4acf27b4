use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::debug;

use crate::error::CatalogError;
use crate::models::{
    ExportTable, Meal, MealStats, NewMeal, NewRecipe, Recipe, RecipeFilter, TableDump,
};
use crate::names::distinct_names;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Enable foreign keys and bring the schema up to date.
    ///
    /// Safe to run on every start, including on databases whose tables
    /// already exist but were never versioned.
    fn initialize(&self) -> Result<()> {
        // Per-connection setting; cascades and orphan checks depend on it.
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.migrate()
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            debug!(from = version, to = 1, "migrating schema");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    ingredients TEXT,
                    instructions TEXT,
                    tags TEXT,
                    liked_by TEXT
                );

                CREATE TABLE IF NOT EXISTS meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL,
                    ate_on TEXT NOT NULL,
                    notes TEXT,
                    FOREIGN KEY(recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_meals_recipe ON meals(recipe_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects columns: id, name, ingredients, instructions, tags, liked_by
    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            ingredients: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            instructions: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            tags: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            liked_by: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        })
    }

    // Expects columns: id, recipe_id, ate_on, notes
    fn meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Meal> {
        let ate_on: String = row.get(2)?;
        Ok(Meal {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            ate_on: parse_stored_date(2, &ate_on)?,
            notes: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        })
    }

    // --- Recipes ---

    pub fn add_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        self.conn
            .execute(
                "INSERT INTO recipes (name, ingredients, instructions, tags, liked_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    recipe.name,
                    recipe.ingredients,
                    recipe.instructions,
                    recipe.tags,
                    recipe.liked_by,
                ],
            )
            .context("Failed to add recipe")?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name = %recipe.name, "added recipe");
        Ok(Recipe {
            id,
            name: recipe.name.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
            tags: recipe.tags.clone(),
            liked_by: recipe.liked_by.clone(),
        })
    }

    pub fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        self.conn
            .query_row(
                "SELECT id, name, ingredients, instructions, tags, liked_by
                 FROM recipes WHERE id = ?1",
                params![id],
                Self::recipe_from_row,
            )
            .optional()
            .context("Failed to load recipe")
    }

    /// Overwrite every field of a recipe. Returns `false` if the id is unknown.
    pub fn update_recipe(&self, id: i64, recipe: &NewRecipe) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE recipes
                 SET name = ?1, ingredients = ?2, instructions = ?3, tags = ?4, liked_by = ?5
                 WHERE id = ?6",
                params![
                    recipe.name,
                    recipe.ingredients,
                    recipe.instructions,
                    recipe.tags,
                    recipe.liked_by,
                    id,
                ],
            )
            .context("Failed to update recipe")?;
        debug!(id, updated = rows > 0, "update recipe");
        Ok(rows > 0)
    }

    /// Delete a recipe; its meals go with it through the cascade.
    pub fn delete_recipe(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![id])
            .context("Failed to delete recipe")?;
        debug!(id, deleted = rows > 0, "delete recipe");
        Ok(rows > 0)
    }

    pub fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let mut sql = String::from(
            "SELECT id, name, ingredients, instructions, tags, liked_by FROM recipes",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        let text = filter.text.trim();
        if !text.is_empty() {
            clauses.push(
                "(name LIKE ?1 ESCAPE '\\' OR ingredients LIKE ?1 ESCAPE '\\'
                  OR instructions LIKE ?1 ESCAPE '\\' OR tags LIKE ?1 ESCAPE '\\')",
            );
            args.push(like_pattern(text));
        }
        let liked = filter.liked_by.trim();
        if !liked.is_empty() {
            clauses.push(if args.is_empty() {
                "liked_by LIKE ?1 ESCAPE '\\'"
            } else {
                "liked_by LIKE ?2 ESCAPE '\\'"
            });
            args.push(like_pattern(liked));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let recipes = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    // --- Meals ---

    /// Record that a recipe was eaten. An unknown recipe id is refused by the
    /// foreign key and reported as `CatalogError::RecipeNotFound`.
    pub fn log_meal(&self, meal: &NewMeal) -> Result<Meal> {
        let ate_on = meal.ate_on.format(DATE_FORMAT).to_string();
        match self.conn.execute(
            "INSERT INTO meals (recipe_id, ate_on, notes) VALUES (?1, ?2, ?3)",
            params![meal.recipe_id, ate_on, meal.notes],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(CatalogError::RecipeNotFound(meal.recipe_id).into());
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to log meal")),
        }
        let id = self.conn.last_insert_rowid();
        debug!(id, recipe_id = meal.recipe_id, %ate_on, "logged meal");
        Ok(Meal {
            id,
            recipe_id: meal.recipe_id,
            ate_on: meal.ate_on,
            notes: meal.notes.clone(),
        })
    }

    pub fn meals_for_recipe(&self, recipe_id: i64) -> Result<Vec<Meal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recipe_id, ate_on, notes FROM meals
             WHERE recipe_id = ?1
             ORDER BY ate_on DESC, id DESC",
        )?;
        let meals = stmt
            .query_map(params![recipe_id], Self::meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    /// Count and latest date of the meals logged for a recipe.
    ///
    /// Dates are stored as `YYYY-MM-DD`, so the text maximum is the latest day.
    pub fn meal_stats(&self, recipe_id: i64) -> Result<MealStats> {
        let (count, last): (i64, Option<String>) = self.conn.query_row(
            "SELECT COUNT(*), MAX(ate_on) FROM meals WHERE recipe_id = ?1",
            params![recipe_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let last_eaten = last
            .map(|s| parse_stored_date(1, &s))
            .transpose()
            .context("Invalid date stored in meals table")?;
        Ok(MealStats { count, last_eaten })
    }

    // --- Name lists ---

    pub fn distinct_likers(&self) -> Result<Vec<String>> {
        self.distinct_list_values("liked_by")
    }

    pub fn distinct_tags(&self) -> Result<Vec<String>> {
        self.distinct_list_values("tags")
    }

    // `column` is always one of the literals above.
    fn distinct_list_values(&self, column: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column} FROM recipes
             WHERE {column} IS NOT NULL AND TRIM({column}) <> ''
             ORDER BY id"
        ))?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(distinct_names(values))
    }

    // --- Export ---

    /// Every row and column of an exportable table, in id order.
    pub fn export_table(&self, table: ExportTable) -> Result<TableDump> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY id", table.as_str()))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(value_to_text))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read table {table}"))?;
        Ok(TableDump { columns, rows })
    }
}

fn parse_stored_date(column: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// `%text%` with LIKE wildcards in `text` escaped so they match literally.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn value_to_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}
