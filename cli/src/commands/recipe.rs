use anyhow::Result;
use std::process;

use recipebox_core::models::{RecipeFilter, RecipeForm};
use recipebox_core::service::CatalogService;

use super::helpers::{print_json, print_recipe_table};

/// Field values given on the command line for `recipe add` / `recipe edit`.
#[derive(Debug, Default)]
pub(crate) struct RecipeFields {
    pub name: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Option<String>,
    pub tags: Option<String>,
    pub like: Vec<String>,
    pub unlike: Vec<String>,
    pub new_likers: Option<String>,
}

impl RecipeFields {
    /// Overlay the given values on a form. Fields that were not passed keep
    /// the form's current value.
    fn apply(self, form: &mut RecipeForm, known_likers: &[String]) {
        if let Some(name) = self.name {
            form.name = name;
        }
        if !self.ingredients.is_empty() {
            form.ingredients = self.ingredients.join("\n");
        }
        if let Some(instructions) = self.instructions {
            form.instructions = instructions;
        }
        if let Some(tags) = self.tags {
            form.tags = tags;
        }
        form.selected_likers.retain(|s| {
            !self
                .unlike
                .iter()
                .any(|u| u.trim().to_lowercase() == s.to_lowercase())
        });
        form.selected_likers
            .extend(self.like.iter().map(|n| known_spelling(n, known_likers)));
        if let Some(new_likers) = self.new_likers {
            form.new_likers = new_likers;
        }
    }
}

/// Picked names refer to existing likers; reuse the stored spelling.
fn known_spelling(name: &str, known: &[String]) -> String {
    let name = name.trim();
    known
        .iter()
        .find(|k| k.to_lowercase() == name.to_lowercase())
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

pub(crate) fn cmd_recipe_add(
    svc: &CatalogService,
    name: String,
    fields: RecipeFields,
    json: bool,
) -> Result<()> {
    let known = svc.likers()?;
    let mut form = RecipeForm::default();
    RecipeFields {
        name: Some(name),
        ..fields
    }
    .apply(&mut form, &known);

    let recipe = svc.save_recipe(&form)?;
    if json {
        print_json(&recipe)?;
    } else {
        let name = &recipe.name;
        let id = recipe.id;
        println!("Saved recipe: {name} (id: {id})");
        if !recipe.liked_by.is_empty() {
            println!("  Liked by: {}", recipe.liked_by);
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_edit(
    svc: &CatalogService,
    id: i64,
    fields: RecipeFields,
    json: bool,
) -> Result<()> {
    let existing = svc.get_recipe(id)?;
    let known = svc.likers()?;
    let mut form = RecipeForm::from_recipe(&existing);
    fields.apply(&mut form, &known);

    let recipe = svc.edit_recipe(id, &form)?;
    if json {
        print_json(&recipe)?;
    } else {
        let name = &recipe.name;
        println!("Updated recipe: {name} (id: {id})");
        if !recipe.liked_by.is_empty() {
            println!("  Liked by: {}", recipe.liked_by);
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &CatalogService, id: i64, json: bool) -> Result<()> {
    let overview = svc.recipe_overview(id)?;

    if json {
        return print_json(&overview);
    }

    let recipe = &overview.recipe;
    let stats = overview.stats();
    let name = &recipe.name;
    println!("=== {name} ===");
    if !recipe.tags.is_empty() {
        println!("  Tags:     {}", recipe.tag_list().join(" · "));
    }
    if !recipe.liked_by.is_empty() {
        println!("  Liked by: {}", recipe.liker_list().join(" · "));
    }
    let count = stats.count;
    let last = stats.last_eaten_display();
    println!("  Eaten {count} time(s)  |  Last eaten: {last}\n");

    println!("  INGREDIENTS:");
    let lines = recipe.ingredient_lines();
    if lines.is_empty() {
        println!("    —");
    }
    for line in lines {
        println!("    - {line}");
    }

    println!("\n  INSTRUCTIONS:");
    if recipe.instructions.is_empty() {
        println!("    —");
    }
    for line in recipe.instructions.lines() {
        println!("    {line}");
    }

    Ok(())
}

pub(crate) fn cmd_recipe_list(
    svc: &CatalogService,
    search: Option<&str>,
    liked_by: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipes = svc.list_recipes(&RecipeFilter::new(search, liked_by))?;

    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        process::exit(2);
    }

    if json {
        return print_json(&recipes);
    }

    print_recipe_table(&recipes);
    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &CatalogService, id: i64, json: bool) -> Result<()> {
    let overview = svc.recipe_overview(id)?;
    svc.delete_recipe(id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": id, "meals_removed": overview.times_eaten })
        );
    } else {
        let name = &overview.recipe.name;
        let meals = overview.times_eaten;
        println!("Deleted recipe: {name} (id: {id}) and {meals} logged meal(s)");
    }
    Ok(())
}
