use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Modify, Style, Width, object::Columns},
};

use recipebox_core::service::CatalogService;

use super::helpers::{parse_date, print_json};

pub(crate) fn cmd_meal_log(
    svc: &CatalogService,
    recipe_id: i64,
    date: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let ate_on = parse_date(date)?;
    let meal = svc.log_meal(recipe_id, ate_on, notes.as_deref().unwrap_or_default())?;

    if json {
        print_json(&meal)?;
    } else {
        let recipe = svc.get_recipe(recipe_id)?;
        let stats = svc.meal_stats(recipe_id)?;
        let name = &recipe.name;
        let day = meal.ate_on.format("%Y-%m-%d");
        let count = stats.count;
        println!("Logged {name} on {day} (eaten {count} time(s))");
    }
    Ok(())
}

pub(crate) fn cmd_meal_list(svc: &CatalogService, recipe_id: i64, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let meals = svc.meal_history(recipe_id)?;
    if meals.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No meals logged for recipe {recipe_id}");
        }
        process::exit(2);
    }

    if json {
        return print_json(&meals);
    }

    let rows: Vec<MealRow> = meals
        .iter()
        .map(|m| MealRow {
            id: m.id,
            date: m.ate_on.format("%Y-%m-%d").to_string(),
            notes: m.notes.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Width::wrap(50)))
        .to_string();
    println!("{table}");
    Ok(())
}
