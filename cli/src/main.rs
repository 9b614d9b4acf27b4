mod commands;
mod config;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    RecipeFields, cmd_export, cmd_likers, cmd_meal_list, cmd_meal_log, cmd_recipe_add,
    cmd_recipe_delete, cmd_recipe_edit, cmd_recipe_list, cmd_recipe_show, cmd_tags, json_error,
};
use crate::config::Config;
use recipebox_core::error::CatalogError;
use recipebox_core::models::ExportTable;
use recipebox_core::service::CatalogService;

#[derive(Parser)]
#[command(
    name = "recipebox",
    version,
    about = "A small recipe catalog and meal log",
    long_about = "Keep your recipes, who likes them, and when you last cooked them.\n\
                  Everything lives in a single local SQLite file."
)]
struct Cli {
    /// Path to the database file (default: platform data directory)
    #[arg(long, global = true, env = "RECIPEBOX_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Log and review when a recipe was eaten
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// List everyone who likes at least one recipe
    Likers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every tag in use
    Tags {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export a table as CSV
    Export {
        /// Table to export: recipes or meals
        #[arg(value_parser = parse_export_table)]
        table: ExportTable,
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Start the local REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Add a new recipe
    Add {
        /// Recipe name
        name: String,
        #[command(flatten)]
        fields: FieldArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a recipe; options not given keep their current value
    Edit {
        /// Recipe ID
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
        /// Remove someone from the liked-by list (repeatable)
        #[arg(long, value_name = "NAME")]
        unlike: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its meal statistics
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recipes, optionally filtered
    List {
        /// Match name, ingredients, instructions or tags
        #[arg(short, long)]
        search: Option<String>,
        /// Only recipes liked by someone matching this name
        #[arg(short, long)]
        liked_by: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe and every meal logged for it
    Delete {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct FieldArgs {
    /// Ingredient line (repeatable, one item each; replaces the list on edit)
    #[arg(short, long = "ingredient", value_name = "LINE")]
    ingredients: Vec<String>,
    /// Preparation steps
    #[arg(long)]
    instructions: Option<String>,
    /// Comma-separated tags (e.g. "pasta, quick, kids")
    #[arg(short, long)]
    tags: Option<String>,
    /// Someone who likes this dish, picked from `recipebox likers` (repeatable)
    #[arg(long, value_name = "NAME")]
    like: Vec<String>,
    /// New people who like this dish, comma-separated
    #[arg(long, value_name = "NAMES")]
    new_likers: Option<String>,
}

impl FieldArgs {
    fn into_fields(self, name: Option<String>, unlike: Vec<String>) -> RecipeFields {
        RecipeFields {
            name,
            ingredients: self.ingredients,
            instructions: self.instructions,
            tags: self.tags,
            like: self.like,
            unlike,
            new_likers: self.new_likers,
        }
    }
}

#[derive(Subcommand)]
enum MealCommands {
    /// Record that a recipe was eaten
    Log {
        /// Recipe ID
        recipe_id: i64,
        /// Date eaten (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional note
        #[arg(short, long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every meal logged for a recipe, newest first
    List {
        /// Recipe ID
        recipe_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_export_table(s: &str) -> Result<ExportTable, CatalogError> {
    s.parse()
}

impl Cli {
    fn wants_json(&self) -> bool {
        match &self.command {
            Commands::Recipe { command } => match command {
                RecipeCommands::Add { json, .. }
                | RecipeCommands::Edit { json, .. }
                | RecipeCommands::Show { json, .. }
                | RecipeCommands::List { json, .. }
                | RecipeCommands::Delete { json, .. } => *json,
            },
            Commands::Meal { command } => match command {
                MealCommands::Log { json, .. } | MealCommands::List { json, .. } => *json,
            },
            Commands::Likers { json } | Commands::Tags { json } => *json,
            Commands::Export { .. } | Commands::Serve { .. } => false,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let json = cli.wants_json();

    if let Err(e) = run(cli).await {
        if json {
            println!("{}", json_error(&format!("{e:#}")));
        } else {
            eprintln!("Error: {e:#}");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db)?;
    tracing::debug!(path = %config.db_path.display(), "opening database");
    let svc = CatalogService::open(&config.db_path)?;

    match cli.command {
        Commands::Recipe { command } => match command {
            RecipeCommands::Add { name, fields, json } => {
                cmd_recipe_add(&svc, name, fields.into_fields(None, Vec::new()), json)
            }
            RecipeCommands::Edit {
                id,
                name,
                fields,
                unlike,
                json,
            } => cmd_recipe_edit(&svc, id, fields.into_fields(name, unlike), json),
            RecipeCommands::Show { id, json } => cmd_recipe_show(&svc, id, json),
            RecipeCommands::List {
                search,
                liked_by,
                json,
            } => cmd_recipe_list(&svc, search.as_deref(), liked_by.as_deref(), json),
            RecipeCommands::Delete { id, json } => cmd_recipe_delete(&svc, id, json),
        },
        Commands::Meal { command } => match command {
            MealCommands::Log {
                recipe_id,
                date,
                notes,
                json,
            } => cmd_meal_log(&svc, recipe_id, date, notes, json),
            MealCommands::List { recipe_id, json } => cmd_meal_list(&svc, recipe_id, json),
        },
        Commands::Likers { json } => cmd_likers(&svc, json),
        Commands::Tags { json } => cmd_tags(&svc, json),
        Commands::Export { table, output } => cmd_export(&svc, table, output.as_deref()),
        Commands::Serve { port, bind } => server::start_server(svc, port, &bind).await,
    }
}
