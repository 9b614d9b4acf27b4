mod export;
mod helpers;
mod meal;
mod names;
mod recipe;

pub(crate) use export::cmd_export;
pub(crate) use helpers::json_error;
pub(crate) use meal::{cmd_meal_list, cmd_meal_log};
pub(crate) use names::{cmd_likers, cmd_tags};
pub(crate) use recipe::{
    RecipeFields, cmd_recipe_add, cmd_recipe_delete, cmd_recipe_edit, cmd_recipe_list,
    cmd_recipe_show,
};
