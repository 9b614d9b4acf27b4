use thiserror::Error;

/// Domain failures that callers are expected to tell apart.
///
/// These travel inside `anyhow::Error`; front ends recover them with
/// `downcast_ref::<CatalogError>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A recipe name was empty after trimming.
    #[error("Recipe name is required")]
    EmptyName,

    /// No recipe with this id exists.
    #[error("Recipe {0} not found")]
    RecipeNotFound(i64),

    /// Export was requested for a table outside the allow-list.
    #[error("Unknown table '{0}'. Exportable tables: recipes, meals")]
    UnknownTable(String),
}

/// Find a `CatalogError` anywhere in an error chain.
#[must_use]
pub fn catalog_error(err: &anyhow::Error) -> Option<&CatalogError> {
    err.chain().find_map(|cause| cause.downcast_ref::<CatalogError>())
}
