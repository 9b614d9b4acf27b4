//! Comma-separated name lists.
//!
//! Tags and "liked by" people are stored as plain text like `"Ana, Bob"`.
//! These helpers parse that text, merge picked names with freshly typed ones,
//! and build the distinct-name lists used for suggestions.

use std::collections::HashSet;

/// Split on commas, trimming each piece and dropping empty ones.
///
/// Order is preserved and duplicates are kept.
#[must_use]
pub fn split_csv(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Keep the first occurrence of each name, comparing case-insensitively.
///
/// The surviving entry keeps the casing it was first seen with.
#[must_use]
pub fn dedupe_keep_order<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let name = item.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_lowercase()) {
            out.push(name.to_string());
        }
    }
    out
}

#[must_use]
pub fn join_csv<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Combine names picked from existing suggestions with newly typed ones.
///
/// Picked names come first, in pick order, so they win over a typed
/// duplicate and keep their position across edits.
#[must_use]
pub fn merge_names<S: AsRef<str>>(selected: &[S], typed_csv: &str) -> String {
    let combined = selected
        .iter()
        .map(|s| s.as_ref().to_string())
        .chain(split_csv(typed_csv));
    join_csv(&dedupe_keep_order(combined))
}

/// Every distinct name across many stored lists, sorted case-insensitively.
///
/// Names that differ only by case collapse onto the first spelling seen, the
/// same rule `dedupe_keep_order` applies when a list is saved.
#[must_use]
pub fn distinct_names<I, S>(csv_values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let all = csv_values
        .into_iter()
        .flat_map(|value| split_csv(value.as_ref()));
    let mut names = dedupe_keep_order(all);
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    names
}
