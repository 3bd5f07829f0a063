//! Behavioural step modules registered with `rstest-bdd`.

pub mod result_steps;
pub mod tracing_steps;

/// Split a comma-separated step list from a feature file.
pub(crate) fn step_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}
