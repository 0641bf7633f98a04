#![warn(unused_extern_crates)]
#![allow(clippy::missing_errors_doc)]
pub mod deps;
pub mod error;
pub mod generate;
pub mod ux;

use std::path::{Path, PathBuf};

use solb::index::DEFAULT_IGNORED_PATTERNS;

pub const SOLUTION_EXT: &str = "sln";

/// Solution file placed next to project and named after it
#[must_use]
pub fn default_solution_path(project: &Path) -> PathBuf {
    project.with_extension(SOLUTION_EXT)
}

/// Search roots specified or project's directory if none
#[must_use]
pub fn search_roots<'a, I>(specified: Option<I>, project: &Path) -> Vec<PathBuf>
where
    I: Iterator<Item = &'a PathBuf>,
{
    let roots = specified
        .map(|it| it.cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    if roots.is_empty() {
        vec![solb::parent_of(project).to_path_buf()]
    } else {
        roots
    }
}

/// Default ignore patterns (unless disabled) followed by the ones specified
#[must_use]
pub fn ignored_patterns<'a, I>(specified: Option<I>, no_defaults: bool) -> Vec<String>
where
    I: Iterator<Item = &'a String>,
{
    let defaults: &[&str] = if no_defaults {
        &[]
    } else {
        &DEFAULT_IGNORED_PATTERNS
    };
    defaults
        .iter()
        .map(|p| (*p).to_owned())
        .chain(specified.into_iter().flatten().cloned())
        .collect()
}
