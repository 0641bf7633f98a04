use std::fmt::Display;
use std::path::{Path, PathBuf};

use crossterm::style::Stylize;

use crate::ux;

/// Project files which cannot be parsed while scanning source trees
pub struct Collector {
    paths: Vec<String>,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self { paths: vec![] }
    }

    pub fn add_path(&mut self, path: &Path) {
        self.paths.push(path.display().to_string());
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.paths.len() as u64
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&[PathBuf]> for Collector {
    fn from(paths: &[PathBuf]) -> Self {
        let mut collector = Collector::new();
        for path in paths {
            collector.add_path(path);
        }
        collector
    }
}

impl Display for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(table) =
            ux::one_column_table("Path", self.paths.iter().map(std::string::String::as_str))
        {
            writeln!(
                f,
                "{}",
                " These project files cannot be parsed:".dark_red().bold()
            )?;
            writeln!(f, "{table}")?;
        }
        Ok(())
    }
}
