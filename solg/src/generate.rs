use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use comfy_table::{Cell, Color};
use crossterm::style::Stylize;
use itertools::Itertools;
use solb::Analysis;
use solb::msbuild;

use crate::error::Collector;
use crate::ux;

struct Row {
    name: String,
    kind: String,
    platforms: String,
    path: String,
    startup: bool,
}

/// Generated solution summary
pub struct Generate {
    path: PathBuf,
    rows: Vec<Row>,
    errors: Collector,
}

impl Generate {
    #[must_use]
    pub fn new(path: &Path, analysis: &Analysis) -> Self {
        let startup = analysis.solution.startup_project();
        let rows = analysis
            .solution
            .projects()
            .map(|(id, p)| Row {
                name: p.display_name().to_owned(),
                kind: p
                    .kind()
                    .map_or("Unknown", |k| msbuild::describe_project(k.type_id()))
                    .to_owned(),
                platforms: p
                    .configurations()
                    .iter()
                    .map(|c| c.platform.as_str())
                    .unique()
                    .join(", "),
                path: p.full_path().display().to_string(),
                startup: Some(id) == startup,
            })
            .collect();
        Self {
            path: path.to_path_buf(),
            rows,
            errors: Collector::from(analysis.skipped.as_slice()),
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors.count() > 0
    }
}

impl Display for Generate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " {}", ux::styled_path(&self.path))?;
        writeln!(f)?;

        let mut table = ux::new_table(&["Project", "Type", "Platforms", "Path"]);
        for row in &self.rows {
            let name = if row.startup {
                Cell::new(&row.name).fg(Color::Green)
            } else {
                Cell::new(&row.name)
            };
            table.add_row(vec![
                name,
                Cell::new(&row.kind),
                Cell::new(&row.platforms),
                Cell::new(&row.path),
            ]);
        }
        writeln!(f, "{table}")?;
        writeln!(f)?;
        writeln!(
            f,
            " {} {}",
            "Projects written:".bold(),
            self.rows.len()
        )?;
        writeln!(f)?;

        write!(f, "{}", self.errors)
    }
}
