use std::fmt::{self, Display};

use comfy_table::{Cell, CellAlignment};
use crossterm::style::Stylize;
use solb::Analysis;
use solb::msbuild::{self, Descriptor};

use crate::error::Collector;
use crate::ux;

/// Shows root project and everything it references without writing solution
pub struct Deps {
    closure: Vec<Descriptor>,
    errors: Collector,
}

impl Deps {
    #[must_use]
    pub fn new(analysis: Analysis) -> Self {
        Self {
            errors: Collector::from(analysis.skipped.as_slice()),
            closure: analysis.closure,
        }
    }
}

impl Display for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(root) = self.closure.first() else {
            return Ok(());
        };
        writeln!(f, " {}", ux::styled_path(root.path()))?;
        writeln!(f)?;

        let mut table = ux::new_table(&["#", "Project", "Assembly", "Type", "Path"]);
        for (ix, descriptor) in self.closure.iter().enumerate().skip(1) {
            table.add_row(vec![
                Cell::new(ix).set_alignment(CellAlignment::Right),
                Cell::new(descriptor.name()),
                Cell::new(descriptor.identity()),
                Cell::new(msbuild::describe_project(descriptor.kind().type_id())),
                Cell::new(descriptor.path().display()),
            ]);
        }
        writeln!(f, "{table}")?;
        writeln!(f)?;
        writeln!(
            f,
            " {} {}",
            "Referenced projects found:".bold(),
            self.closure.len() - 1
        )?;
        writeln!(f)?;

        write!(f, "{}", self.errors)
    }
}
