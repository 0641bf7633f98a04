use std::path::{self, Path};

use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use crossterm::style::{Color, StyledContent, Stylize, style};

#[must_use]
pub fn new_table(head: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            head.iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

/// Returns none if there is nothing to show
#[must_use]
pub fn one_column_table<'a, I>(head: &str, items: I) -> Option<Table>
where
    I: Iterator<Item = &'a str>,
{
    let mut table = new_table(&[head]);
    let mut empty = true;
    for item in items {
        table.add_row(vec![item]);
        empty = false;
    }
    (!empty).then_some(table)
}

#[must_use]
pub fn styled_path(path: &Path) -> StyledContent<path::Display<'_>> {
    style(path.display())
        .with(Color::Rgb {
            r: 0xAA,
            g: 0xAA,
            b: 0xAA,
        })
        .bold()
}
