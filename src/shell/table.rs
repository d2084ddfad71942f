//! Single-line box-drawing tables for terminal output.

use prettytable::format::{Alignment, FormatBuilder, LinePosition, LineSeparator, TableFormat};
use prettytable::{Cell, Row};

/// Column alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    /// Pad on the right.
    #[default]
    Left,
    /// Pad on the left.
    Right,
}

/// A table of string cells. The first row is the heading.
#[derive(Debug, Clone, Default)]
pub struct Table {
    title: Option<String>,
    rows: Vec<Vec<String>>,
    heading_border: bool,
    justify: Vec<Justify>,
}

fn box_format() -> TableFormat {
    FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separator(LinePosition::Top, LineSeparator::new('─', '┬', '┌', '┐'))
        .separator(LinePosition::Title, LineSeparator::new('─', '┼', '├', '┤'))
        .separator(LinePosition::Bottom, LineSeparator::new('─', '┴', '└', '┘'))
        .padding(1, 1)
        .build()
}

/// Overwrite the start of the top border with `title` if it fits.
fn embed_title(border: &str, title: &str) -> String {
    let mut chars: Vec<char> = border.chars().collect();
    let inner = chars.len().saturating_sub(2);
    if title.chars().count() <= inner {
        for (slot, c) in chars[1..].iter_mut().zip(title.chars()) {
            *slot = c;
        }
    }
    chars.into_iter().collect()
}

impl Table {
    /// Create a table from rows of cells.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            title: None,
            rows,
            heading_border: true,
            justify: Vec::new(),
        }
    }

    /// Embed a title in the top border.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Do not draw a rule under the first row.
    pub fn without_heading_border(mut self) -> Self {
        self.heading_border = false;
        self
    }

    /// Set every column's alignment.
    pub fn justify_all(mut self, justify: Justify) -> Self {
        self.justify = vec![justify; self.column_count()];
        self
    }

    /// Number of columns, taken from the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn row(&self, cells: &[String]) -> Row {
        let cells = (0..self.column_count())
            .map(|i| {
                let text = cells.get(i).map(String::as_str).unwrap_or("");
                let align = match self.justify.get(i).copied().unwrap_or_default() {
                    Justify::Left => Alignment::LEFT,
                    Justify::Right => Alignment::RIGHT,
                };
                Cell::new_align(text, align)
            })
            .collect();
        Row::new(cells)
    }

    /// Render the table; lines are separated by `\n` with no trailing newline.
    pub fn render(&self) -> String {
        let mut table = prettytable::Table::new();
        table.set_format(box_format());

        let mut rows = self.rows.iter();
        if self.heading_border && self.rows.len() > 1 {
            if let Some(heading) = rows.next() {
                table.set_titles(self.row(heading));
            }
        }
        for cells in rows {
            table.add_row(self.row(cells));
        }

        let rendered = table.to_string();
        let mut lines: Vec<String> = rendered.lines().map(str::to_string).collect();
        if let (Some(title), Some(top)) = (self.title.as_deref(), lines.first_mut()) {
            *top = embed_title(top, title);
        }
        lines.join("\n")
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cells(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn renders_heading_rule_and_title() {
        let table = Table::new(cells(&[&["Id", "Qty"], &["abc", "10"]])).with_title("Orders");
        let expected = "\
┌Orders─────┐
│ Id  │ Qty │
├─────┼─────┤
│ abc │ 10  │
└─────┴─────┘";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn right_justify_pads_left() {
        let table = Table::new(cells(&[&["Sz"], &["1000"]])).justify_all(Justify::Right);
        let expected = "\
┌──────┐
│   Sz │
├──────┤
│ 1000 │
└──────┘";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn short_rows_render_blank_cells() {
        let mut rows = cells(&[&["A", "B"]]);
        rows.push(Vec::new());
        let table = Table::new(rows).without_heading_border();
        let expected = "\
┌───┬───┐
│ A │ B │
│   │   │
└───┴───┘";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn title_wider_than_table_is_dropped() {
        let table = Table::new(cells(&[&["x"]])).with_title("Very long title");
        assert!(table.render().starts_with("┌───┐"));
    }
}
