//! Data table component.
//!
//! The product and slide managers describe their tables with these types
//! and render them through `partials/data_table.html`.

use askama::Template;

/// Column definition for a data table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    /// Unique key for the column.
    pub key: &'static str,
    /// Display label for the column header.
    pub label: &'static str,
}

impl TableColumn {
    #[must_use]
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// One table cell. A cell with an image renders a thumbnail, otherwise text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub image: Option<String>,
    /// Extra class on the `<td>`, e.g. a status badge.
    pub class: &'static str,
}

impl Cell {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            class: "",
        }
    }

    #[must_use]
    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            text: alt.into(),
            image: Some(src.into()),
            class: "",
        }
    }

    #[must_use]
    pub const fn class(mut self, class: &'static str) -> Self {
        self.class = class;
        self
    }
}

/// A row with its record id; the id is attached to the edit and delete
/// buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub id: String,
    pub cells: Vec<Cell>,
}

/// Configuration and contents of a data table.
#[derive(Debug, Clone, Template)]
#[template(path = "partials/data_table.html")]
pub struct DataTable {
    /// Unique table identifier.
    pub table_id: &'static str,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
    /// Shown in place of the rows when there are none.
    pub empty_title: String,
}

impl DataTable {
    #[must_use]
    pub fn new(table_id: &'static str) -> Self {
        Self {
            table_id,
            columns: Vec::new(),
            rows: Vec::new(),
            empty_title: "No items found".to_owned(),
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the empty state message.
    #[must_use]
    pub fn empty_state(mut self, title: &str) -> Self {
        title.clone_into(&mut self.empty_title);
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: Vec<TableRow>) -> Self {
        self.rows = rows;
        self
    }

    /// Columns plus the trailing actions column.
    #[must_use]
    pub fn span(&self) -> usize {
        self.columns.len() + 1
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_shows_message() {
        let html = DataTable::new("things")
            .column(TableColumn::new("name", "Name"))
            .empty_state("Nothing here.")
            .render()
            .unwrap();
        assert!(html.contains("Nothing here."));
        assert!(html.contains(r#"colspan="2""#));
    }

    #[test]
    fn test_rows_render_cells_and_ids() {
        let html = DataTable::new("things")
            .column(TableColumn::new("image", "Image"))
            .column(TableColumn::new("name", "Name"))
            .rows(vec![TableRow {
                id: "42".into(),
                cells: vec![
                    Cell::image("https://img.test/a.png", "A <b>"),
                    Cell::text("Widget").class("status--active"),
                ],
            }])
            .render()
            .unwrap();
        assert!(html.contains(r#"src="https://img.test/a.png""#));
        assert!(html.contains("A &#60;b&#62;") || html.contains("A &lt;b&gt;"));
        assert!(html.contains(r#"data-id="42""#));
        assert!(html.contains("status--active"));
    }
}
