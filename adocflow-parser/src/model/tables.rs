//! Table types.

use serde::Serialize;

use super::{Attributes, Inline};

/// The cell separator syntax of a table, chosen by its delimiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// `|===`, cells start with `|`.
    Psv,
    /// `,===`, comma separated values.
    Csv,
    /// `:===`, colon separated values.
    Dsv,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableCell {
    #[serde(skip)]
    pub raw: String,
    pub content: Vec<Inline>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub format: TableFormat,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<Inline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<TableRow>,
    pub rows: Vec<TableRow>,
    pub line: u32,
}

impl Table {
    /// All rows, header first.
    pub fn all_rows_mut(&mut self) -> impl Iterator<Item = &mut TableRow> {
        self.header.iter_mut().chain(self.rows.iter_mut())
    }
}
