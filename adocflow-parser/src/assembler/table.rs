//! Splits the raw lines of a `|===`, `,===` or `:===` block into rows and cells.
use crate::{
    fragment::TableDelimiter,
    model::{Attributes, Table, TableCell, TableFormat, TableRow},
};

fn cell(raw: &str) -> TableCell {
    TableCell {
        raw: raw.trim().to_string(),
        content: Vec::new(),
    }
}

/// Number of columns declared by `cols`, honouring `3*` multipliers.
fn declared_columns(attributes: &Attributes) -> Option<usize> {
    let cols = attributes.get_str("cols")?;
    let count = cols
        .split([',', ';'])
        .map(|spec| {
            spec.trim()
                .split_once('*')
                .and_then(|(multiplier, _)| multiplier.trim().parse().ok())
                .unwrap_or(1)
        })
        .sum();
    (count > 0).then_some(count)
}

/// Split a line on an unescaped `separator`, returning the text before the
/// first separator and the cells after it.
fn split_cells(line: &str, separator: char) -> (String, Vec<String>) {
    let mut leading = String::new();
    let mut cells: Vec<String> = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&separator) {
            chars.next();
            cells.last_mut().unwrap_or(&mut leading).push(separator);
        } else if c == separator {
            cells.push(String::new());
        } else {
            cells.last_mut().unwrap_or(&mut leading).push(c);
        }
    }
    (leading, cells)
}

/// Cells in document order, plus whether the first line is followed by a blank line.
fn psv_cells(lines: &[String], separator: char) -> (Vec<String>, Option<usize>, bool) {
    let mut cells: Vec<String> = Vec::new();
    let mut first_line_cells = None;
    let mut implicit_header = false;
    let mut seen_content = false;
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            if index == 1 && seen_content {
                implicit_header = true;
            }
            continue;
        }
        seen_content = true;
        let (leading, new_cells) = split_cells(line, separator);
        if !leading.trim().is_empty() {
            // Continuation of the previous cell.
            if let Some(last) = cells.last_mut() {
                last.push('\n');
                last.push_str(leading.trim());
            }
        }
        if first_line_cells.is_none() && !new_cells.is_empty() {
            first_line_cells = Some(new_cells.len());
        }
        cells.extend(new_cells);
    }
    (cells, first_line_cells, implicit_header)
}

fn delimited_rows(lines: &[String], delimiter: u8, quoting: bool) -> (Vec<Vec<String>>, bool) {
    let implicit_header = lines.len() > 1
        && lines.first().is_some_and(|line| !line.trim().is_empty())
        && lines.get(1).is_some_and(|line| line.trim().is_empty());
    let text = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(quoting)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.iter().map(ToString::to_string).collect()),
            Err(error) => tracing::warn!(%error, "skipping malformed delimited table row"),
        }
    }
    (rows, implicit_header)
}

pub(crate) fn build(delimiter: TableDelimiter, attributes: Attributes, lines: &[String], line: u32) -> Table {
    let (format, mut rows, implicit_header): (TableFormat, Vec<TableRow>, bool) = match delimiter {
        TableDelimiter::Pipe => {
            let separator = attributes
                .get_str("separator")
                .and_then(|separator| separator.chars().next())
                .unwrap_or('|');
            let (cells, first_line_cells, implicit_header) = psv_cells(lines, separator);
            let columns = declared_columns(&attributes)
                .or(first_line_cells)
                .unwrap_or(1)
                .max(1);
            let rows = cells
                .chunks(columns)
                .map(|chunk| TableRow {
                    cells: chunk.iter().map(|raw| cell(raw)).collect(),
                })
                .collect();
            (TableFormat::Psv, rows, implicit_header)
        }
        TableDelimiter::Comma | TableDelimiter::Colon => {
            let (format, separator, quoting) = if delimiter == TableDelimiter::Comma {
                (TableFormat::Csv, b',', true)
            } else {
                (TableFormat::Dsv, b':', false)
            };
            let (rows, implicit_header) = delimited_rows(lines, separator, quoting);
            let rows = rows
                .into_iter()
                .map(|row| TableRow {
                    cells: row.iter().map(|raw| cell(raw)).collect(),
                })
                .collect();
            (format, rows, implicit_header)
        }
    };

    let has_header = !attributes.has_option("noheader")
        && (attributes.has_option("header") || implicit_header)
        && !rows.is_empty();
    let header = has_header.then(|| rows.remove(0));
    Table {
        format,
        attributes,
        title: Vec::new(),
        header,
        rows,
        line,
    }
}
