use crate::error::SheetError;
use crate::table::{Record, Table, encode_table};

const FIELD_SEPARATOR: char = '\t';

/// Parse a tab-separated document: first line header, one row per line.
///
/// The whole document is trimmed first, so a trailing newline does not
/// produce an empty row. Cells are trimmed, which also strips the `\r` of
/// CRLF line endings. An empty document is an empty table.
pub fn parse_tsv(text: &str) -> Table {
    let text = text.trim();
    if text.is_empty() {
        return Table::default();
    }

    let mut lines = text.split('\n');
    let header = lines
        .next()
        .map(split_line)
        .unwrap_or_default();
    let rows = lines.map(split_line).collect();

    Table::new(header, rows)
}

fn split_line(line: &str) -> Vec<String> {
    line.split(FIELD_SEPARATOR)
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Render records as a tab-separated document (header line + one line per
/// record, `\n` separated, no trailing newline).
///
/// Tabs and line breaks inside cell text are replaced with spaces so every
/// record stays on one line.
pub fn render_tsv(records: &[Record]) -> Result<String, SheetError> {
    let table = encode_table(records)?;

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(join_line(&table.header));
    for row in &table.rows {
        lines.push(join_line(row));
    }
    Ok(lines.join("\n"))
}

fn join_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| cell.replace(['\t', '\r', '\n'], " "))
        .collect::<Vec<_>>()
        .join("\t")
}
