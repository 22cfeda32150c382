// CSV import of materialized workflow outputs

use std::path::Path;

use wfgrade_recon::{Column, DataType, Table, Value};

pub fn import(path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    table_from_str(&content, delimiter)
}

/// Lines inspected when guessing the delimiter.
const SNIFF_LINES: usize = 10;

/// Candidates in tie-break order: on equal scores the earlier one wins.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Guess the field delimiter of an engine-written table.
///
/// Engines write whatever the workflow's writer node was configured with, so
/// each candidate is scored by how many of the first lines split into the
/// same number of fields as the header, weighted by that field count. A
/// candidate that leaves the header as a single field scores zero; a file
/// where every candidate scores zero is a one-column table and uses `,`.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(SNIFF_LINES).collect();
    let field_count = |line: &str, delim: u8| -> usize {
        csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes())
            .records()
            .next()
            .and_then(Result::ok)
            .map_or(1, |r| r.len())
    };

    let score = |delim: u8| -> usize {
        let Some(header) = sample.first() else {
            return 0;
        };
        let width = field_count(header, delim);
        if width <= 1 {
            return 0;
        }
        sample.iter().filter(|l| field_count(l, delim) == width).count() * width
    };

    DELIMITERS
        .iter()
        .map(|&d| (d, score(d)))
        .fold((b',', 0), |best, cand| if cand.1 > best.1 { cand } else { best })
        .0
}

/// File contents as UTF-8. Non-UTF-8 input is decoded as Windows-1252, the
/// encoding desktop engines fall back to on Windows hosts.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(String::from_utf8(bytes).unwrap_or_else(|e| {
        let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
        decoded.into_owned()
    }))
}

/// Parse delimited text into a typed [`Table`]. The first row names the
/// columns; each column's type is inferred from its non-blank cells.
pub fn table_from_str(content: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| e.to_string())?;
        if record.len() > headers.len() {
            return Err(format!(
                "row {} has {} fields, header has {}",
                row_idx + 2,
                record.len(),
                headers.len()
            ));
        }
        for (col_idx, col_cells) in cells.iter_mut().enumerate() {
            col_cells.push(record.get(col_idx).unwrap_or("").to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, col_cells)| {
            let dtype = infer_dtype(&col_cells);
            let values = col_cells.iter().map(|c| parse_cell(c, dtype)).collect();
            Column::new(name, dtype, values)
        })
        .collect();

    Table::new(columns).map_err(|e| e.to_string())
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Narrowest type that every non-blank cell parses as.
fn infer_dtype(cells: &[String]) -> DataType {
    let mut present = cells.iter().map(String::as_str).filter(|c| !is_blank(c)).peekable();
    if present.peek().is_none() {
        return DataType::Null;
    }
    let present: Vec<&str> = present.map(str::trim).collect();

    if present.iter().all(|c| c.parse::<i64>().is_ok()) {
        DataType::Int64
    } else if present.iter().all(|c| c.parse::<f64>().is_ok()) {
        DataType::Float64
    } else if present.iter().all(|c| parse_bool(c).is_some()) {
        DataType::Bool
    } else {
        DataType::String
    }
}

fn parse_cell(cell: &str, dtype: DataType) -> Value {
    if is_blank(cell) {
        return Value::Null;
    }
    let trimmed = cell.trim();
    match dtype {
        DataType::Int64 => trimmed.parse().map(Value::Int).unwrap_or(Value::Null),
        DataType::Float64 => trimmed.parse().map(Value::Float).unwrap_or(Value::Null),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).unwrap_or(Value::Null),
        DataType::String => Value::Str(cell.to_string()),
        DataType::Null => Value::Null,
    }
}
