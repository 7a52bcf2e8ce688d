//! Vessel, voyage and port matchers for bills of lading.
//!
//! Three layouts are tried in order and the first one that yields a value
//! wins: label/value pairs, the compound `VESSEL/VOYAGE` field, and a
//! header row whose values sit on the next row.

use regex::Regex;

use super::patterns::{
    COLUMN_SPLIT, CONTACT_LINE, PORT_OF_DISCHARGE_LABEL, PORT_OF_LOADING_LABEL, VESSEL_LABEL,
    VESSEL_VOYAGE_LABEL, VOYAGE_LABEL,
};
use crate::models::candidate::FieldMatch;

/// Longest vessel or voyage value accepted.
const TRANSPORT_VALUE_MAX_LEN: usize = 40;

/// Lines after a bare label searched for its value.
const VALUE_LOOKAHEAD_LINES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Vessel,
    Voyage,
    PortOfLoading,
    PortOfDischarge,
}

impl Column {
    fn label(&self) -> &'static Regex {
        match self {
            Column::Vessel => &*VESSEL_LABEL,
            Column::Voyage => &*VOYAGE_LABEL,
            Column::PortOfLoading => &*PORT_OF_LOADING_LABEL,
            Column::PortOfDischarge => &*PORT_OF_DISCHARGE_LABEL,
        }
    }

    const ALL: [Column; 4] = [
        Column::Vessel,
        Column::Voyage,
        Column::PortOfLoading,
        Column::PortOfDischarge,
    ];
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn label_count(line: &str) -> usize {
    Column::ALL.iter().filter(|c| c.label().is_match(line)).count()
}

/// A header row names two or more columns.
fn is_header_row(line: &str) -> bool {
    label_count(line) >= 2 && !VESSEL_VOYAGE_LABEL.is_match(line)
}

fn strip_separators(s: &str) -> &str {
    s.trim_start_matches([':', '-', '.', '#', ' ', '\t']).trim()
}

fn columns(line: &str) -> Vec<&str> {
    COLUMN_SPLIT
        .split(line.trim())
        .filter(|c| !c.is_empty())
        .collect()
}

/// How a label sitting in one cell of a multi-column row resolves.
enum ColumnValue {
    Found(String, String),
    /// Columnar header whose next row does not line up with it.
    Misaligned,
    /// Not a columnar layout; the rest of the line holds the value.
    Inline,
}

/// A lone label among other column headings takes the cell at the same
/// index on the next row; a label with text after it in its own cell takes
/// that text.
fn column_value(lines: &[&str], i: usize, headers: &[&str], column: Column) -> ColumnValue {
    let Some(index) = headers.iter().position(|h| column.label().is_match(h)) else {
        return ColumnValue::Inline;
    };
    let cell = headers[index];
    let Some(found) = column.label().find(cell) else {
        return ColumnValue::Inline;
    };
    let after = &cell[found.end()..];
    let rest = strip_separators(after);
    if !rest.is_empty() {
        return ColumnValue::Found(collapse(rest), lines[i].trim().to_string());
    }
    if after.contains(':') {
        return ColumnValue::Inline;
    }

    let row = lines.iter().skip(i + 1).find(|l| !l.trim().is_empty());
    if let Some(row) = row.filter(|r| label_count(r) == 0) {
        let cells = columns(row);
        if cells.len() == headers.len() {
            return ColumnValue::Found(
                collapse(cells[index]),
                format!("{}\n{}", lines[i].trim(), row.trim()),
            );
        }
    }

    if index == 0 {
        ColumnValue::Inline
    } else {
        ColumnValue::Misaligned
    }
}

/// Value after a label on the same line, or on one of the next lines.
fn value_after(lines: &[&str], i: usize, label_end: usize) -> Option<(String, String)> {
    let rest = strip_separators(&lines[i][label_end..]);
    if !rest.is_empty() {
        return Some((collapse(rest), lines[i].trim().to_string()));
    }

    lines
        .iter()
        .skip(i + 1)
        .filter(|l| !l.trim().is_empty())
        .take(VALUE_LOOKAHEAD_LINES)
        .find(|l| label_count(l) == 0)
        .map(|l| {
            (
                collapse(l),
                format!("{}\n{}", lines[i].trim(), l.trim()),
            )
        })
}

fn label_value(text: &str, column: Column) -> Option<FieldMatch<String>> {
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if is_header_row(line) || VESSEL_VOYAGE_LABEL.is_match(line) {
            continue;
        }
        let Some(found) = column.label().find(line) else {
            continue;
        };
        let headers = columns(line);
        if headers.len() >= 2 {
            match column_value(&lines, i, &headers, column) {
                ColumnValue::Found(value, context) => {
                    return Some(FieldMatch::new(value.clone(), value, context));
                }
                ColumnValue::Misaligned => continue,
                ColumnValue::Inline => {}
            }
        }
        if let Some((value, context)) = value_after(&lines, i, found.end()) {
            return Some(FieldMatch::new(value.clone(), value, context));
        }
    }
    None
}

/// Split "MSC ANNA / 412W", "MSC ANNA V.412W" or "MSC ANNA 412W".
fn split_vessel_voyage(value: &str) -> Option<(String, String)> {
    if let Some((vessel, voyage)) = value.rsplit_once('/') {
        let (vessel, voyage) = (collapse(vessel), collapse(voyage));
        return (!vessel.is_empty() && !voyage.is_empty()).then_some((vessel, voyage));
    }

    let tokens: Vec<&str> = value.split_whitespace().collect();
    let (last, head) = tokens.split_last()?;
    if head.is_empty() || !last.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let voyage = last
        .trim_start_matches("V.")
        .trim_start_matches("v.")
        .to_string();
    Some((head.join(" "), voyage))
}

fn compound(text: &str) -> Option<(FieldMatch<String>, FieldMatch<String>)> {
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let Some(found) = VESSEL_VOYAGE_LABEL.find(line) else {
            continue;
        };
        let Some((value, context)) = value_after(&lines, i, found.end()) else {
            continue;
        };
        if let Some((vessel, voyage)) = split_vessel_voyage(&value) {
            return Some((
                FieldMatch::new(vessel, value.clone(), context.clone()),
                FieldMatch::new(voyage, value, context),
            ));
        }
    }
    None
}

fn header_table(text: &str, column: Column) -> Option<FieldMatch<String>> {
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if !is_header_row(line) {
            continue;
        }
        let headers = columns(line);
        let Some(index) = headers.iter().position(|h| column.label().is_match(h)) else {
            continue;
        };
        let Some(row) = lines.iter().skip(i + 1).find(|l| !l.trim().is_empty()) else {
            continue;
        };
        let cells = columns(row);
        if cells.len() != headers.len() {
            continue;
        }
        let value = collapse(cells[index]);
        if !value.is_empty() {
            return Some(FieldMatch::new(
                value,
                cells[index],
                format!("{}\n{}", line.trim(), row.trim()),
            ));
        }
    }
    None
}

fn valid_transport_value(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= TRANSPORT_VALUE_MAX_LEN
        && value.chars().any(|c| c.is_alphanumeric())
        && !CONTACT_LINE.is_match(value)
}

/// Ports with contact markers, several commas or excessive length are not ports.
pub fn valid_port(value: &str, max_len: usize) -> bool {
    !value.is_empty()
        && value.chars().count() <= max_len
        && value.chars().any(|c| c.is_alphabetic())
        && value.matches(',').count() <= 1
        && !CONTACT_LINE.is_match(value)
}

fn first_valid(
    candidates: [Option<FieldMatch<String>>; 3],
    valid: impl Fn(&str) -> bool,
) -> Vec<FieldMatch<String>> {
    candidates
        .into_iter()
        .flatten()
        .find(|m| valid(&m.value))
        .into_iter()
        .collect()
}

/// Vessel name.
pub fn vessel(text: &str) -> Vec<FieldMatch<String>> {
    first_valid(
        [
            label_value(text, Column::Vessel),
            compound(text).map(|(v, _)| v),
            header_table(text, Column::Vessel),
        ],
        valid_transport_value,
    )
}

/// Voyage number.
pub fn voyage(text: &str) -> Vec<FieldMatch<String>> {
    first_valid(
        [
            label_value(text, Column::Voyage),
            compound(text).map(|(_, v)| v),
            header_table(text, Column::Voyage),
        ],
        valid_transport_value,
    )
}

/// Port of loading.
pub fn port_of_loading(text: &str, max_len: usize) -> Vec<FieldMatch<String>> {
    first_valid(
        [
            label_value(text, Column::PortOfLoading),
            None,
            header_table(text, Column::PortOfLoading),
        ],
        |v| valid_port(v, max_len),
    )
}

/// Port of discharge.
pub fn port_of_discharge(text: &str, max_len: usize) -> Vec<FieldMatch<String>> {
    first_valid(
        [
            label_value(text, Column::PortOfDischarge),
            None,
            header_table(text, Column::PortOfDischarge),
        ],
        |v| valid_port(v, max_len),
    )
}
