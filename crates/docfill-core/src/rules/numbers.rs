//! Number parsing and total weight/volume/carton matchers.

use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{
    GROSS_WEIGHT, NET_WEIGHT, NUMBER_TOKEN, TOTAL_CARTONS_LABELED, TOTAL_CARTONS_TRAILING,
    UNIT_WEIGHT, VOLUME,
};
use crate::models::candidate::FieldMatch;

/// Parse a printed number ("1,205.50", "1.205,50", "120,5", "US$ 3.20").
///
/// A comma followed by exactly three digits and no decimal point is a
/// thousands separator; otherwise a lone comma is a decimal comma.
pub fn parse_number(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == ',');

    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => {
            let groups: Vec<&str> = cleaned.split(',').collect();
            let thousands = groups.len() > 1
                && groups[0].len() <= 3
                && groups[1..].iter().all(|g| g.len() == 3);
            if thousands {
                cleaned.replace(',', "")
            } else if groups.len() == 2 {
                cleaned.replace(',', ".")
            } else {
                return None;
            }
        }
        (None, _) => cleaned.to_string(),
    };

    Decimal::from_str(&normalized).ok()
}

/// Parse a whole non-negative count.
pub fn parse_count(s: &str) -> Option<i64> {
    let value = parse_number(s)?;
    if value.is_sign_negative() || !value.fract().is_zero() {
        return None;
    }
    i64::try_from(value.trunc()).ok()
}

/// Numeric tokens on a line, in order.
pub fn number_tokens(line: &str) -> Vec<(String, Decimal)> {
    NUMBER_TOKEN
        .find_iter(line)
        .filter_map(|m| parse_number(m.as_str()).map(|v| (m.as_str().to_string(), v)))
        .collect()
}

/// Weight captures carry a unit either in the label "(KGS)" or after the
/// number; unit-less figures are skipped.
fn weights(text: &str, pattern: &Regex, header_labels: &[&str]) -> Vec<FieldMatch<Decimal>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut results = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let mut found_on_line = false;
        for caps in pattern.captures_iter(line) {
            found_on_line = true;
            if let Some(m) = weight_from_captures(&caps, line) {
                results.push(m);
            }
        }

        // Header cell with the figure on the next row.
        if !found_on_line && label_only(line, header_labels) {
            if let Some(next) = lines.iter().skip(i + 1).find(|l| !l.trim().is_empty()) {
                results.extend(unit_weights(next, line));
            }
        }
    }

    results
}

fn weight_from_captures(caps: &Captures<'_>, line: &str) -> Option<FieldMatch<Decimal>> {
    let has_unit = caps.get(1).is_some() || caps.get(3).is_some();
    if !has_unit {
        return None;
    }
    let raw = caps.get(2)?.as_str();
    let value = parse_number(raw)?;
    (value > Decimal::ZERO).then(|| FieldMatch::new(value, raw, line.trim()))
}

/// Line carries a weight label but no figure.
fn label_only(line: &str, header_labels: &[&str]) -> bool {
    let lower = line.to_lowercase();
    header_labels.iter().any(|label| lower.contains(label)) && number_tokens(line).is_empty()
}

fn unit_weights(row: &str, header: &str) -> Vec<FieldMatch<Decimal>> {
    UNIT_WEIGHT
        .captures_iter(row)
        .filter_map(|caps| {
            let raw = caps.get(1)?.as_str();
            let value = parse_number(raw)?;
            Some(FieldMatch::new(
                value,
                raw,
                format!("{}\n{}", header.trim(), row.trim()),
            ))
        })
        .take(1)
        .collect()
}

/// Gross weight totals in kilograms.
pub fn gross_weight(text: &str) -> Vec<FieldMatch<Decimal>> {
    weights(text, &GROSS_WEIGHT, &["gross weight", "g.w"])
}

/// Net weight totals in kilograms.
pub fn net_weight(text: &str) -> Vec<FieldMatch<Decimal>> {
    weights(text, &NET_WEIGHT, &["net weight", "n.w"])
}

/// Volumes in cubic metres.
pub fn volume(text: &str) -> Vec<FieldMatch<Decimal>> {
    let mut results = Vec::new();
    for line in text.lines() {
        for caps in VOLUME.captures_iter(line) {
            let raw = &caps[1];
            if let Some(value) = parse_number(raw).filter(|v| *v > Decimal::ZERO) {
                results.push(FieldMatch::new(value, raw, line.trim()));
            }
        }
    }
    results
}

/// Total carton/package counts.
pub fn total_cartons(text: &str) -> Vec<FieldMatch<i64>> {
    let mut results = Vec::new();
    for line in text.lines() {
        let caps = TOTAL_CARTONS_LABELED
            .captures(line)
            .or_else(|| TOTAL_CARTONS_TRAILING.captures(line));
        let Some(caps) = caps else {
            continue;
        };
        let raw = &caps[1];
        if let Some(count) = parse_count(raw).filter(|c| *c > 0) {
            results.push(FieldMatch::new(count, raw, line.trim()));
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_number_separators() {
        assert_eq!(parse_number("1,205"), Some(dec("1205")));
        assert_eq!(parse_number("1,205.50"), Some(dec("1205.50")));
        assert_eq!(parse_number("1.205,50"), Some(dec("1205.50")));
        assert_eq!(parse_number("120,5"), Some(dec("120.5")));
        assert_eq!(parse_number("12,345,678"), Some(dec("12345678")));
        assert_eq!(parse_number("US$ 3.20"), Some(dec("3.20")));
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_parse_count_rejects_fractions() {
        assert_eq!(parse_count("1,200"), Some(1200));
        assert_eq!(parse_count("12.5"), None);
        assert_eq!(parse_count("12.0"), Some(12));
    }

    #[test]
    fn test_gross_weight_needs_a_unit() {
        let text = "GROSS WEIGHT: 1,205.0 KGS\nG.W. 120.5\nGROSS WEIGHT (KGS): 98.2";
        let values: Vec<Decimal> = gross_weight(text).into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec![dec("1205.0"), dec("98.2")]);
    }

    #[test]
    fn test_gross_weight_from_header_row() {
        let text = "DESCRIPTION    GROSS WEIGHT    MEASUREMENT\nTOYS    1205.0 KGS    12.5 CBM";
        let found = gross_weight(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, dec("1205.0"));
        assert!(found[0].context.contains("TOYS"));
    }

    #[test]
    fn test_net_weight_is_not_gross() {
        let text = "N.W.: 900 KGS\nG.W.: 1000 KGS";
        let net: Vec<Decimal> = net_weight(text).into_iter().map(|m| m.value).collect();
        assert_eq!(net, vec![dec("900")]);
    }

    #[test]
    fn test_volume_and_cartons() {
        let text = "TOTAL: 150 CARTONS\nMEASUREMENT 12.5 CBM\nTotal packages: 150";
        let volumes: Vec<Decimal> = volume(text).into_iter().map(|m| m.value).collect();
        assert_eq!(volumes, vec![dec("12.5")]);

        let cartons: Vec<i64> = total_cartons(text).into_iter().map(|m| m.value).collect();
        assert_eq!(cartons, vec![150, 150]);
    }
}
