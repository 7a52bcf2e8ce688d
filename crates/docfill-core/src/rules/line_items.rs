//! SKU handling and priced line-item rows from PI/PO/invoice tables.

use rust_decimal::Decimal;

use super::numbers::parse_number;
use super::patterns::{
    CARTONS_HEADER, CURRENCY_PREFIX, NUMBER_TOKEN, PER_CARTON_HEADER, SHIPMENT_LEG, SKU_SHAPE,
    SUMMARY_ROW, UNIT_SUFFIXED,
};
use crate::models::candidate::{FieldMatch, LineItemMatch};

/// Longest token treated as an item number in front of a SKU.
const ITEM_NUMBER_MAX_LEN: usize = 8;

/// Normalize a SKU for matching: uppercase, trimmed, without a
/// shipment-leg suffix (`BT-1001-SEA`, `BT-1001-AIR-2` become `BT-1001`).
pub fn normalize_sku(raw: &str) -> String {
    let sku = raw
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_uppercase();

    match SHIPMENT_LEG.captures(&sku) {
        Some(caps) => caps[1].to_string(),
        None => sku,
    }
}

/// Whether a token looks like a SKU code rather than a word or a figure.
pub fn is_sku_token(token: &str) -> bool {
    let token = token
        .trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')'))
        .to_uppercase();

    SKU_SHAPE.is_match(&token)
        && token.chars().any(|c| c.is_ascii_alphabetic())
        && token.chars().any(|c| c.is_ascii_digit())
        && !UNIT_SUFFIXED.is_match(&token)
}

/// Parse a whole-cell number, allowing a currency prefix.
fn numeric_cell(token: &str) -> Option<(bool, Decimal)> {
    let token = CURRENCY_PREFIX.replace(token.trim(), "");
    let token = token.trim();
    let found = NUMBER_TOKEN.find(token)?;
    if found.start() != 0 || found.end() != token.len() {
        return None;
    }
    let value = parse_number(token)?;
    let integer = !token.contains('.') && value.fract().is_zero();
    Some((integer, value))
}

fn products_agree(quantity: Decimal, unit: Decimal, total: Decimal) -> bool {
    let tolerance = (total.abs() / Decimal::from(100)).max(Decimal::new(1, 2));
    (quantity * unit - total).abs() <= tolerance
}

fn as_count(value: Decimal) -> Option<i64> {
    i64::try_from(value).ok().filter(|n| *n > 0)
}

/// Which of the two carton columns the table header names first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CartonOrder {
    PerCartonFirst,
    CartonsFirst,
}

fn carton_order(header: &str) -> Option<CartonOrder> {
    let per = PER_CARTON_HEADER.find(header)?;
    let cartons = CARTONS_HEADER.find(header)?;
    Some(if per.start() < cartons.start() {
        CartonOrder::PerCartonFirst
    } else {
        CartonOrder::CartonsFirst
    })
}

/// Priced rows: a SKU token followed by quantity, unit cost and total cost.
pub fn line_items(text: &str) -> Vec<FieldMatch<LineItemMatch>> {
    let mut order = CartonOrder::PerCartonFirst;
    let mut results = Vec::new();

    for line in text.lines() {
        if let Some(found) = carton_order(line) {
            order = found;
            continue;
        }
        if SUMMARY_ROW.is_match(line) {
            continue;
        }
        if let Some(item) = parse_row(line, order) {
            tracing::trace!(line = %line.trim(), units = item.units_ordered, "Line item row");
            results.push(FieldMatch::new(item, line.trim(), line.trim()));
        }
    }

    results
}

fn parse_row(line: &str, order: CartonOrder) -> Option<LineItemMatch> {
    let tokens: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == '|')
        .filter(|t| !t.is_empty())
        .collect();

    let sku_index = tokens.iter().position(|t| is_sku_token(t));
    let item_number = match sku_index {
        Some(1) => {
            let first = tokens[0].trim_end_matches('.');
            (first.len() <= ITEM_NUMBER_MAX_LEN && first.chars().all(|c| c.is_ascii_alphanumeric()))
                .then(|| first.to_string())
        }
        _ => None,
    };

    let numbers: Vec<(bool, Decimal)> = tokens
        .iter()
        .skip(sku_index.map_or(0, |i| i + 1))
        .filter_map(|t| numeric_cell(t))
        .collect();
    if numbers.len() < 3 {
        return None;
    }

    let k = (0..numbers.len() - 2).rev().find(|&k| {
        let (integer, quantity) = numbers[k];
        integer
            && quantity > Decimal::ZERO
            && products_agree(quantity, numbers[k + 1].1, numbers[k + 2].1)
    })?;

    let units_ordered = as_count(numbers[k].1)?;
    let (mut units_per_carton, mut cartons) = (None, None);
    if k >= 2 {
        let (a_int, a) = numbers[k - 2];
        let (b_int, b) = numbers[k - 1];
        if a_int && b_int && a * b == numbers[k].1 {
            let (a, b) = (as_count(a), as_count(b));
            (units_per_carton, cartons) = match order {
                CartonOrder::PerCartonFirst => (a, b),
                CartonOrder::CartonsFirst => (b, a),
            };
        }
    }

    Some(LineItemMatch {
        sku: sku_index.map(|i| normalize_sku(tokens[i])),
        item_number,
        units_ordered,
        unit_cost: Some(numbers[k + 1].1),
        total_cost: Some(numbers[k + 2].1),
        units_per_carton,
        cartons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalize_sku_strips_shipment_leg() {
        assert_eq!(normalize_sku(" bt-1001-sea "), "BT-1001");
        assert_eq!(normalize_sku("BT-1001-AIR-2"), "BT-1001");
        assert_eq!(normalize_sku("BT-1001"), "BT-1001");
        assert_eq!(normalize_sku("SEA-100"), "SEA-100");
    }

    #[test]
    fn test_sku_tokens() {
        assert!(is_sku_token("BT-1001-SEA"));
        assert!(is_sku_token("A1234,"));
        assert!(!is_sku_token("1200"));
        assert!(!is_sku_token("PLUSH"));
        assert!(!is_sku_token("30CM"));
        assert!(!is_sku_token("US$3.20"));
    }

    const TABLE: &str = "\
ITEM  SKU          DESCRIPTION        PCS/CTN  CTNS  QTY    UNIT PRICE  AMOUNT
1     BT-1001-SEA  PLUSH BEAR 30CM    24       50    1200   US$3.20     US$3,840.00
2     BT-1002      PLUSH RABBIT       12       20    240    4.50        1,080.00
TOTAL                                          70    1440               4,920.00
";

    #[test]
    fn test_table_rows() {
        let items: Vec<LineItemMatch> = line_items(TABLE).into_iter().map(|m| m.value).collect();
        assert_eq!(
            items,
            vec![
                LineItemMatch {
                    sku: Some("BT-1001".into()),
                    item_number: Some("1".into()),
                    units_ordered: 1200,
                    unit_cost: Some(dec("3.20")),
                    total_cost: Some(dec("3840.00")),
                    units_per_carton: Some(24),
                    cartons: Some(50),
                },
                LineItemMatch {
                    sku: Some("BT-1002".into()),
                    item_number: Some("2".into()),
                    units_ordered: 240,
                    unit_cost: Some(dec("4.50")),
                    total_cost: Some(dec("1080.00")),
                    units_per_carton: Some(12),
                    cartons: Some(20),
                },
            ]
        );
    }

    #[test]
    fn test_cartons_first_header() {
        let text = "CODE  CTNS  PCS/CTN  QTY  PRICE  TOTAL USD\nX-100  10  6  60  2.00  120.00";
        let items = line_items(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value.cartons, Some(10));
        assert_eq!(items[0].value.units_per_carton, Some(6));
    }

    #[test]
    fn test_inconsistent_row_is_ignored() {
        assert!(line_items("BT-1003 PLUSH DOG 100 2.00 350.00").is_empty());
    }
}
