//! Shipping-mark blocks: per-SKU carton attributes around a
//! `SHIPPING MARK` anchor line.

use regex::{Captures, Regex};
use rust_decimal::Decimal;

use super::line_items::{is_sku_token, normalize_sku};
use super::numbers::parse_number;
use super::patterns::{
    MARK_CARTONS, MARK_COMMODITY_CODE, MARK_DIMENSIONS, MARK_GROSS_WEIGHT, MARK_NET_WEIGHT,
    MARK_ORIGIN, MARK_PRODUCT_NUMBER, MARK_UNITS_PER_CARTON, SHIPPING_MARK_ANCHOR, SKU_LABEL,
};
use crate::models::candidate::{CartonDimensions, FieldMatch, ShippingMarkMatch};

/// Parse every shipping-mark block in the text.
///
/// Each anchor line must carry a SKU token. Attributes are searched from
/// `before` lines above to `after` lines below the anchor, never crossing
/// into a neighbouring block.
pub fn shipping_marks(text: &str, before: usize, after: usize) -> Vec<FieldMatch<ShippingMarkMatch>> {
    let lines: Vec<&str> = text.lines().collect();
    let anchors: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| SHIPPING_MARK_ANCHOR.is_match(l))
        .map(|(i, _)| i)
        .collect();

    let mut results = Vec::new();
    for (n, &anchor) in anchors.iter().enumerate() {
        let Some(sku) = anchor_sku(lines[anchor]) else {
            tracing::debug!(line = %lines[anchor].trim(), "Shipping mark anchor without SKU");
            continue;
        };

        // Lines still inside the previous block's window stay with it.
        let lower = match n.checked_sub(1) {
            Some(p) => anchor
                .saturating_sub(before)
                .max((anchors[p] + after + 1).min(anchor)),
            None => anchor.saturating_sub(before),
        };
        let upper = anchors
            .get(n + 1)
            .map_or(lines.len(), |next| *next)
            .min(anchor + after + 1)
            .min(lines.len());
        let window = &lines[lower..upper];

        let mark = ShippingMarkMatch {
            sku: normalize_sku(&sku),
            product_number: first_capture(window, &MARK_PRODUCT_NUMBER)
                .map(|s| s.to_uppercase()),
            cartons: carton_count(window),
            units_per_carton: first_capture(window, &MARK_UNITS_PER_CARTON)
                .and_then(|s| s.parse().ok()),
            commodity_code: first_capture(window, &MARK_COMMODITY_CODE)
                .map(|s| s.chars().filter(char::is_ascii_digit).collect()),
            country_of_origin: first_capture(window, &MARK_ORIGIN)
                .map(|s| s.trim().trim_end_matches('.').to_uppercase()),
            net_weight_kg: first_capture(window, &MARK_NET_WEIGHT).and_then(|s| parse_number(&s)),
            gross_weight_kg: first_capture(window, &MARK_GROSS_WEIGHT)
                .and_then(|s| parse_number(&s)),
            dimensions: window.iter().find_map(|l| dimensions(l)),
        };

        let context = window
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        results.push(FieldMatch::new(mark, lines[anchor].trim(), context));
    }

    results
}

fn anchor_sku(line: &str) -> Option<String> {
    let found = SHIPPING_MARK_ANCHOR.find(line)?;
    let rest = line[found.end()..].trim_start_matches([':', '-', '#', ' ', '\t']);
    let rest = SKU_LABEL.replace(rest, "");
    rest.split_whitespace()
        .find(|t| is_sku_token(t))
        .map(str::to_string)
}

/// First non-empty capture group of the first match in the window.
fn first_capture(window: &[&str], pattern: &Regex) -> Option<String> {
    window.iter().find_map(|line| {
        pattern
            .captures(line)
            .and_then(|caps| any_group(&caps))
            .map(str::to_string)
    })
}

fn any_group<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.iter().skip(1).flatten().next().map(|m| m.as_str())
}

/// Carton counts, skipping per-carton figures such as `QTY/CTN: 24`.
fn carton_count(window: &[&str]) -> Option<i64> {
    for line in window {
        for caps in MARK_CARTONS.captures_iter(line) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let prefix = line[..whole.start()].trim_end().to_lowercase();
            if prefix.ends_with('/') || prefix.ends_with("per") {
                continue;
            }
            if let Some(count) = any_group(&caps).and_then(|s| s.parse().ok()) {
                return Some(count);
            }
        }
    }
    None
}

/// `A x B x C` with an optional unit, converted to centimetres.
fn dimensions(line: &str) -> Option<CartonDimensions> {
    let caps = MARK_DIMENSIONS.captures(line)?;
    let factor = match caps.get(4).map(|m| m.as_str().to_lowercase()).as_deref() {
        Some("mm") => Decimal::new(1, 1),
        Some("m") => Decimal::from(100),
        _ => Decimal::ONE,
    };
    let side = |i: usize| parse_number(&caps[i]).map(|v| (v * factor).normalize());

    Some(CartonDimensions {
        length_cm: side(1)?,
        width_cm: side(2)?,
        height_cm: side(3)?,
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

    const MARKS: &str = "\
SHIPPING MARK: BT-1001-SEA
ITEM NO.: 1001
QTY/CTN: 24 PCS
CTNS: 50
N.W.: 9.5 KGS  G.W.: 10.8 KGS
MEAS: 50 x 40 x 30 CM
HS CODE: 9503.00.75
MADE IN CHINA

SHIPPING MARK: BT-1002
C/NO. 1-20
12 PCS/CTN
CARTON SIZE 600X400X350MM
COUNTRY OF ORIGIN: Vietnam
";

    #[test]
    fn test_full_block() {
        let marks = shipping_marks(MARKS, 2, 15);
        assert_eq!(marks.len(), 2);

        assert_eq!(
            marks[0].value,
            ShippingMarkMatch {
                sku: "BT-1001".into(),
                product_number: Some("1001".into()),
                cartons: Some(50),
                units_per_carton: Some(24),
                commodity_code: Some("95030075".into()),
                country_of_origin: Some("CHINA".into()),
                net_weight_kg: Some(dec("9.5")),
                gross_weight_kg: Some(dec("10.8")),
                dimensions: Some(CartonDimensions {
                    length_cm: dec("50"),
                    width_cm: dec("40"),
                    height_cm: dec("30"),
                }),
            }
        );
    }

    #[test]
    fn test_second_block_does_not_borrow_from_first() {
        let marks = shipping_marks(MARKS, 2, 15);
        let second = &marks[1].value;
        assert_eq!(second.sku, "BT-1002");
        assert_eq!(second.cartons, Some(20));
        assert_eq!(second.units_per_carton, Some(12));
        assert_eq!(second.net_weight_kg, None);
        assert_eq!(second.commodity_code, None);
        assert_eq!(second.country_of_origin, Some("VIETNAM".into()));
        assert_eq!(
            second.dimensions,
            Some(CartonDimensions {
                length_cm: dec("60"),
                width_cm: dec("40"),
                height_cm: dec("35"),
            })
        );
    }

    #[test]
    fn test_anchor_without_sku_is_skipped() {
        assert!(shipping_marks("SHIPPING MARKS: AS PER BUYER\nCTNS: 10", 2, 15).is_empty());
    }

    #[test]
    fn test_window_is_bounded() {
        let text = "SHIPPING MARK: A-100\nL1\nL2\nCTNS: 9";
        let marks = shipping_marks(text, 2, 2);
        assert_eq!(marks[0].value.cartons, None);
    }
}
