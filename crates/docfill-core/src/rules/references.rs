//! Reference-number matchers: invoices, bills of lading, containers,
//! customs entries and purchase orders.

use std::collections::BTreeSet;

use regex::Regex;

use super::patterns::{
    BILL_OF_LADING_NO, CARRIER_REFERENCE, COMMERCIAL_INVOICE_NO, CONTACT_LINE, CONTACT_PREFIX,
    CONTAINER_NO, CONTAINER_SHAPE, ENTRY_NUMBER, MRN_LABELED, MRN_STANDALONE, PO_REFERENCE,
    PROFORMA_HEADER, PROFORMA_MENTION, PROFORMA_NO,
};
use crate::models::candidate::FieldMatch;

/// Minimum digits in an unlabeled carrier reference.
const CARRIER_REFERENCE_MIN_DIGITS: usize = 6;

fn clean_reference(raw: &str) -> String {
    raw.trim_end_matches(['.', ',', '-', '/', '_']).to_uppercase()
}

/// First capture group of every match, line by line.
fn labeled(text: &str, pattern: &Regex, skip_line: impl Fn(&str) -> bool) -> Vec<FieldMatch<String>> {
    let mut results = Vec::new();
    for line in text.lines() {
        if skip_line(line) {
            continue;
        }
        for caps in pattern.captures_iter(line) {
            let Some(group) = caps.get(1) else {
                continue;
            };
            let value = clean_reference(group.as_str());
            if !value.is_empty() {
                results.push(FieldMatch::new(value, group.as_str(), line.trim()));
            }
        }
    }
    results
}

/// Commercial invoice numbers; lines that talk about a proforma are skipped.
pub fn commercial_invoice_number(text: &str) -> Vec<FieldMatch<String>> {
    labeled(text, &COMMERCIAL_INVOICE_NO, |line| PROFORMA_MENTION.is_match(line))
}

/// Proforma invoice numbers.
pub fn proforma_invoice_number(text: &str) -> Vec<FieldMatch<String>> {
    let mut results = labeled(text, &PROFORMA_NO, |_| false);
    if results.is_empty() {
        results = labeled(text, &PROFORMA_HEADER, |_| false);
    }
    results
}

/// Bill of lading numbers.
///
/// Label-anchored first. Without a label, the leading `scan_lines` lines
/// are scanned for carrier-reference-shaped tokens and the result is kept
/// only when exactly one distinct token qualifies.
pub fn bill_of_lading_number(text: &str, scan_lines: usize) -> Vec<FieldMatch<String>> {
    let results = labeled(text, &BILL_OF_LADING_NO, |_| false);
    if !results.is_empty() {
        return results;
    }

    let mut seen = BTreeSet::new();
    let mut first = None;
    for line in text.lines().take(scan_lines) {
        if CONTACT_LINE.is_match(line) {
            continue;
        }
        for token in CARRIER_REFERENCE.find_iter(line) {
            let token = token.as_str();
            if !is_carrier_reference(token) {
                continue;
            }
            if seen.insert(token.to_string()) && first.is_none() {
                first = Some(FieldMatch::new(token.to_string(), token, line.trim()));
            }
        }
    }

    match (seen.len(), first) {
        (1, Some(found)) => vec![found],
        (0, _) => Vec::new(),
        (n, _) => {
            tracing::debug!(count = n, "Several unlabeled B/L-shaped tokens, ignoring");
            Vec::new()
        }
    }
}

fn is_carrier_reference(token: &str) -> bool {
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    let has_letter = token.chars().any(|c| c.is_ascii_alphabetic());

    has_letter
        && digits >= CARRIER_REFERENCE_MIN_DIGITS
        && !CONTAINER_SHAPE.is_match(token)
        && !CONTACT_PREFIX.is_match(token)
}

/// Container numbers with a valid ISO 6346 check digit.
pub fn container_number(text: &str) -> Vec<FieldMatch<String>> {
    let mut results = Vec::new();
    for line in text.lines() {
        for caps in CONTAINER_NO.captures_iter(line) {
            let number = format!("{}{}{}", &caps[1], &caps[2], &caps[3]);
            if validate_container_number(&number) {
                results.push(FieldMatch::new(number, &caps[0], line.trim()));
            }
        }
    }
    results
}

/// Validate an ISO 6346 container number (owner code, serial, check digit).
pub fn validate_container_number(number: &str) -> bool {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() != 11 || !CONTAINER_SHAPE.is_match(number) {
        return false;
    }

    let mut sum: u32 = 0;
    for (i, c) in chars[..10].iter().enumerate() {
        let value = match c {
            'A'..='Z' => letter_value(*c),
            '0'..='9' => c.to_digit(10).unwrap_or(0),
            _ => return false,
        };
        sum += value << i;
    }

    let check = (sum % 11) % 10;
    chars[10].to_digit(10) == Some(check)
}

/// Letter values skip multiples of 11.
fn letter_value(c: char) -> u32 {
    let mut value = 10;
    let mut letter = 'A';
    while letter < c {
        value += 1;
        if value % 11 == 0 {
            value += 1;
        }
        letter = (letter as u8 + 1) as char;
    }
    value
}

/// Customs references: labeled MRN, then bare MRN, then entry numbers.
pub fn customs_reference(text: &str) -> Vec<FieldMatch<String>> {
    let results = labeled(text, &MRN_LABELED, |_| false);
    if !results.is_empty() {
        return results;
    }
    let results = labeled(text, &MRN_STANDALONE, |_| false);
    if !results.is_empty() {
        return results;
    }
    labeled(text, &ENTRY_NUMBER, |_| false)
}

/// Distinct purchase-order numbers a document refers to.
pub fn po_references(text: &str) -> BTreeSet<String> {
    labeled(text, &PO_REFERENCE, |_| false)
        .into_iter()
        .map(|m| m.value)
        .collect()
}
