//! Supplier name and address from a document header.

use super::patterns::{
    COMPANY_SUFFIX, CONTACT_LINE, DOCUMENT_MARKER, PARTY_LABEL, SECTION_BOUNDARY,
};
use crate::models::candidate::FieldMatch;

/// Supplier identity found in a header block.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterpartyMatch {
    pub name: FieldMatch<String>,
    pub address: Option<FieldMatch<String>>,
}

/// Locate the supplier block above the first invoice/PO marker.
///
/// The name is the first company-shaped line in the header window. The
/// address is the run of plain lines that follows it, stopping at contact
/// details, a section boundary, a blank line or `address_max_lines`.
pub fn counterparty(
    text: &str,
    header_lines: usize,
    address_max_lines: usize,
) -> Option<CounterpartyMatch> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let marker = lines
        .iter()
        .position(|l| DOCUMENT_MARKER.is_match(l))
        .unwrap_or(lines.len());
    let window_end = marker.min(header_lines).min(lines.len());

    for i in 0..window_end {
        let line = lines[i];
        if line.is_empty() || CONTACT_LINE.is_match(line) || SECTION_BOUNDARY.is_match(line) {
            continue;
        }

        let (name, name_line) = match PARTY_LABEL.find(line) {
            Some(label) if line[label.end()..].trim().is_empty() => {
                match lines.get(i + 1) {
                    Some(next) if i + 1 < window_end => (next.to_string(), i + 1),
                    _ => continue,
                }
            }
            Some(label) => (line[label.end()..].trim().to_string(), i),
            None => (line.to_string(), i),
        };

        if !COMPANY_SUFFIX.is_match(&name) {
            continue;
        }

        let name = clean_name(&name);
        let address = collect_address(&lines, name_line + 1, address_max_lines);
        tracing::trace!(name = %name, has_address = address.is_some(), "Found counterparty");

        return Some(CounterpartyMatch {
            name: FieldMatch::new(name, lines[name_line], lines[name_line]),
            address,
        });
    }

    None
}

fn clean_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([',', ';'])
        .to_string()
}

fn collect_address(lines: &[&str], start: usize, max_lines: usize) -> Option<FieldMatch<String>> {
    let mut parts = Vec::new();
    for line in lines.iter().skip(start).take(max_lines) {
        if line.is_empty()
            || CONTACT_LINE.is_match(line)
            || SECTION_BOUNDARY.is_match(line)
            || DOCUMENT_MARKER.is_match(line)
        {
            break;
        }
        parts.push(line.trim_end_matches(',').trim());
    }

    if parts.is_empty() {
        return None;
    }
    let raw = parts.join("\n");
    Some(FieldMatch::new(parts.join(", "), raw.clone(), raw))
}

/// Supplier name candidates.
pub fn supplier_name(text: &str, header_lines: usize, address_max_lines: usize) -> Vec<FieldMatch<String>> {
    counterparty(text, header_lines, address_max_lines)
        .map(|m| m.name)
        .into_iter()
        .collect()
}

/// Supplier address candidates.
pub fn supplier_address(text: &str, header_lines: usize, address_max_lines: usize) -> Vec<FieldMatch<String>> {
    counterparty(text, header_lines, address_max_lines)
        .and_then(|m| m.address)
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "\
NINGBO BRIGHT TOYS CO., LTD.
No. 88 Jiangnan Road, Beilun District
Ningbo, Zhejiang 315800, China
TEL: +86 574 8888 1234
PROFORMA INVOICE
To: Example Imports Ltd
";

    #[test]
    fn test_name_and_address_before_marker() {
        let found = counterparty(HEADER, 12, 4).unwrap();
        assert_eq!(found.name.value, "NINGBO BRIGHT TOYS CO., LTD.");
        assert_eq!(
            found.address.unwrap().value,
            "No. 88 Jiangnan Road, Beilun District, Ningbo, Zhejiang 315800, China"
        );
    }

    #[test]
    fn test_buyer_after_marker_is_ignored() {
        let text = "COMMERCIAL INVOICE\nTo: Example Imports Ltd\n";
        assert_eq!(counterparty(text, 12, 4), None);
    }

    #[test]
    fn test_labeled_seller_line() {
        let text = "Seller: Shenzhen Lumen Electronics Co., Ltd\n12 Keji Road\nEmail: a@b.com\nINVOICE";
        let found = counterparty(text, 12, 4).unwrap();
        assert_eq!(found.name.value, "Shenzhen Lumen Electronics Co., Ltd");
        assert_eq!(found.address.unwrap().value, "12 Keji Road");
    }

    #[test]
    fn test_address_is_capped() {
        let text = "ACME GMBH\nA\nB\nC\nD\nE\nINVOICE";
        let found = counterparty(text, 12, 2).unwrap();
        assert_eq!(found.address.unwrap().value, "A, B");
    }

    #[test]
    fn test_non_latin_company_name() {
        let text = "宁波明亮玩具有限公司\n形式发票\nPROFORMA INVOICE";
        let found = counterparty(text, 12, 4).unwrap();
        assert_eq!(found.name.value, "宁波明亮玩具有限公司");
    }
}
