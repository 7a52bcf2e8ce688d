//! Unambiguous date parsing and label-anchored date matchers.

use chrono::NaiveDate;
use regex::Regex;

use super::patterns::{
    CLEARANCE_DATE_LABEL, DATE_DAY_FIRST, DATE_ISO, DATE_MONTH_FIRST, DATE_NUMERIC, ETA_LABEL,
    INVOICE_DATE_LABEL, RECEIVED_DATE_LABEL, SHIPPED_ON_BOARD,
};
use crate::models::candidate::FieldMatch;

/// Lines after a bare label searched for its value.
const LABEL_LOOKAHEAD_LINES: usize = 2;

/// A date-shaped token and its parse.
///
/// `date` is `None` when the token is ambiguous (`05/03/2024`) or
/// describes an impossible day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateToken {
    pub raw: String,
    pub start: usize,
    pub date: Option<NaiveDate>,
}

/// Parse a date, returning `None` rather than guessing.
pub fn parse_unambiguous_date(s: &str) -> Option<NaiveDate> {
    first_date_token(s).and_then(|token| token.date)
}

/// Earliest date-shaped token in `s`, in any supported form.
pub fn first_date_token(s: &str) -> Option<DateToken> {
    let mut tokens = Vec::new();

    if let Some(caps) = DATE_ISO.captures(s) {
        let whole = caps.get(0)?;
        let date = ymd(&caps[1], &caps[2], &caps[3]);
        tokens.push(DateToken {
            raw: whole.as_str().to_string(),
            start: whole.start(),
            date,
        });
    }

    if let Some(caps) = DATE_NUMERIC.captures(s) {
        let whole = caps.get(0)?;
        tokens.push(DateToken {
            raw: whole.as_str().to_string(),
            start: whole.start(),
            date: disambiguate_numeric(&caps[1], &caps[2], &caps[3]),
        });
    }

    if let Some(caps) = DATE_MONTH_FIRST.captures(s) {
        let whole = caps.get(0)?;
        let date = month_number(&caps[1]).and_then(|month| {
            let day = caps[2].parse().ok()?;
            let year = caps[3].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        });
        tokens.push(DateToken {
            raw: whole.as_str().to_string(),
            start: whole.start(),
            date,
        });
    }

    if let Some(caps) = DATE_DAY_FIRST.captures(s) {
        let whole = caps.get(0)?;
        let date = month_number(&caps[2]).and_then(|month| {
            let day = caps[1].parse().ok()?;
            NaiveDate::from_ymd_opt(parse_year(&caps[3])?, month, day)
        });
        tokens.push(DateToken {
            raw: whole.as_str().to_string(),
            start: whole.start(),
            date,
        });
    }

    tokens.into_iter().min_by_key(|t| t.start)
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// `A/B/YYYY`: only resolved when one component cannot be a month.
fn disambiguate_numeric(first: &str, second: &str, year: &str) -> Option<NaiveDate> {
    let a: u32 = first.parse().ok()?;
    let b: u32 = second.parse().ok()?;
    let year: i32 = year.parse().ok()?;

    if a == b {
        return NaiveDate::from_ymd_opt(year, a, b);
    }
    match (a > 12, b > 12) {
        (true, false) => NaiveDate::from_ymd_opt(year, b, a),
        (false, true) => NaiveDate::from_ymd_opt(year, a, b),
        _ => None,
    }
}

/// Four-digit years pass through; two-digit years pivot at 50.
fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    match s.len() {
        4 => Some(year),
        2 if year <= 50 => Some(2000 + year),
        2 => Some(1900 + year),
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Dates following a label, on the same line or the next few lines.
///
/// The first date-shaped token after the label decides: when it is
/// ambiguous the label yields nothing instead of trying later tokens.
pub fn labeled_dates(text: &str, label: &Regex) -> Vec<FieldMatch<NaiveDate>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut results = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(found) = label.find(line) else {
            continue;
        };

        let token = first_date_token(&line[found.end()..]).map(|t| (t, i)).or_else(|| {
            lines
                .iter()
                .enumerate()
                .skip(i + 1)
                .filter(|(_, l)| !l.trim().is_empty())
                .take(LABEL_LOOKAHEAD_LINES)
                .find_map(|(j, l)| first_date_token(l).map(|t| (t, j)))
        });

        let Some((token, j)) = token else {
            continue;
        };
        let Some(date) = token.date else {
            tracing::trace!(raw = %token.raw, "Skipping ambiguous date");
            continue;
        };

        let context = if i == j {
            line.trim().to_string()
        } else {
            format!("{}\n{}", line.trim(), lines[j].trim())
        };
        results.push(FieldMatch::new(date, token.raw, context));
    }

    results
}

/// Shipped-on-board / actual departure dates.
pub fn shipped_on_board(text: &str) -> Vec<FieldMatch<NaiveDate>> {
    labeled_dates(text, &SHIPPED_ON_BOARD)
}

/// Estimated arrival dates.
pub fn estimated_arrival(text: &str) -> Vec<FieldMatch<NaiveDate>> {
    labeled_dates(text, &ETA_LABEL)
}

/// Invoice issue dates.
pub fn invoice_date(text: &str) -> Vec<FieldMatch<NaiveDate>> {
    labeled_dates(text, &INVOICE_DATE_LABEL)
}

/// Goods-received dates.
pub fn received_date(text: &str) -> Vec<FieldMatch<NaiveDate>> {
    labeled_dates(text, &RECEIVED_DATE_LABEL)
}

/// Customs acceptance/clearance dates.
pub fn clearance_date(text: &str) -> Vec<FieldMatch<NaiveDate>> {
    labeled_dates(text, &CLEARANCE_DATE_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_numeric_dates_need_a_component_over_twelve() {
        assert_eq!(parse_unambiguous_date("05/03/2024"), None);
        assert_eq!(parse_unambiguous_date("13/03/2024"), Some(date(2024, 3, 13)));
        assert_eq!(parse_unambiguous_date("03/13/2024"), Some(date(2024, 3, 13)));
        assert_eq!(parse_unambiguous_date("07.07.2024"), Some(date(2024, 7, 7)));
        assert_eq!(parse_unambiguous_date("31/31/2024"), None);
    }

    #[test]
    fn test_named_month_forms() {
        assert_eq!(parse_unambiguous_date("2024-03-12"), Some(date(2024, 3, 12)));
        assert_eq!(parse_unambiguous_date("March 5, 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_unambiguous_date("5th March 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_unambiguous_date("12-MAR-2024"), Some(date(2024, 3, 12)));
        assert_eq!(parse_unambiguous_date("12-MAR-24"), Some(date(2024, 3, 12)));
        assert_eq!(parse_unambiguous_date("01-JAN-99"), Some(date(1999, 1, 1)));
        assert_eq!(parse_unambiguous_date("30 Feb 2024"), None);
        assert_eq!(parse_unambiguous_date("no date here"), None);
    }

    #[test]
    fn test_shipped_on_board_same_line() {
        let text = "BILL OF LADING\nSHIPPED ON BOARD 12-MAR-2024\n";
        let found = shipped_on_board(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, date(2024, 3, 12));
        assert_eq!(found[0].raw, "12-MAR-2024");
        assert_eq!(found[0].context, "SHIPPED ON BOARD 12-MAR-2024");
    }

    #[test]
    fn test_label_value_on_next_line() {
        let text = "ETA\n\n2024/04/20\n";
        let found = estimated_arrival(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, date(2024, 4, 20));
        assert_eq!(found[0].context, "ETA\n2024/04/20");
    }

    #[test]
    fn test_ambiguous_labeled_date_yields_nothing() {
        let text = "Invoice Date: 05/03/2024 (due 20/04/2024)";
        assert!(invoice_date(text).is_empty());
    }

    #[test]
    fn test_eta_is_not_matched_inside_words() {
        assert!(estimated_arrival("BETA release 2024-01-01").is_empty());
    }
}
