//! The backfill write policy: only into empty targets, only unique values.

use serde::{Deserialize, Serialize};

use crate::models::order::{FieldValue, OrderField, is_empty_value};
use crate::reconcile::{AliasTable, Reduced};

/// Why nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The target already holds a value.
    AlreadyPopulated,
    /// No usable candidate survived gating and filtering.
    NoCandidates,
    /// Several distinct candidates remain.
    Ambiguous,
}

/// Outcome for one target field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Apply {
        value: FieldValue,
        /// An existing supplier name rewritten to its canonical spelling.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        canonicalization: bool,
    },
    Skip {
        reason: SkipReason,
    },
}

impl Decision {
    pub fn applied(&self) -> Option<&FieldValue> {
        match self {
            Decision::Apply { value, .. } => Some(value),
            Decision::Skip { .. } => None,
        }
    }

    pub fn is_apply(&self) -> bool {
        matches!(self, Decision::Apply { .. })
    }

    fn skip(reason: SkipReason) -> Self {
        Decision::Skip { reason }
    }
}

/// Decide whether a reduced candidate may be written into an empty target.
pub fn decide_value(current: Option<&FieldValue>, reduced: &Reduced<FieldValue>) -> Decision {
    if !is_empty_value(current) {
        return Decision::skip(SkipReason::AlreadyPopulated);
    }

    match reduced {
        Reduced::Unique(value) => Decision::Apply {
            value: value.clone(),
            canonicalization: false,
        },
        Reduced::None => Decision::skip(SkipReason::NoCandidates),
        Reduced::Ambiguous(_) => Decision::skip(SkipReason::Ambiguous),
    }
}

/// Decide for an order-level field.
///
/// A populated supplier name is the one exception to the no-overwrite
/// rule: a known spelling variant is rewritten to its canonical form.
pub fn decide(
    field: OrderField,
    current: Option<&FieldValue>,
    reduced: &Reduced<FieldValue>,
    aliases: &AliasTable,
) -> Decision {
    if field == OrderField::SupplierName {
        if let Some(FieldValue::Text(name)) = current.filter(|v| !v.is_blank()) {
            return match aliases.lookup(name) {
                Some(canonical) if canonical != name.trim() => Decision::Apply {
                    value: FieldValue::Text(canonical.to_string()),
                    canonicalization: true,
                },
                _ => Decision::skip(SkipReason::AlreadyPopulated),
            };
        }
    }

    decide_value(current, reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::SupplierAlias;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_applies_only_into_empty_targets() {
        let unique = Reduced::Unique(text("MSC ANNA"));
        let aliases = AliasTable::default();

        assert_eq!(
            decide(OrderField::Vessel, None, &unique, &aliases),
            Decision::Apply {
                value: text("MSC ANNA"),
                canonicalization: false
            }
        );
        assert_eq!(
            decide(OrderField::Vessel, Some(&text("-")), &unique, &aliases).applied(),
            Some(&text("MSC ANNA"))
        );
        assert_eq!(
            decide(OrderField::Vessel, Some(&text("EVER GIVEN")), &unique, &aliases),
            Decision::Skip {
                reason: SkipReason::AlreadyPopulated
            }
        );
    }

    #[test]
    fn test_dates_are_never_blank() {
        let date = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let unique = Reduced::Unique(FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()));
        assert!(!decide_value(Some(&date), &unique).is_apply());
    }

    #[test]
    fn test_skip_reasons() {
        assert_eq!(
            decide_value(None, &Reduced::None),
            Decision::Skip {
                reason: SkipReason::NoCandidates
            }
        );
        assert_eq!(
            decide_value(None, &Reduced::Ambiguous(vec![text("A1"), text("B2")])),
            Decision::Skip {
                reason: SkipReason::Ambiguous
            }
        );
    }

    #[test]
    fn test_supplier_name_canonicalization() {
        let aliases = AliasTable::new(&[SupplierAlias {
            canonical: "Ningbo Beta Toys Co., Ltd.".into(),
            variants: vec!["宁波贝塔玩具有限公司".into()],
        }]);
        let none = Reduced::None;

        let decision = decide(
            OrderField::SupplierName,
            Some(&text("宁波贝塔玩具有限公司")),
            &none,
            &aliases,
        );
        assert_eq!(
            decision,
            Decision::Apply {
                value: text("Ningbo Beta Toys Co., Ltd."),
                canonicalization: true
            }
        );

        // Already canonical, or unknown: left alone.
        for current in ["Ningbo Beta Toys Co., Ltd.", "Other Supplier Ltd"] {
            assert!(!decide(OrderField::SupplierName, Some(&text(current)), &none, &aliases).is_apply());
        }

        // Other fields never canonicalize.
        assert!(!decide(OrderField::SupplierAddress, Some(&text("宁波贝塔玩具有限公司")), &none, &aliases).is_apply());
    }
}
