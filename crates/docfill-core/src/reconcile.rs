//! Candidate reconciliation.
//!
//! A field's candidate list is reduced to no value, one value, or
//! "ambiguous". Conflicting evidence is never broken by tie-breaking:
//! absence and conflict both end in "do nothing".

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::models::candidate::Candidate;
use crate::models::config::{ReconcileConfig, SupplierAlias};
use crate::models::order::{FieldPolicy, FieldValue};

/// Corporate-suffix spellings treated as equal when comparing names.
const SUFFIX_EQUIVALENTS: [(&str, &str); 10] = [
    ("COMPANY LIMITED", "CO LTD"),
    ("CO LIMITED", "CO LTD"),
    ("COMPANY LTD", "CO LTD"),
    ("CORPORATION", "CORP"),
    ("INCORPORATED", "INC"),
    ("LIMITED", "LTD"),
    ("有限责任公司", "CO LTD"),
    ("有限公司", "CO LTD"),
    ("株式会社", "KK"),
    ("주식회사", "CO LTD"),
];

/// Separators that make an alphanumeric token look like a reference.
const REFERENCE_SEPARATORS: [char; 4] = ['-', '/', '_', '.'];

/// Result of reducing a candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "values", rename_all = "snake_case")]
pub enum Reduced<T> {
    /// No usable candidate.
    None,
    /// Exactly one distinct value.
    Unique(T),
    /// Several distinct values; nothing is written.
    Ambiguous(Vec<T>),
}

impl<T> Reduced<T> {
    pub fn unique(&self) -> Option<&T> {
        match self {
            Reduced::Unique(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Reduced::Ambiguous(_))
    }
}

/// Why a candidate did or did not take part in the reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Considered,
    ExcludedOptical,
    Implausible,
}

/// A reduced candidate list with the per-candidate statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub outcome: Reduced<FieldValue>,
    /// Parallel to the input candidates.
    pub statuses: Vec<CandidateStatus>,
}

/// Deduplicate by value; unique when exactly one distinct value remains.
pub fn reduce<T: Ord>(values: impl IntoIterator<Item = T>) -> Reduced<T> {
    let distinct: BTreeSet<T> = values.into_iter().collect();
    let mut iter = distinct.into_iter();
    match (iter.next(), iter.next()) {
        (None, _) => Reduced::None,
        (Some(only), None) => Reduced::Unique(only),
        (Some(a), Some(b)) => {
            let mut all = vec![a, b];
            all.extend(iter);
            Reduced::Ambiguous(all)
        }
    }
}

/// Measurement rule: a single distinct value wins, otherwise the maximum
/// wins only when it is at least `ratio` times the minimum.
pub fn reduce_measurement(values: impl IntoIterator<Item = Decimal>, ratio: Decimal) -> Reduced<Decimal> {
    let normalized = values.into_iter().map(|v| v.normalize());
    match reduce(normalized) {
        Reduced::Ambiguous(all) => {
            // `all` is sorted ascending.
            let (min, max) = (all[0], all[all.len() - 1]);
            if min > Decimal::ZERO && max >= min * ratio {
                trace!("Outlier rule picks {} over {}", max, min);
                Reduced::Unique(max)
            } else {
                Reduced::Ambiguous(all)
            }
        }
        other => other,
    }
}

/// Letters and digits, a minimum length, and a separator or known prefix.
pub fn plausible_reference(value: &str, min_len: usize, prefixes: &[String]) -> bool {
    let value = value.trim();
    let upper = value.to_uppercase();

    value.chars().count() >= min_len
        && value.chars().any(|c| c.is_alphabetic())
        && value.chars().any(|c| c.is_ascii_digit())
        && (value.contains(REFERENCE_SEPARATORS)
            || prefixes.iter().any(|p| upper.starts_with(&p.to_uppercase())))
}

/// Comparison key for a company name: uppercase, punctuation dropped,
/// whitespace collapsed and corporate suffixes unified.
pub fn name_key(name: &str) -> String {
    let cleaned: String = name
        .to_uppercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut key = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    for (variant, canonical) in SUFFIX_EQUIVALENTS {
        match key.strip_suffix(variant) {
            // Latin suffixes must be whole words; CJK ones attach directly.
            Some(head) if head.is_empty() || head.ends_with(' ') || !variant.is_ascii() => {
                key = format!("{} {}", head.trim_end(), canonical).trim().to_string();
                break;
            }
            _ => {}
        }
    }
    key
}

/// Known supplier spellings mapped to their canonical name.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    by_key: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new(aliases: &[SupplierAlias]) -> Self {
        let mut by_key = BTreeMap::new();
        for alias in aliases {
            let canonical = alias.canonical.trim().to_string();
            by_key.insert(name_key(&canonical), canonical.clone());
            for variant in &alias.variants {
                by_key.insert(name_key(variant), canonical.clone());
            }
        }
        Self { by_key }
    }

    /// Canonical spelling when the name is a known variant.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.by_key.get(&name_key(name)).map(String::as_str)
    }

    /// Canonical spelling, or the name with whitespace collapsed.
    pub fn canonicalize(&self, name: &str) -> String {
        match self.lookup(name) {
            Some(canonical) => canonical.to_string(),
            None => name.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Applies method gating and per-field policies to candidate lists.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconcileConfig,
    aliases: AliasTable,
}

impl Reconciler {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self {
            aliases: AliasTable::new(&config.supplier_aliases),
            config: config.clone(),
        }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn allows_ocr_evidence(&self) -> bool {
        self.config.allow_ocr_evidence
    }

    fn status(&self, policy: FieldPolicy, candidate: &Candidate<FieldValue>) -> CandidateStatus {
        if candidate.is_optical() && !self.config.allow_ocr_evidence {
            return CandidateStatus::ExcludedOptical;
        }

        let plausible = match (policy, &candidate.value) {
            (FieldPolicy::Reference, FieldValue::Text(s)) => plausible_reference(
                s,
                self.config.reference_min_len,
                &self.config.reference_prefixes,
            ),
            (FieldPolicy::Measurement, value) => {
                value.as_decimal().is_some_and(|d| d > Decimal::ZERO)
            }
            (_, value) => !value.is_blank(),
        };

        if plausible {
            CandidateStatus::Considered
        } else {
            CandidateStatus::Implausible
        }
    }

    /// Reduce one field's candidates under the given policy.
    pub fn reduce(&self, policy: FieldPolicy, candidates: &[Candidate<FieldValue>]) -> Reduction {
        let statuses: Vec<CandidateStatus> =
            candidates.iter().map(|c| self.status(policy, c)).collect();
        let considered = candidates
            .iter()
            .zip(&statuses)
            .filter(|(_, s)| **s == CandidateStatus::Considered)
            .map(|(c, _)| &c.value);

        let outcome = match policy {
            FieldPolicy::Measurement => {
                let values: Vec<&FieldValue> = considered.collect();
                let counts = values.iter().all(|v| matches!(v, FieldValue::Count(_)));
                let decimals = values.iter().filter_map(|v| v.as_decimal());
                match reduce_measurement(decimals, self.config.outlier_ratio) {
                    Reduced::None => Reduced::None,
                    Reduced::Unique(d) => Reduced::Unique(measurement_value(d, counts)),
                    Reduced::Ambiguous(all) => Reduced::Ambiguous(
                        all.into_iter().map(|d| measurement_value(d, counts)).collect(),
                    ),
                }
            }
            FieldPolicy::Counterparty => self.reduce_names(considered),
            FieldPolicy::Plain | FieldPolicy::Reference => reduce(considered.map(normalize_value)),
        };

        Reduction { outcome, statuses }
    }

    /// Names collapse when their comparison keys match after alias lookup;
    /// the first spelling seen stands for its group.
    fn reduce_names<'a>(&self, values: impl Iterator<Item = &'a FieldValue>) -> Reduced<FieldValue> {
        let mut groups: BTreeMap<String, String> = BTreeMap::new();
        for value in values {
            let Some(name) = value.as_text() else {
                continue;
            };
            let canonical = self.aliases.canonicalize(name);
            groups.entry(name_key(&canonical)).or_insert(canonical);
        }
        reduce(groups.into_values().map(FieldValue::Text))
    }
}

fn measurement_value(d: Decimal, counts: bool) -> FieldValue {
    match i64::try_from(d) {
        Ok(n) if counts => FieldValue::Count(n),
        _ => FieldValue::Number(d),
    }
}

/// Trim text and collapse inner whitespace so layout noise does not
/// create spurious conflicts.
fn normalize_value(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Text(s) => FieldValue::Text(s.split_whitespace().collect::<Vec<_>>().join(" ")),
        FieldValue::Number(d) => FieldValue::Number(d.normalize()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::Provenance;
    use crate::models::document::{DocumentType, ExtractionMethod};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn candidate(value: FieldValue, method: ExtractionMethod) -> Candidate<FieldValue> {
        Candidate {
            raw: value.to_string(),
            context: value.to_string(),
            value,
            provenance: Provenance {
                source_path: "doc.pdf".into(),
                method,
                document_id: Some("d1".into()),
                document_type: Some(DocumentType::PackingList),
                document_stage: None,
                matcher: "test".into(),
            },
        }
    }

    fn native(value: FieldValue) -> Candidate<FieldValue> {
        candidate(value, ExtractionMethod::NativeText)
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_reduce_deduplicates() {
        assert_eq!(reduce(Vec::<i32>::new()), Reduced::None);
        assert_eq!(reduce(vec![3, 3, 3]), Reduced::Unique(3));
        assert_eq!(reduce(vec![4, 3, 4]), Reduced::Ambiguous(vec![3, 4]));
    }

    #[test]
    fn test_weight_outlier_rule() {
        let ratio = Decimal::from(5);
        assert_eq!(
            reduce_measurement(vec![dec("120.5"), dec("1205.0")], ratio),
            Reduced::Unique(dec("1205"))
        );
        assert!(reduce_measurement(vec![dec("120.5"), dec("121.0")], ratio).is_ambiguous());
        assert_eq!(
            reduce_measurement(vec![dec("1205.0"), dec("1205.00")], ratio),
            Reduced::Unique(dec("1205"))
        );
    }

    #[test]
    fn test_numeric_equality_dedup() {
        let reconciler = Reconciler::new(&ReconcileConfig::default());
        let found = reconciler.reduce(
            FieldPolicy::Measurement,
            &[
                native(FieldValue::Number(dec("1205.0"))),
                native(FieldValue::Number(dec("1205.00"))),
            ],
        );
        assert_eq!(found.outcome, Reduced::Unique(FieldValue::Number(dec("1205"))));
    }

    #[test]
    fn test_optical_candidates_are_gated() {
        let candidates = vec![candidate(text("MSC ANNA"), ExtractionMethod::OpticalRecognition)];

        let strict = Reconciler::new(&ReconcileConfig::default());
        let found = strict.reduce(FieldPolicy::Plain, &candidates);
        assert_eq!(found.outcome, Reduced::None);
        assert_eq!(found.statuses, vec![CandidateStatus::ExcludedOptical]);

        let lenient = Reconciler::new(&ReconcileConfig {
            allow_ocr_evidence: true,
            ..ReconcileConfig::default()
        });
        let found = lenient.reduce(FieldPolicy::Plain, &candidates);
        assert_eq!(found.outcome, Reduced::Unique(text("MSC ANNA")));
    }

    #[test]
    fn test_reference_plausibility() {
        let prefixes: Vec<String> = vec!["PI".into(), "INV".into()];
        assert!(plausible_reference("PI2024001", 5, &prefixes));
        assert!(plausible_reference("BT-2024-17", 5, &prefixes));
        assert!(!plausible_reference("2024001", 5, &prefixes));
        assert!(!plausible_reference("PROFORMA", 5, &prefixes));
        assert!(!plausible_reference("AB12", 5, &prefixes));
        assert!(!plausible_reference("XY20240", 5, &prefixes));
    }

    #[test]
    fn test_implausible_references_do_not_cause_ambiguity() {
        let reconciler = Reconciler::new(&ReconcileConfig::default());
        let found = reconciler.reduce(
            FieldPolicy::Reference,
            &[native(text("PI-24017")), native(text("20240117"))],
        );
        assert_eq!(found.outcome, Reduced::Unique(text("PI-24017")));
        assert_eq!(
            found.statuses,
            vec![CandidateStatus::Considered, CandidateStatus::Implausible]
        );
    }

    #[test]
    fn test_name_key_unifies_suffixes() {
        assert_eq!(name_key("Ningbo Beta Toys Co., Ltd."), "NINGBO BETA TOYS CO LTD");
        assert_eq!(name_key("NINGBO BETA TOYS COMPANY LIMITED"), "NINGBO BETA TOYS CO LTD");
        assert_eq!(name_key("宁波贝塔玩具有限公司"), "宁波贝塔玩具 CO LTD");
        assert_eq!(name_key("Unlimited Toys Unlimited"), "UNLIMITED TOYS UNLIMITED");
    }

    #[test]
    fn test_alias_table_collapses_scripts() {
        let config = ReconcileConfig {
            supplier_aliases: vec![SupplierAlias {
                canonical: "Ningbo Beta Toys Co., Ltd.".into(),
                variants: vec!["宁波贝塔玩具有限公司".into(), "BETA TOYS NINGBO".into()],
            }],
            ..ReconcileConfig::default()
        };
        let reconciler = Reconciler::new(&config);
        assert_eq!(
            reconciler.aliases().lookup("NINGBO BETA TOYS CO.,LTD"),
            Some("Ningbo Beta Toys Co., Ltd.")
        );

        let found = reconciler.reduce(
            FieldPolicy::Counterparty,
            &[
                native(text("宁波贝塔玩具有限公司")),
                native(text("NINGBO BETA TOYS CO., LTD.")),
                native(text("Beta Toys Ningbo")),
            ],
        );
        assert_eq!(found.outcome, Reduced::Unique(text("Ningbo Beta Toys Co., Ltd.")));
    }

    #[test]
    fn test_unknown_names_conflict() {
        let reconciler = Reconciler::new(&ReconcileConfig::default());
        let found = reconciler.reduce(
            FieldPolicy::Counterparty,
            &[native(text("ALPHA TRADING LTD")), native(text("GAMMA TOYS LTD"))],
        );
        assert!(found.outcome.is_ambiguous());
    }

    #[test]
    fn test_suffix_spellings_collapse_without_configured_aliases() {
        let reconciler = Reconciler::new(&ReconcileConfig::default());
        assert!(reconciler.aliases().is_empty());

        let found = reconciler.reduce(
            FieldPolicy::Counterparty,
            &[
                native(text("NINGBO BETA TOYS CO., LTD.")),
                native(text("Ningbo Beta Toys Company Limited")),
            ],
        );
        assert_eq!(found.outcome, Reduced::Unique(text("NINGBO BETA TOYS CO., LTD.")));
    }

    #[test]
    fn test_count_measurements_stay_counts() {
        let reconciler = Reconciler::new(&ReconcileConfig::default());
        let found = reconciler.reduce(
            FieldPolicy::Measurement,
            &[native(FieldValue::Count(12)), native(FieldValue::Count(120))],
        );
        assert_eq!(found.outcome, Reduced::Unique(FieldValue::Count(120)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn reference() -> impl Strategy<Value = String> {
        "[A-Z]{2}-[0-9]{4,8}"
    }

    proptest! {
        /// Two distinct plausible values never reduce to a unique one.
        #[test]
        fn two_distinct_values_are_ambiguous(a in reference(), b in reference()) {
            prop_assume!(a != b);
            let values = vec![FieldValue::Text(a), FieldValue::Text(b)];
            let reduced = reduce(values.iter().map(normalize_value));
            prop_assert!(reduced.is_ambiguous());
        }

        /// Repeating one value any number of times stays unique.
        #[test]
        fn repeated_value_is_unique(a in reference(), n in 1usize..6) {
            let reduced = reduce(std::iter::repeat(FieldValue::Text(a.clone())).take(n));
            prop_assert_eq!(reduced, Reduced::Unique(FieldValue::Text(a)));
        }

        /// The maximum wins exactly when it dominates the minimum.
        #[test]
        fn outlier_rule(min in 1i64..100_000, factor in 1i64..20, extra in 1i64..1_000) {
            let min = Decimal::new(min, 1);
            let max = min * Decimal::from(factor) + Decimal::new(extra, 2);
            let reduced = reduce_measurement(vec![min, max], Decimal::from(5));

            if max >= min * Decimal::from(5) {
                prop_assert_eq!(reduced, Reduced::Unique(max.normalize()));
            } else {
                prop_assert!(reduced.is_ambiguous());
            }
        }
    }
}
