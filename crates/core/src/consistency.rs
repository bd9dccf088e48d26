//! Load-time cross-record checks.
//!
//! Runs once, before a `RuleStore` exists. After these pass the store can
//! assume every case reference resolves and that no pair of rules both
//! requires and excludes the same combination.

use std::collections::{HashMap, HashSet};

use crate::error::DataError;
use crate::types::{CoOccurrenceRule, GrammaticalCase, RuleKind};

pub(crate) fn check(cases: &[GrammaticalCase], rules: &[CoOccurrenceRule]) -> Result<(), DataError> {
    let defined = check_cases(cases)?;
    check_rules(rules, &defined)?;
    check_require_exclude(rules)
}

fn check_cases(cases: &[GrammaticalCase]) -> Result<HashSet<&str>, DataError> {
    let mut defined: HashSet<&str> = HashSet::with_capacity(cases.len());
    for case in cases {
        if !defined.insert(case.code.as_str()) {
            return Err(DataError::DuplicateCase {
                code: case.code.clone(),
            });
        }
    }

    for case in cases {
        for why_not in &case.why_not_alternatives {
            if !defined.contains(why_not.other_case.as_str()) {
                return Err(DataError::UndefinedCase {
                    record: format!("case '{}' why_not_alternatives", case.code),
                    case: why_not.other_case.clone(),
                });
            }
        }
    }

    Ok(defined)
}

fn check_rules(rules: &[CoOccurrenceRule], defined: &HashSet<&str>) -> Result<(), DataError> {
    let mut ids: HashSet<&str> = HashSet::with_capacity(rules.len());

    for rule in rules {
        if !ids.insert(rule.id.as_str()) {
            return Err(DataError::DuplicateRule {
                id: rule.id.clone(),
            });
        }

        let invalid = |message: String| DataError::InvalidRule {
            rule: rule.id.clone(),
            message,
        };

        if rule.cases.is_empty() {
            return Err(invalid("must list at least one case".to_string()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for code in &rule.cases {
            if !seen.insert(code.as_str()) {
                return Err(invalid(format!("lists case '{}' more than once", code)));
            }
            if !defined.contains(code.as_str()) {
                return Err(DataError::UndefinedCase {
                    record: format!("rule '{}'", rule.id),
                    case: code.clone(),
                });
            }
        }

        match rule.kind {
            RuleKind::Exclude | RuleKind::Require => {
                if rule.cases.len() < 2 {
                    return Err(invalid(format!(
                        "{} needs at least two cases",
                        rule.kind
                    )));
                }
                if !rule.roles.is_empty() {
                    return Err(invalid(format!(
                        "'roles' only applies to ROLE_CONDITIONED rules, not {}",
                        rule.kind
                    )));
                }
                if rule.voluntary.is_some() {
                    return Err(invalid(format!(
                        "'voluntary' only applies to ROLE_CONDITIONED rules, not {}",
                        rule.kind
                    )));
                }
            }
            RuleKind::RoleConditioned => {
                if rule.cases.len() == 1 && rule.voluntary.is_none() {
                    return Err(invalid(
                        "a single-case ROLE_CONDITIONED rule needs a 'voluntary' condition"
                            .to_string(),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Directed (subject, other) pairs a rule constrains.
fn directed_pairs(rule: &CoOccurrenceRule) -> Vec<(&str, &str)> {
    rule.subjects()
        .iter()
        .flat_map(move |subject| {
            rule.others(subject)
                .map(move |other| (subject.as_str(), other))
        })
        .collect()
}

fn check_require_exclude(rules: &[CoOccurrenceRule]) -> Result<(), DataError> {
    let mut required: HashMap<(&str, &str), &str> = HashMap::new();
    for rule in rules.iter().filter(|r| r.kind == RuleKind::Require) {
        for pair in directed_pairs(rule) {
            required.entry(pair).or_insert(rule.id.as_str());
        }
    }

    for rule in rules.iter().filter(|r| r.kind == RuleKind::Exclude) {
        for (case, other) in directed_pairs(rule) {
            if let Some(require_rule) = required.get(&(case, other)) {
                return Err(DataError::Inconsistent {
                    case: case.to_string(),
                    other: other.to_string(),
                    require_rule: require_rule.to_string(),
                    exclude_rule: rule.id.clone(),
                });
            }
        }
    }

    Ok(())
}
