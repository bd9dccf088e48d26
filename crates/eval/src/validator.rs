//! The validator: sole authority on whether a proposal is grammatical.
//!
//! `validate` is a pure function of the proposal, the situation hints and
//! the rule store. Checks run in a fixed order and stop at the first
//! failure: existence, role, function, co-occurrence.

use std::fmt;
use std::sync::Arc;

use casegate_core::{
    join_labels, CoOccurrenceRule, Function, GrammaticalCase, RuleKind, RuleStore, SemanticRole,
    SituationHints,
};
use serde::{Deserialize, Serialize};

use crate::proposal::Proposal;

/// How many known codes an UNKNOWN_CASE explanation lists before eliding.
const KNOWN_CODES_SHOWN: usize = 24;

/// Why a proposal was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    UnknownCase,
    RoleMismatch,
    FunctionMismatch,
    ConstraintViolation { rule_id: String },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::UnknownCase => f.write_str("UNKNOWN_CASE"),
            RejectionReason::RoleMismatch => f.write_str("ROLE_MISMATCH"),
            RejectionReason::FunctionMismatch => f.write_str("FUNCTION_MISMATCH"),
            RejectionReason::ConstraintViolation { rule_id } => {
                write!(f, "CONSTRAINT_VIOLATION({})", rule_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationResult {
    Accepted {
        /// Grammar references for the accepted case.
        citations: Vec<String>,
    },
    Rejected {
        reason: RejectionReason,
        /// Human-readable, suitable for feeding back to the proposer.
        explanation: String,
    },
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accepted { .. })
    }

    /// Empty for a rejection.
    pub fn citations(&self) -> &[String] {
        match self {
            ValidationResult::Accepted { citations } => citations,
            ValidationResult::Rejected { .. } => &[],
        }
    }

    pub fn reason(&self) -> Option<&RejectionReason> {
        match self {
            ValidationResult::Accepted { .. } => None,
            ValidationResult::Rejected { reason, .. } => Some(reason),
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            ValidationResult::Accepted { .. } => None,
            ValidationResult::Rejected { explanation, .. } => Some(explanation),
        }
    }

    fn rejected(reason: RejectionReason, explanation: String) -> Self {
        ValidationResult::Rejected {
            reason,
            explanation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    store: Arc<RuleStore>,
}

impl Validator {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Validator { store }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn validate(&self, proposal: &Proposal, hints: &SituationHints) -> ValidationResult {
        let code = proposal.case.trim();
        let Some(case) = self.store.get_case(code) else {
            return ValidationResult::rejected(
                RejectionReason::UnknownCase,
                self.unknown_case(code),
            );
        };

        let role = match self.check_role(case, proposal.role.trim(), hints) {
            Ok(role) => role,
            Err(explanation) => {
                return ValidationResult::rejected(RejectionReason::RoleMismatch, explanation)
            }
        };

        if let Err(explanation) = check_function(case, proposal.function.as_deref()) {
            return ValidationResult::rejected(RejectionReason::FunctionMismatch, explanation);
        }

        for rule in self.store.rules_for(&case.code) {
            if let Some(explanation) = violation(rule, &case.code, role, hints) {
                return ValidationResult::rejected(
                    RejectionReason::ConstraintViolation {
                        rule_id: rule.id.clone(),
                    },
                    explanation,
                );
            }
        }

        ValidationResult::Accepted {
            citations: case.citations(),
        }
    }

    fn unknown_case(&self, code: &str) -> String {
        let codes: Vec<&str> = self.store.codes().collect();
        let mut known = join_labels(codes.iter().copied().take(KNOWN_CODES_SHOWN));
        if codes.len() > KNOWN_CODES_SHOWN {
            known.push_str(&format!(" (and {} more)", codes.len() - KNOWN_CODES_SHOWN));
        }
        if code.is_empty() {
            format!("The proposal names no case. Known cases: {}.", known)
        } else {
            format!("'{}' is not a known case. Known cases: {}.", code, known)
        }
    }

    /// The proposal's role, if the case permits it and it is the role the
    /// situation calls for. Otherwise the ROLE_MISMATCH explanation.
    fn check_role(
        &self,
        case: &GrammaticalCase,
        label: &str,
        hints: &SituationHints,
    ) -> Result<SemanticRole, String> {
        let parsed = label.parse::<SemanticRole>();

        let opening = match (&parsed, hints.expected_role) {
            (Err(_), _) if label.is_empty() => {
                format!("The proposal gives no semantic role for {}.", case.code)
            }
            (Err(_), _) => format!("'{}' is not a semantic role.", label),
            (Ok(role), _) if !case.permits(*role) => format!(
                "{} ({}) does not permit the role {}.",
                case.code, case.name, role
            ),
            (Ok(role), Some(expected)) if *role != expected => format!(
                "The situation calls for the role {}, not {}.",
                expected, role
            ),
            (Ok(role), _) => return Ok(*role),
        };

        let intended = hints.expected_role.or(parsed.ok());
        let mut explanation = opening;
        explanation.push_str(&format!(" {} permits: {}.", case.code, case.roles_label()));

        if let Some(intended) = intended {
            explanation.push(' ');
            explanation.push_str(&self.role_guidance(case, intended));
        }

        Err(explanation)
    }

    /// Where the intended role can be found, plus the recorded distinction
    /// between the proposed case and the nearest alternative.
    fn role_guidance(&self, proposed: &GrammaticalCase, intended: SemanticRole) -> String {
        let alternatives: Vec<&GrammaticalCase> = self
            .store
            .cases_permitting(intended)
            .into_iter()
            .filter(|c| c.code != proposed.code)
            .collect();

        let mut guidance = if proposed.permits(intended) {
            format!("{} itself permits {}.", proposed.code, intended)
        } else if alternatives.is_empty() {
            format!("No case permits {}.", intended)
        } else {
            format!(
                "Cases that permit {}: {}.",
                intended,
                join_labels(alternatives.iter().map(|c| c.code.as_str()))
            )
        };

        let distinction = alternatives.iter().find_map(|alt| {
            alt.why_not(&proposed.code)
                .or_else(|| proposed.why_not(&alt.code))
                .map(|text| (alt.code.as_str(), text))
        });
        if let Some((alt, text)) = distinction {
            guidance.push_str(&format!(" {} vs {}: {}", alt, proposed.code, text));
        }

        guidance
    }
}

fn check_function(case: &GrammaticalCase, label: Option<&str>) -> Result<(), String> {
    let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(());
    };
    let allowed = join_labels(case.allowed_functions.iter().map(Function::as_str));
    let function = label.parse::<Function>().map_err(|_| {
        format!(
            "'{}' is not a function; use one of {}.",
            label,
            join_labels(Function::ALL.iter().map(Function::as_str))
        )
    })?;
    if case.allows_function(function) {
        Ok(())
    } else {
        Err(format!(
            "{} ({}) only combines with {}, not {}. Semantic role: {}.",
            case.code,
            case.name,
            allowed,
            function,
            case.roles_label()
        ))
    }
}

/// The explanation for the first way `rule` is violated by `code` taking
/// `role` in the hinted situation. Rules that need a hint the caller did
/// not give do not fire.
fn violation(
    rule: &CoOccurrenceRule,
    code: &str,
    role: SemanticRole,
    hints: &SituationHints,
) -> Option<String> {
    if !rule.is_subject(code) {
        return None;
    }
    let others: Vec<&str> = rule.others(code).collect();

    match rule.kind {
        RuleKind::Exclude => {
            let clash: Vec<&str> = others
                .iter()
                .copied()
                .filter(|o| hints.has_companion(o))
                .collect();
            if clash.is_empty() {
                return None;
            }
            Some(format!(
                "Rule '{}': {} cannot appear alongside {}. {}",
                rule.id,
                code,
                join_labels(clash),
                rule.detail
            ))
        }
        RuleKind::Require => {
            if hints.companion_cases.is_empty() {
                return None;
            }
            let missing: Vec<&str> = others
                .iter()
                .copied()
                .filter(|o| !hints.has_companion(o))
                .collect();
            if missing.is_empty() {
                return None;
            }
            Some(format!(
                "Rule '{}': {} requires {} to be present. {}",
                rule.id,
                code,
                join_labels(missing),
                rule.detail
            ))
        }
        RuleKind::RoleConditioned => {
            if !others.iter().all(|o| hints.has_companion(o)) {
                return None;
            }
            if let Some(wanted) = rule.voluntary {
                if hints.voluntary != Some(wanted) {
                    return None;
                }
            }
            if rule.roles.contains(&role) {
                return None;
            }
            let allowed = if rule.roles.is_empty() {
                format!("{} is not available here", code)
            } else {
                format!(
                    "{} may only take {} here",
                    code,
                    join_labels(rule.roles.iter().map(SemanticRole::as_str))
                )
            };
            Some(format!("Rule '{}': {}. {}", rule.id, allowed, rule.detail))
        }
    }
}
