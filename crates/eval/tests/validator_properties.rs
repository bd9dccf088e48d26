//! Validator properties checked over every case and role of the shipped
//! rule data.

use std::path::Path;
use std::sync::Arc;

use casegate_core::{RuleStore, SemanticRole, SituationHints};
use casegate_eval::{Proposal, RejectionReason, ValidationResult, Validator};

fn validator() -> Validator {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/grammar.json");
    let store = RuleStore::from_path(&path)
        .unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e));
    Validator::new(Arc::new(store))
}

#[test]
fn every_permitted_role_is_accepted_without_hints() {
    let v = validator();
    let hints = SituationHints::default();
    for case in v.store().all_cases() {
        for role in &case.permitted_roles {
            let result = v.validate(&Proposal::new(case.code.clone(), role.as_str()), &hints);
            assert_eq!(
                result,
                ValidationResult::Accepted {
                    citations: case.citations()
                },
                "{}/{} should be accepted",
                case.code,
                role
            );
        }
    }
}

#[test]
fn accepted_assignment_cites_its_case() {
    let v = validator();
    for case in v.store().all_cases() {
        let role = case.permitted_roles[0];
        let result = v.validate(
            &Proposal::new(case.code.clone(), role.as_str()),
            &SituationHints::default(),
        );
        let citations = result.citations();
        assert!(!citations.is_empty(), "{} cites nothing", case.code);
        assert!(
            citations.iter().any(|c| c.contains("Grammar")),
            "{} cites no grammar section: {:?}",
            case.code,
            citations
        );
        assert!(
            citations
                .iter()
                .any(|c| c.contains(&case.code) && c.contains(&case.name)),
            "{} citations do not name the case: {:?}",
            case.code,
            citations
        );
    }

    let result = v.validate(
        &Proposal::new("AFF", "EXPERIENCER"),
        &SituationHints::default(),
    );
    assert_eq!(result.citations()[0], "Grammar §7.1 (Affective)");
}

#[test]
fn function_mismatch_names_the_semantic_role() {
    let v = validator();
    let result = v.validate(
        &Proposal::new("AFF", "EXPERIENCER").with_function("DYN"),
        &SituationHints::default(),
    );
    assert_eq!(result.reason(), Some(&RejectionReason::FunctionMismatch));
    let explanation = result.explanation().unwrap();
    assert!(explanation.ends_with("Semantic role: EXPERIENCER."), "{}", explanation);
}

#[test]
fn every_other_role_is_a_role_mismatch() {
    let v = validator();
    let hints = SituationHints::default();
    for case in v.store().all_cases() {
        for role in SemanticRole::ALL.iter().filter(|r| !case.permits(**r)) {
            let result = v.validate(&Proposal::new(case.code.clone(), role.as_str()), &hints);
            assert_eq!(
                result.reason(),
                Some(&RejectionReason::RoleMismatch),
                "{}/{} should be a role mismatch",
                case.code,
                role
            );
            let explanation = result.explanation().unwrap_or_default();
            assert!(
                explanation.contains(&case.roles_label()),
                "explanation for {}/{} should name the permitted roles: {}",
                case.code,
                role,
                explanation
            );
        }
    }
}

#[test]
fn unknown_code_is_unknown_case() {
    let v = validator();
    for code in ["XYZ", "", "aff", "AFFX"] {
        let result = v.validate(&Proposal::new(code, "EXPERIENCER"), &SituationHints::default());
        assert_eq!(result.reason(), Some(&RejectionReason::UnknownCase), "{:?}", code);
    }
}

#[test]
fn validation_is_deterministic() {
    let v = validator();
    let hints = SituationHints {
        voluntary: Some(false),
        expected_role: Some(SemanticRole::Experiencer),
        companion_cases: vec!["ERG".to_string()],
    };
    let proposals = [
        Proposal::new("ABS", "PATIENT"),
        Proposal::new("AFF", "EXPERIENCER"),
        Proposal::new("ERG", "AGENT").with_function("STA"),
        Proposal::new("QQQ", "AGENT"),
    ];
    for p in &proposals {
        let first = v.validate(p, &hints);
        for _ in 0..5 {
            assert_eq!(v.validate(p, &hints), first);
        }
    }
}

#[test]
fn whitespace_around_labels_is_ignored() {
    let v = validator();
    let result = v.validate(
        &Proposal::new(" AFF ", " experiencer "),
        &SituationHints::default(),
    );
    assert!(result.is_accepted());
}

#[test]
fn function_is_checked_only_when_proposed() {
    let v = validator();
    let hints = SituationHints::default();
    assert!(v.validate(&Proposal::new("ERG", "AGENT"), &hints).is_accepted());
    assert!(v
        .validate(&Proposal::new("ERG", "AGENT").with_function("DYN"), &hints)
        .is_accepted());
    let result = v.validate(&Proposal::new("ERG", "AGENT").with_function("STA"), &hints);
    assert_eq!(result.reason(), Some(&RejectionReason::FunctionMismatch));

    let result = v.validate(&Proposal::new("THM", "CONTENT").with_function("EXPERIENCER"), &hints);
    assert_eq!(result.reason(), Some(&RejectionReason::FunctionMismatch));
    assert!(result.explanation().unwrap().contains("STA, DYN, MNF"));
}

#[test]
fn involuntary_situation_bars_ergative() {
    let v = validator();
    let hints = SituationHints {
        voluntary: Some(false),
        ..SituationHints::default()
    };
    let result = v.validate(&Proposal::new("ERG", "AGENT"), &hints);
    assert_eq!(
        result.reason(),
        Some(&RejectionReason::ConstraintViolation {
            rule_id: "erg-willed".to_string()
        })
    );
    assert!(result.explanation().unwrap().contains("ERG requires intent"));
}

#[test]
fn role_conditioned_rule_limits_roles_with_companion() {
    let v = validator();
    let with_tool = SituationHints {
        companion_cases: vec!["INS".to_string()],
        ..SituationHints::default()
    };
    assert!(v.validate(&Proposal::new("IND", "AGENT"), &with_tool).is_accepted());
    let result = v.validate(&Proposal::new("IND", "PATIENT"), &with_tool);
    assert_eq!(
        result.reason(),
        Some(&RejectionReason::ConstraintViolation {
            rule_id: "ind-wields-ins".to_string()
        })
    );
    assert!(result
        .explanation()
        .unwrap()
        .contains("IND may only take AGENT here"));

    // Without the instrument the rule does not apply.
    assert!(v
        .validate(&Proposal::new("IND", "PATIENT"), &SituationHints::default())
        .is_accepted());
}

#[test]
fn fear_distinction_is_surfaced_verbatim() {
    let v = validator();
    let hints = SituationHints {
        voluntary: Some(false),
        expected_role: Some(SemanticRole::Experiencer),
        ..SituationHints::default()
    };
    let result = v.validate(&Proposal::new("ABS", "PATIENT"), &hints);
    assert_eq!(result.reason(), Some(&RejectionReason::RoleMismatch));

    let distinction = v
        .store()
        .get_case("AFF")
        .and_then(|c| c.why_not("ABS"))
        .expect("AFF records why not ABS");
    let explanation = result.explanation().unwrap();
    assert!(explanation.contains(distinction), "{}", explanation);
    assert!(explanation.contains("Cases that permit EXPERIENCER: AFF."));
}
