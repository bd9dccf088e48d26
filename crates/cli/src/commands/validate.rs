use std::process;

use casegate_core::SituationHints;
use casegate_eval::{Proposal, ValidationResult, Validator};

use super::{load_store, print_json};
use crate::{Globals, OutputFormat};

/// Validate one proposal. Exits 1 when it is rejected.
pub(crate) fn cmd_validate(
    globals: &Globals,
    case: &str,
    role: &str,
    function: Option<&str>,
    hints: &SituationHints,
) {
    let store = load_store(globals);
    let validator = Validator::new(store);

    let mut proposal = Proposal::new(case, role);
    if let Some(f) = function {
        proposal = proposal.with_function(f);
    }
    let result = validator.validate(&proposal, hints);
    tracing::debug!(proposal = %proposal.label(), accepted = result.is_accepted(), "validated");

    match globals.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "proposal": proposal,
            "hints": hints,
            "result": result,
        })),
        OutputFormat::Text => {
            if !globals.quiet {
                match &result {
                    ValidationResult::Accepted { citations } => {
                        println!("ACCEPTED {}", proposal.label());
                        for citation in citations {
                            println!("  cites: {}", citation);
                        }
                    }
                    ValidationResult::Rejected {
                        reason,
                        explanation,
                    } => {
                        println!("REJECTED {} {}", proposal.label(), reason);
                        println!("  {}", explanation);
                    }
                }
            }
        }
    }

    if !result.is_accepted() {
        process::exit(1);
    }
}
