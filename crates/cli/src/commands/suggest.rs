use std::process;

use casegate_core::{InputDescription, SituationHints};
use casegate_eval::{Coordinator, ReportOutcome, SessionReport};

use super::{coordinator_config, fail, load_config_or_exit, load_store, print_json, runtime};
use crate::proposers::build_proposer;
use crate::{report_error, Globals, OutputFormat, SessionArgs};

/// Run one session and print its report. Exits 1 unless it was accepted.
pub(crate) fn cmd_suggest(
    globals: &Globals,
    description: &str,
    hints: &SituationHints,
    session: &SessionArgs,
) {
    let config = load_config_or_exit(globals);
    let store = load_store(globals);
    let proposer = match build_proposer(&session.proposer, &config.llm, session.model.as_deref()) {
        Ok(p) => p,
        Err(e) => fail(globals, &e),
    };

    let coordinator =
        Coordinator::with_lexical_retrieval(store, proposer, coordinator_config(&config, session));
    let input = InputDescription::new(description).with_hints(hints.clone());
    let report = runtime(globals).block_on(coordinator.run_report(&input));

    match globals.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            if !globals.quiet {
                print_report_text(&report);
            }
        }
    }

    if let Some(error) = &report.error {
        report_error(error, globals.output, globals.quiet);
    }
    if !report.is_accepted() {
        process::exit(1);
    }
}

fn print_report_text(report: &SessionReport) {
    println!("candidates: {}", report.candidates.join(", "));
    for (i, attempt) in report.attempts.iter().enumerate() {
        match attempt.result.reason() {
            None => println!("{}. {} accepted", i + 1, attempt.proposal.label()),
            Some(reason) => {
                println!("{}. {} rejected: {}", i + 1, attempt.proposal.label(), reason);
                if let Some(explanation) = attempt.result.explanation() {
                    println!("   {}", explanation);
                }
            }
        }
    }
    match report.outcome {
        ReportOutcome::Accepted => {
            println!(
                "ACCEPTED {}/{}",
                report.final_case.as_deref().unwrap_or_default(),
                report.final_role.as_deref().unwrap_or_default()
            );
            for citation in &report.citations {
                println!("  cites: {}", citation);
            }
        }
        ReportOutcome::Exhausted => {
            println!("EXHAUSTED after {} attempts", report.attempts.len())
        }
        ReportOutcome::Error => println!("ERROR after {} attempts", report.attempts.len()),
    }
}
