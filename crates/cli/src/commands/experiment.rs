use std::path::Path;
use std::process;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::{coordinator_config, fail, load_config_or_exit, load_store, print_json, runtime};
use crate::experiment::{fixtures, report, run_experiment, ExperimentRun};
use crate::proposers::build_proposer;
use crate::{Globals, OutputFormat, SessionArgs};

pub(crate) fn cmd_experiment(
    globals: &Globals,
    cases_path: &Path,
    limit: Option<usize>,
    save: Option<&Path>,
    session: &SessionArgs,
) {
    let config = load_config_or_exit(globals);
    let store = load_store(globals);
    let mut items = match fixtures::load_cases(cases_path) {
        Ok(items) => items,
        Err(e) => fail(globals, &e),
    };
    if let Some(n) = limit {
        items.truncate(n);
    }
    let proposer = match build_proposer(&session.proposer, &config.llm, session.model.as_deref()) {
        Ok(p) => p,
        Err(e) => fail(globals, &e),
    };

    let run = runtime(globals).block_on(run_experiment(
        store,
        proposer,
        coordinator_config(&config, session),
        &items,
        globals.quiet,
    ));

    match globals.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "items": run.items.len(),
            "with_retrieval": run.with_retrieval,
            "without_retrieval": run.without_retrieval,
            "improvement": run.improvement(),
            "relative_improvement": run.relative_improvement(),
            "rules_digest": run.rules_digest,
        })),
        OutputFormat::Text => {
            println!("{}", report::render_tap(&run));
            if !globals.quiet {
                eprintln!("\n{}", report::render_summary(&run));
            }
        }
    }

    if let Some(path) = save {
        if let Err(e) = save_results(&run, path) {
            fail(globals, &e);
        }
        if !globals.quiet {
            eprintln!("Full results saved to {}", path.display());
        }
    }

    if run.with_retrieval.errors > 0 || run.without_retrieval.errors > 0 {
        process::exit(1);
    }
}

fn save_results(run: &ExperimentRun, path: &Path) -> Result<(), String> {
    let time = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| format!("could not format timestamp: {}", e))?;
    let doc = serde_json::json!({
        "time": time,
        "run": run,
    });
    let text = serde_json::to_string_pretty(&doc)
        .map_err(|e| format!("could not serialize results: {}", e))?;
    std::fs::write(path, text).map_err(|e| format!("could not write '{}': {}", path.display(), e))
}
