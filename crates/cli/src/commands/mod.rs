pub(crate) mod experiment;
pub(crate) mod retrieve;
pub(crate) mod rules;
pub(crate) mod suggest;
pub(crate) mod validate;

use std::process;
use std::sync::Arc;

use casegate_core::RuleStore;
use casegate_eval::CoordinatorConfig;
use serde::Serialize;

use crate::config::{load_config, Config};
use crate::{report_error, Globals, OutputFormat, SessionArgs};

/// Report `msg` and exit 1.
pub(crate) fn fail(globals: &Globals, msg: &str) -> ! {
    report_error(msg, globals.output, globals.quiet);
    process::exit(1);
}

/// Load the rule data named by `--data`, exiting on failure.
pub(crate) fn load_store(globals: &Globals) -> Arc<RuleStore> {
    match RuleStore::from_path(&globals.data) {
        Ok(store) => Arc::new(store),
        Err(e) => fail(globals, &e.to_string()),
    }
}

pub(crate) fn load_config_or_exit(globals: &Globals) -> Config {
    match load_config(globals.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(globals, &e),
    }
}

/// File values overridden by command-line flags.
pub(crate) fn coordinator_config(config: &Config, session: &SessionArgs) -> CoordinatorConfig {
    let mut merged = config.coordinator.clone();
    if let Some(n) = session.max_attempts {
        merged.max_attempts = n;
    }
    if let Some(k) = session.top_k {
        merged.top_k = k;
    }
    if session.no_retrieval {
        merged.use_retrieval = false;
    }
    merged
}

pub(crate) fn runtime(globals: &Globals) -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => fail(globals, &format!("failed to create tokio runtime: {}", e)),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            report_error(
                &format!("could not serialize output: {}", e),
                OutputFormat::Json,
                false,
            );
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposers::ProposerChoice;

    fn session_args() -> SessionArgs {
        SessionArgs {
            proposer: ProposerChoice::FirstCandidate,
            max_attempts: None,
            top_k: None,
            no_retrieval: false,
            model: None,
        }
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = Config::default();
        config.coordinator.max_attempts = 7;
        config.coordinator.top_k = 4;

        let untouched = coordinator_config(&config, &session_args());
        assert_eq!(untouched.max_attempts, 7);
        assert_eq!(untouched.top_k, 4);
        assert!(untouched.use_retrieval);

        let args = SessionArgs {
            max_attempts: Some(2),
            no_retrieval: true,
            ..session_args()
        };
        let merged = coordinator_config(&config, &args);
        assert_eq!(merged.max_attempts, 2);
        assert_eq!(merged.top_k, 4);
        assert!(!merged.use_retrieval);
    }
}
