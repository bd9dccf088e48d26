use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. Filtering comes from `CASEGATE_LOG`
/// (e.g. `casegate_eval=debug`), defaulting to `warn`.
pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_env("CASEGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
