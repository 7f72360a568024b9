use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Console logging on stdout. `RUST_LOG` adjusts verbosity (e.g.
/// `RUST_LOG=db_partition=debug` prints every statement).
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stdout)
        .init();
}
