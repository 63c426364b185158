use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` refines the crate's `info`
/// default. Output goes to stderr.
pub fn init() {
    let filter = EnvFilter::from_default_env().add_directive(
        "openclaw_config_manager=info"
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
