pub mod analysis_client; // Engine transport + mock
pub mod codec; // Result validation / serialization
pub mod config;
pub mod dictation;
pub mod history; // Bounded recent-assessment cache
pub mod models;
pub mod report; // Plain-text report + export
pub mod session; // Intake → pending → result state machine
pub mod store;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Logs go to stderr so reports
/// printed on stdout stay clean. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{} tracing initialized", config::APP_NAME, config::APP_VERSION);
}
