use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn,stickies=info";

/// Installs the stderr subscriber. `RUST_LOG` overrides the default filter;
/// `verbose` raises the crate to debug. Safe to call more than once.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "warn,stickies=debug"
    } else {
        DEFAULT_FILTER
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
