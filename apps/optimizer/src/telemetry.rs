use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global structured-logging subscriber.
/// `RUST_LOG` directives win; otherwise the crate logs at `default_level`.
pub fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                default_level
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
