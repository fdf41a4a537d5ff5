use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber according to `config`.
///
/// `RUST_LOG` wins over the configured level when set. Calling this twice is
/// harmless; the second install attempt is ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.format == "pretty" {
        builder.pretty().try_init()
    } else {
        builder.json().try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
