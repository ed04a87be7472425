//! Tracing subscriber setup. `RUST_LOG` overrides the default filter.

use crate::config::{LogFormat, LogSettings};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "api_template=info,api_template_server=info,tower_http=info";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init_tracing(settings: &LogSettings) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let installed = match settings.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.with_target(true).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init_tracing(&LogSettings::default());
        init_tracing(&LogSettings { format: LogFormat::Json });
    }
}
