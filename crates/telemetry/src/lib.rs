//! Tracing subscriber bootstrap.

use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Build the level filter; `RUST_LOG` takes precedence over configuration.
fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber.
///
/// Returns `false` when a subscriber was already installed, which happens
/// when several entry points share a process (tests, the CLI).
pub fn init(settings: &TelemetrySettings) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(settings));

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };

    if installed {
        tracing::info!(
            target: "shelf-telemetry",
            format = ?settings.log_format,
            level = %settings.log_level,
            "telemetry initialized"
        );
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_info() {
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            log_level: "not a [valid filter".to_string(),
        };
        // Only meaningful when RUST_LOG is unset, but must never panic.
        let _ = env_filter(&settings);
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        let settings = TelemetrySettings::default();
        let _ = init(&settings);
        assert!(!init(&settings));
    }
}
