use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the JSON tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` (from
/// `application.log_level`) applies. Returns an error if a global subscriber
/// was already installed.
pub fn init_telemetry(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialization_fails_instead_of_panicking() {
        // The first call may lose to another test; the second always fails.
        let _ = init_telemetry("debug");
        assert!(init_telemetry("debug").is_err());
    }
}
