use std::net::TcpListener;

use simple_auth::configuration::get_configuration;
use simple_auth::startup::{build_store, run};
use simple_auth::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    init_telemetry(&configuration.application.log_level)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    tracing::info!(
        environment = ?configuration.application.environment,
        "Configuration loaded successfully"
    );

    let store = build_store(&configuration).await?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, store, &configuration)?.await
}
