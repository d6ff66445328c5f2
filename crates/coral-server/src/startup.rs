//! Server startup utilities.

use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(
        r#"
   ______                __
  / ____/___  _________ _/ /
 / /   / __ \/ ___/ __ `/ /
/ /___/ /_/ / /  / /_/ / /
\____/\____/_/   \__,_/_/
    "#
    );
}

/// Prints server startup information.
pub fn print_startup_info(port: u16) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("HTTP API:  http://0.0.0.0:{}", port);
    info!("Health:    http://0.0.0.0:{}/health", port);
    info!("API Docs:  http://0.0.0.0:{}/openapi.json", port);
    info!("{}", separator);
}
