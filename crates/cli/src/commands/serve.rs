//! `eventwire serve`: Start the HTTP SSE gateway.

use eventwire_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Eventwire Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Agent:     {}", config.identity.to_identity());
    println!("   Model:     {}", config.model.model);

    eventwire_gateway::start(config).await?;

    Ok(())
}
