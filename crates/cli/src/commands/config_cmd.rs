//! `eventwire config`: Configuration commands.

use eventwire_config::AppConfig;

/// Print the default configuration as TOML.
pub async fn defaults() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", AppConfig::default_toml());
    Ok(())
}

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();
            if config.model.api_key.is_none() {
                warnings.push("No model API key set (set MODEL_API_KEY env var)");
            }
            if config.search.api_key.is_none() {
                warnings.push("No search API key set (set TAVILY_API_KEY env var)");
            }
            if config.gateway.host == "0.0.0.0" {
                warnings.push("Gateway bound to 0.0.0.0 (reachable from other hosts)");
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   WARNING: {w}");
                }
            }

            println!();
            println!("   Agent:     {}", config.identity.to_identity());
            println!("   Model:     {} @ {}", config.model.model, config.model.base_url);
            println!("   Search:    {}", config.search.base_url);
            println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    for key in [&mut config.model.api_key, &mut config.search.api_key] {
        if key.is_some() {
            *key = Some("[REDACTED]".into());
        }
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
