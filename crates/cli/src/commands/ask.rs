//! `eventwire ask`: Answer one query and print the SSE frames as they arrive.

use std::io::Write;
use std::sync::Arc;

use eventwire_agent::{SearchAgent, spawn_response};
use eventwire_config::AppConfig;
use eventwire_core::channel::EventReceiver;

pub async fn run(query: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API keys early so a missing key gets a clear message
    if !config.has_api_keys() {
        eprintln!();
        eprintln!("  ERROR: Missing API keys!");
        eprintln!();
        eprintln!("  Set both environment variables:");
        eprintln!("    MODEL_API_KEY   = 'sk-...'     (OpenAI-compatible model)");
        eprintln!("    TAVILY_API_KEY  = 'tvly-...'   (web search)");
        eprintln!();
        eprintln!("  Or add them to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("API keys not configured. See above for setup instructions.".into());
    }

    let providers = eventwire_providers::build_from_config(&config)?;
    let agent = Arc::new(SearchAgent::new(
        config.identity.to_identity(),
        providers.model,
        providers.search,
    ));

    let rx = spawn_response(agent, query, config.stream.channel_capacity);
    let stdout = std::io::stdout();
    let frames = write_frames(rx, &mut stdout.lock()).await?;
    tracing::debug!(frames, "Response finished");

    Ok(())
}

/// Write each event as an SSE frame, flushing after every frame.
/// Returns the number of frames written.
pub async fn write_frames<W: Write>(mut rx: EventReceiver, out: &mut W) -> std::io::Result<usize> {
    let mut frames = 0;
    while let Some(event) = rx.recv().await {
        out.write_all(event.to_sse_frame()?.as_bytes())?;
        out.flush()?;
        frames += 1;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventwire_core::{Identity, Responder, channel};

    #[tokio::test]
    async fn frames_are_written_in_order() {
        let (tx, rx) = channel(8);
        let mut responder = Responder::new(Identity::new("Search-Demo", "Search Demo"), tx);
        responder.emit_text("PLAN", "Rephrasing user query...").await.unwrap();
        responder.complete().await.unwrap();

        let mut out = Vec::new();
        let frames = write_frames(rx, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(frames, 2);
        let lines: Vec<&str> = text.split("\n\n").filter(|f| !f.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("data: {"));
        assert!(lines[0].contains("\"event_name\":\"PLAN\""));
        assert!(lines[1].contains("\"content_type\":\"atomic.done\""));
    }
}
