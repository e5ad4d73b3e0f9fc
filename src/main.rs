use std::sync::Arc;

use calendar_agent::agent::{Agent, EnvCollaboratorFactory};
use calendar_agent::config::{AgentConfig, ExtractionConfig, ServerConfig};
use calendar_agent::pipeline::extraction::OpenAiExtractor;
use calendar_agent::server::control_routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let agent_config = AgentConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    let extraction_config = ExtractionConfig::from_env()?;

    eprintln!("📅 Calendar Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", extraction_config.model);
    eprintln!(
        "   Poll: every {}s, up to {} messages matching '{}'",
        agent_config.poll_interval.as_secs(),
        agent_config.max_results,
        agent_config.query
    );
    eprintln!("   Control API: http://{}\n", server_config.bind_addr);

    let extractor = Arc::new(OpenAiExtractor::new(extraction_config)?);
    let agent = Arc::new(Agent::new(
        agent_config,
        extractor,
        Arc::new(EnvCollaboratorFactory),
    ));

    let app = control_routes(Arc::clone(&agent));
    let listener = tokio::net::TcpListener::bind(server_config.bind_addr).await?;
    tracing::info!(addr = %server_config.bind_addr, "Control server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    agent.stop().await;
    Ok(())
}
