use std::{net::SocketAddr, time::Duration};

use clap::{Parser, Subcommand};
use log::{info, warn};
use ymproxy::{
    api::{AppState, create_router},
    clients::{errors::Result, yandex::DEFAULT_API_BASE},
};

use crate::config::{Config, ConfigBuilder, DEFAULT_BIND};

#[derive(Parser)]
#[command(name = "ymproxy")]
#[command(version, about = "Yandex Music proxy for a web frontend", long_about = None)]
struct Cli {
    /// Shared secret clients send in the X-API-KEY header
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Yandex Music OAuth token; anonymous access when omitted
    #[arg(long, env = "YANDEX_TOKEN", hide_env_values = true)]
    yandex_token: Option<String>,

    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Yandex Music API base URL
    #[arg(long, env = "YANDEX_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Timeout for Yandex Music API calls, in seconds
    #[arg(long, env = "YANDEX_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Check the Yandex Music token and exit
    Check,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    let builder = ConfigBuilder::new()
        .api_key(cli.api_key)
        .yandex_token(cli.yandex_token)
        .api_base(cli.api_base)
        .timeout(Duration::from_secs(cli.timeout_secs))
        .bind(cli.bind);

    match command {
        Commands::Serve => {
            info!("Building config ...");
            let config = builder.build().await?;
            serve(config).await
        }
        Commands::Check => check_token(&builder).await,
    }
}

async fn check_token(builder: &ConfigBuilder) -> Result<()> {
    let client = builder.build_client().await?;
    match client.account().and_then(|a| a.login.as_deref()) {
        Some(login) => info!("Token is valid for {login}"),
        None => warn!("Yandex Music answered, but the session is anonymous"),
    }
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let app = create_router(AppState::new(config.service, config.api_key));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", config.bind);
    info!("API docs at http://{}/docs", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down ...");
}
