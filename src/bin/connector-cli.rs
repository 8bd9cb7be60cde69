use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use connector_core::auth::{ClientCredentialsHandler, Credentials, TokenManager};
use connector_core::config::{load_config, ConnectorConfig};
use connector_core::observability::{logging, metrics};
use connector_core::pool::{CircuitBreakerConnectionPool, PoolState, TcpConnectionFactory};

#[derive(Parser)]
#[command(name = "connector-cli")]
#[command(about = "Exercise the connector token handler and breaker-protected pool", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an access token with a refresh token grant
    Token {
        /// Connection name used to scope the token cache
        #[arg(long, default_value = "default")]
        connection: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        client_id: String,
        #[arg(long, env = "CONNECTOR_CLIENT_SECRET")]
        client_secret: String,
        #[arg(long, env = "CONNECTOR_REFRESH_TOKEN")]
        refresh_token: String,
    },
    /// Borrow TCP connections through the circuit breaker and print its state
    Probe {
        /// host:port to connect to
        address: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        attempts: u32,
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
        #[arg(long, default_value_t = 2_000)]
        connect_timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ConnectorConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    match cli.command {
        Commands::Token {
            connection,
            endpoint,
            client_id,
            client_secret,
            refresh_token,
        } => {
            let handler = ClientCredentialsHandler::new(TokenManager::new(), &config.token_client)?;
            let credentials = Credentials::new(client_id, client_secret, refresh_token);
            let token = handler.get_valid_token(&connection, &credentials, &endpoint).await?;
            println!("{}", token);
        }
        Commands::Probe {
            address,
            attempts,
            interval_ms,
            connect_timeout_ms,
        } => {
            let factory = TcpConnectionFactory::new(address.clone(), Duration::from_millis(connect_timeout_ms));
            let pool = CircuitBreakerConnectionPool::new(
                address,
                factory,
                config.pool.clone(),
                Arc::new(PoolState::new()),
            );

            for attempt in 1..=attempts {
                let outcome = match pool.borrow().await {
                    Ok(conn) => {
                        pool.release(conn);
                        "ok".to_string()
                    }
                    Err(e) => e.to_string(),
                };
                println!("{:>3}  {:<9}  {}", attempt, pool.state(), outcome);
                if attempt < attempts {
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
            }
            pool.pool().close();
        }
    }

    Ok(())
}
