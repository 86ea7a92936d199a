//! athenaql: GraphQL server over AWS Athena.
//!
//! Routes:
//! - `POST /graphql`: GraphQL endpoint
//! - `GET /graphql`, `GET /graphiql`: GraphiQL IDE
//! - `GET /health`: load balancer health check

mod router;
mod schema;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use athenaql_athena::{load_dotenv, AthenaClient, AthenaConfig};

use crate::state::AppState;

// ── CLI ─────────────────────────────────────────────────────────────

/// GraphQL façade over AWS Athena.
#[derive(Parser, Debug)]
#[command(name = "athenaql", version, about)]
struct Cli {
    /// Interface to bind.
    #[arg(long, env = "ATHENAQL_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "ATHENAQL_PORT", default_value_t = 8080)]
    port: u16,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing so `.env` values also feed the clap env fallbacks.
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = AthenaConfig::from_env()?;
    info!(
        region = %config.region,
        database = %config.database,
        workgroup = ?config.workgroup,
        credentials = config.credentials.label(),
        "loaded athena config"
    );
    if !config.is_configured() {
        warn!("ATHENA_OUTPUT_LOCATION is not set; queries will fail unless the workgroup defines one");
    }

    let client = AthenaClient::new(config).await?;
    let app = router::build_router(Arc::new(AppState::new(client)));

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "athenaql listening");
    axum::serve(listener, app).await?;

    Ok(())
}
