use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use server::{error::ServerError, GameServer, Server};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Server::Start(params) = Server::from_args();

    let server = GameServer::bind(params).await?;
    tracing::info!(
        game = %server.game_addr(),
        auth = %server.auth_addr(),
        "server running"
    );

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, closing listeners");
            Ok(())
        }
    }
}
