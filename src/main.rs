use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomcast::api::{self, AppState};
use roomcast::avatar::{AvatarResolver, HashedLookup, IdentitySupplied, LocalStore};
use roomcast::config::Config;
use roomcast::ws::Hub;

#[derive(Parser, Debug)]
#[command(name = "roomcast")]
#[command(about = "Single-room WebSocket chat relay")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, env = "ROOMCAST_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Directory avatars are stored in and served from
    #[arg(long, env = "ROOMCAST_AVATAR_DIR", default_value = "avatars")]
    avatar_dir: PathBuf,

    /// Config file path (optional)
    #[arg(short, long, env = "ROOMCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, env = "ROOMCAST_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "roomcast=debug,tower_http=debug"
    } else {
        "roomcast=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if config.providers.is_empty() {
        info!("no identity providers configured, logins will not succeed");
    }

    tokio::fs::create_dir_all(&cli.avatar_dir)
        .await
        .with_context(|| format!("creating avatar directory {}", cli.avatar_dir.display()))?;

    // First matching strategy wins: a locally uploaded file beats the
    // provider-supplied picture, the hashed lookup is the fallback.
    let resolver = AvatarResolver::new(vec![
        Box::new(LocalStore::new(&cli.avatar_dir)),
        Box::new(IdentitySupplied),
        Box::new(HashedLookup),
    ]);

    let hub = Hub::spawn();
    let state = AppState::new(hub.handle(), resolver, config, cli.avatar_dir.clone());
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("binding {}", cli.listen))?;
    info!("listening on {}", cli.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    hub.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
