use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser; // for cli
use tracing::info;

use keywords_gateway::clock::SystemClock;
use keywords_gateway::config::{Args, StoreLocation};
use keywords_gateway::handlers::router;
use keywords_gateway::llm::GroqClient;
use keywords_gateway::state::{AppState, Components};
use keywords_gateway::store::{FileStore, KeyValueStore, MemoryStore};
use keywords_gateway::sweeper::sweeper;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keywords_gateway=info")),
        )
        .with_target(true)
        .init();
}

fn open_store(args: &Args) -> Result<Arc<dyn KeyValueStore>> {
    let location = args
        .store_location()
        .ok_or_else(|| anyhow!("no data directory available, pass --store"))?;

    let store: Arc<dyn KeyValueStore> = match location {
        StoreLocation::Memory => {
            info!("using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StoreLocation::File(path) => Arc::new(
            FileStore::open(&path, args.store_quota_bytes)
                .with_context(|| format!("failed to open store at {}", path.display()))?,
        ),
    };
    Ok(store)
}

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<()> {
    // parse cli arguments
    let args = Args::parse();
    init_tracing();

    let completion = GroqClient::new(args.api_key.clone())
        .context("failed to build completion client")?
        .with_base_url(args.api_base.clone())
        .with_model(args.model.clone());

    let state = AppState::start(Components {
        store: open_store(&args)?,
        clock: Arc::new(SystemClock),
        completion: Arc::new(completion),
        cache_ttl: args.cache_ttl(),
        cooldown: args.cooldown(),
        queue_depth: args.queue_depth,
        admin_token: args.admin_token.clone(),
    });

    if let Some(sweep_interval) = args.sweep_interval() {
        tokio::spawn(sweeper(Arc::clone(&state.cache), sweep_interval));
    }

    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "gateway listening");
    info!(api_base = %args.api_base, model = %args.model, "forwarding completions");
    info!(
        cache_ttl_secs = args.cache_ttl,
        cooldown_secs = args.cooldown,
        admin = args.admin_token.is_some(),
        "limits configured"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
