use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use common::storage::FsBlobStore;
use mq::{MqConfig, init_mq};
use tower_http::cors::{Any, CorsLayer};
use tracing::{Level, info, warn};

use server::config::AppConfig;
use server::consumers::{consume_judge_updates, consume_worker_dlq};
use server::database::init_db;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url).await?;
    info!("Database ready");

    let storage = Arc::new(
        FsBlobStore::open(config.storage.root.clone(), config.storage.max_bytes).await?,
    );

    let mq = if config.mq.enabled {
        match init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        {
            Ok(queue) => {
                info!("Message queue connected");
                Some(Arc::new(queue))
            }
            Err(e) => {
                warn!(error = %e, "MQ unavailable, submissions will stay Pending");
                None
            }
        }
    } else {
        info!("MQ disabled by config");
        None
    };

    if let Some(ref mq) = mq {
        tokio::spawn(consume_judge_updates(
            db.clone(),
            mq.clone(),
            config.mq.update_queue.clone(),
        ));
        tokio::spawn(consume_worker_dlq(
            db.clone(),
            mq.clone(),
            config.mq.dlq_queue.clone(),
        ));
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let cors = cors_layer(&config);

    let state = AppState {
        db,
        config,
        mq,
        storage,
    };
    let app = server::build_router(state).layer(cors);

    info!("Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors
        .allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.server.cors.max_age))
}
