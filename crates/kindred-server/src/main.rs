mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use kindred_api::auth::AppStateInner;
use kindred_api::notify::{BrokerPublisher, EventPublisher};
use kindred_api::service::{AccountService, MessagingService, ProfileService};
use kindred_api::tokens::TokenIssuer;
use kindred_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kindred=debug,kindred_api=debug,kindred_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    info!("Starting kindred ({})", config.environment);

    let db = Arc::new(Database::open(&config.db_path)?);
    let tokens = Arc::new(TokenIssuer::new(&config.jwt_secret, config.jwt_lifetime)?);

    // A broker outage never stops the HTTP server; sends just skip notifications.
    let publisher = Arc::new(BrokerPublisher::new(config.broker.clone()));
    let mut consumer = None;
    match &config.broker {
        Some(broker) => match publisher.connect().await {
            Ok(()) => {
                let audit = publisher
                    .subscribe(|event| async move {
                        debug!(routing_key = %event.routing_key(), "Notification event observed");
                    })
                    .await;
                match audit {
                    Ok(handle) => consumer = Some(handle),
                    Err(e) => warn!("Notification consumer not started: {}", e),
                }
            }
            Err(e) => warn!("Notification broker at {} unavailable: {}", broker.url, e),
        },
        None => info!("Notification broker not configured, skipping connection"),
    }

    let state = Arc::new(AppStateInner {
        accounts: AccountService::new(db.clone(), tokens),
        profiles: ProfileService::new(db.clone()),
        messaging: MessagingService::new(db, publisher.clone() as Arc<dyn EventPublisher>),
    });

    let app = kindred_api::router(state)
        .layer(cors_layer(config.cors_origin.as_deref())?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Kindred server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(consumer) = consumer {
        consumer.abort();
    }
    publisher.close().await;
    info!("Server stopped");
    Ok(())
}

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Ok(match origin {
        Some(origin) => cors
            .allow_origin(AllowOrigin::exact(HeaderValue::from_str(origin)?))
            .allow_credentials(true),
        None => cors.allow_origin(AllowOrigin::any()).allow_credentials(false),
    })
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
