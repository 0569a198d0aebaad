use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paypal_proxy_client::adapters::http::checkout::{checkout_router, CheckoutAppState};
use paypal_proxy_client::adapters::memory::InMemoryOrderStore;
use paypal_proxy_client::adapters::proxy::ProxyHttpClient;
use paypal_proxy_client::application::SessionStore;
use paypal_proxy_client::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(config.server.log_level.clone())
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let signer = Arc::new(config.proxy.signer());
    let proxy = Arc::new(ProxyHttpClient::new(
        config.proxy.base_url.clone(),
        config.storefront.site_url.clone(),
        config.proxy.signer(),
    ));

    let state = CheckoutAppState {
        store: Arc::new(InMemoryOrderStore::new()),
        proxy,
        sessions: Arc::new(SessionStore::new()),
        signer,
        storefront: config.storefront.clone(),
    };

    let app = checkout_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr();
    info!(%addr, environment = ?config.server.environment, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
