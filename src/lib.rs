mod adapters;
mod app;
pub mod auth;
pub mod channels;
pub mod config;
pub mod ports;
pub mod push;
pub mod state;
pub mod store;
pub mod types;
pub mod users;

pub use app::app;
pub use push::generate_vapid_credentials;

use std::net::SocketAddr;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app(config)).await
}
