//! VRF Broker Backend
//!
//! Hosts one randomness-request broker over a local ledger and a development
//! oracle. Runs two concurrent subsystems:
//!
//! - **Fulfiller**: produces local blocks and answers oracle jobs once their
//!   confirmation depth is reached.
//! - **HTTP server**: broker operations, queries and the `/health` / `/status` probes.
//!
//! `vrf-broker-backend account-key <ADDRESS>` prints the HTTP signing key
//! issued to an account and exits.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use base64::Engine;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod auth;
mod config;
mod fulfiller;
mod http;
mod metrics;
mod node;
mod store;
mod vrf;

use auth::RequestAuth;
use config::AppConfig;
use http::AppState;
use metrics::Metrics;
use node::Node;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,actix_web=warn,actix_server=warn")),
        )
        .with_target(true)
        .with_ansi(true)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let auth = RequestAuth::new(config.auth_secret.clone());

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, address] = args.as_slice() {
        if command == "account-key" {
            let account: vrf_broker::Address = address
                .parse()
                .with_context(|| format!("invalid address: {address}"))?;
            println!(
                "{}",
                base64::engine::general_purpose::STANDARD.encode(auth.account_key(&account))
            );
            return Ok(());
        }
    }

    info!(
        broker = %config.broker,
        admin = %config.admin,
        oracle = %config.oracle,
        "Starting VRF broker backend"
    );
    info!(
        key_hash = %config.key_hash,
        confirmations = config.request_confirmations,
        num_words = config.num_words,
        block_time_ms = config.block_time_ms,
        "Request configuration"
    );

    let node = Arc::new(Mutex::new(Node::open(&config)?));
    let metrics = Arc::new(Metrics::new());

    // Background: produce blocks and answer ready oracle jobs.
    let fulfiller_config = config.clone();
    let fulfiller_node = node.clone();
    let fulfiller_metrics = metrics.clone();
    tokio::spawn(async move {
        fulfiller::run_fulfiller(fulfiller_config, fulfiller_node, fulfiller_metrics).await;
    });

    let state = web::Data::new(AppState {
        node,
        metrics,
        auth,
    });

    info!(port = config.http_port, "Starting HTTP server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(http::routes))
        .bind(("0.0.0.0", config.http_port))?
        .run()
        .await?;
    Ok(())
}
