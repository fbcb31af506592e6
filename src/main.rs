use std::process::ExitCode;
use std::sync::Arc;

mod buffer;
mod config;
mod controller;
mod error;
mod gateway;
mod rest;
mod sink;
mod stream;
mod supervisor;
mod wire;

use config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = tokio_util::sync::CancellationToken::new();
    let router = supervisor::build_router(config.clone(), shutdown.clone());

    match supervisor::serve(config, router, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "listener failed");
            ExitCode::FAILURE
        }
    }
}
