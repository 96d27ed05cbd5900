#![forbid(unsafe_code)]

//! `dice serve`: a reference outcome provider.
//!
//! `GET /roll` answers with a JSON integer in `1..=6`, drawn from the
//! thread-local generator (a CSPRNG seeded from the operating system).

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Args;
use dice_core::{Face, FaceError};
use rand::Rng;
use tracing::{error, info};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,
}

pub fn app() -> Router {
    Router::new().route("/roll", get(roll))
}

/// Uniform draw over the six faces.
pub fn draw_face() -> std::result::Result<Face, FaceError> {
    Face::new(rand::rng().random_range(1..=6))
}

async fn roll() -> std::result::Result<Json<u8>, StatusCode> {
    match draw_face() {
        Ok(face) => {
            info!(target: "dice.serve", face = face.get(), "served roll");
            Ok(Json(face.get()))
        }
        Err(err) => {
            error!(target: "dice.serve", error = %err, "cannot draw a face");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub fn run_serve(args: ServeArgs) -> Result<()> {
    let addr = args.bind;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| CliError::Serve { addr, source })?;
        let local = listener.local_addr()?;
        info!(target: "dice.serve", addr = %local, "outcome provider listening");
        axum::serve(listener, app())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|source| CliError::Serve { addr, source })?;
        info!(target: "dice.serve", "outcome provider stopped");
        Ok::<(), CliError>(())
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: "dice.serve", error = %err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
