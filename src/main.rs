//! The server binary for the debt tracking REST API.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum_server::Handle;
use clap::Parser;
use debtor_rs::{AppState, build_router, graceful_shutdown};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// The path to the SQLite database file. The file is created if it does
    /// not exist yet.
    #[arg(long, default_value = "debts.db")]
    db_path: String,

    /// The port to serve the API on.
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let token_secret =
        std::env::var("JWT_SECRET").expect("the environment variable JWT_SECRET must be set");

    let connection =
        Connection::open(&args.db_path).expect("could not open the database file");

    let state =
        AppState::new(connection, &token_secret).expect("could not initialize the database");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let address = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.port);
    tracing::info!("serving on {address}");

    axum_server::bind(address)
        .handle(handle)
        .serve(build_router(state).into_make_service())
        .await
        .expect("unexpected server error");
}
