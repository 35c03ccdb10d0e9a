use anyhow::Result;
use axum::Router;
use bm25_core::config::{DEFAULT_CORPUS, DEFAULT_STORE_DIR};
use clap::Parser;
use server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index store directory
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store: String,
    /// Corpus to search
    #[arg(long, default_value = DEFAULT_CORPUS)]
    corpus: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app: Router = build_app(&args.store, &args.corpus)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, store = %args.store, corpus = %args.corpus, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
