//! notas server: PDF upload, table extraction to spreadsheets, invoice records.
//!
//! Usage:
//!   NOTAS_DB=/path/to/notas.db NOTAS_BIND=0.0.0.0:5000 notas-server
//!
//! Or with args:
//!   notas-server --db /path/to/notas.db --bind 0.0.0.0:5000 \
//!                --upload-dir uploads --output-dir converted

use clap::Parser;
use notas_lib::config::{ServerArgs, ServerConfig};
use notas_lib::db::Database;
use notas_lib::extract::PdfTableExtractor;
use notas_lib::server::{self, AppState};
use notas_lib::storage::Storage;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("notas_server=info,notas_lib=info,tower_http=debug")),
        )
        .init();

    let config = ServerConfig::from_args(ServerArgs::parse());
    tracing::info!(
        db = %config.db_path.display(),
        uploads = %config.upload_dir.display(),
        converted = %config.output_dir.display(),
        bind = %config.bind,
        "starting notas-server"
    );

    let storage = Storage::new(&config.upload_dir, &config.output_dir);
    if let Err(e) = storage.ensure_dirs() {
        tracing::error!(error = %e, "failed to create storage directories");
        std::process::exit(1);
    }

    // Opening resets notas_fiscais
    let db = match Database::new(&config.db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!(error = %e, path = %config.db_path.display(), "failed to open database");
            std::process::exit(1);
        }
    };

    let state = AppState {
        db: db.clone(),
        storage: Arc::new(storage),
        extractor: Arc::new(PdfTableExtractor::default()),
    };
    let app = server::router(state, config.max_upload_bytes);

    let listener = match tokio::net::TcpListener::bind(&config.bind).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, bind = %config.bind, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(bind = %config.bind, "listening");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // The router held the other handles; this releases the connection
    let path = db.get_path();
    drop(db);
    tracing::info!(db = %path, "database closed");

    if let Err(e) = served {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
