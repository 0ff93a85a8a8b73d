use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use api::AppState;
use drill_core::TableConjugator;
use storage::repository::Storage;

mod config;
mod logging;

use config::{Command, Config, prepare_sqlite_file, print_usage};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (command, config) = Config::from_env()
        .apply_args(std::env::args().skip(1))
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    if command == Command::Help {
        print_usage();
        return Ok(());
    }

    let _log_guard = logging::init_tracing(&config.log_level);

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&config.db_url)?;
    let storage = Storage::sqlite(&config.db_url).await?;
    info!(db = %config.db_url, "database ready");

    if command == Command::Migrate {
        return Ok(());
    }

    let state = AppState::with_source(&storage, Arc::new(TableConjugator::new()));
    let rounds = state.rounds().clone();

    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "drill server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, flushing pending guess writes");
    rounds.flush_pending_syncs().await;
    info!("graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    if let Err(err) = run().await {
        error!(error = %err, "drill exited with an error");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
