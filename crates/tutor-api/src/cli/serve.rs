//! `tutor serve`: REST API server with the idle-session sweeper.

use anyhow::Result;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::http::router::build_router;
use crate::state::AppState;
use crate::sweeper::spawn_idle_sweeper;

/// Bind, serve until Ctrl+C / SIGTERM, then stop the sweeper and close the pool.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} Tutor API listening on {}",
        style("⚡").bold(),
        style(format!("http://{addr}")).cyan()
    );
    println!("  {}", style(format!("Data: {}", state.data_dir.display())).dim());
    println!("  {}", style("Press Ctrl+C to stop").dim());

    let cancel = CancellationToken::new();
    let sweeper = match state.config.session_idle_timeout() {
        Some(idle_for) => Some(spawn_idle_sweeper(
            state.session_manager.clone(),
            idle_for,
            state.config.sweep_interval(),
            cancel.clone(),
        )),
        None => {
            info!("Idle session expiry disabled");
            None
        }
    };

    let db_pool = state.db_pool.clone();
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }
    db_pool.close().await;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
