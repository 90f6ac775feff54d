// Signal handling module
//
// SIGINT (Ctrl+C) and, on Unix, SIGTERM stop the accept loop. Connections
// still open are dropped with the `LocalSet` once `serve` returns.

/// Resolves when the process is asked to stop
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            crate::logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                crate::logger::log_error(&format!("Failed to listen for SIGTERM: {e}"));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => crate::logger::log_info("Received SIGINT, shutting down"),
        () = terminate => crate::logger::log_info("Received SIGTERM, shutting down"),
    }
}
