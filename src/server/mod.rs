// Server module entry point
// Listener setup, accept loop and per-connection serving

pub mod connection;
pub mod listener;
pub mod signal;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::logger;
use crate::pipeline::Pipeline;

pub use connection::accept_connection;
pub use listener::create_listener;
pub use signal::shutdown_signal;

/// State shared by every connection of a running server
pub struct ServerState {
    pub pipeline: Pipeline,
    pub max_body_size: u64,
    pub access_log: bool,
    pub access_log_format: String,
    pub keep_alive: bool,
    /// Time allowed for a request head to arrive; bodies are not bounded
    pub header_read_timeout: Duration,
    pub max_connections: Option<u64>,
    pub active_connections: AtomicUsize,
}

impl ServerState {
    pub fn new(config: &Config, pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            max_body_size: config.http.max_body_size,
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
            keep_alive: config.performance.keep_alive_timeout > 0,
            header_read_timeout: Duration::from_secs(config.performance.read_timeout),
            max_connections: config.performance.max_connections,
            active_connections: AtomicUsize::new(0),
        }
    }
}

/// Accept connections until `shutdown` resolves.
///
/// Must run inside a `LocalSet`: connections are served with `spawn_local`.
pub async fn serve(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: impl std::future::Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accept_result = listener.accept() => match accept_result {
                Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = &mut shutdown => break,
        }
    }
}
