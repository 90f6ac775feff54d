use std::sync::Arc;

use static_webserver::config::{Config, StaticConfig};
use static_webserver::handler::StaticHandler;
use static_webserver::logger;
use static_webserver::pipeline::Pipeline;
use static_webserver::server::{self, ServerState};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config file path without extension, "config" -> config.toml
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let static_config =
        StaticConfig::from_options(cfg.static_root()?, cfg.static_files.options.clone(), None)?;
    let pipeline = Pipeline::new().with(StaticHandler::new(static_config));
    let state = Arc::new(ServerState::new(&cfg, pipeline));

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::serve(listener, state, server::shutdown_signal()))
        .await;

    logger::log_info("Server stopped");
    Ok(())
}
