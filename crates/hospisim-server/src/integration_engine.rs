use std::env;
use std::path::Path;

use hospisim_server::config::loader::{load_config, load_dotenv, resolve_config_path};
use hospisim_server::{HospisimServer, build_integration_app, init_integration};

#[tokio::main]
async fn main() {
    load_dotenv();
    hospisim_server::observability::init_tracing("info");

    let (config_path, source) = resolve_config_path(env::args().skip(1));
    let cfg = match load_config(Some(Path::new(&config_path))) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(path = %config_path, source = %source, "Configuration loaded");
    hospisim_server::observability::apply_logging_level(&cfg.logging.level);
    hospisim_server::metrics::init_metrics();

    let state = match init_integration(&cfg).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Integration engine initialization failed: {e:#}");
            std::process::exit(2);
        }
    };

    let app = build_integration_app(state, &cfg.server);
    if let Err(e) = HospisimServer::new(cfg.addr(), app).run().await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
