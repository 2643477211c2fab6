//! Server entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging and build every shared handle once.
//! - Serve HTTP until Ctrl-C.

use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;
use techinsight_core::{
    init_logging, init_stderr_logging, AppConfig, ArxivSource, IntentClassifier, PaperCache,
    SyncService,
};
use techinsight_server::{router, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("techinsight-server: {err}");
            return ExitCode::FAILURE;
        }
    };

    let logging = match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy()),
        None => init_stderr_logging(&config.log_level),
    };
    if let Err(err) = logging {
        eprintln!("techinsight-server: {err}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_exit module=server status=error error={}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cache = Arc::new(PaperCache::open(&config.db_path)?);
    info!(
        "event=cache_open module=server status=ok path={} rows={}",
        config.db_path.display(),
        cache.count_papers()?
    );

    let source = ArxivSource::new(config.arxiv.clone())?;
    let sync = SyncService::with_options(cache, source, config.sync.clone());
    let classifier =
        IntentClassifier::from_api_key(config.gemini_api_key.as_deref(), &config.gemini_model);
    let app = router(AppState::new(sync, classifier));

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!(
        "event=server_start module=server status=ok address={}",
        address
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("event=server_shutdown module=server status=ok");
        })
        .await?;

    Ok(())
}
