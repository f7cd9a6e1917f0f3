use std::sync::Arc;

use common::http::ReqwestClient;
use configs::AppConfig;
use dotenvy::dotenv;
use graph::{AttributeTagger, MemoryGraph};
use service::{ApiCache, RegisterOptions, StoreError};
use tracing::{error, info};
use uuid::Uuid;

/// Register the configured APIs in the document's cache and refresh them all.
async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let graph = Arc::new(MemoryGraph::load(&cfg.document.path).await?);
    let tagger = AttributeTagger::new(Arc::clone(&graph));
    let http = Arc::new(ReqwestClient::new(cfg.http.timeout(), &cfg.http.user_agent)?);
    let cache = ApiCache::open(&*graph, &tagger, &cfg.cache.name, http).await?;

    let opts = RegisterOptions { auto_update: false, ignore_if_exists: true };
    for api in &cfg.apis {
        // re-registering resets the cached payload, so only do it when the url changed
        match cache.registration(&api.name).await {
            Ok(existing) if existing.url == api.url => continue,
            Ok(_) | Err(StoreError::KeyNotFound(_)) => cache.register(&api.name, &api.url, opts).await?,
            Err(e) => return Err(e.into()),
        }
    }

    // entries refreshed before a failure are kept, so save either way
    let updated = cache.update(&[]).await;
    graph.save(&cfg.document.path).await?;
    updated?;

    for (name, timestamp) in cache.timestamp(&[]).await? {
        info!(service = "refresh", event = "api_refreshed", api = %name, timestamp = timestamp.as_deref().unwrap_or("never"), "api cache entry");
    }
    info!(service = "refresh", event = "document_saved", path = %cfg.document.path, "{}", cache.describe().await?);
    Ok(())
}

fn main() -> std::process::ExitCode {
    // 提前加载 .env，使得 RUST_LOG / CONFIG_PATH 生效
    dotenv().ok();

    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(service = "refresh", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    common::utils::logging::init_logging(&cfg.logging.format);

    let run_id = Uuid::new_v4();
    let version = env!("CARGO_PKG_VERSION");

    // 单线程运行时：所有存储操作按顺序执行
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "refresh", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "refresh",
        event = "start",
        %run_id,
        version,
        document = %cfg.document.path,
        apis = cfg.apis.len(),
        "cache refresh starting"
    );

    rt.block_on(async move {
        tokio::select! {
            res = run(cfg) => match res {
                Ok(()) => {
                    info!(service = "refresh", event = "stop", %run_id, "cache refresh finished");
                    std::process::ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(service = "refresh", event = "run_failed", %run_id, error = %e, "cache refresh failed");
                    std::process::ExitCode::FAILURE
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!(service = "refresh", event = "shutdown_signal", %run_id, "received Ctrl+C, document not saved");
                std::process::ExitCode::FAILURE
            }
        }
    })
}
