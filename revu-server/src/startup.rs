//! Server startup and role wiring

use anyhow::{bail, Context, Result};
use revu_config::{CoordinationBackend, RevuConfig};
use revu_coordination::{InMemoryStore, KeyLayout, LocalTaskQueue, RedisStore, RedisTaskQueue, SystemClock};
use revu_interfaces::{CoordinationStore, TaskQueue};
use revu_orchestration::{ScrapeOrchestrator, ScrapeWorker};
use revu_rest_api::{create_rest_app, AppConfig, AppContext};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::collaborators::ApifySource;

/// How often the in-memory backends drop expired entries
const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Which parts of the system this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
    /// HTTP API only
    Api,
    /// Queue consumer only
    Worker,
    /// API and one worker loop in the same process
    All,
}

impl Role {
    pub fn runs_api(self) -> bool {
        matches!(self, Role::Api | Role::All)
    }

    pub fn runs_worker(self) -> bool {
        matches!(self, Role::Worker | Role::All)
    }
}

/// Coordination store and task queue shared by the API and the worker
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn CoordinationStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub keys: KeyLayout,
    memory: Option<MemoryBackends>,
}

/// In-process backends that need a periodic sweep of expired entries
#[derive(Clone)]
struct MemoryBackends {
    store: Arc<InMemoryStore>,
    queue: Arc<LocalTaskQueue>,
}

/// Connect the configured coordination backend
pub async fn build_backends(config: &RevuConfig) -> Result<Backends> {
    let keys = KeyLayout::new(config.coordination.key_prefix.clone());

    match config.coordination.backend {
        CoordinationBackend::Memory => {
            let store = Arc::new(InMemoryStore::new());
            let queue = Arc::new(LocalTaskQueue::with_retention(config.scrape.retention));
            Ok(Backends {
                store: store.clone(),
                queue: queue.clone(),
                keys,
                memory: Some(MemoryBackends { store, queue }),
            })
        }
        CoordinationBackend::Redis => {
            let store = RedisStore::connect(&config.coordination.redis_url)
                .await
                .context("Failed to connect to the coordination store")?;
            let queue = RedisTaskQueue::new(store.connection(), keys.clone(), config.scrape.retention);
            Ok(Backends {
                store: Arc::new(store),
                queue: Arc::new(queue),
                keys,
                memory: None,
            })
        }
    }
}

/// API and worker roles over one set of backends
pub struct Server {
    config: RevuConfig,
    role: Role,
}

impl Server {
    pub fn new(config: RevuConfig, role: Role) -> Result<Self> {
        if config.coordination.backend == CoordinationBackend::Memory && role != Role::All {
            bail!(
                "The memory backend keeps jobs inside one process; run with --role all or configure the redis backend"
            );
        }
        Ok(Self { config, role })
    }

    /// Run until `shutdown` fires. A failing API stops the worker too.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        self.log_config_summary();
        let backends = build_backends(&self.config).await?;

        if let Some(memory) = backends.memory.clone() {
            tokio::spawn(sweep_expired(memory, shutdown.clone()));
        }

        let api = async {
            if !self.role.runs_api() {
                return Ok(());
            }
            let result = self.serve_api(&backends, shutdown.clone()).await;
            if result.is_err() {
                shutdown.cancel();
            }
            result
        };

        let worker = async {
            if !self.role.runs_worker() {
                return Ok(());
            }
            let worker = self.build_worker(&backends)?;
            worker.run(shutdown.clone()).await;
            Ok::<_, anyhow::Error>(())
        };

        let (api, worker) = tokio::join!(api, worker);
        api?;
        worker?;

        info!("Server shutdown complete");
        Ok(())
    }

    async fn serve_api(&self, backends: &Backends, shutdown: CancellationToken) -> Result<()> {
        let orchestrator = ScrapeOrchestrator::new(
            backends.store.clone(),
            backends.queue.clone(),
            Arc::new(SystemClock),
            backends.keys.clone(),
            &self.config.scrape,
        );
        let app = create_rest_app(
            AppContext::new(Arc::new(orchestrator)),
            AppConfig {
                enable_cors: self.config.server.enable_cors,
                enable_tracing: true,
            },
        );

        let addr = self.config.server.socket_address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .context("HTTP server failed")?;
        Ok(())
    }

    fn build_worker(&self, backends: &Backends) -> Result<ScrapeWorker> {
        let source = ApifySource::new(self.config.source.clone())
            .context("Failed to build the review source client")?;
        Ok(ScrapeWorker::new(
            backends.store.clone(),
            backends.queue.clone(),
            Arc::new(source),
            backends.keys.clone(),
            self.config.scrape.clone(),
        ))
    }

    fn log_config_summary(&self) {
        info!("=== Revu Configuration ===");
        info!("Role: {:?}", self.role);
        info!("Coordination backend: {:?}", self.config.coordination.backend);
        info!("Key prefix: {}", self.config.coordination.key_prefix);
        info!("Lock TTL: {}s", self.config.scrape.lock_ttl.as_secs());
        if self.config.scrape.rate_limit_enabled() {
            info!("Daily scrape limit: {}", self.config.scrape.daily_limit);
        } else {
            info!("Daily scrape limit: disabled");
        }
        info!("Review source actor: {}", self.config.source.actor);
        info!("CORS: {}", if self.config.server.enable_cors { "Enabled" } else { "Disabled" });
        info!("==========================");
    }
}

async fn sweep_expired(memory: MemoryBackends, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(MEMORY_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let removed = memory.store.cleanup_expired();
                if removed > 0 {
                    debug!("Dropped {} expired coordination keys", removed);
                }
                let removed = memory.queue.purge_expired();
                if removed > 0 {
                    debug!("Dropped {} expired task records", removed);
                }
            }
        }
    }
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM
pub async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }

    info!("Shutdown signal received, starting graceful shutdown...");
    shutdown.cancel();
}
