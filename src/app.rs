//! Process-level wiring: store, collector, scheduler and dashboard
//!
//! `App::init` opens everything, `serve` runs the dashboard until Ctrl-C,
//! `shutdown` stops the scheduler and closes the store.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::collector::Collector;
use crate::config::CollectorConfig;
use crate::dashboard::{self, AppState};
use crate::scheduler;
use crate::session::{ChromeBroker, SessionBroker};
use crate::store::Store;

pub struct App<B: SessionBroker + 'static = ChromeBroker> {
    config: Arc<CollectorConfig>,
    store: Store,
    collector: Arc<Collector<B>>,
    shutdown_tx: watch::Sender<bool>,
    scheduler: Option<JoinHandle<()>>,
}

impl App<ChromeBroker> {
    /// Validate the config, open the store and build the Chrome-backed collector
    pub async fn init(config: CollectorConfig) -> Result<Self> {
        let broker = ChromeBroker::new(&config).context("Failed to create broker client")?;
        Self::with_broker(config, broker).await
    }
}

impl<B: SessionBroker + 'static> App<B> {
    pub async fn with_broker(config: CollectorConfig, broker: B) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let store = Store::initialize(config.database_path(), config.retention_days())
            .await
            .context("Failed to initialize store")?;

        let collector = Arc::new(Collector::new(broker, store.clone(), Arc::clone(&config)));
        let (shutdown_tx, _) = watch::channel(false);

        info!(
            "Collector ready for profile {} (database {})",
            config.profile_id(),
            config.database_path().display()
        );

        Ok(Self {
            config,
            store,
            collector,
            shutdown_tx,
            scheduler: None,
        })
    }

    #[must_use]
    pub fn collector(&self) -> &Arc<Collector<B>> {
        &self.collector
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Start the scheduler; a second call is a no-op
    pub fn start_scheduler(&mut self) {
        if self.scheduler.is_some() {
            return;
        }
        self.scheduler = Some(scheduler::spawn(
            Arc::clone(&self.collector),
            self.config.schedule_hours().to_vec(),
            self.config.run_on_startup(),
            self.shutdown_tx.subscribe(),
        ));
    }

    /// Run the scheduler and the dashboard until Ctrl-C or [`App::shutdown`]
    pub async fn serve(&mut self) -> Result<()> {
        self.start_scheduler();

        let state = Arc::new(AppState {
            collector: Arc::clone(&self.collector),
            store: self.store.clone(),
            log_file: self.config.log_file().to_path_buf(),
            recent_days: self.config.recent_days(),
        });
        let router = dashboard::router(state);

        let listener = TcpListener::bind(self.config.bind_addr())
            .await
            .with_context(|| format!("Failed to bind dashboard to {}", self.config.bind_addr()))?;
        info!("Dashboard listening on http://{}", listener.local_addr()?);

        let mut stop = self.shutdown_tx.subscribe();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!("Failed to listen for Ctrl-C: {e}");
                        }
                        info!("Ctrl-C received, shutting down");
                    }
                    _ = stop.changed() => {}
                }
            })
            .await
            .context("Dashboard server failed")?;

        Ok(())
    }

    /// Stop the scheduler and close the store
    ///
    /// A collection already running is allowed to finish first.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.scheduler.take() {
            if let Err(e) = handle.await {
                warn!("Scheduler task ended abnormally: {e}");
            }
        }
        self.store.close().await;
        info!("Shutdown complete");
    }
}
