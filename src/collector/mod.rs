//! Collection orchestrator
//!
//! One run acquires a single browser session and drives three sequential
//! passes over it: subscribers, purchases, tips. Each pass loads its page,
//! extracts records and commits them in its own store transaction, so a
//! failing pass costs only its own writes. The session is released at the
//! end of every run that acquired one, including a run whose future is
//! dropped part-way through.

pub mod report;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, NaiveDate};
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

pub use report::{PassReport, PassStatus, RunOutcome, RunPhase, RunReport};

use crate::config::{CollectorConfig, DataSource, TransactionKind};
use crate::error::{CollectorError, CollectorResult};
use crate::extractor::{self, Extraction};
use crate::loader::LoadOptions;
use crate::session::{BrowserSession, SessionBroker, acquire_session};
use crate::store::{PassCounts, PassWriter, Store};

/// Drives collection runs for one profile
pub struct Collector<B: SessionBroker> {
    broker: B,
    store: Store,
    config: Arc<CollectorConfig>,
    load_options: LoadOptions,
    /// Held for the whole run; `try_lock_owned` is the overlap guard
    run_guard: Arc<Mutex<()>>,
    phase: RwLock<RunPhase>,
    last_report: RwLock<Option<RunReport>>,
}

impl<B: SessionBroker> Collector<B> {
    pub fn new(broker: B, store: Store, config: Arc<CollectorConfig>) -> Self {
        let load_options = LoadOptions::from_config(&config);
        Self {
            broker,
            store,
            config,
            load_options,
            run_guard: Arc::new(Mutex::new(())),
            phase: RwLock::new(RunPhase::Idle),
            last_report: RwLock::new(None),
        }
    }

    /// Replace the page-load timing derived from the config
    #[must_use]
    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        *self.phase.read()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase().is_running()
    }

    #[must_use]
    pub fn last_report(&self) -> Option<RunReport> {
        self.last_report.read().clone()
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn set_phase(&self, phase: RunPhase) {
        *self.phase.write() = phase;
    }

    /// Run one collection
    ///
    /// Returns `Err(RunInProgress)` when another run holds the guard. Every
    /// other failure is reported through the returned [`RunReport`].
    pub async fn run(&self) -> CollectorResult<RunReport> {
        let Ok(guard) = Arc::clone(&self.run_guard).try_lock_owned() else {
            warn!("Collection requested while a run is in progress, skipping");
            return Err(CollectorError::RunInProgress);
        };

        let started_at = Local::now();
        let today = started_at.date_naive();
        info!("Starting collection run for profile {}", self.config.profile_id());
        self.set_phase(RunPhase::AcquiringSession);

        let mut scope = RunScope {
            collector: self,
            started_at,
            guard: Some(guard),
            session: None,
            finished: false,
        };

        match acquire_session(
            &self.broker,
            self.config.profile_id(),
            self.config.platform_root_url(),
            self.config.auth_timeout(),
        )
        .await
        {
            Ok(session) => scope.session = Some(session),
            Err(e) => {
                error!("Could not acquire a browser session: {e}");
                return Ok(scope.finish(RunReport::session_failed(started_at, &e)));
            }
        }

        let mut passes = Vec::with_capacity(DataSource::ALL.len());
        for source in DataSource::ALL {
            let Some(session) = scope.session.as_mut() else {
                break;
            };
            self.set_phase(RunPhase::collecting(source));
            let started = Instant::now();
            let status = self.run_pass(session, source, today).await;
            passes.push(PassReport {
                source,
                status,
                duration: started.elapsed(),
            });
        }

        if let Some(session) = scope.session.take() {
            session.release().await;
        }
        Ok(scope.finish(RunReport::from_passes(started_at, passes)))
    }

    fn finish(&self, report: RunReport) -> RunReport {
        match report.outcome {
            RunOutcome::Done => info!("{}", report.summary()),
            _ => warn!("{}", report.summary()),
        }
        self.set_phase(report.phase());
        *self.last_report.write() = Some(report.clone());
        report
    }

    /// One pass with its errors folded into a [`PassStatus`]
    async fn run_pass(
        &self,
        session: &mut B::Session,
        source: DataSource,
        today: NaiveDate,
    ) -> PassStatus {
        match self.collect_source(session, source, today).await {
            Ok(status) => status,
            Err(CollectorError::LoadTimeout { url, timeout }) => {
                warn!("No {source} records on {url} within {timeout:?}, skipping this source");
                PassStatus::Skipped {
                    reason: format!("no records within {timeout:?}"),
                }
            }
            Err(e) => {
                error!("{source} pass failed: {e}");
                PassStatus::failed(&e)
            }
        }
    }

    async fn collect_source(
        &self,
        session: &mut B::Session,
        source: DataSource,
        today: NaiveDate,
    ) -> CollectorResult<PassStatus> {
        let url = self.config.source_url(source);
        let page = session.load_and_expand(url, &self.load_options).await?;

        match source.transaction_kind() {
            None => {
                let extraction = extractor::extract_subscribers(&page.html);
                let writer = self.store.begin_pass().await?;
                let counts = store_subscribers(writer, &extraction, today).await?;
                Ok(completed(&extraction, counts))
            }
            Some(kind) => {
                let extraction = extractor::extract_transactions(&page.html, kind, today);
                let writer = self.store.begin_pass().await?;
                let counts = store_transactions(writer, &extraction, kind).await?;
                Ok(completed(&extraction, counts))
            }
        }
    }
}

/// State of a run in flight
///
/// Dropping it before [`RunScope::finish`] means the run future was
/// cancelled: the session is released on a spawned task, which keeps the
/// overlap guard until the browser is gone, and the run is recorded as
/// failed.
struct RunScope<'a, B: SessionBroker> {
    collector: &'a Collector<B>,
    started_at: DateTime<Local>,
    guard: Option<OwnedMutexGuard<()>>,
    session: Option<B::Session>,
    finished: bool,
}

impl<B: SessionBroker> RunScope<'_, B> {
    fn finish(&mut self, report: RunReport) -> RunReport {
        self.finished = true;
        self.collector.finish(report)
    }
}

impl<B: SessionBroker> Drop for RunScope<'_, B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Collection run was cancelled before it finished");

        let guard = self.guard.take();
        if let Some(session) = self.session.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        session.release().await;
                        drop(guard);
                    });
                }
                Err(_) => error!("No runtime left to release the browser session on"),
            }
        }
        self.collector.finish(RunReport::cancelled(self.started_at));
    }
}

fn completed<T>(extraction: &Extraction<T>, counts: PassCounts) -> PassStatus {
    PassStatus::Completed {
        blocks: extraction.blocks_total,
        candidates: extraction.candidates,
        extracted: extraction.extracted(),
        rejected: extraction.rejected.len(),
        inserted: counts.inserted,
        duplicates: counts.duplicates,
    }
}

async fn store_subscribers(
    mut writer: PassWriter,
    extraction: &Extraction<extractor::RawSubscriber>,
    today: NaiveDate,
) -> CollectorResult<PassCounts> {
    for record in &extraction.records {
        if let Err(e) = writer.upsert_subscriber(&record.username, today).await {
            writer.rollback().await;
            return Err(e);
        }
    }
    let counts = writer.commit().await?;
    info!(
        "Subscribers pass committed: {} new, {} already known",
        counts.inserted, counts.duplicates
    );
    Ok(counts)
}

async fn store_transactions(
    mut writer: PassWriter,
    extraction: &Extraction<extractor::RawTransaction>,
    kind: TransactionKind,
) -> CollectorResult<PassCounts> {
    for record in &extraction.records {
        if let Err(e) = writer.upsert_transaction(record).await {
            writer.rollback().await;
            return Err(e);
        }
    }
    let counts = writer.commit().await?;
    info!(
        "{kind} pass committed: {} new, {} already known",
        counts.inserted, counts.duplicates
    );
    Ok(counts)
}
