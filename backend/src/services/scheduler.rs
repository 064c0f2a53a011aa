//! Background day-end timer
//!
//! Polls the wall clock and hands each reading to [`Session::tick`]. When a
//! tick asks for a reload, the session re-reads today's ledger after a short
//! delay. The loop stops when its [`CancellationToken`] is cancelled.
//!
//! Ticks and reloads touch storage and write export files synchronously, so
//! they run on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use shared::{DayEndOutcome, KeyValueStore, LedgerExporter, Session};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::DayEndConfig;

/// Source of "now" for the scheduler
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

#[derive(Clone)]
pub struct SchedulerSettings {
    pub poll_interval: Duration,
    pub reload_delay: Duration,
    pub clock: Clock,
}

impl SchedulerSettings {
    pub fn from_config(config: &DayEndConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            reload_delay: config.reload_delay(),
            clock: local_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

/// Handle to the running timer task
pub struct DayEndScheduler {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl DayEndScheduler {
    pub fn spawn<S, E>(session: Arc<Mutex<Session<S>>>, exporter: E, settings: SchedulerSettings) -> Self
    where
        S: KeyValueStore + Send + 'static,
        E: LedgerExporter + Clone + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move {
            run(session, exporter, settings, cancel_clone).await;
        });
        tracing::info!("Day-end scheduler started");
        Self { handle, cancel }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the timer and wait for the task to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            tracing::error!("Day-end scheduler join failed: {:?}", err);
        }
    }
}

async fn run<S, E>(
    session: Arc<Mutex<Session<S>>>,
    exporter: E,
    settings: SchedulerSettings,
    cancel: CancellationToken,
) where
    S: KeyValueStore + Send + 'static,
    E: LedgerExporter + Clone + Send + 'static,
{
    while !cancel.is_cancelled() {
        let now = (settings.clock)();
        if let Some(outcome) = tick_once(&session, &exporter, now).await {
            if outcome.reload_requested {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(settings.reload_delay) => {}
                }
                let today = (settings.clock)().date();
                if with_session_blocking(&session, move |session| session.reload(today))
                    .await
                    .is_some()
                {
                    tracing::info!("Reloaded ledger for {}", today);
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(settings.poll_interval) => {}
        }
    }
    tracing::info!("Day-end scheduler exiting");
}

/// Run one timer tick against the shared session
pub async fn tick_once<S, E>(
    session: &Arc<Mutex<Session<S>>>,
    exporter: &E,
    now: NaiveDateTime,
) -> Option<DayEndOutcome>
where
    S: KeyValueStore + Send + 'static,
    E: LedgerExporter + Clone + Send + 'static,
{
    let mut exporter = exporter.clone();
    let outcome = with_session_blocking(session, move |session| session.tick(now, &mut exporter))
        .await
        .flatten()?;
    tracing::info!(
        "Day-end closed {} ({} rolled over, export: {:?})",
        outcome.closed_date,
        outcome.rolled_over,
        outcome.exported_file
    );
    Some(outcome)
}

/// Lock the session on the blocking pool and run `f` there
///
/// Returns `None` if the blocking task panicked.
pub async fn with_session_blocking<S, T, F>(session: &Arc<Mutex<Session<S>>>, f: F) -> Option<T>
where
    S: KeyValueStore + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut Session<S>) -> T + Send + 'static,
{
    let session = Arc::clone(session);
    let task = tokio::task::spawn_blocking(move || {
        let mut guard = session.blocking_lock();
        f(&mut guard)
    });
    match task.await {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!("Blocking session task failed: {:?}", err);
            None
        }
    }
}
