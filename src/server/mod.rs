//! Service mode: HTTP endpoints plus a timer that runs cycles.
//!
//! At most one cycle runs at a time across timer ticks and manual triggers.
//! The guard is an owned `tokio::sync::Mutex` permit held for the whole
//! cycle; a trigger that cannot take it is refused, never queued. Status
//! readers only look at an atomic flag and never touch the guard.

mod history;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub use history::HistoryStore;

use crate::{
    cycle::{BalanceOracle, CycleController, HolderSource},
    gateway::OrderSubmitter,
    logging::targets,
    prelude::*,
    CycleResult,
};

/// Anything that can run one distribution cycle.
#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
    async fn run_cycle(&self) -> Result<CycleResult>;
}

#[async_trait]
impl<O, H, S> CycleRunner for CycleController<O, H, S>
where
    O: BalanceOracle + 'static,
    H: HolderSource + 'static,
    S: OrderSubmitter + 'static,
{
    async fn run_cycle(&self) -> Result<CycleResult> {
        CycleController::run_cycle(self).await
    }
}

#[derive(Debug, Clone, Default)]
struct LastRun {
    time: Option<DateTime<Utc>>,
    status: Option<String>,
    next_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub is_running: bool,
    pub last_run_time: Option<DateTime<Utc>>,
    pub last_run_status: Option<String>,
    pub uptime: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_running: bool,
    pub last_run_time: Option<DateTime<Utc>>,
    pub last_run_status: Option<String>,
    pub next_run: Option<DateTime<Utc>>,
    pub interval_secs: u64,
}

pub struct DistributorService<R: CycleRunner> {
    runner: R,
    guard: Arc<Mutex<()>>,
    running: AtomicBool,
    last_run: RwLock<LastRun>,
    history: Option<HistoryStore>,
    interval: Duration,
    started: Instant,
}

impl<R: CycleRunner> DistributorService<R> {
    /// `interval` of zero disables the timer.
    pub fn new(runner: R, interval: Duration, history: Option<HistoryStore>) -> Self {
        Self {
            runner,
            guard: Arc::new(Mutex::new(())),
            running: AtomicBool::new(false),
            last_run: RwLock::new(LastRun::default()),
            history,
            interval,
            started: Instant::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Option<OwnedMutexGuard<()>> {
        let permit = self.guard.clone().try_lock_owned().ok()?;
        self.running.store(true, Ordering::Release);
        Some(permit)
    }

    /// Run a cycle on the current task, or `None` if one is already running.
    pub async fn run_now(&self) -> Option<Result<CycleResult>> {
        let permit = self.acquire()?;
        Some(self.execute(permit).await)
    }

    /// Start a cycle in the background; false if one is already running.
    pub fn trigger(self: &Arc<Self>) -> bool {
        match self.acquire() {
            Some(permit) => {
                let service = Arc::clone(self);
                tokio::spawn(async move {
                    let _ = service.execute(permit).await;
                });
                true
            }
            None => false,
        }
    }

    async fn execute(&self, permit: OwnedMutexGuard<()>) -> Result<CycleResult> {
        self.last_run.write().await.time = Some(Utc::now());

        let result = self.runner.run_cycle().await;
        let status = match &result {
            Ok(cycle) => {
                if let Some(history) = &self.history {
                    if let Err(e) = history.record(cycle) {
                        warn!(target: targets::SERVER, error = %e, "Failed to save cycle result");
                    }
                }
                cycle.summary()
            }
            Err(e) if e.is_precondition() => {
                warn!(target: targets::SERVER, error = %e, "Cycle aborted before any order");
                format!("Error: {e}")
            }
            Err(e) => {
                error!(target: targets::SERVER, error = %e, "Distribution cycle failed");
                format!("Error: {e}")
            }
        };
        info!(target: targets::SERVER, status = %status, "Cycle finished");
        self.last_run.write().await.status = Some(status);

        // cleared while the permit is still held
        self.running.store(false, Ordering::Release);
        drop(permit);
        result
    }

    /// Fire a cycle every `interval`, skipping ticks that find one running.
    pub async fn run_schedule(self: Arc<Self>) {
        if self.interval.is_zero() {
            return;
        }
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            self.last_run.write().await.next_run = chrono::Duration::from_std(self.interval)
                .ok()
                .map(|d| Utc::now() + d);
            ticker.tick().await;

            info!(target: targets::SERVER, "Scheduled cycle");
            if self.run_now().await.is_none() {
                warn!(target: targets::SERVER, "Previous cycle still running, skipping tick");
            }
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let last = self.last_run.read().await.clone();
        HealthResponse {
            status: "healthy",
            is_running: self.is_running(),
            last_run_time: last.time,
            last_run_status: last.status,
            uptime: self.started.elapsed().as_secs_f64(),
        }
    }

    pub async fn status(&self) -> StatusResponse {
        let last = self.last_run.read().await.clone();
        StatusResponse {
            is_running: self.is_running(),
            last_run_time: last.time,
            last_run_status: last.status,
            next_run: last.next_run,
            interval_secs: self.interval.as_secs(),
        }
    }
}

async fn health<R: CycleRunner>(
    State(service): State<Arc<DistributorService<R>>>,
) -> Json<HealthResponse> {
    Json(service.health().await)
}

async fn status<R: CycleRunner>(
    State(service): State<Arc<DistributorService<R>>>,
) -> Json<StatusResponse> {
    Json(service.status().await)
}

async fn distribute<R: CycleRunner>(
    State(service): State<Arc<DistributorService<R>>>,
) -> (StatusCode, Json<serde_json::Value>) {
    if service.trigger() {
        info!(target: targets::SERVER, "Manual cycle triggered");
        (
            StatusCode::OK,
            Json(json!({ "message": "Distribution cycle started" })),
        )
    } else {
        (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Distribution cycle already running",
                "isRunning": true,
            })),
        )
    }
}

pub fn router<R: CycleRunner>(service: Arc<DistributorService<R>>) -> Router {
    Router::new()
        .route("/health", get(health::<R>))
        .route("/status", get(status::<R>))
        .route("/distribute", post(distribute::<R>))
        .with_state(service)
}

/// Bind `addr`, start the timer and serve until Ctrl-C.
pub async fn serve<R: CycleRunner>(service: Arc<DistributorService<R>>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        target: targets::SERVER,
        addr,
        interval_secs = service.interval.as_secs(),
        "Distributor service listening"
    );

    let schedule = tokio::spawn(Arc::clone(&service).run_schedule());

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(target: targets::SERVER, "Shutdown requested");
        })
        .await?;

    schedule.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tokio::sync::Semaphore;

    use super::*;
    use crate::{CycleStatus, Error};

    /// Blocks inside `run_cycle` until a permit is released.
    struct GatedRunner {
        gate: Semaphore,
        calls: AtomicUsize,
        result: std::result::Result<CycleResult, Error>,
    }

    impl GatedRunner {
        fn new(result: std::result::Result<CycleResult, Error>) -> Self {
            Self {
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
                result,
            }
        }

        fn open(result: std::result::Result<CycleResult, Error>) -> Self {
            let runner = Self::new(result);
            runner.gate.add_permits(100);
            runner
        }
    }

    #[async_trait]
    impl CycleRunner for GatedRunner {
        async fn run_cycle(&self) -> Result<CycleResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            self.result.clone()
        }
    }

    fn completed() -> CycleResult {
        CycleResult {
            status: CycleStatus::Completed,
            attempted: 4,
            succeeded: 3,
            failed: 1,
            ..CycleResult::skipped_low_balance("10")
        }
    }

    async fn spawn_app<R: CycleRunner>(service: Arc<DistributorService<R>>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(service)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn wait_idle<R: CycleRunner>(service: &DistributorService<R>) {
        for _ in 0..200 {
            if !service.is_running() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("cycle never finished");
    }

    #[tokio::test]
    async fn test_health_reports_idle_service() {
        let service = Arc::new(DistributorService::new(
            GatedRunner::open(Ok(completed())),
            Duration::ZERO,
            None,
        ));
        let base = spawn_app(service).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["isRunning"], false);
        assert!(body["lastRunStatus"].is_null());
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_distribute_rejects_while_running() {
        let service = Arc::new(DistributorService::new(
            GatedRunner::new(Ok(completed())),
            Duration::ZERO,
            None,
        ));
        let base = spawn_app(Arc::clone(&service)).await;
        let client = reqwest::Client::new();

        let first = client.post(format!("{base}/distribute")).send().await.unwrap();
        assert_eq!(first.status(), reqwest::StatusCode::OK);
        assert!(service.is_running());

        let second = client.post(format!("{base}/distribute")).send().await.unwrap();
        assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);
        let body: serde_json::Value = second.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("already running"));

        service.runner.gate.add_permits(1);
        wait_idle(&service).await;
        assert_eq!(service.runner.calls.load(Ordering::SeqCst), 1);

        let status: serde_json::Value = client
            .get(format!("{base}/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["isRunning"], false);
        assert_eq!(status["lastRunStatus"], "Completed: 3/4 orders succeeded");
        assert!(status["lastRunTime"].is_string());
    }

    #[tokio::test]
    async fn test_run_now_skips_when_busy() {
        let service = Arc::new(DistributorService::new(
            GatedRunner::new(Ok(completed())),
            Duration::ZERO,
            None,
        ));
        assert!(service.trigger());
        assert!(service.run_now().await.is_none());

        service.runner.gate.add_permits(1);
        wait_idle(&service).await;
        service.runner.gate.add_permits(1);
        assert!(service.run_now().await.is_some());
        assert_eq!(service.runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_status_polling_never_blocks_cycles() {
        let runner = GatedRunner::new(Ok(completed()));
        runner.gate.add_permits(2_000);
        let service = Arc::new(DistributorService::new(runner, Duration::ZERO, None));

        let done = Arc::new(AtomicBool::new(false));
        let poller = {
            let service = Arc::clone(&service);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut polls = 0u64;
                while !done.load(Ordering::Relaxed) {
                    let _ = service.is_running();
                    let _ = service.status().await;
                    polls += 1;
                    tokio::task::yield_now().await;
                }
                polls
            })
        };

        for _ in 0..2_000 {
            assert!(service.run_now().await.is_some());
            assert!(!service.is_running());
        }
        done.store(true, Ordering::Relaxed);
        assert!(poller.await.unwrap() > 0);
        assert_eq!(service.runner.calls.load(Ordering::SeqCst), 2_000);
    }

    #[tokio::test]
    async fn test_failed_cycle_recorded_in_status() {
        let service = DistributorService::new(
            GatedRunner::open(Err(Error::Balance("rpc down".to_string()))),
            Duration::ZERO,
            None,
        );
        let result = service.run_now().await.unwrap();
        assert!(result.is_err());

        let health = service.health().await;
        assert_eq!(
            health.last_run_status.as_deref(),
            Some("Error: Balance query failed: rpc down")
        );
        assert!(health.last_run_time.is_some());
    }

    #[tokio::test]
    async fn test_completed_cycle_written_to_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::open(dir.path()).unwrap();
        let service = DistributorService::new(
            GatedRunner::open(Ok(completed())),
            Duration::ZERO,
            Some(history.clone()),
        );

        service.run_now().await.unwrap().unwrap();
        assert_eq!(history.entries().unwrap().len(), 1);
    }
}
