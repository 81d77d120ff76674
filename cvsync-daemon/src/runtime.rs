use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use croner::Cron;
use tokio::sync::broadcast;

use cvsync_clients::{CvClient, MetaClient};
use cvsync_core::{Config, ScheduleConfig};
use cvsync_sync::{pipeline, CycleReport, SyncScope};

use crate::error::{io_err, DaemonError};
use crate::log_rotation::{rotate_current, RotationPolicy};

const ROTATION_PERIOD: Duration = Duration::from_secs(60);

/// One sync cycle, as seen by the scheduler.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleSummary, DaemonError>;
}

/// Connects both clients fresh and runs a full cycle against the live systems.
#[derive(Debug, Clone)]
pub struct LiveCycle {
    config: Config,
}

impl LiveCycle {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CycleRunner for LiveCycle {
    async fn run_cycle(&self) -> Result<CycleSummary, DaemonError> {
        let started = Instant::now();
        let meta = MetaClient::connect(&self.config.metacontrata).await?;
        let cv = CvClient::new(&self.config.cvsecurity)?;
        let report = pipeline::run(&meta, &cv, &self.config.sync, SyncScope::All, false).await;
        Ok(CycleSummary::from_report(&report, started.elapsed()))
    }
}

/// Flat counters for one cycle, suitable for a single log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub departments_created: usize,
    pub departments_deleted: usize,
    pub persons_created: usize,
    pub persons_updated: usize,
    pub persons_deleted: usize,
    /// Write failures plus aborted reconciliations.
    pub failures: usize,
    pub duration_ms: u128,
}

impl CycleSummary {
    pub fn from_report(report: &CycleReport, elapsed: Duration) -> Self {
        let mut summary = Self {
            duration_ms: elapsed.as_millis(),
            ..Self::default()
        };
        match &report.departments {
            Some(Ok(r)) => {
                summary.departments_created = r.created.len();
                summary.departments_deleted = r.deleted.len();
                summary.failures += r.failures.len();
            }
            Some(Err(_)) => summary.failures += 1,
            None => {}
        }
        match &report.employees {
            Some(Ok(r)) => {
                summary.persons_created = r.created;
                summary.persons_updated = r.updated;
                summary.persons_deleted = r.deleted;
                summary.failures += r.failures.len();
            }
            Some(Err(_)) => summary.failures += 1,
            None => {}
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failures == 0
    }
}

/// Start the daemon and block the current thread until it exits.
pub fn start_blocking(config: Config) -> Result<(), DaemonError> {
    crate::logging::init(&config.logging)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the scheduler until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    let trigger = Trigger::from_config(&config.schedule)?;
    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let scheduler_rx = shutdown_tx.subscribe();

    tracing::info!(
        %trigger,
        run_on_start = config.schedule.run_on_start,
        "sync daemon starting",
    );

    let rotation_handle = config.logging.dir.clone().map(|dir| {
        let shutdown = shutdown_tx.clone();
        let rx = shutdown.subscribe();
        tokio::spawn(log_rotation_task(dir, RotationPolicy::default(), rx))
    });

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => {}
                signal = shutdown_signal() => {
                    let name = signal?;
                    tracing::info!(signal = name, "shutting down sync daemon");
                    let _ = shutdown.send(());
                }
            }
            Ok::<(), DaemonError>(())
        })
    };

    let runner = LiveCycle::new(config.clone());
    let cycles = scheduler_loop(
        &runner,
        &trigger,
        config.schedule.run_on_start,
        scheduler_rx,
    )
    .await;
    let _ = shutdown_tx.send(());

    handle_join("signal_handler", signal_handle.await)?;
    if let Some(handle) = rotation_handle {
        handle_join("log_rotation", handle.await)?;
    }
    tracing::info!(cycles, "sync daemon stopped");
    Ok(())
}

/// When cycles fire.
pub enum Trigger {
    /// Fixed period, measured from daemon start.
    Every(Duration),
    /// Crontab expression evaluated in local time.
    Cron { expression: String, schedule: Cron },
}

impl Trigger {
    /// `schedule.cron` when set, else `schedule.interval_secs`.
    pub fn from_config(schedule: &ScheduleConfig) -> Result<Self, DaemonError> {
        Ok(match (&schedule.cron, schedule.cron_schedule()?) {
            (Some(expression), Some(cron)) => Trigger::Cron {
                expression: expression.clone(),
                schedule: cron,
            },
            _ => Trigger::Every(schedule.interval()),
        })
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Every(period) => write!(f, "every {}s", period.as_secs()),
            Trigger::Cron { expression, .. } => write!(f, "cron '{expression}'"),
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trigger({self})")
    }
}

/// Local wall time that advances with the tokio clock, so paused-time tests
/// can drive cron schedules.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    anchor: DateTime<Local>,
    started: tokio::time::Instant,
}

impl WallClock {
    pub fn system() -> Self {
        Self::starting_at(Local::now())
    }

    pub fn starting_at(anchor: DateTime<Local>) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor + elapsed
    }
}

/// Run `runner` whenever `trigger` fires until `shutdown_rx` fires.
pub async fn scheduler_loop<R>(
    runner: &R,
    trigger: &Trigger,
    run_on_start: bool,
    shutdown_rx: broadcast::Receiver<()>,
) -> usize
where
    R: CycleRunner + ?Sized,
{
    scheduler_loop_with_clock(runner, trigger, run_on_start, WallClock::system(), shutdown_rx)
        .await
}

/// [`scheduler_loop`] against an explicit clock.
///
/// A cycle always runs to completion before the next fire time is awaited,
/// and fire times that passed while a cycle was running are skipped. Returns
/// the number of cycles started.
pub async fn scheduler_loop_with_clock<R>(
    runner: &R,
    trigger: &Trigger,
    run_on_start: bool,
    clock: WallClock,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> usize
where
    R: CycleRunner + ?Sized,
{
    let mut cycles = 0;
    match trigger {
        Trigger::Every(period) => {
            let mut interval = tokio::time::interval(*period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await; // the first tick completes immediately

            if run_on_start {
                run_one(runner, &mut cycles).await;
            }
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => run_one(runner, &mut cycles).await,
                }
            }
        }
        Trigger::Cron { schedule, .. } => {
            if run_on_start {
                run_one(runner, &mut cycles).await;
            }
            loop {
                let now = clock.now();
                let next = match schedule.find_next_occurrence(&now, false) {
                    Ok(next) => next,
                    Err(err) => {
                        tracing::error!(error = %err, "cron schedule has no next occurrence");
                        break;
                    }
                };
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tracing::debug!(next = %next, "next sync cycle scheduled");
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(wait) => run_one(runner, &mut cycles).await,
                }
            }
        }
    }
    cycles
}

async fn run_one<R: CycleRunner + ?Sized>(runner: &R, cycles: &mut usize) {
    *cycles += 1;
    let cycle = *cycles;
    tracing::info!(cycle, "sync cycle starting");
    match runner.run_cycle().await {
        Ok(summary) if summary.is_success() => tracing::info!(
            cycle,
            departments_created = summary.departments_created,
            departments_deleted = summary.departments_deleted,
            persons_created = summary.persons_created,
            persons_updated = summary.persons_updated,
            persons_deleted = summary.persons_deleted,
            duration_ms = summary.duration_ms as u64,
            "sync cycle finished",
        ),
        Ok(summary) => tracing::warn!(
            cycle,
            failures = summary.failures,
            duration_ms = summary.duration_ms as u64,
            "sync cycle finished with failures",
        ),
        Err(err) => tracing::error!(cycle, error = %err, "sync cycle failed"),
    }
}

async fn log_rotation_task(
    dir: PathBuf,
    policy: RotationPolicy,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(ROTATION_PERIOD);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let dir = dir.clone();
                tokio::task::spawn_blocking(move || rotate_current(&dir, policy))
                    .await
                    .map_err(|e| DaemonError::Task { task: "log_rotation", reason: e.to_string() })?;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).map_err(DaemonError::Signal)?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT").map_err(DaemonError::Signal),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    tokio::signal::ctrl_c()
        .await
        .map(|()| "ctrl-c")
        .map_err(DaemonError::Signal)
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task {
            task,
            reason: err.to_string(),
        }),
    }
}
