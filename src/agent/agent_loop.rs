//! Agent lifecycle and the background polling loop.
//!
//! `start()` builds collaborators lazily, flips the run state to
//! `Running` and spawns the scheduler task. `stop()` raises the task's
//! stop flag, waits a bounded grace period for it to exit, and then
//! reports `Stopped` whether or not the task has finished.
//!
//! A task that outlives its grace period is kept as `draining`. The next
//! `start()` waits for it once more and aborts it if it is still busy, so
//! at most one scheduler is ever live.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::agent::factory::{CollaboratorFactory, Collaborators};
use crate::agent::state::{AgentState, RunState};
use crate::config::AgentConfig;
use crate::pipeline::extraction::Extractor;
use crate::pipeline::processor::MessageProcessor;
use crate::pipeline::types::{RecentItem, Stats};

/// Result of a `start()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// Collaborator construction failed; run state is now `Error`.
    Failed(String),
}

/// Result of a `stop()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// Point-in-time run status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatus {
    pub state: RunState,
    pub running: bool,
}

/// Handle to the spawned scheduler task.
struct RunHandle {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Lifecycle {
    /// Built on first successful start, reused afterwards.
    collaborators: Option<Collaborators>,
    run: Option<RunHandle>,
    /// Stopped loop task that had not exited when its grace period ran out.
    draining: Option<JoinHandle<()>>,
}

/// The inbox-to-calendar agent.
///
/// Construct once at process start and share via `Arc`; every control
/// operation goes through these methods.
pub struct Agent {
    config: AgentConfig,
    extractor: Arc<dyn Extractor>,
    factory: Arc<dyn CollaboratorFactory>,
    state: Arc<AgentState>,
    lifecycle: Mutex<Lifecycle>,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        extractor: Arc<dyn Extractor>,
        factory: Arc<dyn CollaboratorFactory>,
    ) -> Self {
        Self {
            config,
            extractor,
            factory,
            state: Arc::new(AgentState::new()),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Start the background loop. No-op if already running.
    pub async fn start(&self) -> StartOutcome {
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.run.is_some() {
            info!("Agent is already running");
            return StartOutcome::AlreadyRunning;
        }

        if let Some(previous) = lifecycle.draining.take() {
            self.drain(previous).await;
        }

        let collaborators = match &lifecycle.collaborators {
            Some(c) => c.clone(),
            None => match self.factory.build().await {
                Ok(c) => {
                    lifecycle.collaborators = Some(c.clone());
                    c
                }
                Err(e) => {
                    let reason = e.to_string();
                    error!(error = %reason, "Failed to start agent");
                    self.state.set_run_state(RunState::Error(reason.clone())).await;
                    return StartOutcome::Failed(reason);
                }
            },
        };

        let processor = Arc::new(MessageProcessor::new(
            Arc::clone(&self.extractor),
            collaborators,
            Arc::clone(&self.state),
            self.config.extraction_timeout,
        ));

        let stop = Arc::new(AtomicBool::new(false));
        self.state.set_run_state(RunState::Running).await;
        let handle = spawn_agent_loop(processor, self.config.clone(), Arc::clone(&stop));
        lifecycle.run = Some(RunHandle { stop, handle });

        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Agent started"
        );
        StartOutcome::Started
    }

    /// Stop the background loop. No-op if not running.
    pub async fn stop(&self) -> StopOutcome {
        let mut lifecycle = self.lifecycle.lock().await;

        let Some(mut run) = lifecycle.run.take() else {
            return StopOutcome::NotRunning;
        };

        info!("Stopping agent");
        run.stop.store(true, Ordering::SeqCst);

        let joined = tokio::time::timeout(self.config.stop_grace, &mut run.handle).await;
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Agent loop task failed"),
            Err(_) => {
                warn!(
                    grace_secs = self.config.stop_grace.as_secs_f64(),
                    "Agent loop did not exit within grace period, detaching"
                );
                lifecycle.draining = Some(run.handle);
            }
        }

        self.state.set_run_state(RunState::Stopped).await;
        info!("Agent stopped");
        StopOutcome::Stopped
    }

    /// Give a detached loop task one more grace period, then abort it.
    async fn drain(&self, mut previous: JoinHandle<()>) {
        if previous.is_finished() {
            return;
        }
        if tokio::time::timeout(self.config.stop_grace, &mut previous)
            .await
            .is_err()
        {
            warn!("Previous agent loop still busy, aborting it");
            previous.abort();
            let _ = previous.await;
        }
    }

    pub async fn status(&self) -> AgentStatus {
        let state = self.state.run_state().await;
        AgentStatus {
            running: state.is_running(),
            state,
        }
    }

    pub async fn stats(&self) -> Stats {
        self.state.stats().await
    }

    /// Recent notable messages, newest first.
    pub async fn recent_items(&self) -> Vec<RecentItem> {
        self.state.recent_items().await
    }
}

/// Spawn the scheduler: pass, idle, repeat until `stop` is set.
fn spawn_agent_loop(
    processor: Arc<MessageProcessor>,
    config: AgentConfig,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Entering agent loop");

        while !stop.load(Ordering::SeqCst) {
            run_pass_guarded(&processor, &config, &stop).await;
            idle(config.poll_interval, config.stop_check_interval, &stop).await;
        }

        info!("Agent loop exited");
    })
}

/// Run one pass in its own task so neither an error nor a panic can
/// end the loop. Aborting the loop task drops the `JoinSet`, which
/// aborts the pass with it.
async fn run_pass_guarded(
    processor: &Arc<MessageProcessor>,
    config: &AgentConfig,
    stop: &Arc<AtomicBool>,
) {
    let processor = Arc::clone(processor);
    let stop = Arc::clone(stop);
    let max_results = config.max_results;
    let query = config.query.clone();

    let mut pass = JoinSet::new();
    pass.spawn(async move { processor.run_pass(max_results, &query, &stop).await });

    match pass.join_next().await {
        Some(Ok(Ok(_summary))) => {}
        Some(Ok(Err(e))) => error!(error = %e, "Error in agent loop pass"),
        Some(Err(e)) => error!(error = %e, "Agent loop pass panicked"),
        None => {}
    }
}

/// Sleep for `total`, waking every `step` to check the stop flag.
async fn idle(total: Duration, step: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    let step = step.max(Duration::from_millis(1));

    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep(step.min(deadline - now)).await;
    }
}
