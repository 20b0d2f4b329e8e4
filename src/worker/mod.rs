//! The worker (§4.6) — lifecycle owner of the queue → mutex → adapter
//! pipeline. The only task that ever calls `K8sAdapter::scale`/`restart`
//! (I5) and the only writer of `RUNNING`/terminal `CommandResult`s.
//!
//! Grounded on the teacher's `kernel::cleanup::CleanupService`
//! (spawn/`select!`/oneshot-stop shape for `start`/`stop`) and
//! `kernel::recovery::with_recovery_async` (guaranteed-release scope around
//! a fallible operation, generalized here to a `finally`-style guard via
//! `FifoGuard`'s `Drop` rather than `catch_unwind`, since the adapter calls
//! are `async` and ordinary `Result` errors rather than panics are the
//! expected failure mode).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex as AsyncMutex};

use crate::command::{CommandResult, CommandStatus, SanitizedCommand, ScheduledCommand};
use crate::k8s::KubernetesAdapter;
use crate::parser::{Action, CommandKind};
use crate::state::ExecutionStateRegistry;
use crate::sync::{FifoMutex, PriorityQueue};
use crate::types::{CommandId, Error, ExecutionId, KubernetesConfig};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const GRACEFUL_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// Shared result table. A `CommandResult` is created PENDING at dequeue and
/// mutated exactly once at completion (I4); readers (the status endpoint)
/// take a clone.
#[derive(Debug, Default)]
pub struct ResultTable {
    results: AsyncMutex<HashMap<CommandId, CommandResult>>,
}

impl ResultTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn put(&self, result: CommandResult) {
        self.results.lock().await.insert(result.command_id.clone(), result);
    }

    pub async fn get(&self, id: &CommandId) -> Option<CommandResult> {
        self.results.lock().await.get(id).cloned()
    }
}

/// Process-owned singleton worker (enforced by the bootstrap component,
/// not by this type itself — see `src/bootstrap.rs`).
#[derive(Debug)]
pub struct Worker {
    queue: Arc<PriorityQueue>,
    mutex: Arc<FifoMutex>,
    adapter: Arc<dyn KubernetesAdapter>,
    state: Arc<ExecutionStateRegistry>,
    results: Arc<ResultTable>,
    config: KubernetesConfig,
    stop_tx: AsyncMutex<Option<oneshot::Sender<()>>>,
    running: std::sync::atomic::AtomicBool,
}

impl Worker {
    pub fn new(
        queue: Arc<PriorityQueue>,
        mutex: Arc<FifoMutex>,
        adapter: Arc<dyn KubernetesAdapter>,
        state: Arc<ExecutionStateRegistry>,
        results: Arc<ResultTable>,
        config: KubernetesConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            mutex,
            adapter,
            state,
            results,
            config,
            stop_tx: AsyncMutex::new(None),
            running: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Idempotent: spawns the run loop only if not already running (P6).
    pub async fn start(self: &Arc<Self>) {
        use std::sync::atomic::Ordering;
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!(phase = "system", "worker start() called while already running, ignored");
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        *self.stop_tx.lock().await = Some(stop_tx);

        let worker = self.clone();
        tokio::spawn(async move {
            worker.run_loop(stop_rx).await;
        });
    }

    /// Sets the stop flag; the loop exits after completing any in-flight
    /// command. Idempotent (P6): a second call with nothing to stop is a
    /// no-op.
    pub async fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().await.take() {
            let _ = tx.send(());
        }
    }

    /// Stops intake and waits up to `GRACEFUL_SHUTDOWN_DEADLINE` for the
    /// in-flight command to finish, then returns even if not idle. Does not
    /// cancel an in-flight adapter call (§5).
    pub async fn graceful_shutdown(&self) {
        self.stop().await;
        let deadline = tokio::time::Instant::now() + GRACEFUL_SHUTDOWN_DEADLINE;
        while tokio::time::Instant::now() < deadline {
            if !self.mutex.is_locked() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn run_loop(self: Arc<Self>, mut stop_rx: oneshot::Receiver<()>) {
        loop {
            if stop_rx.try_recv().is_ok() {
                break;
            }

            let cmd = match self.queue.dequeue().await {
                Some(cmd) => cmd,
                None => {
                    tokio::select! {
                        _ = tokio::time::sleep(POLL_INTERVAL) => continue,
                        _ = &mut stop_rx => break,
                    }
                }
            };

            if cmd.parsed.kind != CommandKind::Execute {
                // Defence-in-depth: the API gate never enqueues non-EXECUTE
                // commands, so this branch should be unreachable in
                // production, but a stray enqueue must not crash the loop.
                tracing::warn!(
                    execution_id = %cmd.execution_id,
                    phase = "system",
                    "non-EXECUTE command reached the worker queue, skipping"
                );
                continue;
            }

            self.execute(cmd).await;
        }

        self.running.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    /// Runs one EXECUTE command end to end: publish RUNNING, acquire the
    /// mutex, dispatch + verify, record the terminal result, release the
    /// mutex. The guaranteed-release scope is `FifoGuard`'s `Drop` — it
    /// fires on every path out of this function, success or error (§4.6
    /// step 5/6, P4).
    async fn execute(&self, cmd: ScheduledCommand) {
        let sanitized = SanitizedCommand::from(&cmd);
        self.results.put(CommandResult::running(cmd.id.clone())).await;
        self.state.mark_executing(sanitized).await;

        tracing::info!(
            execution_id = %cmd.execution_id,
            command_id = %cmd.id,
            user_id = %cmd.user_id,
            phase = "executing",
            "acquiring mutex for execution"
        );

        let guard = self.mutex.acquire().await;

        let outcome = self.dispatch(&cmd).await;

        // Guaranteed-release: dropping `guard` here (end of scope, on every
        // path including an early return inside `dispatch`) hands the lock
        // to the next waiter or frees it.
        drop(guard);
        self.state.mark_idle().await;

        match outcome {
            Ok(()) => {
                tracing::info!(
                    execution_id = %cmd.execution_id,
                    command_id = %cmd.id,
                    phase = "completed",
                    "execution succeeded"
                );
                self.results.put(CommandResult::success(cmd.id.clone())).await;
                self.state.record_success(cmd.id.to_string()).await;
            }
            Err(err) => {
                let message = err.public_message();
                tracing::error!(
                    execution_id = %cmd.execution_id,
                    command_id = %cmd.id,
                    phase = "failed",
                    error = %message,
                    "execution failed"
                );
                self.results
                    .put(CommandResult::failed(cmd.id.clone(), message.clone()))
                    .await;
                self.state.record_failure(cmd.id.to_string(), message).await;
            }
        }
    }

    /// Dispatches by `cmd.parsed.action` — explicit tagged match, no
    /// dynamic dispatch on the action itself (§9 "replaced by an explicit
    /// tagged match"). Any action other than SCALE/RESTART is FAILED with
    /// an `UnknownAction` reason, fail-closed.
    async fn dispatch(&self, cmd: &ScheduledCommand) -> crate::types::Result<()> {
        match cmd.parsed.action {
            Some(Action::Scale) => {
                let replicas = cmd.parsed.target_replicas.ok_or_else(|| {
                    Error::system("SCALE command missing targetReplicas at dispatch")
                })?;
                self.scale_and_verify(replicas, &cmd.execution_id).await
            }
            Some(Action::Restart) => self.restart_and_verify(&cmd.execution_id).await,
            None => Err(Error::system(format!(
                "UnknownAction: command {} carries no action",
                cmd.id
            ))),
        }
    }

    async fn scale_and_verify(&self, replicas: i64, execution_id: &ExecutionId) -> crate::types::Result<()> {
        if replicas < self.config.replica_floor as i64 || replicas > self.config.replica_ceiling as i64 {
            return Err(Error::validation(format!(
                "targetReplicas {replicas} outside [{}, {}]",
                self.config.replica_floor, self.config.replica_ceiling
            )));
        }
        let replicas = replicas as u32;
        self.adapter.scale(replicas, execution_id).await?;

        tokio::time::sleep(self.config.verification_grace).await;
        let status = self.adapter.status(execution_id).await?;
        if status.replicas != replicas as i32 {
            return Err(Error::system(format!(
                "scale verification mismatch: expected {replicas} replicas, observed {}",
                status.replicas
            )));
        }
        Ok(())
    }

    async fn restart_and_verify(&self, execution_id: &ExecutionId) -> crate::types::Result<()> {
        self.adapter.restart(execution_id).await?;
        // Fetched purely to confirm connectivity post-restart; no equality
        // assertion (§4.5).
        self.adapter.status(execution_id).await?;
        Ok(())
    }
}
