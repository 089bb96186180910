//! The drain-and-flush worker loop.
//!
//! One cycle pops at most one queue item, buffers it if it parses, then
//! flushes the batch once the size or interval threshold is crossed. A
//! failed flush never loses the batch: it is written to a rescue file
//! instead. On exit (shutdown signal or loop limit) the remaining batch is
//! flushed before the loop returns.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tally_config::WorkerConfig;
use tally_core::AuditEvent;
use tally_core::reports::WorkSummary;
use tally_db::{AuditQueue, AuditStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::WorkerError;
use crate::policy::FlushPolicy;
use crate::rescue::RescueStore;

/// Back-off after an unexpected per-iteration failure.
const ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Characters of an invalid payload kept in the log line.
const PREVIEW_CHARS: usize = 80;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Runtime knobs for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub batch_size: usize,
    pub flush_interval: Duration,
    /// Sleep after an empty pop.
    pub idle_sleep: Duration,
    /// Sleep after a transient loop error.
    pub error_pause: Duration,
    /// Stop after this many cycles. `0` runs until shutdown.
    pub max_loops: u64,
    /// Advisory batch size ceiling. `0` disables the warning.
    pub memory_limit_bytes: u64,
}

impl WorkerSettings {
    #[must_use]
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            flush_interval: Duration::from_secs(config.flush_interval_secs),
            idle_sleep: Duration::from_millis(config.sleep_ms),
            error_pause: ERROR_PAUSE,
            max_loops: 0,
            memory_limit_bytes: config.memory_limit_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    #[must_use]
    pub const fn with_max_loops(mut self, max_loops: u64) -> Self {
        self.max_loops = max_loops;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> FlushPolicy {
        FlushPolicy::new(self.batch_size, self.flush_interval)
    }

    const fn loop_limit_reached(&self, loops: u64) -> bool {
        self.max_loops > 0 && loops >= self.max_loops
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPhase {
    Running,
    /// Flushing what is left before exit.
    Draining,
    Stopped,
}

/// Everything a worker carries between cycles.
#[derive(Debug)]
pub struct WorkerState {
    batch: Vec<AuditEvent>,
    batch_bytes: u64,
    memory_warned: bool,
    last_flush: Instant,
    loops: u64,
    phase: WorkerPhase,
    summary: WorkSummary,
}

impl WorkerState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            batch: Vec::new(),
            batch_bytes: 0,
            memory_warned: false,
            last_flush: Instant::now(),
            loops: 0,
            phase: WorkerPhase::Running,
            summary: WorkSummary::default(),
        }
    }

    /// Events buffered since the last flush, in arrival order.
    #[must_use]
    pub fn batch(&self) -> &[AuditEvent] {
        &self.batch
    }

    /// Approximate serialized size of the batch.
    #[must_use]
    pub const fn batch_bytes(&self) -> u64 {
        self.batch_bytes
    }

    #[must_use]
    pub const fn loops(&self) -> u64 {
        self.loops
    }

    #[must_use]
    pub const fn phase(&self) -> WorkerPhase {
        self.phase
    }

    #[must_use]
    pub const fn summary(&self) -> &WorkSummary {
        &self.summary
    }

    #[must_use]
    pub fn since_last_flush(&self) -> Duration {
        self.last_flush.elapsed()
    }

    fn buffer(&mut self, event: AuditEvent, payload_len: usize) {
        self.batch_bytes = self.batch_bytes.saturating_add(payload_len as u64);
        self.batch.push(event);
    }

    /// Hand the batch over to a flush. The clock restarts whatever the
    /// flush outcome.
    fn take_batch(&mut self) -> Vec<AuditEvent> {
        self.last_flush = Instant::now();
        self.batch_bytes = 0;
        self.memory_warned = false;
        std::mem::take(&mut self.batch)
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a flushed batch ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlushOutcome {
    Flushed { count: usize },
    Rescued { count: usize, path: PathBuf },
}

pub struct Worker<Q, S> {
    queue: Q,
    store: S,
    rescue: RescueStore,
    settings: WorkerSettings,
    shutdown: CancellationToken,
}

impl<Q: AuditQueue, S: AuditStore> Worker<Q, S> {
    pub const fn new(
        queue: Q,
        store: S,
        rescue: RescueStore,
        settings: WorkerSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            store,
            rescue,
            settings,
            shutdown,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Run until shutdown is requested or the loop limit is reached, then
    /// flush the remaining batch.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::RescueWrite` when a failed batch could not be
    /// written to a rescue file. Every other failure is handled in-loop.
    pub async fn run(&self) -> Result<WorkSummary, WorkerError> {
        let mut state = WorkerState::new();
        self.run_with(&mut state).await?;
        Ok(state.summary)
    }

    /// Like [`Worker::run`], continuing from an existing state.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::RescueWrite` when a failed batch could not be
    /// written to a rescue file.
    pub async fn run_with(&self, state: &mut WorkerState) -> Result<(), WorkerError> {
        info!(
            pid = std::process::id(),
            batch_size = self.settings.batch_size,
            flush_interval_secs = self.settings.flush_interval.as_secs(),
            max_loops = self.settings.max_loops,
            "Starting audit worker"
        );

        let reason = loop {
            if self.shutdown.is_cancelled() {
                break "shutdown requested";
            }
            if self.settings.loop_limit_reached(state.loops) {
                break "loop limit reached";
            }
            if let Err(error) = self.cycle(state).await {
                state.phase = WorkerPhase::Stopped;
                return Err(error);
            }
        };

        info!(reason, buffered = state.batch.len(), "Stopping audit worker");
        self.drain(state).await
    }

    /// One iteration: pop, parse, buffer, maybe flush.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::RescueWrite` when a failed batch could not be
    /// written to a rescue file.
    pub async fn cycle(&self, state: &mut WorkerState) -> Result<Option<FlushOutcome>, WorkerError> {
        state.loops += 1;
        state.summary.loops += 1;

        if let Err(error) = self.receive(state).await {
            state.summary.transient_errors += 1;
            error!(%error, "Worker error");
            self.pause(self.settings.error_pause).await;
            return Ok(None);
        }

        match self
            .settings
            .policy()
            .trigger(state.batch.len(), state.since_last_flush())
        {
            Some(trigger) => {
                debug!(?trigger, buffered = state.batch.len(), "flush threshold reached");
                self.flush(state).await
            }
            None => Ok(None),
        }
    }

    /// Write the batch to the store, or to a rescue file if the store
    /// rejects it. An empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::RescueWrite` when the rescue file could not be
    /// written. The batch is lost in that case.
    pub async fn flush(&self, state: &mut WorkerState) -> Result<Option<FlushOutcome>, WorkerError> {
        if state.batch.is_empty() {
            return Ok(None);
        }

        let batch = state.take_batch();
        let count = batch.len();

        match self.store.bulk_insert(&batch).await {
            Ok(()) => {
                state.summary.flushes += 1;
                state.summary.events_flushed += count as u64;
                info!(count, "Flushed {count} logs to store");
                Ok(Some(FlushOutcome::Flushed { count }))
            }
            Err(source) => {
                let reason = source.to_string();
                let error = WorkerError::Flush { count, source };
                error!(%error, "Store rejected batch, writing rescue file");

                let path = match self.rescue.write(&reason, &batch) {
                    Ok(path) => path,
                    Err(rescue_error) => {
                        error!(error = %rescue_error, count, "Rescue write failed, batch lost");
                        return Err(rescue_error);
                    }
                };

                state.summary.rescues += 1;
                state.summary.events_rescued += count as u64;
                warn!(path = %path.display(), count, "Rescued to file");
                Ok(Some(FlushOutcome::Rescued { count, path }))
            }
        }
    }

    async fn receive(&self, state: &mut WorkerState) -> Result<(), WorkerError> {
        let popped = self
            .queue
            .pop()
            .await
            .map_err(|source| WorkerError::Transient { source })?;

        let Some(payload) = popped else {
            self.pause(self.settings.idle_sleep).await;
            return Ok(());
        };

        match AuditEvent::from_wire(&payload) {
            Ok(event) => {
                state.summary.received += 1;
                state.buffer(event, payload.len());
                debug!(buffered = state.batch.len(), "Buffered audit event");
                self.check_memory(state);
            }
            Err(source) => {
                state.summary.skipped += 1;
                let error = WorkerError::Serialization {
                    preview: payload.chars().take(PREVIEW_CHARS).collect(),
                    source,
                };
                warn!(%error, "Skipping invalid payload");
            }
        }
        Ok(())
    }

    fn check_memory(&self, state: &mut WorkerState) {
        let limit = self.settings.memory_limit_bytes;
        if limit == 0 || state.memory_warned || state.batch_bytes <= limit {
            return;
        }
        state.memory_warned = true;
        warn!(
            batch_bytes = state.batch_bytes,
            limit_bytes = limit,
            buffered = state.batch.len(),
            "Audit batch exceeds memory ceiling"
        );
    }

    async fn drain(&self, state: &mut WorkerState) -> Result<(), WorkerError> {
        state.phase = WorkerPhase::Draining;
        if !state.batch.is_empty() {
            info!(buffered = state.batch.len(), "Flushing buffer before exit...");
        }
        let flushed = self.flush(state).await;
        state.phase = WorkerPhase::Stopped;
        flushed?;

        let summary = &state.summary;
        info!(
            loops = summary.loops,
            received = summary.received,
            skipped = summary.skipped,
            events_flushed = summary.events_flushed,
            events_rescued = summary.events_rescued,
            "Audit worker stopped"
        );
        Ok(())
    }

    /// Sleep, waking early on shutdown.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            () = self.shutdown.cancelled() => {}
            () = tokio::time::sleep(duration) => {}
        }
    }
}
