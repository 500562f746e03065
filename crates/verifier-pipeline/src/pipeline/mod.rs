//! Proof pipeline runner
//!
//! A run moves strictly forward through `Idle -> Proving -> Encoding -> Calling` and ends in
//! `Succeeded` or `Failed(stage, reason)`. Nothing is retried: the verifier call may broadcast a
//! transaction, and a second attempt could submit it twice. Retry policy belongs to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use proof_codec::VerifierCalldata;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::client::VerifierClient;
use crate::config::EnvironmentConfig;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::proof_system::{CircuitInputs, ProofBackend, ProverOutput};

pub mod cancel;
pub mod result;

pub use cancel::CancelHandle;
pub use result::{PipelineRunResult, RunOutcome, Stage};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

fn next_run_id() -> u64 {
    NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed)
}

/// RunState is the position of a run in the pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Proving,
    Encoding,
    Calling,
    Succeeded,
    Failed { stage: Stage, kind: ErrorKind },
}

impl RunState {
    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Proving => 1,
            Self::Encoding => 2,
            Self::Calling => 3,
            Self::Succeeded | Self::Failed { .. } => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

impl From<Stage> for RunState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Proving => Self::Proving,
            Stage::Encoding => Self::Encoding,
            Stage::Calling => Self::Calling,
        }
    }
}

/// RunTracker owns the state of one run and turns it into a result when the run ends.
struct RunTracker {
    run_id: u64,
    started_at: DateTime<Utc>,
    state: RunState,
}

impl RunTracker {
    fn start() -> Self {
        Self {
            run_id: next_run_id(),
            started_at: Utc::now(),
            state: RunState::Idle,
        }
    }

    fn enter(&mut self, stage: Stage) {
        let next = RunState::from(stage);
        debug_assert!(next.rank() > self.state.rank(), "{:?} -> {next:?} is not forward", self.state);
        info!(run_id = self.run_id, %stage, "entering stage");
        self.state = next;
    }

    fn current_stage(&self) -> Stage {
        match self.state {
            RunState::Encoding => Stage::Encoding,
            RunState::Calling => Stage::Calling,
            RunState::Failed { stage, .. } => stage,
            _ => Stage::Proving,
        }
    }

    fn succeed(mut self, valid: bool) -> PipelineRunResult {
        self.state = RunState::Succeeded;
        info!(run_id = self.run_id, valid, "run completed");
        PipelineRunResult::verified(self.run_id, self.started_at, valid)
    }

    fn fail(mut self, err: PipelineError) -> PipelineRunResult {
        let stage = self.current_stage();
        self.state = RunState::Failed { stage, kind: err.kind() };
        warn!(run_id = self.run_id, %stage, kind = %err.kind(), "run failed: {err}");
        PipelineRunResult::failed(self.run_id, self.started_at, stage, &err)
    }
}

/// ProofPipelineRunner sequences proving, encoding and the verifier call.
pub struct ProofPipelineRunner {
    backend: Arc<dyn ProofBackend>,
    call_timeout: Duration,
}

impl ProofPipelineRunner {
    /// Create a runner bounding each external call by `call_timeout`.
    pub fn new(backend: Arc<dyn ProofBackend>, call_timeout: Duration) -> Self {
        Self { backend, call_timeout }
    }

    pub fn from_config(backend: Arc<dyn ProofBackend>, config: &EnvironmentConfig) -> Self {
        Self::new(backend, config.call_timeout)
    }

    /// Runs the pipeline once against `verifier`.
    ///
    /// Never returns an error: every failure is recorded in the result together with the stage
    /// it happened in, and stops the run.
    pub async fn run(&self, inputs: &CircuitInputs, verifier: &dyn VerifierClient) -> PipelineRunResult {
        self.run_with_cancel(inputs, verifier, &CancelHandle::new()).await
    }

    /// Like [`ProofPipelineRunner::run`], stopping early if `cancel` fires before the call stage.
    pub async fn run_with_cancel(
        &self,
        inputs: &CircuitInputs,
        verifier: &dyn VerifierClient,
        cancel: &CancelHandle,
    ) -> PipelineRunResult {
        let mut run = RunTracker::start();

        run.enter(Stage::Proving);
        let output = match self.prove(inputs, cancel).await {
            Ok(output) => output,
            Err(e) => return run.fail(e),
        };

        run.enter(Stage::Encoding);
        if cancel.is_cancelled() {
            return run.fail(PipelineError::Cancelled);
        }
        let calldata = match encode(output) {
            Ok(calldata) => calldata,
            Err(e) => return run.fail(e),
        };
        // last point where cancellation is honoured
        if cancel.is_cancelled() {
            return run.fail(PipelineError::Cancelled);
        }

        run.enter(Stage::Calling);
        match self.call(verifier, &calldata).await {
            Ok(valid) => run.succeed(valid),
            Err(e) => run.fail(e),
        }
    }

    /// Runs independent pipelines concurrently, at most `concurrency` at a time.
    ///
    /// Runs share only the backend and the verifier client. Results are returned in job order.
    pub async fn run_batch(
        self: Arc<Self>,
        jobs: Vec<CircuitInputs>,
        verifier: Arc<dyn VerifierClient>,
        concurrency: usize,
        cancel: CancelHandle,
    ) -> Vec<PipelineRunResult> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        info!("starting batch of {} runs, concurrency {}", jobs.len(), concurrency.max(1));

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|inputs| {
                let runner = Arc::clone(&self);
                let verifier = Arc::clone(&verifier);
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    runner.run_with_cancel(&inputs, verifier.as_ref(), &cancel).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => results.push(RunTracker::start().fail(PipelineError::Cancelled)),
            }
        }
        results
    }

    async fn prove(&self, inputs: &CircuitInputs, cancel: &CancelHandle) -> Result<ProverOutput> {
        let timeout = self.call_timeout;
        debug!("proving with {} backend", self.backend.kind());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            res = tokio::time::timeout(timeout, self.backend.prove(inputs)) => match res {
                Ok(output) => output,
                Err(_) => Err(PipelineError::Network(format!("prover did not finish within {timeout:?}"))),
            },
        }
    }

    async fn call(&self, verifier: &dyn VerifierClient, calldata: &VerifierCalldata) -> Result<bool> {
        let timeout = self.call_timeout;
        debug!("submitting proof in {} mode", verifier.call_mode());
        match tokio::time::timeout(timeout, verifier.verify(calldata)).await {
            Ok(res) => res,
            Err(_) => Err(PipelineError::Network(format!("verifier call did not finish within {timeout:?}"))),
        }
    }
}

fn encode(output: ProverOutput) -> Result<VerifierCalldata> {
    let (proof, public_inputs) = output.into_parts()?;
    debug!("encoding {} proof bytes and {} public inputs", proof.len(), public_inputs.len());
    Ok(VerifierCalldata::new(&proof, &public_inputs)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_moves_forward() {
        let mut run = RunTracker::start();
        assert_eq!(run.state, RunState::Idle);
        run.enter(Stage::Proving);
        run.enter(Stage::Encoding);
        assert_eq!(run.current_stage(), Stage::Encoding);
        run.enter(Stage::Calling);
        let result = run.succeed(true);
        assert_eq!(result.verified_result(), Some(true));
    }

    #[test]
    #[should_panic(expected = "is not forward")]
    #[cfg(debug_assertions)]
    fn test_tracker_rejects_backward_transition() {
        let mut run = RunTracker::start();
        run.enter(Stage::Encoding);
        run.enter(Stage::Proving);
    }

    #[test]
    fn test_failure_is_attributed_to_current_stage() {
        let mut run = RunTracker::start();
        run.enter(Stage::Proving);
        run.enter(Stage::Encoding);
        let result = run.fail(PipelineError::Cancelled);
        assert_eq!(result.stage(), Stage::Encoding);
        assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunTracker::start();
        let b = RunTracker::start();
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Succeeded.is_terminal());
        assert!(RunState::Failed {
            stage: Stage::Calling,
            kind: ErrorKind::Revert
        }
        .is_terminal());
        assert!(!RunState::Calling.is_terminal());
    }
}
