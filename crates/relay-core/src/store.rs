//! Run and step persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::Mutex;

use crate::error::{CoreError, Result};
use crate::id::{RunId, StepId};
use crate::run::{ExecutionRun, RunStatus};
use crate::step::{StepExecution, StepStatus};

/// Persistence for execution runs and their steps.
///
/// Shared mutable state between the graph executor and the background
/// monitor. The `claim_*` operations persist their flag or counter and
/// report whether the caller won *before* any dispatch side effect is
/// performed, so overlapping monitor ticks cannot double-fire.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persists a new run.
    async fn create_run(&self, run: ExecutionRun) -> Result<()>;

    /// Returns a run by ID.
    async fn get_run(&self, run_id: RunId) -> Result<ExecutionRun>;

    /// Overwrites a run record.
    async fn update_run(&self, run: ExecutionRun) -> Result<()>;

    /// Persists a new step.
    async fn create_step(&self, step: StepExecution) -> Result<()>;

    /// Overwrites a step record.
    async fn update_step(&self, step: StepExecution) -> Result<()>;

    /// Returns all steps of a run, ordered by step index.
    async fn steps_for_run(&self, run_id: RunId) -> Result<Vec<StepExecution>>;

    /// Counts completed steps of a run with the given node kind.
    async fn count_completed(&self, run_id: RunId, node_kind: &str) -> Result<usize>;

    /// Returns the waiting step of a run, if any.
    async fn find_waiting_step(&self, run_id: RunId) -> Result<Option<StepExecution>>;

    /// Returns all waiting steps across runs.
    async fn list_waiting_steps(&self) -> Result<Vec<StepExecution>>;

    /// Returns all runs with the given status.
    async fn list_runs_by_status(&self, status: RunStatus) -> Result<Vec<ExecutionRun>>;

    /// Claims the next retry for a waiting step.
    ///
    /// Wins only if the step is still `Waiting` and its retry count
    /// still equals `expected_retry_count`; on a win the counter is
    /// incremented and `last_retry_at` set, durably, before returning.
    async fn claim_retry(
        &self,
        step_id: StepId,
        expected_retry_count: u32,
        now: Timestamp,
    ) -> Result<bool>;

    /// Claims the one-time escalation for a waiting step.
    ///
    /// Wins only if the escalation has not fired yet.
    async fn claim_escalation(&self, step_id: StepId, now: Timestamp) -> Result<bool>;

    /// Claims the one-time overdue notification for a running run.
    ///
    /// Wins only if the run is still `Running` and not yet notified.
    async fn claim_overdue(
        &self,
        run_id: RunId,
        threshold_minutes: i64,
        now: Timestamp,
    ) -> Result<bool>;
}

#[derive(Debug, Default)]
struct MemoryState {
    runs: HashMap<RunId, ExecutionRun>,
    steps: HashMap<StepId, StepExecution>,
}

/// In-memory run store.
///
/// Reference implementation used for tests and single-process hosts.
/// A single mutex over runs and steps makes every claim operation
/// atomic with respect to concurrent callers.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    state: Mutex<MemoryState>,
}

impl MemoryRunStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create_run(&self, run: ExecutionRun) -> Result<()> {
        let mut state = self.state.lock().await;
        state.runs.insert(run.id, run);
        Ok(())
    }

    async fn get_run(&self, run_id: RunId) -> Result<ExecutionRun> {
        let state = self.state.lock().await;
        state
            .runs
            .get(&run_id)
            .cloned()
            .ok_or(CoreError::RunNotFound(run_id))
    }

    async fn update_run(&self, run: ExecutionRun) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.runs.contains_key(&run.id) {
            return Err(CoreError::RunNotFound(run.id));
        }
        state.runs.insert(run.id, run);
        Ok(())
    }

    async fn create_step(&self, step: StepExecution) -> Result<()> {
        let mut state = self.state.lock().await;
        state.steps.insert(step.id, step);
        Ok(())
    }

    async fn update_step(&self, step: StepExecution) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.steps.contains_key(&step.id) {
            return Err(CoreError::StepNotFound(step.id));
        }
        state.steps.insert(step.id, step);
        Ok(())
    }

    async fn steps_for_run(&self, run_id: RunId) -> Result<Vec<StepExecution>> {
        let state = self.state.lock().await;
        let mut steps: Vec<_> = state
            .steps
            .values()
            .filter(|step| step.run_id == run_id)
            .cloned()
            .collect();
        steps.sort_by_key(|step| step.step_index);
        Ok(steps)
    }

    async fn count_completed(&self, run_id: RunId, node_kind: &str) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state
            .steps
            .values()
            .filter(|step| {
                step.run_id == run_id
                    && step.node_kind == node_kind
                    && step.status == StepStatus::Completed
            })
            .count())
    }

    async fn find_waiting_step(&self, run_id: RunId) -> Result<Option<StepExecution>> {
        let state = self.state.lock().await;
        Ok(state
            .steps
            .values()
            .find(|step| step.run_id == run_id && step.status == StepStatus::Waiting)
            .cloned())
    }

    async fn list_waiting_steps(&self) -> Result<Vec<StepExecution>> {
        let state = self.state.lock().await;
        Ok(state
            .steps
            .values()
            .filter(|step| step.status == StepStatus::Waiting)
            .cloned()
            .collect())
    }

    async fn list_runs_by_status(&self, status: RunStatus) -> Result<Vec<ExecutionRun>> {
        let state = self.state.lock().await;
        Ok(state
            .runs
            .values()
            .filter(|run| run.status == status)
            .cloned()
            .collect())
    }

    async fn claim_retry(
        &self,
        step_id: StepId,
        expected_retry_count: u32,
        now: Timestamp,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let step = state
            .steps
            .get_mut(&step_id)
            .ok_or(CoreError::StepNotFound(step_id))?;

        if step.status != StepStatus::Waiting || step.retry_count != expected_retry_count {
            return Ok(false);
        }

        step.retry_count += 1;
        step.last_retry_at = Some(now);
        Ok(true)
    }

    async fn claim_escalation(&self, step_id: StepId, now: Timestamp) -> Result<bool> {
        let mut state = self.state.lock().await;
        let step = state
            .steps
            .get_mut(&step_id)
            .ok_or(CoreError::StepNotFound(step_id))?;

        if step.status != StepStatus::Waiting || step.escalation_sent {
            return Ok(false);
        }

        step.escalation_sent = true;
        step.escalation_sent_at = Some(now);
        Ok(true)
    }

    async fn claim_overdue(
        &self,
        run_id: RunId,
        threshold_minutes: i64,
        now: Timestamp,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .get_mut(&run_id)
            .ok_or(CoreError::RunNotFound(run_id))?;

        if run.status != RunStatus::Running || run.overdue_notified {
            return Ok(false);
        }

        run.overdue_notified = true;
        run.overdue_notified_at = Some(now);
        run.overdue_threshold_minutes = Some(threshold_minutes);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn sample_run() -> ExecutionRun {
        ExecutionRun::new(Uuid::nil(), Timestamp::UNIX_EPOCH)
    }

    #[tokio::test]
    async fn test_run_roundtrip() {
        let store = MemoryRunStore::new();
        let run = sample_run();
        let run_id = run.id;

        store.create_run(run.clone()).await.unwrap();
        assert_eq!(store.get_run(run_id).await.unwrap(), run);

        assert!(matches!(
            store.get_run(RunId::new()).await,
            Err(CoreError::RunNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_claim_retry_is_single_winner() {
        let store = MemoryRunStore::new();
        let run = sample_run();
        let mut step = StepExecution::new(run.id, 0, "n1", "waitReply", Timestamp::UNIX_EPOCH);
        step.status = StepStatus::Waiting;
        let step_id = step.id;

        store.create_run(run).await.unwrap();
        store.create_step(step).await.unwrap();

        let now = Timestamp::UNIX_EPOCH;
        // Two callers race on the same expected count; one wins.
        assert!(store.claim_retry(step_id, 0, now).await.unwrap());
        assert!(!store.claim_retry(step_id, 0, now).await.unwrap());
        // Next threshold crossing claims the incremented count.
        assert!(store.claim_retry(step_id, 1, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_escalation_once() {
        let store = MemoryRunStore::new();
        let run = sample_run();
        let mut step = StepExecution::new(run.id, 0, "n1", "waitReply", Timestamp::UNIX_EPOCH);
        step.status = StepStatus::Waiting;
        let step_id = step.id;

        store.create_run(run).await.unwrap();
        store.create_step(step).await.unwrap();

        assert!(
            store
                .claim_escalation(step_id, Timestamp::UNIX_EPOCH)
                .await
                .unwrap()
        );
        assert!(
            !store
                .claim_escalation(step_id, Timestamp::UNIX_EPOCH)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_claim_overdue_once() {
        let store = MemoryRunStore::new();
        let run = sample_run();
        let run_id = run.id;
        store.create_run(run).await.unwrap();

        assert!(
            store
                .claim_overdue(run_id, 60, Timestamp::UNIX_EPOCH)
                .await
                .unwrap()
        );
        assert!(
            !store
                .claim_overdue(run_id, 60, Timestamp::UNIX_EPOCH)
                .await
                .unwrap()
        );

        let run = store.get_run(run_id).await.unwrap();
        assert!(run.overdue_notified);
        assert_eq!(run.overdue_threshold_minutes, Some(60));
    }

    #[tokio::test]
    async fn test_count_completed_filters_kind_and_status() {
        let store = MemoryRunStore::new();
        let run = sample_run();
        let run_id = run.id;
        store.create_run(run).await.unwrap();

        let mut end_done = StepExecution::new(run_id, 1, "e1", "end", Timestamp::UNIX_EPOCH);
        end_done.complete(Timestamp::UNIX_EPOCH);
        let end_running = StepExecution::new(run_id, 2, "e2", "end", Timestamp::UNIX_EPOCH);
        let mut other = StepExecution::new(run_id, 3, "m1", "sendMessage", Timestamp::UNIX_EPOCH);
        other.complete(Timestamp::UNIX_EPOCH);

        store.create_step(end_done).await.unwrap();
        store.create_step(end_running).await.unwrap();
        store.create_step(other).await.unwrap();

        assert_eq!(store.count_completed(run_id, "end").await.unwrap(), 1);
    }
}
