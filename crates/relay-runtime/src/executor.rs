//! Workflow graph executor.
//!
//! Walks a compiled [`RunGraph`] from its start node, dispatching node
//! side effects through the host [`ActionDispatcher`]. Sibling branches
//! fan out into concurrent tasks; wait-reply nodes suspend the run; end
//! nodes form the join barrier that completes it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use futures::future::BoxFuture;
use jiff::Timestamp;
use relay_core::run::{ExecutionRun, RunStatus};
use relay_core::step::{StepExecution, StepStatus};
use relay_core::store::RunStore;
use relay_core::variable::{VariableStore, VariableValue};
use relay_core::RunId;

use crate::condition::ConditionEvaluator;
use crate::definition::{Node, NodeKind, NodeRef, Workflow};
use crate::dispatcher::{ActionDispatcher, RunContext};
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::RunGraph;

/// Tracing target for executor operations.
const TRACING_TARGET: &str = "relay_runtime::executor";

/// The workflow graph executor.
///
/// Cheap to clone; clones share the same stores and dispatcher.
#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn RunStore>,
    variables: Arc<dyn VariableStore>,
    dispatcher: Arc<dyn ActionDispatcher>,
    evaluator: ConditionEvaluator,
}

impl Executor {
    /// Creates a new executor over the given collaborators.
    pub fn new(
        store: Arc<dyn RunStore>,
        variables: Arc<dyn VariableStore>,
        dispatcher: Arc<dyn ActionDispatcher>,
    ) -> Self {
        let evaluator = ConditionEvaluator::new(variables.clone());
        Self {
            store,
            variables,
            dispatcher,
            evaluator,
        }
    }

    /// Starts a new run of a workflow and executes it until it reaches
    /// `Completed`, `Waiting`, or `Error`.
    ///
    /// A workflow without a start node is a no-op: the run is created
    /// and immediately completed without visiting any node.
    pub async fn start(&self, workflow: &Workflow) -> WorkflowResult<ExecutionRun> {
        let graph = Arc::new(RunGraph::compile(workflow)?);
        let run = ExecutionRun::new(workflow.id, Timestamp::now());
        let run_id = run.id;
        self.store.create_run(run).await?;

        let Some(start) = graph.start_node() else {
            tracing::warn!(
                target: TRACING_TARGET,
                run_id = %run_id,
                "Workflow has no start node; nothing to execute"
            );
            let mut run = self.store.get_run(run_id).await?;
            run.complete(Timestamp::now());
            self.store.update_run(run).await?;
            return Ok(self.store.get_run(run_id).await?);
        };

        tracing::debug!(
            target: TRACING_TARGET,
            run_id = %run_id,
            node_count = graph.node_count(),
            "Starting workflow execution"
        );

        let start_ref = start.id.clone();
        let counter = Arc::new(AtomicU32::new(0));
        let outcome = visit(self.clone(), graph, run_id, start_ref, counter).await;
        self.record_outcome(run_id, outcome).await
    }

    /// Resumes a run suspended on a wait-reply node.
    ///
    /// Stores the reply into the node's target variable, completes the
    /// waiting step, and re-enters traversal at its successors.
    pub async fn resume(
        &self,
        run_id: RunId,
        workflow: &Workflow,
        reply: Option<VariableValue>,
    ) -> WorkflowResult<ExecutionRun> {
        let graph = Arc::new(RunGraph::compile(workflow)?);

        let mut step = self
            .store
            .find_waiting_step(run_id)
            .await?
            .ok_or(WorkflowError::NothingToResume(run_id))?;
        let node_ref = NodeRef::new(step.node_ref.clone());

        if let Some(reply) = reply {
            if let Some(Node {
                kind: NodeKind::WaitReply(data),
                ..
            }) = graph.node(&node_ref)
            {
                if let Some(variable) = &data.variable {
                    self.variables.set(run_id, variable, reply).await?;
                }
            }
        }

        let now = Timestamp::now();
        step.complete(now);
        self.store.update_step(step).await?;

        let mut run = self.store.get_run(run_id).await?;
        run.status = RunStatus::Running;
        self.store.update_run(run).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            run_id = %run_id,
            node = %node_ref,
            "Resuming workflow execution"
        );

        let existing = self.store.steps_for_run(run_id).await?.len() as u32;
        let counter = Arc::new(AtomicU32::new(existing));
        let successors = graph.successors(&node_ref);
        let outcome =
            visit_successors(self.clone(), graph, run_id, successors, counter).await;
        self.record_outcome(run_id, outcome).await
    }

    /// Records a traversal outcome on the run and returns its final state.
    async fn record_outcome(
        &self,
        run_id: RunId,
        outcome: WorkflowResult<()>,
    ) -> WorkflowResult<ExecutionRun> {
        if let Err(err) = outcome {
            tracing::error!(
                target: TRACING_TARGET,
                run_id = %run_id,
                error = %err,
                "Workflow traversal failed"
            );
            let mut run = self.store.get_run(run_id).await?;
            run.fail(Timestamp::now(), err.to_string());
            self.store.update_run(run).await?;
        }
        Ok(self.store.get_run(run_id).await?)
    }

    /// Dispatches a side-effecting node's action.
    ///
    /// Missing required fields are logged and skipped; dispatch
    /// failures are logged. Neither aborts traversal.
    async fn perform_action(&self, node: &Node, ctx: &RunContext) {
        let result = match &node.kind {
            NodeKind::SendMessage(data) => {
                if data.content.is_empty() {
                    self.skip_misconfigured(node, "content is empty", ctx);
                    return;
                }
                self.dispatcher
                    .send_message(&data.recipient, &data.content, ctx)
                    .await
            }
            NodeKind::SendTemplate(data) => {
                if data.template_id.is_empty() {
                    self.skip_misconfigured(node, "templateId is empty", ctx);
                    return;
                }
                self.dispatcher
                    .send_template(&data.recipient, &data.template_id, &data.variables, ctx)
                    .await
            }
            NodeKind::SendForm(data) => {
                if data.form_id.is_empty() {
                    self.skip_misconfigured(node, "formId is empty", ctx);
                    return;
                }
                self.dispatcher
                    .send_form(&data.recipient, &data.form_id, ctx)
                    .await
            }
            NodeKind::CallApi(data) => {
                if data.url.is_empty() {
                    self.skip_misconfigured(node, "url is empty", ctx);
                    return;
                }
                self.dispatcher.call_external(data, ctx).await
            }
            NodeKind::DbQuery(data) => {
                if data.query.is_empty() {
                    self.skip_misconfigured(node, "query is empty", ctx);
                    return;
                }
                match self.dispatcher.run_query(&data.query, ctx).await {
                    Ok(Some(value)) => {
                        if let Some(output) = &data.output_variable {
                            if let Err(err) =
                                self.variables.set(ctx.run_id, output, value).await
                            {
                                tracing::warn!(
                                    target: TRACING_TARGET,
                                    run_id = %ctx.run_id,
                                    node = %ctx.node_ref,
                                    error = %err,
                                    "Failed to store query result"
                                );
                            }
                        }
                        Ok(())
                    }
                    Ok(None) => Ok(()),
                    Err(err) => Err(err),
                }
            }
            _ => return,
        };

        if let Err(err) = result {
            tracing::warn!(
                target: TRACING_TARGET,
                run_id = %ctx.run_id,
                node = %ctx.node_ref,
                kind = %ctx.node_kind,
                error = %err,
                "Action dispatch failed; traversal continues"
            );
        }
    }

    fn skip_misconfigured(&self, node: &Node, reason: &str, ctx: &RunContext) {
        tracing::warn!(
            target: TRACING_TARGET,
            run_id = %ctx.run_id,
            node = %node.id,
            kind = %node.kind_name(),
            reason,
            "Node config incomplete; action skipped"
        );
    }
}

/// Visits one node and recurses into its successors.
///
/// Boxed because the recursion crosses spawned tasks on fan-out.
fn visit(
    executor: Executor,
    graph: Arc<RunGraph>,
    run_id: RunId,
    node_ref: NodeRef,
    counter: Arc<AtomicU32>,
) -> BoxFuture<'static, WorkflowResult<()>> {
    Box::pin(async move {
        let node = graph
            .node(&node_ref)
            .ok_or_else(|| {
                WorkflowError::Internal(format!("node {node_ref} missing from compiled graph"))
            })?
            .clone();

        let step_index = counter.fetch_add(1, Ordering::SeqCst);
        let now = Timestamp::now();
        let mut step = StepExecution::new(
            run_id,
            step_index,
            node_ref.as_str(),
            node.kind_name(),
            now,
        );
        let ctx = RunContext {
            run_id,
            step_id: step.id,
            node_ref: node_ref.to_string(),
            node_kind: node.kind_name().to_owned(),
        };

        tracing::trace!(
            target: TRACING_TARGET,
            run_id = %run_id,
            node = %node_ref,
            kind = %node.kind_name(),
            step_index,
            "Visiting node"
        );

        let successors = match &node.kind {
            NodeKind::Start(_) => {
                step.complete(now);
                executor.store.create_step(step).await?;
                graph.successors(&node_ref)
            }

            NodeKind::SendMessage(_)
            | NodeKind::SendTemplate(_)
            | NodeKind::SendForm(_)
            | NodeKind::DbQuery(_)
            | NodeKind::CallApi(_) => {
                executor.store.create_step(step.clone()).await?;
                executor.perform_action(&node, &ctx).await;
                step.complete(Timestamp::now());
                executor.store.update_step(step).await?;
                graph.successors(&node_ref)
            }

            NodeKind::WaitReply(data) => {
                step.status = StepStatus::Waiting;
                step.validation = data.validation.clone();
                step.waiting_for = data.waiting_for.clone();
                executor.store.create_step(step).await?;

                let mut run = executor.store.get_run(run_id).await?;
                run.status = RunStatus::Waiting;
                run.current_step = step_index;
                executor.store.update_run(run).await?;

                tracing::debug!(
                    target: TRACING_TARGET,
                    run_id = %run_id,
                    node = %node_ref,
                    step_index,
                    "Run suspended awaiting reply"
                );
                // The suspension point: no successors are visited.
                return Ok(());
            }

            NodeKind::Switch(data) => {
                let selected = executor
                    .evaluator
                    .select_path(run_id, &data.groups, data.default_path.as_deref())
                    .await
                    .map(str::to_owned);
                step.complete(Timestamp::now());
                executor.store.create_step(step).await?;

                match selected {
                    Some(path) => {
                        tracing::debug!(
                            target: TRACING_TARGET,
                            run_id = %run_id,
                            node = %node_ref,
                            path = %path,
                            "Switch selected path"
                        );
                        graph.successors_on_path(&node_ref, &path)
                    }
                    None => {
                        tracing::debug!(
                            target: TRACING_TARGET,
                            run_id = %run_id,
                            node = %node_ref,
                            "Switch matched no group and has no default path"
                        );
                        Vec::new()
                    }
                }
            }

            NodeKind::End => {
                step.complete(now);
                executor.store.create_step(step).await?;

                let completed = executor.store.count_completed(run_id, "end").await?;
                let total = graph.end_count();
                if completed >= total {
                    let mut run = executor.store.get_run(run_id).await?;
                    if run.status == RunStatus::Running {
                        run.complete(Timestamp::now());
                        executor.store.update_run(run).await?;
                        tracing::debug!(
                            target: TRACING_TARGET,
                            run_id = %run_id,
                            end_nodes = total,
                            "All end nodes completed; run finished"
                        );
                    }
                }
                graph.successors(&node_ref)
            }

            NodeKind::Unknown { type_name } => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    run_id = %run_id,
                    node = %node_ref,
                    kind = %type_name,
                    "Unknown node type; continuing to successors"
                );
                step.status = StepStatus::UnknownStepType;
                step.ended_at = Some(now);
                executor.store.create_step(step).await?;
                graph.successors(&node_ref)
            }
        };

        visit_successors(executor, graph, run_id, successors, counter).await
    })
}

/// Dispatches traversal into successor nodes.
///
/// Zero successors ends the branch silently. A single successor is
/// visited inline. Multiple successors fan out into one task each and
/// this frame waits for all of them; run completion itself is decided
/// by the end-node join barrier, not by this join.
async fn visit_successors(
    executor: Executor,
    graph: Arc<RunGraph>,
    run_id: RunId,
    successors: Vec<NodeRef>,
    counter: Arc<AtomicU32>,
) -> WorkflowResult<()> {
    if successors.len() == 1 {
        let mut successors = successors;
        let next = match successors.pop() {
            Some(next) => next,
            None => return Ok(()),
        };
        return visit(executor, graph, run_id, next, counter).await;
    }

    let mut handles = Vec::with_capacity(successors.len());
    for next in successors {
        handles.push(tokio::spawn(visit(
            executor.clone(),
            graph.clone(),
            run_id,
            next,
            counter.clone(),
        )));
    }

    let mut first_error = None;
    for handle in handles {
        let joined = handle
            .await
            .map_err(|err| WorkflowError::Internal(format!("branch task failed: {err}")))?;
        if let Err(err) = joined {
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
