//! Integration tests for workflow graph execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use relay_core::recipient::Recipient;
use relay_core::run::RunStatus;
use relay_core::step::StepStatus;
use relay_core::store::{MemoryRunStore, RunStore};
use relay_core::variable::{MemoryVariableStore, VariableStore, VariableValue};
use relay_runtime::WorkflowError;
use relay_runtime::definition::{ApiCallData, Workflow};
use relay_runtime::dispatcher::{ActionDispatcher, DispatchResult, RunContext};
use relay_runtime::executor::Executor;
use tokio::sync::Mutex;

/// Dispatcher that records every call and can be told to fail.
#[derive(Default)]
struct RecordingDispatcher {
    calls: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
}

impl RecordingDispatcher {
    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, entry: String) {
        self.calls.lock().await.push(entry);
    }

    fn outcome(&self) -> DispatchResult {
        if self.fail_sends.load(Ordering::SeqCst) {
            Err("delivery backend unavailable".into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
    async fn send_message(
        &self,
        _recipient: &Recipient,
        content: &str,
        _ctx: &RunContext,
    ) -> DispatchResult {
        self.record(format!("message:{content}")).await;
        self.outcome()
    }

    async fn send_template(
        &self,
        _recipient: &Recipient,
        template_id: &str,
        _variables: &HashMap<String, String>,
        _ctx: &RunContext,
    ) -> DispatchResult {
        self.record(format!("template:{template_id}")).await;
        self.outcome()
    }

    async fn send_form(
        &self,
        _recipient: &Recipient,
        form_id: &str,
        _ctx: &RunContext,
    ) -> DispatchResult {
        self.record(format!("form:{form_id}")).await;
        self.outcome()
    }

    async fn call_external(&self, config: &ApiCallData, _ctx: &RunContext) -> DispatchResult {
        self.record(format!("api:{}", config.url)).await;
        self.outcome()
    }

    async fn run_query(
        &self,
        query: &str,
        _ctx: &RunContext,
    ) -> DispatchResult<Option<VariableValue>> {
        self.record(format!("query:{query}")).await;
        Ok(Some(VariableValue::Text("42".into())))
    }
}

struct Harness {
    store: Arc<MemoryRunStore>,
    variables: Arc<MemoryVariableStore>,
    dispatcher: Arc<RecordingDispatcher>,
    executor: Executor,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryRunStore::new());
    let variables = Arc::new(MemoryVariableStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let executor = Executor::new(store.clone(), variables.clone(), dispatcher.clone());
    Harness {
        store,
        variables,
        dispatcher,
        executor,
    }
}

fn workflow(json: &str) -> Workflow {
    serde_json::from_str(json).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn single_path_completes_in_topological_order() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "m", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "hello"}},
                {"id": "e", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "m"},
                {"id": "e2", "source": "m", "target": "e"}
            ]
        }"#,
    );

    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.ended_at.is_some());

    let steps = h.store.steps_for_run(run.id).await.unwrap();
    assert_eq!(steps.len(), 3);
    let kinds: Vec<_> = steps.iter().map(|s| s.node_kind.as_str()).collect();
    assert_eq!(kinds, ["start", "sendMessage", "end"]);
    assert!(steps.iter().all(|s| s.status == StepStatus::Completed));

    assert_eq!(h.dispatcher.calls().await, ["message:hello"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_branches_join_at_both_ends() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "a", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "left"}},
                {"id": "b", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "right"}},
                {"id": "ea", "type": "end"},
                {"id": "eb", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "a"},
                {"id": "e2", "source": "s", "target": "b"},
                {"id": "e3", "source": "a", "target": "ea"},
                {"id": "e4", "source": "b", "target": "eb"}
            ]
        }"#,
    );

    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    // Both branches executed and both end nodes completed, regardless
    // of which branch finished first.
    let steps = h.store.steps_for_run(run.id).await.unwrap();
    assert_eq!(steps.len(), 5);
    assert_eq!(h.store.count_completed(run.id, "end").await.unwrap(), 2);

    let mut calls = h.dispatcher.calls().await;
    calls.sort();
    assert_eq!(calls, ["message:left", "message:right"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn wait_reply_suspends_and_resume_continues() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "w", "type": "waitReply", "data": {"variable": "answer"}},
                {"id": "m", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "thanks"}},
                {"id": "e", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "w"},
                {"id": "e2", "source": "w", "target": "m"},
                {"id": "e3", "source": "m", "target": "e"}
            ]
        }"#,
    );

    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(run.status, RunStatus::Waiting);

    // The waiting step is the suspend point; nothing beyond it exists.
    let steps = h.store.steps_for_run(run.id).await.unwrap();
    assert_eq!(steps.len(), 2);
    let waiting = steps.last().unwrap();
    assert_eq!(waiting.status, StepStatus::Waiting);
    assert_eq!(run.current_step, waiting.step_index);
    assert!(h.dispatcher.calls().await.is_empty());

    let resumed = h
        .executor
        .resume(run.id, &wf, Some(VariableValue::from("yes")))
        .await
        .unwrap();
    assert_eq!(resumed.status, RunStatus::Completed);

    assert_eq!(
        h.variables.get(run.id, "answer").await.unwrap(),
        Some(VariableValue::Text("yes".into()))
    );
    assert_eq!(h.dispatcher.calls().await, ["message:thanks"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn resume_without_waiting_step_fails() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [{"id": "s", "type": "start"}, {"id": "e", "type": "end"}],
            "edges": [{"id": "e1", "source": "s", "target": "e"}]
        }"#,
    );

    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(h.executor.resume(run.id, &wf, None).await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_routes_by_variable() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "sw", "type": "switch",
                 "data": {"groups": [
                     {"id": "g1", "relation": "AND",
                      "conditions": [{"variableName": "tier", "operator": "equals", "value": "vip"}],
                      "outputPath": "vip"}
                 ],
                 "defaultPath": "standard"}},
                {"id": "vip_msg", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "vip"}},
                {"id": "std_msg", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "standard"}},
                {"id": "e1n", "type": "end"},
                {"id": "e2n", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "sw"},
                {"id": "e2", "source": "sw", "target": "vip_msg", "sourceHandle": "vip"},
                {"id": "e3", "source": "sw", "target": "std_msg", "sourceHandle": "standard"},
                {"id": "e4", "source": "vip_msg", "target": "e1n"},
                {"id": "e5", "source": "std_msg", "target": "e2n"}
            ]
        }"#,
    );

    // The run takes only one branch, so only that branch's end node
    // completes; the run stays Running by the join-barrier rule.
    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(h.dispatcher.calls().await, ["message:standard"]);
    assert_eq!(run.status, RunStatus::Running);
    assert_eq!(h.store.count_completed(run.id, "end").await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_node_type_is_visible_but_not_fatal() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "x", "type": "teleport", "data": {"dest": "moon"}},
                {"id": "e", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "x"},
                {"id": "e2", "source": "x", "target": "e"}
            ]
        }"#,
    );

    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    let steps = h.store.steps_for_run(run.id).await.unwrap();
    let unknown = steps.iter().find(|s| s.node_kind == "teleport").unwrap();
    assert_eq!(unknown.status, StepStatus::UnknownStepType);
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_failure_does_not_abort_traversal() {
    let h = harness();
    h.dispatcher.fail_sends.store(true, Ordering::SeqCst);
    let wf = workflow(
        r#"{
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "m", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "hello"}},
                {"id": "e", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "m"},
                {"id": "e2", "source": "m", "target": "e"}
            ]
        }"#,
    );

    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn workflow_without_start_completes_without_steps() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [{"id": "e", "type": "end"}],
            "edges": []
        }"#,
    );

    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.ended_at.is_some());
    assert!(h.store.steps_for_run(run.id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn cyclic_workflow_is_rejected_before_traversal() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "m", "type": "sendMessage",
                 "data": {"recipient": {"kind": "initiator"}, "content": "again"}},
                {"id": "e", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "m"},
                {"id": "e2", "source": "m", "target": "e"},
                {"id": "e3", "source": "e", "target": "m"}
            ]
        }"#,
    );

    assert!(matches!(
        h.executor.start(&wf).await,
        Err(WorkflowError::InvalidDefinition(_))
    ));
    assert!(h.dispatcher.calls().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn query_result_lands_in_output_variable() {
    let h = harness();
    let wf = workflow(
        r#"{
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "q", "type": "dbQuery",
                 "data": {"query": "count open tickets", "outputVariable": "tickets"}},
                {"id": "e", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "q"},
                {"id": "e2", "source": "q", "target": "e"}
            ]
        }"#,
    );

    let run = h.executor.start(&wf).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(
        h.variables.get(run.id, "tickets").await.unwrap(),
        Some(VariableValue::Text("42".into()))
    );
}
