//! Recording mocks shared by the check tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use relay_core::Result as CoreResult;
use relay_core::id::RunId;
use relay_core::recipient::{Recipient, RecipientResolver, ResolvedTarget};
use tokio::sync::Mutex;

use crate::host::{HostResult, MessageSender};

/// A sent message captured by [`RecordingSender`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SentMessage {
    pub address: String,
    pub content: String,
}

/// Records every send; optionally fails all sends.
#[derive(Debug, Default)]
pub(crate) struct RecordingSender {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl RecordingSender {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub(crate) async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, target: &ResolvedTarget, content: &str) -> HostResult {
        if self.fail.load(Ordering::SeqCst) {
            return Err("send rejected".into());
        }
        self.sent.lock().await.push(SentMessage {
            address: target.address.clone(),
            content: content.to_owned(),
        });
        Ok(())
    }
}

/// Resolves every recipient to a single fixed address.
#[derive(Debug)]
pub(crate) struct StaticResolver {
    address: String,
}

impl StaticResolver {
    pub(crate) fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl RecipientResolver for StaticResolver {
    async fn resolve(
        &self,
        _run_id: RunId,
        _recipient: &Recipient,
    ) -> CoreResult<Vec<ResolvedTarget>> {
        Ok(vec![ResolvedTarget::new(self.address.clone())])
    }
}
