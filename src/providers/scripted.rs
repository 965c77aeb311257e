//! Offline provider that replays queued results.
//!
//! Used by tests and the demo to exercise retry, timeout and fallback paths
//! without network access.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{ProviderError, ResponseProvider};

/// Replays a queue of replies and errors in order.
///
/// Clones share the queue and the call log, so a test can keep a handle
/// after moving the provider into an orchestrator. Once the queue runs dry
/// every call fails with [`ProviderError::Transport`].
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    name: String,
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    /// Latency added before every call resolves.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push(&self, result: Result<String, ProviderError>) {
        lock(&self.script).push_back(result);
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Every prompt received, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.prompts).last().cloned()
    }
}

#[async_trait]
impl ResponseProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_response(&self, prompt: &str) -> Result<String, ProviderError> {
        lock(&self.prompts).push(prompt.to_string());
        let next = lock(&self.script).pop_front();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        next.unwrap_or_else(|| Err(ProviderError::Transport("script exhausted".to_string())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
