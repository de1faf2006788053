//! Shared mock executors and discovery sources for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use emailpilot_ai::types::{Message, NormalizedModel, Provider, Usage};
use emailpilot_ai::{
    Completion, ExecutionOptions, ModelDiscovery, OrchestratorError, ProviderExecutor, Result,
};

/// What a [`MockExecutor`] does when called.
#[derive(Clone)]
pub enum Behaviour {
    Reply(String),
    Fail(fn() -> OrchestratorError),
}

/// Executor that records its calls and answers from a fixed behaviour.
pub struct MockExecutor {
    provider: Provider,
    behaviour: Behaviour,
    calls: AtomicU32,
    models: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn replying(provider: Provider, text: &str) -> Self {
        Self::new(provider, Behaviour::Reply(text.to_string()))
    }

    pub fn failing(provider: Provider, error: fn() -> OrchestratorError) -> Self {
        Self::new(provider, Behaviour::Fail(error))
    }

    fn new(provider: Provider, behaviour: Behaviour) -> Self {
        Self {
            provider,
            behaviour,
            calls: AtomicU32::new(0),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Models requested so far, in call order.
    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderExecutor for MockExecutor {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(
        &self,
        _messages: &[Message],
        model: &str,
        _options: &ExecutionOptions,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.models.lock().unwrap().push(model.to_string());
        match &self.behaviour {
            Behaviour::Reply(text) => Ok(Completion {
                text: text.clone(),
                usage: Usage::new(10, 5),
                model: model.to_string(),
                warnings: Vec::new(),
                finish_reason: Some("stop".into()),
            }),
            Behaviour::Fail(error) => Err(error()),
        }
    }
}

pub fn server_error() -> OrchestratorError {
    OrchestratorError::Api {
        status: 500,
        message: "upstream exploded".into(),
    }
}

pub fn rate_limited() -> OrchestratorError {
    OrchestratorError::RateLimited { retry_after: None }
}

/// Discovery source returning a fixed model list and counting passes.
pub struct CountingSource {
    provider: Provider,
    ids: Vec<&'static str>,
    fail: bool,
    calls: AtomicU32,
}

impl CountingSource {
    pub fn new(provider: Provider, ids: Vec<&'static str>) -> Self {
        Self {
            provider,
            ids,
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing(provider: Provider) -> Self {
        Self {
            provider,
            ids: Vec::new(),
            fail: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelDiscovery for CountingSource {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn discover(&self) -> Result<Vec<NormalizedModel>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OrchestratorError::Http("connection refused".into()));
        }
        Ok(self
            .ids
            .iter()
            .map(|id| NormalizedModel::new(self.provider, *id, u32::MAX))
            .collect())
    }
}

pub fn user(text: &str) -> Vec<Message> {
    vec![Message::user(text)]
}
