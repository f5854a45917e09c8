//! Test doubles shared by the pipeline, batch, job and router tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{LlmError, ModelClient, ModelProvider};
use crate::outreach::models::{Contact, SenderProfile};

type Responder = dyn Fn(&str, u32) -> Result<String, LlmError> + Send + Sync;

/// A `ModelClient` that answers from a closure and records every call.
pub struct ScriptedModel {
    responder: Box<Responder>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedModel {
    pub fn new(
        responder: impl Fn(&str, u32) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every email call with a well-formed email and everything else with plain text.
    pub fn well_formed() -> Self {
        Self::new(|_, max_tokens| Ok(canned_response(max_tokens)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_tokens));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(prompt, max_tokens)
    }
}

/// Hands out one shared `ScriptedModel` and records the keys it was asked for.
pub struct ScriptedProvider {
    pub model: Arc<ScriptedModel>,
    keys: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(model: ScriptedModel) -> Self {
        Self {
            model: Arc::new(model),
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

impl ModelProvider for ScriptedProvider {
    fn client(&self, api_key: String) -> Result<Arc<dyn ModelClient>, LlmError> {
        self.keys.lock().unwrap().push(api_key);
        let model: Arc<dyn ModelClient> = self.model.clone();
        Ok(model)
    }
}

/// Plausible model output keyed off the token budget of the call.
pub fn canned_response(max_tokens: u32) -> String {
    match max_tokens {
        400 => "SUBJECT: Scaling your roadmap\n---\nHi there,\n\nShort note.\n\nBest".to_string(),
        150 => "  Hi! Would love to connect and swap notes on product engineering.  ".to_string(),
        _ => "Opener: ...\nValue Prop: ...\nDiscovery: ...\nObjections: ...\nClose: ...\n"
            .to_string(),
    }
}

pub fn contact(first_name: &str, company: &str) -> Contact {
    Contact {
        email: format!("{}@{}.example.com", first_name.to_lowercase(), company.to_lowercase()),
        first_name: first_name.to_string(),
        last_name: String::new(),
        company: company.to_string(),
    }
}

pub fn sender() -> SenderProfile {
    SenderProfile {
        name: "Dana Reyes".to_string(),
        title: "Founder & CTO".to_string(),
        company: "Northwind Labs".to_string(),
        calendar_link: "https://cal.example.com/dana".to_string(),
    }
}
