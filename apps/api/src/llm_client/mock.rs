//! Scripted in-memory `ModelInvoker` for pipeline and router tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Completion, GenerationParams, LlmError, ModelInvoker, Usage};

/// A call observed by the scripted invoker.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
    pub params: GenerationParams,
}

/// Replays queued responses in order. Running out of script is a generic backend error.
pub struct ScriptedInvoker {
    script: Mutex<VecDeque<Result<Completion, LlmError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues a successful reply with the given usage.
    pub fn reply(self, text: impl Into<String>, input_tokens: u32, output_tokens: u32) -> Self {
        self.push(Ok(Completion {
            text: text.into(),
            usage: Usage {
                input_tokens,
                output_tokens,
            },
        }))
    }

    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error))
    }

    fn push(self, item: Result<Completion, LlmError>) -> Self {
        self.script.lock().unwrap().push_back(item);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn invoke(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            params: params.clone(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Backend {
                    status: None,
                    message: "script exhausted".to_string(),
                })
            })
    }
}
