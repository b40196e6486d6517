//! Language model abstraction
//!
//! The assistant talks to a [`LanguageModel`] through a provider-neutral
//! request/turn shape. [`GeminiClient`] is the hosted implementation and
//! [`ScriptedModel`] replays canned turns for tests and offline runs.

pub mod gemini;

pub use gemini::GeminiClient;

use crate::error::AppError;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelPart {
    Text(String),
    FunctionCall { name: String, args: Value },
    FunctionResponse { name: String, response: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: Role,
    pub parts: Vec<ModelPart>,
}

impl ModelMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ModelPart::Text(text.into())],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![ModelPart::Text(text.into())],
        }
    }
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments; `None` for argument-less tools.
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub contents: Vec<ModelMessage>,
    /// Empty when the model must answer in text.
    pub tools: Vec<ToolDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// What the model produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    Text(String),
    ToolCalls(Vec<ToolCall>),
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &ModelRequest) -> Result<ModelTurn>;
}

#[derive(Debug, Clone)]
pub enum ScriptedStep {
    Turn(ModelTurn),
    Fail(String),
}

impl ScriptedStep {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedStep::Turn(ModelTurn::Text(text.into()))
    }

    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        ScriptedStep::Turn(ModelTurn::ToolCalls(vec![ToolCall::new(name, args)]))
    }
}

/// Deterministic model that replays a fixed script and records every request.
pub struct ScriptedModel {
    steps: Mutex<VecDeque<ScriptedStep>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.steps.lock().await.len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelTurn> {
        self.requests.lock().await.push(request.clone());

        match self.steps.lock().await.pop_front() {
            Some(ScriptedStep::Turn(turn)) => Ok(turn),
            Some(ScriptedStep::Fail(message)) => Err(AppError::Llm(message)),
            None => Err(AppError::Llm("Scripted model has no more turns".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ModelRequest {
        ModelRequest {
            system_prompt: "be brief".to_string(),
            contents: vec![ModelMessage::user_text("oi")],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(vec![
            ScriptedStep::tool_call("user-goals", json!({})),
            ScriptedStep::text("done"),
        ]);

        let first = model.generate(&request()).await.unwrap();
        assert_eq!(
            first,
            ModelTurn::ToolCalls(vec![ToolCall::new("user-goals", json!({}))])
        );
        assert_eq!(model.generate(&request()).await.unwrap(), ModelTurn::Text("done".to_string()));
        assert_eq!(model.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_model_errors_when_exhausted() {
        let model = ScriptedModel::new(vec![ScriptedStep::Fail("quota".to_string())]);
        assert!(matches!(model.generate(&request()).await, Err(AppError::Llm(m)) if m == "quota"));
        assert!(matches!(model.generate(&request()).await, Err(AppError::Llm(_))));
        assert_eq!(model.remaining().await, 0);
    }
}
