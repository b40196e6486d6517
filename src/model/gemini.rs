//! Gemini `generateContent` client with function calling
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{LanguageModel, ModelMessage, ModelPart, ModelRequest, ModelTurn, Role, ToolCall};
use crate::error::AppError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", BASE_URL, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelTurn> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Llm("GEMINI_API_KEY not configured".to_string()))?;

        let body = GeminiRequest::from_model_request(request);

        info!(model = %self.model, messages = request.contents.len(), tools = request.tools.len(), "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                AppError::Llm(format!("Gemini API error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(AppError::Llm(format!("Gemini API error ({}): {}", status, error_text)));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AppError::Llm(format!("Gemini parse error: {}", e))
        })?;

        gemini_response.into_turn()
    }
}

//
// ================= Wire format =================
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTools>,
    generation_config: GenerationConfig,
}

impl GeminiRequest {
    fn from_model_request(request: &ModelRequest) -> Self {
        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTools {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        Self {
            contents: request.contents.iter().map(Content::from).collect(),
            system_instruction: SystemInstruction {
                parts: vec![Part::text(&request.system_prompt)],
            },
            tools,
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 2048,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl From<&ModelMessage> for Content {
    fn from(message: &ModelMessage) -> Self {
        let role = match message.role {
            Role::User => "user",
            Role::Model => "model",
        };

        Self {
            role: Some(role.to_string()),
            parts: message.parts.iter().map(Part::from).collect(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

impl From<&ModelPart> for Part {
    fn from(part: &ModelPart) -> Self {
        match part {
            ModelPart::Text(text) => Part::text(text),
            ModelPart::FunctionCall { name, args } => Part {
                function_call: Some(FunctionCall {
                    name: name.clone(),
                    args: args.clone(),
                }),
                ..Default::default()
            },
            ModelPart::FunctionResponse { name, response } => Part {
                function_response: Some(FunctionResponse {
                    name: name.clone(),
                    response: response.clone(),
                }),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
}

impl GeminiResponse {
    /// Function calls win over text when a candidate carries both.
    fn into_turn(self) -> Result<ModelTurn> {
        if let Some(usage) = &self.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("No response from Gemini API".to_string()))?;

        let finish_reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        let mut calls = Vec::new();
        let mut text = String::new();
        for part in parts {
            if let Some(call) = part.function_call {
                calls.push(ToolCall::new(call.name, call.args));
            } else if let Some(chunk) = part.text {
                text.push_str(&chunk);
            }
        }

        if !calls.is_empty() {
            return Ok(ModelTurn::ToolCalls(calls));
        }
        if text.trim().is_empty() {
            return Err(AppError::Llm(format!(
                "Empty response from Gemini (finish reason: {})",
                finish_reason
            )));
        }
        Ok(ModelTurn::Text(text))
    }
}
