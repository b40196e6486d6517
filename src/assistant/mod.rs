//! Conversational finance assistant
//!
//! One chat request runs a bounded tool loop against the language model:
//! the model may ask for any of the read-only finance tools for up to
//! `max_tool_rounds` turns, after which it must answer in text. Only the
//! user's message and the final answer are remembered.

use crate::error::{AppError, ValidationError};
use crate::memory::{caller_fingerprint, ConversationMemory, ConversationMessage, MemoryKey, MessageRole};
use crate::model::{LanguageModel, ModelMessage, ModelPart, ModelRequest, ModelTurn, Role, ToolCall};
use crate::models::ToolInput;
use crate::tools::ToolRegistry;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SYSTEM_PROMPT: &str = r#"Você é um planejador financeiro que ajuda o usuário a alcançar suas metas.

Dados:
- Todo valor monetário retornado pelas ferramentas (income, money_saved, value) está em CENTAVOS.
- Ao responder, converta sempre para reais e formate no padrão brasileiro, por exemplo R$ 1.500,00.
- Nunca mostre identificadores internos ao usuário.

Como analisar:
1. Comece pelo perfil: compare a renda mensal com o dinheiro já guardado.
2. Veja as transações recentes e diga se o mês está em superávit ou déficit.
3. Revise as metas começando pelas marcadas como primary e avalie se o prazo (term ou days_term) é realista para o ritmo atual de economia.

Como responder:
- Seja encorajador sem deixar de ser realista.
- Se não sobrar dinheiro, sugira cortes entre as transações marcadas como optional.
- Organize planos em listas ou tabelas."#;

pub struct FinancialAssistant {
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    memory: ConversationMemory,
    max_tool_rounds: usize,
}

impl FinancialAssistant {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
        memory: ConversationMemory,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            model,
            tools,
            memory,
            max_tool_rounds,
        }
    }

    /// Answer `message` on behalf of `user_id`.
    ///
    /// Tools only ever see `user_id`; a missing id runs anonymously and
    /// every tool call fails back to the model.
    pub async fn respond(&self, user_id: Option<&str>, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::new("message", "Message is required").into());
        }

        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty());
        let key = MemoryKey::for_user(user_id);
        let caller = caller_fingerprint(user_id);

        let history = match self.memory.load(&key).await {
            Ok(history) => history,
            Err(e) => {
                warn!(caller = %caller, "Failed to load conversation memory: {}", e);
                Vec::new()
            }
        };

        let mut contents: Vec<ModelMessage> = history
            .iter()
            .map(|m| match m.role {
                MessageRole::User => ModelMessage::user_text(&m.content),
                MessageRole::Assistant => ModelMessage::model_text(&m.content),
            })
            .collect();
        contents.push(ModelMessage::user_text(message));

        info!(
            caller = %caller,
            model = self.model.name(),
            remembered = history.len(),
            "Assistant request"
        );

        let answer = self.run_tool_loop(user_id, contents).await?;

        let turn = [ConversationMessage::user(message), ConversationMessage::assistant(&answer)];
        if let Err(e) = self.memory.append(&key, &turn).await {
            warn!(caller = %caller, "Failed to save conversation memory: {}", e);
        }

        Ok(answer)
    }

    async fn run_tool_loop(&self, user_id: Option<&str>, mut contents: Vec<ModelMessage>) -> Result<String> {
        let declarations = self.tools.declarations();

        for round in 0..=self.max_tool_rounds {
            let tools_enabled = round < self.max_tool_rounds;
            let request = ModelRequest {
                system_prompt: SYSTEM_PROMPT.to_string(),
                contents: contents.clone(),
                tools: if tools_enabled { declarations.clone() } else { Vec::new() },
            };

            let calls = match self.model.generate(&request).await? {
                ModelTurn::Text(text) => return Ok(text),
                ModelTurn::ToolCalls(calls) if tools_enabled => calls,
                ModelTurn::ToolCalls(_) => {
                    return Err(AppError::Llm(format!(
                        "Model kept requesting tools after {} rounds",
                        self.max_tool_rounds
                    )))
                }
            };

            debug!(round, calls = calls.len(), "Model requested tools");

            contents.push(ModelMessage {
                role: Role::Model,
                parts: calls
                    .iter()
                    .map(|c| ModelPart::FunctionCall {
                        name: c.name.clone(),
                        args: c.args.clone(),
                    })
                    .collect(),
            });

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                responses.push(ModelPart::FunctionResponse {
                    name: call.name.clone(),
                    response: self.call_tool(user_id, call).await,
                });
            }
            contents.push(ModelMessage {
                role: Role::User,
                parts: responses,
            });
        }

        Err(AppError::Llm("Tool loop ended without an answer".to_string()))
    }

    /// Tool failures become a `{success:false}` payload for the model.
    async fn call_tool(&self, user_id: Option<&str>, call: &ToolCall) -> Value {
        let input = ToolInput {
            tool_name: call.name.clone(),
            user_id: user_id.map(str::to_string),
            parameters: call.args.clone(),
        };

        self.tools
            .execute(&input)
            .await
            .and_then(|output| serde_json::to_value(output).map_err(AppError::from))
            .unwrap_or_else(|e| {
                warn!(tool = %call.name, "Tool call failed: {}", e);
                json!({ "success": false, "error": e.to_string() })
            })
    }
}
