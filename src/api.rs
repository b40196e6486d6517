//! REST API server
//!
//! Thin axum handlers over the services layer and the assistant. Shared
//! collaborators are built once at startup and injected through [`AppState`].

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::assistant::FinancialAssistant;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::memory::ConversationMemory;
use crate::model::{GeminiClient, LanguageModel};
use crate::models::{ChatRequest, CreateUserRequest, CreateUserResponse};
use crate::services;
use crate::store::{FinanceStore, InMemoryFinanceStore, PgFinanceStore};
use crate::tools::create_finance_registry;
use crate::Result;

type ApiReply = (StatusCode, Json<Value>);

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FinanceStore>,
    pub assistant: Arc<FinancialAssistant>,
}

impl AppState {
    pub fn new(store: Arc<dyn FinanceStore>, assistant: Arc<FinancialAssistant>) -> Self {
        Self { store, assistant }
    }
}

/// Wire the store, memory, model and tools for a configuration.
///
/// With `DATABASE_URL` set, finance records and conversation memory share
/// one lazily-connected Postgres pool; otherwise both live in process.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let (store, memory): (Arc<dyn FinanceStore>, ConversationMemory) = match &config.database_url {
        Some(url) => {
            let pg = PgFinanceStore::connect_lazy(url)?;
            let memory = ConversationMemory::postgres(pg.pool().clone(), config.memory_last_messages);
            info!("Finance store backend: postgres");
            (Arc::new(pg), memory)
        }
        None => {
            warn!("DATABASE_URL not set; finance records are kept in memory only");
            (
                Arc::new(InMemoryFinanceStore::new()),
                ConversationMemory::in_memory(config.memory_last_messages),
            )
        }
    };

    let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    )?);

    let assistant = FinancialAssistant::new(
        model,
        create_finance_registry(store.clone()),
        memory,
        config.max_tool_rounds,
    );

    Ok(AppState::new(store, Arc::new(assistant)))
}

/// =============================
/// Error Mapping
/// =============================

fn error_reply(err: AppError) -> ApiReply {
    match err {
        AppError::Validation(v) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": v.message, "field": v.field })),
        ),
        AppError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("Not found: {}", what) })),
        ),
        other => {
            error!("Request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Internal server error" })),
            )
        }
    }
}

fn rejection_reply(rejection: JsonRejection) -> ApiReply {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": rejection.body_text() })),
    )
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Users
/// =============================

async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiReply {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_reply(rejection),
    };

    match services::create_user_with_goals(state.store.as_ref(), request).await {
        Ok(user) => (
            StatusCode::OK,
            Json(json!(CreateUserResponse { id: user.id })),
        ),
        Err(e) => error_reply(e),
    }
}

/// =============================
/// Transactions
/// =============================

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub month: Option<String>,
}

async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> ApiReply {
    match services::list_transactions(state.store.as_ref(), query.month.as_deref()).await {
        Ok(transactions) => (StatusCode::OK, Json(json!(transactions))),
        Err(e) => error_reply(e),
    }
}

async fn create_transaction(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiReply {
    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_reply(rejection),
    };

    match services::create_transaction(state.store.as_ref(), &body).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Transaction created",
                "newTransaction": created,
            })),
        ),
        Err(e) => error_reply(e),
    }
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiReply {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Invalid chat request",
                    "error": rejection.body_text(),
                })),
            )
        }
    };

    let message = req.message.as_deref().unwrap_or_default();

    match state.assistant.respond(req.user_id.as_deref(), message).await {
        Ok(response) => (
            StatusCode::OK,
            Json(json!({ "success": true, "response": response })),
        ),
        Err(AppError::Validation(v)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": v.message, "error": v.field })),
        ),
        Err(e) => {
            error!("Assistant failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Assistant failed to respond",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/user", post(create_user))
        .route(
            "/api/transaction",
            get(list_transactions).post(create_transaction),
        )
        .route("/api/ai/chat", post(chat_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(state: AppState, config: &AppConfig) -> Result<()> {
    let router = create_router(state);
    let address = config.bind_address();

    let listener = tokio::net::TcpListener::bind(address.as_str()).await?;

    info!("API Server listening on http://{}", address);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_error_reply_statuses() {
        let (status, Json(body)) = error_reply(ValidationError::invalid_field("date").into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "date");
        assert_eq!(body["message"], "Invalid field 'date'");

        let (status, _) = error_reply(AppError::NotFound("user u9".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, Json(body)) = error_reply(AppError::Database("password=hunter2".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("hunter2"));
    }

    #[test]
    fn test_build_state_without_database() {
        let config = AppConfig::default();
        let state = build_state(&config).unwrap();
        assert_eq!(Arc::strong_count(&state.assistant), 1);
    }
}
