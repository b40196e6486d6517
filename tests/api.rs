use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use finance_coach::api::{build_state, create_router, AppState};
use finance_coach::assistant::FinancialAssistant;
use finance_coach::config::AppConfig;
use finance_coach::memory::ConversationMemory;
use finance_coach::model::{ModelPart, ScriptedModel, ScriptedStep};
use finance_coach::store::{FinanceStore, InMemoryFinanceStore};
use finance_coach::tools::{create_finance_registry, USER_PROFILE_TOOL};
use finance_coach::User;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<InMemoryFinanceStore>,
    model: Arc<ScriptedModel>,
}

async fn test_app(steps: Vec<ScriptedStep>) -> TestApp {
    let store = Arc::new(InMemoryFinanceStore::new());
    store
        .seed_user(User {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            age: "30".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            income: 500000,
            money_saved: 150050,
            created_at: Utc::now(),
        })
        .await;

    let model = Arc::new(ScriptedModel::new(steps));
    let assistant = FinancialAssistant::new(
        model.clone(),
        create_finance_registry(store.clone()),
        ConversationMemory::in_memory(20),
        5,
    );

    let state = AppState::new(store.clone(), Arc::new(assistant));
    TestApp {
        router: create_router(state),
        store,
        model,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn expense(date: &str) -> Value {
    json!({
        "type": "EXPENSE",
        "optional": true,
        "value": 2999,
        "inCash": true,
        "date": date,
        "userId": "u1"
    })
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = test_app(vec![]).await;
    let (status, body) = send(&app.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn cash_expense_is_created_without_months() {
    let app = test_app(vec![]).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/transaction",
        Some(expense("2025-11-25")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Transaction created");
    assert_eq!(body["newTransaction"]["value"], 2999);
    assert!(body["newTransaction"]["months"].is_null());
    assert_eq!(body["newTransaction"]["userId"], "u1");
    assert_eq!(body["newTransaction"]["type"], "EXPENSE");
}

#[tokio::test]
async fn transaction_validation_errors_are_400() {
    let app = test_app(vec![]).await;

    let mut installments = expense("2025-11-25");
    installments["inCash"] = json!(false);
    let (status, body) = send(&app.router, Method::POST, "/api/transaction", Some(installments)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "months");
    assert_eq!(body["message"], "Invalid field 'months'");

    let mut transfer = expense("2025-11-25");
    transfer["type"] = json!("TRANSFER");
    let (status, body) = send(&app.router, Method::POST, "/api/transaction", Some(transfer)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid transaction type");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/transaction")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, listed) = send(&app.router, Method::GET, "/api/transaction", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn transaction_for_unknown_user_is_404() {
    let app = test_app(vec![]).await;
    let mut body = expense("2025-11-25");
    body["userId"] = json!("ghost");

    let (status, _) = send(&app.router, Method::POST, "/api/transaction", Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_filters_by_month() {
    let app = test_app(vec![]).await;
    for date in ["2025-12-03", "2025-11-25", "2025-11-30T23:59:59Z"] {
        let (status, _) = send(&app.router, Method::POST, "/api/transaction", Some(expense(date))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, all) = send(&app.router, Method::GET, "/api/transaction", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, november) = send(&app.router, Method::GET, "/api/transaction?month=2025-11", None).await;
    let dates: Vec<&str> = november
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates.len(), 2);
    assert!(dates[0].starts_with("2025-11-25"));
    assert!(dates[1].starts_with("2025-11-30"));

    let (_, ignored) = send(&app.router, Method::GET, "/api/transaction?month=11-2025", None).await;
    assert_eq!(ignored.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn user_is_created_with_goals() {
    let app = test_app(vec![]).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/user",
        Some(json!({
            "name": "Bia",
            "age": "27",
            "email": "bia@example.com",
            "password": "x7Qp2mZr9LkT4vNw8JcY3sHd",
            "income": 420000,
            "money_saved": 0,
            "goals": [
                { "goal": "home", "primary": true, "value": 30000000, "term": "LONG_TERM" },
                { "goal": "trip", "primary": false, "term": "MEDIUM_TERM" }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let user_id = body["id"].as_str().unwrap().to_string();

    let goals = app.store.list_goals(&user_id).await.unwrap();
    assert_eq!(goals.len(), 2);
    assert!(goals.iter().all(|g| g.user_id == user_id));

    let home = goals.iter().find(|g| g.goal == "home").unwrap();
    assert!(home.primary);
    assert_eq!(home.days_term, 3650);

    let trip = goals.iter().find(|g| g.goal == "trip").unwrap();
    assert!(!trip.primary);
    assert_eq!(trip.value, None);
    assert_eq!(trip.days_term, 3285);

    let stored = app.store.find_user(&user_id).await.unwrap();
    assert_ne!(stored.password_hash, "x7Qp2mZr9LkT4vNw8JcY3sHd");
}

#[tokio::test]
async fn user_payload_errors_are_400() {
    let app = test_app(vec![]).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/user",
        Some(json!({
            "name": "Bia", "age": "27", "email": "bia.example.com",
            "password": "secret", "income": 420000, "money_saved": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "email");

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/api/user",
        Some(json!({ "name": "Bia", "goals": [{ "goal": "home", "term": "FOREVER" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_runs_tools_for_the_caller() {
    let app = test_app(vec![
        ScriptedStep::tool_call(USER_PROFILE_TOOL, json!({})),
        ScriptedStep::text("Você tem R$ 1.500,50 guardados."),
    ])
    .await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/ai/chat",
        Some(json!({ "userId": "u1", "message": "Quanto tenho guardado?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Você tem R$ 1.500,50 guardados.");

    assert_eq!(app.model.remaining().await, 0);
    let requests = app.model.requests().await;
    assert_eq!(requests.len(), 2);
    let tool_reply = &requests[1].contents.last().unwrap().parts[0];
    match tool_reply {
        ModelPart::FunctionResponse { response, .. } => {
            assert_eq!(response["data"]["money_saved"], 150050);
        }
        other => panic!("expected a function response, got {:?}", other),
    }
}

#[tokio::test]
async fn chat_rejects_blank_message() {
    let app = test_app(vec![]).await;
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/ai/chat",
        Some(json!({ "userId": "u1", "message": "  " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn chat_without_api_key_is_500_with_reason() {
    let state = build_state(&AppConfig::default()).unwrap();
    let router = create_router(state);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/ai/chat",
        Some(json!({ "message": "oi" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
}
