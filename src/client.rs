//! HTTP client for the REST surface
//!
//! There is no login: once onboarding succeeds the returned user id is cached
//! and attached to every later transaction and chat request.

use crate::error::AppError;
use crate::models::{CreateUserRequest, CreateUserResponse, Transaction, TransactionType};
use crate::onboarding::OnboardingFlow;
use crate::Result;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::info;

/// A transaction as typed in the entry form.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub kind: TransactionType,
    pub optional: bool,
    /// Amount in cents.
    pub value: i64,
    pub description: Option<String>,
    pub in_cash: bool,
    pub months: Option<i32>,
    pub date: NaiveDate,
}

impl TransactionDraft {
    pub fn expense(value: i64, date: NaiveDate) -> Self {
        Self {
            kind: TransactionType::Expense,
            optional: false,
            value,
            description: None,
            in_cash: true,
            months: None,
            date,
        }
    }

    pub fn income(value: i64, date: NaiveDate) -> Self {
        Self {
            kind: TransactionType::Income,
            ..Self::expense(value, date)
        }
    }

    /// Request body for `POST /api/transaction`.
    ///
    /// Income is never optional, and cash payments carry no installments.
    pub fn to_body(&self, user_id: &str) -> Value {
        let mut body = Map::new();
        body.insert("type".to_string(), json!(self.kind));
        body.insert(
            "optional".to_string(),
            json!(self.kind == TransactionType::Expense && self.optional),
        );
        body.insert("value".to_string(), json!(self.value));
        if let Some(description) = self.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            body.insert("description".to_string(), json!(description));
        }
        body.insert("inCash".to_string(), json!(self.in_cash));
        if !self.in_cash {
            body.insert("months".to_string(), json!(self.months));
        }
        body.insert("date".to_string(), json!(self.date.format("%Y-%m-%d").to_string()));
        body.insert("userId".to_string(), json!(user_id));
        Value::Object(body)
    }
}

pub struct FinanceClient {
    http: Client,
    base_url: String,
    user_id: Option<String>,
}

impl FinanceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(180))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: None,
        })
    }

    /// Resume as a user onboarded earlier.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn require_user(&self) -> Result<&str> {
        self.user_id()
            .ok_or_else(|| AppError::Client("No user yet; complete onboarding first".to_string()))
    }

    /// Create the user and cache its id.
    pub async fn onboard(&mut self, request: &CreateUserRequest) -> Result<String> {
        let response = self.http.post(self.url("/api/user")).json(request).send().await?;
        let created: CreateUserResponse = read_json(response).await?;

        info!(user_id = %created.id, "Onboarding complete");
        self.user_id = Some(created.id.clone());
        Ok(created.id)
    }

    pub async fn submit_onboarding(&mut self, flow: &OnboardingFlow) -> Result<String> {
        let request = flow.build_request()?;
        self.onboard(&request).await
    }

    pub async fn create_transaction(&self, draft: &TransactionDraft) -> Result<Transaction> {
        let user_id = self.require_user()?;
        let response = self
            .http
            .post(self.url("/api/transaction"))
            .json(&draft.to_body(user_id))
            .send()
            .await?;

        let body: Value = read_json(response).await?;
        let created = body
            .get("newTransaction")
            .cloned()
            .ok_or_else(|| AppError::Client("Response is missing 'newTransaction'".to_string()))?;
        Ok(serde_json::from_value(created)?)
    }

    pub async fn list_transactions(&self, month: Option<&str>) -> Result<Vec<Transaction>> {
        let mut request = self.http.get(self.url("/api/transaction"));
        if let Some(month) = month {
            request = request.query(&[("month", month)]);
        }
        read_json(request.send().await?).await
    }

    pub async fn chat(&self, message: &str) -> Result<String> {
        let response = self
            .http
            .post(self.url("/api/ai/chat"))
            .json(&json!({ "userId": self.user_id, "message": message }))
            .send()
            .await?;

        let body: Value = read_json(response).await?;
        body.get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::Client("Response is missing 'response'".to_string()))
    }
}

/// Decode a success body, or turn the server's `message` into a client error.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("request failed");
    let detail = body.get("error").and_then(Value::as_str);

    Err(AppError::Client(match detail {
        Some(detail) => format!("{} ({}): {}", message, status, detail),
        None => format!("{} ({})", message, status),
    }))
}
