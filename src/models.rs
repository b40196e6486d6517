//! Core data models for the finance coach

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const DAYS_PER_YEAR: i32 = 365;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalTerm {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl GoalTerm {
    /// Fixed planning horizon in days for this term.
    ///
    /// The medium horizon is nine years; product has not confirmed whether
    /// that should be a rounder number.
    pub fn days_term(self) -> i32 {
        match self {
            GoalTerm::ShortTerm => 2 * DAYS_PER_YEAR,
            GoalTerm::MediumTerm => 9 * DAYS_PER_YEAR,
            GoalTerm::LongTerm => 10 * DAYS_PER_YEAR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalTerm::ShortTerm => "SHORT_TERM",
            GoalTerm::MediumTerm => "MEDIUM_TERM",
            GoalTerm::LongTerm => "LONG_TERM",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SHORT_TERM" => Some(GoalTerm::ShortTerm),
            "MEDIUM_TERM" => Some(GoalTerm::MediumTerm),
            "LONG_TERM" => Some(GoalTerm::LongTerm),
            _ => None,
        }
    }
}

/// Horizon in days for a raw term value; unknown terms fall back to short.
pub fn days_for_term(raw: &str) -> i32 {
    GoalTerm::parse(raw)
        .unwrap_or(GoalTerm::ShortTerm)
        .days_term()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "INCOME" => Some(TransactionType::Income),
            "EXPENSE" => Some(TransactionType::Expense),
            _ => None,
        }
    }
}

//
// ================= User =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Kept as typed by the user.
    pub age: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Monthly income in cents.
    pub income: i64,
    /// Savings in cents.
    pub money_saved: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub age: String,
    pub email: String,
    pub password_hash: String,
    pub income: i64,
    pub money_saved: i64,
}

/// Subset of a user exposed to the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub age: String,
    pub income: i64,
    pub money_saved: i64,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            age: user.age.clone(),
            income: user.income,
            money_saved: user.money_saved,
        }
    }
}

//
// ================= Goal =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Goal label, e.g. `"car"` or a custom name.
    pub goal: String,
    pub primary: bool,
    /// Target amount in cents, when the user gave one.
    pub value: Option<i64>,
    pub term: GoalTerm,
    pub days_term: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub user_id: String,
    pub goal: String,
    pub primary: bool,
    pub value: Option<i64>,
    pub term: GoalTerm,
    pub days_term: i32,
}

//
// ================= Transaction =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Discretionary spend that could be cut.
    pub optional: bool,
    /// Amount in cents.
    pub value: i64,
    pub description: Option<String>,
    pub in_cash: bool,
    /// Installment count; only set when `in_cash` is false.
    pub months: Option<i32>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

/// A validated transaction ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionType,
    pub optional: bool,
    pub value: i64,
    pub description: Option<String>,
    pub in_cash: bool,
    pub months: Option<i32>,
    pub date: DateTime<Utc>,
    pub user_id: String,
}

//
// ================= Requests =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRequest {
    pub goal: String,
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    pub term: GoalTerm,
}

/// Body of `POST /api/user`: a profile plus its goals, created together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub age: String,
    pub email: String,
    pub password: String,
    pub income: i64,
    pub money_saved: i64,
    #[serde(default)]
    pub goals: Vec<GoalRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    /// Caller the tool is scoped to.
    pub user_id: Option<String>,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

impl fmt::Display for GoalTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
