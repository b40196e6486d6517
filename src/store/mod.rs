//! Persistence layer for users, goals and transactions
//!
//! `InMemoryFinanceStore` backs tests and database-less development;
//! `PgFinanceStore` is used when a database URL is configured.

use crate::error::AppError;
use crate::models::{Goal, NewGoal, NewTransaction, NewUser, Transaction, User, UserProfile};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod postgres;
pub use postgres::PgFinanceStore;

/// Half-open interval `[start, end)` over transaction dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Trait for finance record persistence
#[async_trait::async_trait]
pub trait FinanceStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn create_goal(&self, goal: NewGoal) -> Result<Goal>;
    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction>;

    /// All transactions ordered by date, optionally restricted to a range.
    async fn list_transactions(&self, range: Option<DateRange>) -> Result<Vec<Transaction>>;

    async fn find_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>>;

    /// A user's transactions dated at or after `since`, newest first.
    async fn transactions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>>;
}

pub(crate) fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// In-memory store for development and tests
pub struct InMemoryFinanceStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    goals: Arc<RwLock<Vec<Goal>>>,
    transactions: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryFinanceStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            goals: Arc::new(RwLock::new(Vec::new())),
            transactions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Insert a user with a caller-chosen id (fixtures).
    pub async fn seed_user(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
    }

    pub async fn find_user(&self, user_id: &str) -> Option<User> {
        let users = self.users.read().await;
        users.get(user_id).cloned()
    }

    async fn ensure_user_exists(&self, user_id: &str) -> Result<()> {
        let users = self.users.read().await;
        if users.contains_key(user_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("user {}", user_id)))
        }
    }
}

impl Default for InMemoryFinanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FinanceStore for InMemoryFinanceStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let record = User {
            id: new_record_id(),
            name: user.name,
            age: user.age,
            email: user.email,
            password_hash: user.password_hash,
            income: user.income,
            money_saved: user.money_saved,
            created_at: Utc::now(),
        };

        let mut users = self.users.write().await;
        users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn create_goal(&self, goal: NewGoal) -> Result<Goal> {
        self.ensure_user_exists(&goal.user_id).await?;

        let record = Goal {
            id: new_record_id(),
            user_id: goal.user_id,
            goal: goal.goal,
            primary: goal.primary,
            value: goal.value,
            term: goal.term,
            days_term: goal.days_term,
            created_at: Utc::now(),
        };

        let mut goals = self.goals.write().await;
        goals.push(record.clone());
        Ok(record)
    }

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
        self.ensure_user_exists(&tx.user_id).await?;

        let record = Transaction {
            id: new_record_id(),
            kind: tx.kind,
            optional: tx.optional,
            value: tx.value,
            description: tx.description,
            in_cash: tx.in_cash,
            months: tx.months,
            date: tx.date,
            created_at: Utc::now(),
            user_id: tx.user_id,
        };

        let mut transactions = self.transactions.write().await;
        transactions.push(record.clone());
        Ok(record)
    }

    async fn list_transactions(&self, range: Option<DateRange>) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.read().await;

        let mut matching: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| range.map_or(true, |r| r.contains(tx.date)))
            .cloned()
            .collect();

        matching.sort_by_key(|tx| tx.date);
        Ok(matching)
    }

    async fn find_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).map(UserProfile::from))
    }

    async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        let goals = self.goals.read().await;
        Ok(goals
            .iter()
            .filter(|goal| goal.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn transactions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.read().await;

        let mut recent: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| tx.user_id == user_id && tx.date >= since)
            .cloned()
            .collect();

        recent.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(recent)
    }
}
