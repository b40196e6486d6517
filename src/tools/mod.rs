//! Tool trait and registry
//!
//! Tools are read-only queries against the finance store. Each call is scoped
//! to the user carried in [`ToolInput::user_id`]; ids supplied by the model in
//! the parameters are never consulted.

use crate::error::AppError;
use crate::model::ToolDeclaration;
use crate::models::{ToolInput, ToolOutput};
use crate::store::FinanceStore;
use crate::Result;
use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const USER_PROFILE_TOOL: &str = "user-profile";
pub const USER_GOALS_TOOL: &str = "user-goals";
pub const RECENT_TRANSACTIONS_TOOL: &str = "recent-transactions";

/// Look-back window of the recent transactions tool.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Trait for a single tool (deterministic execution)
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Declarations advertised to the model, in name order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDeclaration {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: None,
            })
            .collect()
    }

    pub async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let tool = self
            .get(&input.tool_name)
            .ok_or_else(|| AppError::ToolNotFound(input.tool_name.clone()))?;
        tool.execute(input).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn require_user(input: &ToolInput) -> Result<&str> {
    input
        .user_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::InvalidToolInput("No user is associated with this conversation".to_string()))
}

pub struct UserProfileTool {
    store: Arc<dyn FinanceStore>,
}

impl UserProfileTool {
    pub fn new(store: Arc<dyn FinanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for UserProfileTool {
    fn name(&self) -> &'static str {
        USER_PROFILE_TOOL
    }

    fn description(&self) -> &'static str {
        "Fetch the user's profile: name, age, monthly income and money saved (amounts in cents)"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let user_id = require_user(input)?;
        let profile = self
            .store
            .find_user_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

        Ok(ToolOutput {
            success: true,
            data: serde_json::to_value(profile)?,
            error: None,
        })
    }
}

pub struct UserGoalsTool {
    store: Arc<dyn FinanceStore>,
}

impl UserGoalsTool {
    pub fn new(store: Arc<dyn FinanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for UserGoalsTool {
    fn name(&self) -> &'static str {
        USER_GOALS_TOOL
    }

    fn description(&self) -> &'static str {
        "Fetch all of the user's financial goals with target value (cents), primary flag, term and days_term"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let user_id = require_user(input)?;
        let goals = self.store.list_goals(user_id).await?;

        Ok(ToolOutput {
            success: true,
            data: json!({ "goals": goals }),
            error: None,
        })
    }
}

pub struct RecentTransactionsTool {
    store: Arc<dyn FinanceStore>,
}

impl RecentTransactionsTool {
    pub fn new(store: Arc<dyn FinanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for RecentTransactionsTool {
    fn name(&self) -> &'static str {
        RECENT_TRANSACTIONS_TOOL
    }

    fn description(&self) -> &'static str {
        "Fetch the user's transactions from the last 30 days, newest first (values in cents)"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let user_id = require_user(input)?;
        let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
        let transactions = self.store.transactions_since(user_id, since).await?;

        debug!(user_id, count = transactions.len(), "Loaded recent transactions");

        Ok(ToolOutput {
            success: true,
            data: json!({
                "since": since,
                "transactions": transactions,
            }),
            error: None,
        })
    }
}

/// Registry with the three read-only finance tools.
pub fn create_finance_registry(store: Arc<dyn FinanceStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(UserProfileTool::new(store.clone())));
    registry.register(Arc::new(UserGoalsTool::new(store.clone())));
    registry.register(Arc::new(RecentTransactionsTool::new(store)));
    registry
}
