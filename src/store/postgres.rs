//! Postgres-backed finance store

use super::{new_record_id, DateRange, FinanceStore};
use crate::error::AppError;
use crate::models::{
    Goal, GoalTerm, NewGoal, NewTransaction, NewUser, Transaction, TransactionType, User,
    UserProfile,
};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

const FOREIGN_KEY_VIOLATION: &str = "23503";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
      id TEXT PRIMARY KEY,
      name TEXT NOT NULL,
      age TEXT NOT NULL,
      email TEXT NOT NULL,
      password_hash TEXT NOT NULL,
      income BIGINT NOT NULL,
      money_saved BIGINT NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS goals (
      id TEXT PRIMARY KEY,
      user_id TEXT NOT NULL REFERENCES users (id),
      goal TEXT NOT NULL,
      is_primary BOOLEAN NOT NULL,
      value BIGINT,
      term TEXT NOT NULL CHECK (term IN ('SHORT_TERM', 'MEDIUM_TERM', 'LONG_TERM')),
      days_term INTEGER NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
      id TEXT PRIMARY KEY,
      user_id TEXT NOT NULL REFERENCES users (id),
      kind TEXT NOT NULL CHECK (kind IN ('INCOME', 'EXPENSE')),
      optional BOOLEAN NOT NULL,
      value BIGINT NOT NULL,
      description TEXT,
      in_cash BOOLEAN NOT NULL,
      months INTEGER,
      date TIMESTAMPTZ NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
      CHECK ((in_cash AND months IS NULL) OR (NOT in_cash AND months IS NOT NULL))
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_goals_user ON goals (user_id);
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions (user_id, date);
    "#,
];

pub struct PgFinanceStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgFinanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    /// Build a lazily-connecting pool; nothing touches the network until the
    /// first query.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                info!("Finance schema ready");
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to initialize finance schema: {}", e)))?;

        Ok(())
    }
}

fn db_error(action: &str, error: sqlx::Error) -> AppError {
    let is_missing_parent = error
        .as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == FOREIGN_KEY_VIOLATION);

    if is_missing_parent {
        AppError::NotFound(format!("Failed to {}: referenced user does not exist", action))
    } else {
        AppError::Database(format!("Failed to {}: {}", action, error))
    }
}

fn decode_error(error: sqlx::Error) -> AppError {
    AppError::Database(format!("Failed to decode row: {}", error))
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(decode_error)?,
        name: row.try_get("name").map_err(decode_error)?,
        age: row.try_get("age").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        income: row.try_get("income").map_err(decode_error)?,
        money_saved: row.try_get("money_saved").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn row_to_goal(row: &PgRow) -> Result<Goal> {
    let term: String = row.try_get("term").map_err(decode_error)?;

    Ok(Goal {
        id: row.try_get("id").map_err(decode_error)?,
        user_id: row.try_get("user_id").map_err(decode_error)?,
        goal: row.try_get("goal").map_err(decode_error)?,
        primary: row.try_get("is_primary").map_err(decode_error)?,
        value: row.try_get("value").map_err(decode_error)?,
        term: GoalTerm::parse(&term)
            .ok_or_else(|| AppError::Database(format!("Unknown goal term '{}'", term)))?,
        days_term: row.try_get("days_term").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction> {
    let kind: String = row.try_get("kind").map_err(decode_error)?;

    Ok(Transaction {
        id: row.try_get("id").map_err(decode_error)?,
        kind: TransactionType::parse(&kind)
            .ok_or_else(|| AppError::Database(format!("Unknown transaction type '{}'", kind)))?,
        optional: row.try_get("optional").map_err(decode_error)?,
        value: row.try_get("value").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        in_cash: row.try_get("in_cash").map_err(decode_error)?,
        months: row.try_get("months").map_err(decode_error)?,
        date: row.try_get("date").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        user_id: row.try_get("user_id").map_err(decode_error)?,
    })
}

const TRANSACTION_COLUMNS: &str =
    "id, kind, optional, value, description, in_cash, months, date, created_at, user_id";

#[async_trait::async_trait]
impl FinanceStore for PgFinanceStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, name, age, email, password_hash, income, money_saved)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, age, email, password_hash, income, money_saved, created_at
            "#,
        )
        .bind(new_record_id())
        .bind(&user.name)
        .bind(&user.age)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.income)
        .bind(user.money_saved)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("insert user", e))?;

        row_to_user(&row)
    }

    async fn create_goal(&self, goal: NewGoal) -> Result<Goal> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO goals (id, user_id, goal, is_primary, value, term, days_term)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, goal, is_primary, value, term, days_term, created_at
            "#,
        )
        .bind(new_record_id())
        .bind(&goal.user_id)
        .bind(&goal.goal)
        .bind(goal.primary)
        .bind(goal.value)
        .bind(goal.term.as_str())
        .bind(goal.days_term)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("insert goal", e))?;

        row_to_goal(&row)
    }

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
        self.ensure_schema().await?;

        let query = format!(
            r#"
            INSERT INTO transactions (id, kind, optional, value, description, in_cash, months, date, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(new_record_id())
            .bind(tx.kind.as_str())
            .bind(tx.optional)
            .bind(tx.value)
            .bind(&tx.description)
            .bind(tx.in_cash)
            .bind(tx.months)
            .bind(tx.date)
            .bind(&tx.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("insert transaction", e))?;

        row_to_transaction(&row)
    }

    async fn list_transactions(&self, range: Option<DateRange>) -> Result<Vec<Transaction>> {
        self.ensure_schema().await?;

        let rows = match range {
            Some(range) => {
                let query = format!(
                    "SELECT {} FROM transactions WHERE date >= $1 AND date < $2 ORDER BY date ASC",
                    TRANSACTION_COLUMNS
                );
                sqlx::query(&query)
                    .bind(range.start)
                    .bind(range.end)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let query = format!("SELECT {} FROM transactions ORDER BY date ASC", TRANSACTION_COLUMNS);
                sqlx::query(&query).fetch_all(&self.pool).await
            }
        }
        .map_err(|e| db_error("list transactions", e))?;

        rows.iter().map(row_to_transaction).collect()
    }

    async fn find_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT name, age, income, money_saved FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("load user profile", e))?;

        row.map(|row| -> Result<UserProfile> {
            Ok(UserProfile {
                name: row.try_get("name").map_err(decode_error)?,
                age: row.try_get("age").map_err(decode_error)?,
                income: row.try_get("income").map_err(decode_error)?,
                money_saved: row.try_get("money_saved").map_err(decode_error)?,
            })
        })
        .transpose()
    }

    async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, goal, is_primary, value, term, days_term, created_at
            FROM goals
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list goals", e))?;

        rows.iter().map(row_to_goal).collect()
    }

    async fn transactions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        self.ensure_schema().await?;

        let query = format!(
            "SELECT {} FROM transactions WHERE user_id = $1 AND date >= $2 ORDER BY date DESC",
            TRANSACTION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("load recent transactions", e))?;

        rows.iter().map(row_to_transaction).collect()
    }
}
