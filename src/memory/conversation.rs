//! Conversation memory backends

use super::{ConversationHistory, ConversationMessage, MemoryKey, MessageRole};
use crate::error::AppError;
use crate::Result;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::info;

enum MemoryBackend {
    InMemory {
        histories: Arc<RwLock<HashMap<MemoryKey, ConversationHistory>>>,
    },
    Postgres {
        pool: PgPool,
        schema_ready: Arc<OnceCell<()>>,
    },
}

/// Remembers the last `last_messages` text turns of every thread.
pub struct ConversationMemory {
    backend: MemoryBackend,
    last_messages: usize,
}

impl ConversationMemory {
    pub fn in_memory(last_messages: usize) -> Self {
        info!("Conversation memory backend: in-memory");
        Self {
            backend: MemoryBackend::InMemory {
                histories: Arc::new(RwLock::new(HashMap::new())),
            },
            last_messages,
        }
    }

    pub fn postgres(pool: PgPool, last_messages: usize) -> Self {
        info!("Conversation memory backend: postgres");
        Self {
            backend: MemoryBackend::Postgres {
                pool,
                schema_ready: Arc::new(OnceCell::new()),
            },
            last_messages,
        }
    }

    async fn ensure_schema_if_needed(&self) -> Result<()> {
        let MemoryBackend::Postgres { pool, schema_ready } = &self.backend else {
            return Ok(());
        };

        schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS assistant_messages (
                      seq BIGSERIAL PRIMARY KEY,
                      message_id UUID NOT NULL UNIQUE,
                      resource_id UUID NOT NULL,
                      thread_id UUID NOT NULL,
                      role TEXT NOT NULL,
                      content TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_assistant_messages_thread
                    ON assistant_messages (resource_id, thread_id, seq);
                    "#,
                )
                .execute(pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to initialize conversation memory schema: {}",
                    e
                ))
            })?;

        Ok(())
    }

    /// The remembered window of a thread, oldest first.
    ///
    /// The window always opens on a user turn; an assistant reply whose
    /// question fell outside the window is dropped.
    pub async fn load(&self, key: &MemoryKey) -> Result<Vec<ConversationMessage>> {
        let mut messages = self.load_window(key).await?;
        let first_user = messages
            .iter()
            .position(|m| m.role == MessageRole::User)
            .unwrap_or(messages.len());
        messages.drain(..first_user);
        Ok(messages)
    }

    async fn load_window(&self, key: &MemoryKey) -> Result<Vec<ConversationMessage>> {
        match &self.backend {
            MemoryBackend::InMemory { histories } => {
                let locked = histories.read().await;
                Ok(locked
                    .get(key)
                    .map(|history| history.recent_messages(self.last_messages))
                    .unwrap_or_default())
            }
            MemoryBackend::Postgres { pool, .. } => {
                self.ensure_schema_if_needed().await?;

                let limit = i64::try_from(self.last_messages).unwrap_or(i64::MAX);
                let rows = sqlx::query(
                    r#"
                    SELECT message_id, role, content, created_at
                    FROM assistant_messages
                    WHERE resource_id = $1 AND thread_id = $2
                    ORDER BY seq DESC
                    LIMIT $3
                    "#,
                )
                .bind(key.resource_id)
                .bind(key.thread_id)
                .bind(limit)
                .fetch_all(pool)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to load conversation history: {}", e))
                })?;

                let mut messages = Vec::with_capacity(rows.len());
                for row in rows.iter().rev() {
                    let role: String = row
                        .try_get("role")
                        .map_err(|e| AppError::Database(format!("Failed to decode message: {}", e)))?;
                    let Some(role) = MessageRole::parse(&role) else {
                        continue;
                    };

                    messages.push(ConversationMessage {
                        message_id: row
                            .try_get("message_id")
                            .map_err(|e| AppError::Database(format!("Failed to decode message: {}", e)))?,
                        timestamp: row
                            .try_get("created_at")
                            .map_err(|e| AppError::Database(format!("Failed to decode message: {}", e)))?,
                        role,
                        content: row
                            .try_get("content")
                            .map_err(|e| AppError::Database(format!("Failed to decode message: {}", e)))?,
                    });
                }

                Ok(messages)
            }
        }
    }

    /// Append messages to a thread in order.
    pub async fn append(&self, key: &MemoryKey, messages: &[ConversationMessage]) -> Result<()> {
        match &self.backend {
            MemoryBackend::InMemory { histories } => {
                let mut locked = histories.write().await;
                let history = locked
                    .entry(*key)
                    .or_insert_with(|| ConversationHistory::new(self.last_messages));
                for message in messages {
                    history.add_message(message.clone());
                }
                Ok(())
            }
            MemoryBackend::Postgres { pool, .. } => {
                self.ensure_schema_if_needed().await?;

                let mut tx = pool.begin().await.map_err(|e| {
                    AppError::Database(format!(
                        "Failed to begin transaction for saving conversation history: {}",
                        e
                    ))
                })?;

                for msg in messages {
                    sqlx::query(
                        r#"
                        INSERT INTO assistant_messages
                          (message_id, resource_id, thread_id, role, content, created_at)
                        VALUES
                          ($1, $2, $3, $4, $5, $6)
                        "#,
                    )
                    .bind(msg.message_id)
                    .bind(key.resource_id)
                    .bind(key.thread_id)
                    .bind(msg.role.as_str())
                    .bind(&msg.content)
                    .bind(msg.timestamp)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::Database(format!("Failed to insert conversation message: {}", e))
                    })?;
                }

                tx.commit().await.map_err(|e| {
                    AppError::Database(format!(
                        "Failed to commit conversation history transaction: {}",
                        e
                    ))
                })?;

                Ok(())
            }
        }
    }
}
