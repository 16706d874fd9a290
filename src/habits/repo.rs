use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Persistence seam for habit records. Names must be non-empty; the store
/// enforces that, not the handler.
#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn create(&self, user_id: Uuid, name: &str) -> anyhow::Result<Habit>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Habit>>;
}

pub struct PgHabitStore {
    db: PgPool,
}

impl PgHabitStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HabitStore for PgHabitStore {
    async fn create(&self, user_id: Uuid, name: &str) -> anyhow::Result<Habit> {
        // Empty names fail the table's CHECK constraint.
        let habit = sqlx::query_as::<_, Habit>(
            r#"
            INSERT INTO habits (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.db)
        .await
        .context("insert habit")?;
        Ok(habit)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Habit>> {
        let rows = sqlx::query_as::<_, Habit>(
            r#"
            SELECT id, user_id, name, created_at
            FROM habits
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list habits")?;
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemHabitStore {
    rows: Mutex<Vec<Habit>>,
}

#[async_trait]
impl HabitStore for MemHabitStore {
    async fn create(&self, user_id: Uuid, name: &str) -> anyhow::Result<Habit> {
        if name.is_empty() {
            anyhow::bail!("habit name must not be empty");
        }
        let habit = Habit {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        let mut rows = self.rows.lock().expect("habit store lock");
        rows.push(habit.clone());
        Ok(habit)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Habit>> {
        let rows = self.rows.lock().expect("habit store lock");
        Ok(rows
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }
}
