//! Database layer — migrations, the state snapshot, and backups.

use std::str::FromStr;

use chrono::Utc;
use fair_draw::{validate_state, LotteryState, LotteryStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::errors::{Result, ServerError};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // An in-memory database lives and dies with its connection.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// [`LotteryStore`] backed by SQLite. The whole state is one JSON document.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn current_payload(&self) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT payload FROM lottery_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(payload,)| payload))
    }

    async fn write_payload(&self, payload: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO lottery_state (id, payload, updated_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET payload = excluded.payload,
                                          updated_at = excluded.updated_at
            "#,
        )
        .bind(payload)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Locators of all backups, newest first.
    pub async fn list_backups(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT locator FROM backups ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(l,)| l).collect())
    }
}

// ─────────────────────────────────────────────────────────
// Persistence contract
// ─────────────────────────────────────────────────────────

impl LotteryStore for SqliteStore {
    type Error = ServerError;

    async fn save(&self, state: &LotteryState) -> Result<()> {
        let payload = serde_json::to_string(state)?;
        self.write_payload(&payload).await?;
        info!(
            "Lottery state saved (cycle {}, {} in history)",
            state.current_cycle.id,
            state.history.len()
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<LotteryState>> {
        let Some(payload) = self.current_payload().await? else {
            info!("No saved lottery state; caller will start fresh");
            return Ok(None);
        };
        let state: LotteryState = serde_json::from_str(&payload).map_err(|e| {
            error!("Saved lottery state is corrupt: {e}");
            e
        })?;
        Ok(Some(state))
    }

    async fn backup(&self) -> Result<String> {
        let now = Utc::now();
        // Copy and sequence number in one statement, under one write lock.
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO backups (locator, payload, created_at)
            SELECT ?1 || (SELECT COALESCE(MAX(id), 0) + 1 FROM backups), payload, ?2
            FROM lottery_state
            WHERE id = 1
            RETURNING locator
            "#,
        )
        .bind(format!("backup_{}_", now.format("%Y%m%d_%H%M%S")))
        .bind(now.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;
        let (locator,) = row.ok_or(ServerError::NothingToBackup)?;

        info!("Lottery state backed up as {locator}");
        Ok(locator)
    }

    async fn restore(&self, locator: &str) -> Result<()> {
        let row: Option<(String,)> = sqlx::query_as("SELECT payload FROM backups WHERE locator = ?1")
            .bind(locator)
            .fetch_optional(&self.pool)
            .await?;
        let (payload,) = row.ok_or_else(|| ServerError::BackupNotFound(locator.to_string()))?;

        // Refuse to restore anything the engine could not continue from.
        let state: LotteryState = serde_json::from_str(&payload)?;
        validate_state(&state)?;

        self.write_payload(&payload).await?;
        info!("Lottery state restored from {locator}");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use fair_draw::DrawEngine;

    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::new(init_pool("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn first_run_loads_nothing() {
        let store = store().await;
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_state_loads_back() {
        let store = store().await;
        let mut engine = DrawEngine::new();
        let mut state = LotteryState::with_defaults(0);
        for _ in 0..8 {
            state = engine.draw(&state).unwrap().state;
        }

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn backup_needs_saved_state() {
        let store = store().await;
        assert!(matches!(
            store.backup().await,
            Err(ServerError::NothingToBackup)
        ));
    }

    #[tokio::test]
    async fn restore_brings_back_the_backed_up_state() {
        let store = store().await;
        let mut engine = DrawEngine::new();
        let early = engine.draw(&LotteryState::with_defaults(0)).unwrap().state;
        store.save(&early).await.unwrap();

        let locator = store.backup().await.unwrap();
        assert!(locator.starts_with("backup_"));

        let later = engine.draw(&early).unwrap().state;
        store.save(&later).await.unwrap();
        assert_eq!(store.load().await.unwrap().as_ref(), Some(&later));

        store.restore(&locator).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(early));
    }

    #[tokio::test]
    async fn backups_get_distinct_locators() {
        let store = store().await;
        store.save(&LotteryState::with_defaults(0)).await.unwrap();

        let a = store.backup().await.unwrap();
        let b = store.backup().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list_backups().await.unwrap(), vec![b, a]);
    }

    #[tokio::test]
    async fn concurrent_backups_both_succeed() {
        let store = store().await;
        store.save(&LotteryState::with_defaults(0)).await.unwrap();

        let (a, b) = tokio::join!(store.backup(), store.backup());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a, b);
        assert_eq!(store.list_backups().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_locator_is_reported() {
        let store = store().await;
        assert!(matches!(
            store.restore("backup_19700101_000000_9").await,
            Err(ServerError::BackupNotFound(l)) if l == "backup_19700101_000000_9"
        ));
    }

    #[tokio::test]
    async fn inconsistent_backup_is_not_restored() {
        let store = store().await;
        let mut broken = LotteryState::with_defaults(0);
        broken.config.draws_per_cycle = 5;
        store.save(&broken).await.unwrap();
        let locator = store.backup().await.unwrap();

        let good = LotteryState::with_defaults(1);
        store.save(&good).await.unwrap();

        assert!(matches!(
            store.restore(&locator).await,
            Err(ServerError::InvalidState(_))
        ));
        assert_eq!(store.load().await.unwrap(), Some(good));
    }
}
