//! The live lottery session: one state, one engine, one store.
//!
//! Every mutation follows the same order: compute the next state, persist it,
//! then swap it in. A failed save leaves the in-memory state untouched, so
//! what clients see is always what was last committed.

use std::sync::Mutex;

use chrono::Utc;
use fair_draw::{
    default_catalog, initialize_new_cycle, validate_state, DrawEngine, DrawResult, LotteryConfig,
    LotteryState, LotteryStore,
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::db::SqliteStore;
use crate::errors::{Result, ServerError};

pub struct Session<S> {
    store: S,
    state: RwLock<LotteryState>,
    engine: Mutex<DrawEngine>,
}

impl<S> Session<S>
where
    S: LotteryStore<Error = ServerError>,
{
    /// Load the saved state, or create and save a fresh one on first run.
    pub async fn open(store: S, defaults: LotteryConfig) -> Result<Self> {
        let state = match store.load().await? {
            Some(state) => {
                validate_state(&state)?;
                info!(
                    "Resumed cycle {} ({} draws, {} cycles in history)",
                    state.current_cycle.id,
                    state.current_cycle.results.len(),
                    state.history.len()
                );
                state
            }
            None => {
                let state = LotteryState::new(default_catalog(), defaults, Utc::now().timestamp_millis());
                store.save(&state).await?;
                info!("Started fresh lottery with cycle {}", state.current_cycle.id);
                state
            }
        };

        Ok(Self {
            store,
            state: RwLock::new(state),
            engine: Mutex::new(DrawEngine::new()),
        })
    }

    /// Current committed state.
    pub async fn snapshot(&self) -> LotteryState {
        self.state.read().await.clone()
    }

    /// Draw, persist, then publish. Returns the result and the new state.
    ///
    /// Accounting failures are logged with the whole cycle and answered by
    /// forcing a new cycle; the original error is still returned unless the
    /// new cycle cannot be saved, in which case both are logged and the
    /// storage error wins.
    pub async fn draw(&self) -> Result<(DrawResult, LotteryState)> {
        let mut current = self.state.write().await;

        let outcome = {
            let mut engine = self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            engine.draw(&current)
        };

        match outcome {
            Ok(drawn) => {
                self.store.save(&drawn.state).await?;
                *current = drawn.state.clone();
                Ok((drawn.result, drawn.state))
            }
            Err(e) if e.is_invariant_violation() => {
                error!(
                    cycle = ?current.current_cycle,
                    "Draw accounting broken: {e}; forcing a new cycle"
                );
                let fresh = initialize_new_cycle(&current);
                if let Err(save_err) = self.store.save(&fresh).await {
                    error!("Replacement cycle not saved after {e}: {save_err}");
                    return Err(save_err);
                }
                *current = fresh;
                Err(e.into())
            }
            Err(e) => {
                warn!("Draw refused: {e}");
                Err(e.into())
            }
        }
    }

    /// Abandon the current cycle and start a new one. History is unchanged.
    pub async fn new_cycle(&self) -> Result<LotteryState> {
        let mut current = self.state.write().await;
        let next = initialize_new_cycle(&current);
        self.store.save(&next).await?;
        *current = next.clone();
        Ok(next)
    }

    pub async fn backup(&self) -> Result<String> {
        // Hold the read lock so no draw lands between snapshot and copy.
        let _guard = self.state.read().await;
        self.store.backup().await
    }

    /// Restore a backup and make it the live state.
    pub async fn restore(&self, locator: &str) -> Result<LotteryState> {
        let mut current = self.state.write().await;
        self.store.restore(locator).await?;
        let restored = self
            .store
            .load()
            .await?
            .ok_or_else(|| ServerError::BackupNotFound(locator.to_string()))?;
        *current = restored.clone();
        info!("Session now on cycle {}", restored.current_cycle.id);
        Ok(restored)
    }

    /// Whether the persisted snapshot is consistent. No snapshot counts as valid.
    pub async fn validate_saved(&self) -> Result<bool> {
        let saved = match self.store.load().await {
            Ok(saved) => saved,
            Err(ServerError::Json(e)) => {
                warn!("Saved state does not parse: {e}");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        match saved {
            None => Ok(true),
            Some(state) => match validate_state(&state) {
                Ok(()) => Ok(true),
                Err(violation) => {
                    warn!("Saved state failed validation: {violation}");
                    Ok(false)
                }
            },
        }
    }
}

impl Session<SqliteStore> {
    /// Backup locators, newest first.
    pub async fn list_backups(&self) -> Result<Vec<String>> {
        self.store.list_backups().await
    }
}
