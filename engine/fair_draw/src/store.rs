//! Persistence contract.
//!
//! The engine never touches storage itself. A session layer owns an
//! implementation of [`LotteryStore`] and calls it around engine operations.
//! Implementations decide the medium and any retry policy; callers treat
//! every method as a single attempt that may fail.

use std::future::Future;

use crate::types::LotteryState;

pub trait LotteryStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist `state`, replacing the previous snapshot.
    fn save(&self, state: &LotteryState) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Last saved snapshot, or `None` on first run.
    fn load(&self) -> impl Future<Output = Result<Option<LotteryState>, Self::Error>> + Send;

    /// Take a point-in-time copy of the current snapshot and return an
    /// opaque locator for it.
    fn backup(&self) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Make the copy at `locator` the current snapshot.
    fn restore(&self, locator: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
