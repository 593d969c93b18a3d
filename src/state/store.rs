//! State store trait definition.

use async_trait::async_trait;

use super::lock::LockInfo;
use super::types::LocalState;
use crate::error::Result;

/// Trait for state storage backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the project state.
    ///
    /// Returns `None` if the project has never been deployed.
    async fn load(&self) -> Result<Option<LocalState>>;

    /// Saves the project state.
    async fn save(&self, state: &LocalState) -> Result<()>;

    /// Checks if state exists.
    async fn exists(&self) -> Result<bool>;

    /// Acquires the deploy lock.
    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo>;

    /// Releases the deploy lock if `lock_id` still holds it.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Removes the lock regardless of holder.
    async fn force_unlock(&self) -> Result<()>;

    /// Gets current lock information if locked.
    async fn get_lock_info(&self) -> Result<Option<LockInfo>>;

    /// Checks if the state is locked by an unexpired lock.
    async fn is_locked(&self) -> Result<bool>;
}
