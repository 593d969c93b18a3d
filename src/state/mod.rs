//! Local deployment state.
//!
//! This module persists what has been provisioned for a project so repeated
//! deploys update existing resources instead of duplicating them.

mod local;
mod lock;
mod store;
mod types;

pub use local::{LocalStateStore, STATE_DIR};
pub use lock::{LOCK_EXPIRY_SECS, LockInfo, generate_holder_id};
#[cfg(test)]
pub use store::MockStateStore;
pub use store::StateStore;
pub use types::{
    ApplicationState, DeployHistoryEntry, DomainState, FunctionState, LocalState,
    MAX_HISTORY_ENTRIES, NamedResource, OriginState, RuleRef, RulesEngineState, STATE_VERSION,
};
