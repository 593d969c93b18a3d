//! Deploy pipeline.
//!
//! A deploy walks the fixed sequence of `Step`s, consulting local state to
//! decide whether each resource is created, updated or left alone:
//!
//! 1. Application
//! 2. Default origin
//! 3. Project bucket
//! 4. Function and its instance
//! 5. Default rule (first run only)
//! 6. Default rule set (unless rules are declared or tracked)
//! 7. Static asset upload
//! 8. Remaining manifest resources
//! 9. Domain

pub mod mapping;
pub mod naming;
mod options;
mod orchestrator;
mod result;
pub mod step;

pub use options::{DEFAULT_ARTIFACT, DEFAULT_STATIC_DIR, DeployOptions};
pub use orchestrator::Orchestrator;
pub use result::{DeployResult, StepOutcome, StepPreview, StepReport};
pub use step::Step;

#[cfg(test)]
mod tests;
