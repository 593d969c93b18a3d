// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Edge Deploy
//!
//! An idempotent deployment orchestrator for edge-compute platforms.
//!
//! ## Overview
//!
//! A project declares what it needs in a manifest; `edge-deploy` provisions it
//! in a fixed order and records every platform-assigned ID in local state, so
//! running a deploy twice never creates anything twice:
//!
//! - An edge application with a default origin
//! - A storage bucket for static assets
//! - The project's function, attached to the application
//! - Rules engine rules routing traffic to origins or the function
//! - A domain the project is served on
//!
//! ## Modules
//!
//! - [`manifest`]: Manifest discovery, parsing and validation
//! - [`state`]: Local state storage and locking
//! - [`platform`]: Platform capability traits, REST client and uploader
//! - [`deploy`]: The deploy pipeline
//! - [`settings`]: Credentials and endpoints from the environment
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! origins:
//!   - name: main
//!     addresses: ["www.shop.example"]
//! rules:
//!   - name: api
//!     criteria:
//!       - - variable: "${uri}"
//!           operator: starts_with
//!           conditional: if
//!           input_value: /api
//!     behaviors:
//!       - name: set_origin
//!         target: main
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod deploy;
pub mod error;
pub mod manifest;
pub mod platform;
pub mod settings;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use deploy::{DeployOptions, DeployResult, Orchestrator, Step};
pub use error::{EdgeDeployError, Result};
pub use manifest::{Manifest, ManifestLoader, ManifestValidator};
pub use platform::{Clients, PlatformClient};
pub use settings::PlatformSettings;
pub use state::{LocalState, LocalStateStore, StateStore};
