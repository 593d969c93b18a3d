//! Declarative resource manifest.
//!
//! This module handles locating, parsing and validating the manifest that
//! describes the resources a project needs on the edge platform.

pub mod parser;
pub mod schema;
pub mod validator;

pub use parser::{DEFAULT_MANIFEST_FILES, ManifestFormat, ManifestLoader};
pub use schema::*;
pub use validator::{ManifestValidator, ValidationError, ValidationResult};
