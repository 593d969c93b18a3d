//! Immutable options for a deploy run.

use std::path::{Path, PathBuf};

/// Default static asset directory, relative to the project.
pub const DEFAULT_STATIC_DIR: &str = ".edge/storage";

/// Default build artifact registered as the function, relative to the project.
pub const DEFAULT_ARTIFACT: &str = ".edge/worker.js";

/// Options fixed for the duration of a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    /// Project root.
    pub project_dir: PathBuf,
    /// Static asset directory, relative to the project unless absolute.
    pub static_dir: PathBuf,
    /// Function artifact, relative to the project unless absolute.
    pub artifact: PathBuf,
    /// Preset override; falls back to the preset recorded in state.
    pub preset: Option<String>,
    /// Template override; falls back to the template recorded in state.
    pub template: Option<String>,
    /// Attach the function to the edge firewall instead of the application.
    pub firewall: bool,
    /// Run without interactive confirmation.
    pub auto: bool,
}

impl DeployOptions {
    /// Creates default options for a project.
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            artifact: PathBuf::from(DEFAULT_ARTIFACT),
            preset: None,
            template: None,
            firewall: false,
            auto: false,
        }
    }

    /// Sets the static asset directory.
    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    /// Sets the function artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.artifact = artifact.into();
        self
    }

    /// Overrides the preset.
    #[must_use]
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    /// Overrides the template the project was generated from.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Targets the edge firewall.
    #[must_use]
    pub const fn with_firewall(mut self, firewall: bool) -> Self {
        self.firewall = firewall;
        self
    }

    /// Skips confirmation prompts.
    #[must_use]
    pub const fn with_auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    /// Absolute path of the static asset directory.
    #[must_use]
    pub fn static_path(&self) -> PathBuf {
        self.resolve(&self.static_dir)
    }

    /// Absolute path of the function artifact.
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.resolve(&self.artifact)
    }

    /// Resolves a path against the project directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    /// Function initiator type for the platform.
    #[must_use]
    pub const fn initiator_type(&self) -> &'static str {
        if self.firewall {
            "edge_firewall"
        } else {
            "edge_application"
        }
    }
}
