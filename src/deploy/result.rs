//! Deploy run results.

use serde::Serialize;

use super::step::Step;

/// What a step ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Created remote resources.
    Created,
    /// Updated existing remote resources.
    Updated,
    /// Took over an externally managed resource.
    Adopted,
    /// Ran without creating or updating anything tracked.
    Completed,
    /// Gate closed; nothing was done.
    Skipped,
}

impl StepOutcome {
    /// Returns true if the step performed remote work.
    #[must_use]
    pub const fn did_work(self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Adopted => "adopted",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        };
        write!(f, "{outcome}")
    }
}

/// One step's report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Step.
    pub step: Step,
    /// Outcome.
    pub outcome: StepOutcome,
    /// Human-readable detail.
    pub detail: String,
}

/// A step as `preview` expects it to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepPreview {
    /// Step.
    pub step: Step,
    /// Expected outcome.
    pub outcome: StepOutcome,
    /// What would happen.
    pub detail: String,
}

/// Result of a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployResult {
    /// Domain the project is served on.
    pub domain_name: String,
    /// `https://` URL of the domain.
    pub url: String,
    /// Per-step reports, in execution order.
    pub steps: Vec<StepReport>,
    /// Non-fatal problems, such as state that could not be saved.
    pub warnings: Vec<String>,
}

impl DeployResult {
    /// Report of a given step.
    #[must_use]
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|r| r.step == step)
    }

    /// Steps that performed remote work.
    pub fn worked_steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps
            .iter()
            .filter(|r| r.outcome.did_work())
            .map(|r| r.step)
    }
}
