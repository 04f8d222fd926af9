//! Scenario run report.
//!
//! The driver appends to a [`ScenarioReport`] as it goes: one [`StepRecord`]
//! per administrative call, one [`Listing`] per app listing and one
//! [`TeardownRecord`] per stopped component. `--report` writes it as JSON.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use keyfault_conductor_admin::AppInfo;
use keyfault_signing_proxy::ProxyStatsSnapshot;

use crate::stage::ScenarioStage;

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed {
        error: String,
        /// True if the step is a probe whose failure does not abort the run.
        expected: bool,
    },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub stage: ScenarioStage,
    pub step: String,
    pub outcome: StepOutcome,
}

/// App listing taken at a labelled point of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub label: String,
    pub apps: Vec<AppInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownRecord {
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything observed during one run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub run_id: Uuid,
    /// Last stage entered before the run finished or failed.
    pub reached: ScenarioStage,
    /// True if every stage up to and including reporting completed.
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Agent identities in generation order, hex encoded.
    pub agents: Vec<String>,
    pub steps: Vec<StepRecord>,
    pub listings: Vec<Listing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyStatsSnapshot>,
    pub teardown: Vec<TeardownRecord>,
    pub duration_ms: u64,
}

impl Default for ScenarioReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            reached: ScenarioStage::Init,
            completed: false,
            error: None,
            agents: Vec::new(),
            steps: Vec::new(),
            listings: Vec::new(),
            proxy: None,
            teardown: Vec::new(),
            duration_ms: 0,
        }
    }

    pub(crate) fn enter(&mut self, stage: ScenarioStage) {
        self.reached = stage;
    }

    pub(crate) fn record(&mut self, stage: ScenarioStage, step: impl Into<String>, outcome: StepOutcome) {
        self.steps.push(StepRecord {
            stage,
            step: step.into(),
            outcome,
        });
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    /// Finds the record of `step`, if that step ran.
    pub fn step(&self, step: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.step == step)
    }

    pub fn listing(&self, label: &str) -> Option<&Listing> {
        self.listings.iter().find(|listing| listing.label == label)
    }

    /// Records of steps that failed unexpectedly.
    pub fn unexpected_failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|record| {
            matches!(record.outcome, StepOutcome::Failed { expected: false, .. })
        })
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
