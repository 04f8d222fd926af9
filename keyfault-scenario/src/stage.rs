//! Scenario stages.

use std::fmt;

use serde::Serialize;

/// Linear sequence of scenario stages.
///
/// A run enters stages in declaration order until it finishes or fails;
/// [`ScenarioStage::Teardown`] is always entered last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStage {
    Init,
    KeystoreUp,
    ProxyUp,
    ConductorUp,
    AgentsGenerated,
    App1Installed,
    App1Activated,
    App2Installed,
    App2Activated,
    FaultInjected,
    App2DeactivateAttempted,
    App3InstallAttempted,
    App3ActivateAttempted,
    Reporting,
    Teardown,
}

impl ScenarioStage {
    pub const ALL: [ScenarioStage; 15] = [
        Self::Init,
        Self::KeystoreUp,
        Self::ProxyUp,
        Self::ConductorUp,
        Self::AgentsGenerated,
        Self::App1Installed,
        Self::App1Activated,
        Self::App2Installed,
        Self::App2Activated,
        Self::FaultInjected,
        Self::App2DeactivateAttempted,
        Self::App3InstallAttempted,
        Self::App3ActivateAttempted,
        Self::Reporting,
        Self::Teardown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::KeystoreUp => "keystore_up",
            Self::ProxyUp => "proxy_up",
            Self::ConductorUp => "conductor_up",
            Self::AgentsGenerated => "agents_generated",
            Self::App1Installed => "app1_installed",
            Self::App1Activated => "app1_activated",
            Self::App2Installed => "app2_installed",
            Self::App2Activated => "app2_activated",
            Self::FaultInjected => "fault_injected",
            Self::App2DeactivateAttempted => "app2_deactivate_attempted",
            Self::App3InstallAttempted => "app3_install_attempted",
            Self::App3ActivateAttempted => "app3_activate_attempted",
            Self::Reporting => "reporting",
            Self::Teardown => "teardown",
        }
    }

    /// Stage that follows this one, `None` for [`ScenarioStage::Teardown`].
    pub fn next(self) -> Option<Self> {
        let index = Self::ALL.iter().position(|stage| *stage == self)?;
        Self::ALL.get(index + 1).copied()
    }

    /// True for stages whose failure is recorded without aborting the run.
    pub fn is_probe(&self) -> bool {
        matches!(
            self,
            Self::App2DeactivateAttempted | Self::App3InstallAttempted | Self::App3ActivateAttempted
        )
    }
}

impl fmt::Display for ScenarioStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
