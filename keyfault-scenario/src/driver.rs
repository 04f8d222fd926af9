//! Scenario driver.
//!
//! [`Driver::run`] walks the stages of [`ScenarioStage`] in order:
//!
//! 1. prepare the scratch and log directories
//! 2. start the keystore and wait for its socket
//! 3. start the signing proxy in front of it and wait for its socket
//! 4. start the conductor and wait for its admin interface
//! 5. generate three agents, install and activate apps for the first two
//! 6. denylist agent 2 and probe the calls that now need its signature
//! 7. install and activate an app for agent 3 through the healthy path
//! 8. list the installed apps
//!
//! Whatever happens, everything that was started is torn down afterwards,
//! including when the run is cut short by SIGTERM or SIGINT.
//! Probe failures are recorded and the run continues; any other failure ends
//! the run and is stored in the report.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info, warn};

use keyfault_conductor_admin::{AdminError, ConductorAdmin, InstallAppBundle};
use keyfault_core::AgentIdentity;
use keyfault_core::config::KeyfaultConfig;
use keyfault_core::error::KeyfaultError;
use keyfault_signing_proxy::{Denylist, DenylistPolicy, ProxyConfig, ProxyHandle, SigningProxy};
use keyfault_supervisor::{ReadinessPolicy, probe_unix_socket, wait_until_ready};

use crate::backend::ScenarioBackend;
use crate::error::ScenarioError;
use crate::report::{Listing, ScenarioReport, StepOutcome};
use crate::shutdown::shutdown_signal;
use crate::stage::ScenarioStage;
use crate::teardown::Teardown;

/// Number of agents generated up front.
const AGENT_COUNT: usize = 3;

pub struct Driver<B> {
    config: KeyfaultConfig,
    backend: B,
    denylist: Denylist,
}

impl<B: ScenarioBackend> Driver<B> {
    pub fn new(config: KeyfaultConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            denylist: Denylist::new(),
        }
    }

    pub fn config(&self) -> &KeyfaultConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Denylist consulted by the signing proxy.
    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Runs the scenario to completion, first fatal error or SIGTERM/SIGINT,
    /// then tears down.
    pub async fn run(&self) -> ScenarioReport {
        self.run_until(shutdown_signal()).await
    }

    /// Like [`Driver::run`], but stops early when `shutdown` resolves with a
    /// signal name. Teardown still runs.
    pub async fn run_until<S>(&self, shutdown: S) -> ScenarioReport
    where
        S: Future<Output = &'static str>,
    {
        let started = Instant::now();
        let mut report = ScenarioReport::new();
        let mut teardown = Teardown::new();
        let mut proxy = None;

        info!(run_id = %report.run_id, "scenario starting");
        let result = tokio::select! {
            result = self.execute(&mut report, &mut teardown, &mut proxy) => result,
            signal = shutdown => Err(ScenarioError::Interrupted { signal }),
        };
        match result {
            Ok(()) => {
                report.completed = true;
                info!(run_id = %report.run_id, "scenario completed");
            }
            Err(e) => {
                if let ScenarioError::Interrupted { signal } = &e {
                    let stage = report.reached.next().unwrap_or(report.reached);
                    warn!(run_id = %report.run_id, stage = %stage, signal = *signal, "scenario interrupted");
                    report.record(
                        stage,
                        "interrupted",
                        StepOutcome::Failed {
                            error: e.to_string(),
                            expected: false,
                        },
                    );
                }
                error!(
                    run_id = %report.run_id,
                    stage = %report.reached,
                    error = %e,
                    "scenario aborted"
                );
                report.error = Some(e.to_string());
            }
        }

        if !teardown.is_empty() {
            let settle = self.config.scenario.settle_before_teardown();
            info!(settle_ms = settle.as_millis() as u64, "settling before teardown");
            tokio::time::sleep(settle).await;
        }

        report.enter(ScenarioStage::Teardown);
        report.teardown = teardown.run().await;
        if let Some(proxy) = proxy {
            report.proxy = Some(proxy.stats());
        }
        report.set_elapsed(started.elapsed());
        info!(
            run_id = %report.run_id,
            completed = report.completed,
            duration_ms = report.duration_ms,
            "teardown finished"
        );
        report
    }

    async fn execute(
        &self,
        report: &mut ScenarioReport,
        teardown: &mut Teardown,
        proxy_slot: &mut Option<Arc<ProxyHandle>>,
    ) -> Result<(), ScenarioError> {
        let proofs = self
            .config
            .scenario
            .decoded_membrane_proofs()
            .map_err(KeyfaultError::from)?;
        self.prepare_directories().await?;
        report.enter(ScenarioStage::Init);

        // keystore
        teardown.set_keystore(self.backend.launch_keystore(&self.config).await?);
        let keystore_socket = self.config.keystore_socket();
        wait_until_ready(
            "keystore socket",
            self.readiness(self.config.readiness.keystore_deadline_ms),
            || probe_unix_socket(&keystore_socket),
        )
        .await?;
        report.enter(ScenarioStage::KeystoreUp);

        // proxy
        let policy = DenylistPolicy::new(self.denylist.clone());
        let proxy_config = ProxyConfig::from_core(&self.config);
        let proxy = Arc::new(SigningProxy::start(proxy_config, policy).await?);
        *proxy_slot = Some(Arc::clone(&proxy));
        teardown.set_proxy(Box::new(Arc::clone(&proxy)));
        wait_until_ready(
            "proxy socket",
            self.readiness(self.config.readiness.proxy_deadline_ms),
            || probe_unix_socket(proxy.local_path()),
        )
        .await?;
        report.enter(ScenarioStage::ProxyUp);

        // conductor
        teardown.set_conductor(self.backend.launch_conductor(&self.config).await?);
        let admin = wait_until_ready(
            "conductor admin",
            self.readiness(self.config.readiness.conductor_deadline_ms),
            || self.backend.connect_admin(&self.config),
        )
        .await?;
        report.enter(ScenarioStage::ConductorUp);

        self.run_steps(&admin, &proofs, report).await
    }

    async fn run_steps<A: ConductorAdmin>(
        &self,
        admin: &A,
        proofs: &BTreeMap<String, Vec<u8>>,
        report: &mut ScenarioReport,
    ) -> Result<(), ScenarioError> {
        let scenario = &self.config.scenario;
        let install = |n: usize, agent: &AgentIdentity| {
            InstallAppBundle::new(
                scenario.app_id(n),
                agent.clone(),
                proofs.clone(),
                scenario.bundle_path.clone(),
            )
        };

        let mut agents = Vec::with_capacity(AGENT_COUNT);
        for n in 1..=AGENT_COUNT {
            let stage = ScenarioStage::AgentsGenerated;
            let step = format!("generate agent {n}");
            let agent = required(report, stage, step, admin.generate_agent_pub_key()).await?;
            info!(agent = n, key = %agent.key().short_hex(), "agent generated");
            report.agents.push(agent.to_string());
            agents.push(agent);
        }
        report.enter(ScenarioStage::AgentsGenerated);

        for (n, agent, installed, activated) in [
            (1, &agents[0], ScenarioStage::App1Installed, ScenarioStage::App1Activated),
            (2, &agents[1], ScenarioStage::App2Installed, ScenarioStage::App2Activated),
        ] {
            let app_id = scenario.app_id(n);
            let payload = install(n, agent);
            let step = format!("install {app_id}");
            required(report, installed, step, admin.install_app_bundle(payload)).await?;
            report.enter(installed);

            let step = format!("activate {app_id}");
            required(report, activated, step, admin.activate_app(&app_id)).await?;
            report.enter(activated);
        }

        let denied = agents[1].key();
        self.denylist.insert(denied);
        info!(key = %denied.short_hex(), "signing disabled for agent 2");
        report.record(
            ScenarioStage::FaultInjected,
            "deny agent 2",
            StepOutcome::Succeeded,
        );
        report.enter(ScenarioStage::FaultInjected);

        let app2 = scenario.app_id(2);
        let stage = ScenarioStage::App2DeactivateAttempted;
        let step = format!("deactivate {app2}");
        probe(report, stage, step, admin.deactivate_app(&app2)).await;
        report.enter(stage);
        listing(admin, report, stage, "after-deactivate").await?;

        let app3 = scenario.app_id(3);
        let stage = ScenarioStage::App3InstallAttempted;
        let payload = install(3, &agents[2]);
        probe(report, stage, format!("install {app3}"), admin.install_app_bundle(payload)).await;
        report.enter(stage);

        let stage = ScenarioStage::App3ActivateAttempted;
        probe(report, stage, format!("activate {app3}"), admin.activate_app(&app3)).await;
        report.enter(stage);

        listing(admin, report, ScenarioStage::Reporting, "final").await?;
        report.enter(ScenarioStage::Reporting);
        Ok(())
    }

    fn readiness(&self, deadline_ms: u64) -> ReadinessPolicy {
        ReadinessPolicy::from_core(&self.config.readiness, deadline_ms)
    }

    /// Recreates the scratch root and its proxy directory, and makes sure the
    /// log directory exists. The keystore creates its own data directory.
    async fn prepare_directories(&self) -> Result<(), ScenarioError> {
        let scratch = &self.config.paths.scratch_dir;
        match tokio::fs::remove_dir_all(scratch).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ScenarioError::setup(scratch, e)),
        }

        let log_dir = &self.config.paths.log_dir;
        for dir in [scratch, &self.config.proxy_dir(), log_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ScenarioError::setup(dir, e))?;
        }
        info!(
            scratch = %scratch.display(),
            log_dir = %log_dir.display(),
            "scratch directory prepared"
        );
        Ok(())
    }
}

/// Runs a step whose failure ends the run.
async fn required<T>(
    report: &mut ScenarioReport,
    stage: ScenarioStage,
    step: String,
    call: impl Future<Output = Result<T, AdminError>>,
) -> Result<T, ScenarioError> {
    match call.await {
        Ok(value) => {
            info!(stage = %stage, step = step.as_str(), "step succeeded");
            report.record(stage, step, StepOutcome::Succeeded);
            Ok(value)
        }
        Err(e) => {
            error!(stage = %stage, step = step.as_str(), error = %e, "step failed");
            report.record(
                stage,
                step.clone(),
                StepOutcome::Failed {
                    error: e.to_string(),
                    expected: false,
                },
            );
            Err(ScenarioError::rpc(step, e))
        }
    }
}

/// Runs a step whose outcome is observed, not enforced.
async fn probe(
    report: &mut ScenarioReport,
    stage: ScenarioStage,
    step: String,
    call: impl Future<Output = Result<(), AdminError>>,
) {
    let outcome = match call.await {
        Ok(()) => {
            info!(stage = %stage, step = step.as_str(), "probe succeeded");
            StepOutcome::Succeeded
        }
        Err(e) => {
            warn!(
                stage = %stage,
                step = step.as_str(),
                rejected_by_conductor = e.is_conductor_rejection(),
                error = %e,
                "probe failed"
            );
            StepOutcome::Failed {
                error: e.to_string(),
                expected: stage.is_probe(),
            }
        }
    };
    report.record(stage, step, outcome);
}

async fn listing<A: ConductorAdmin>(
    admin: &A,
    report: &mut ScenarioReport,
    stage: ScenarioStage,
    label: &str,
) -> Result<(), ScenarioError> {
    let step = format!("list apps ({label})");
    let apps = required(report, stage, step, admin.list_apps()).await?;
    for app in &apps {
        info!(
            label,
            app_id = app.installed_app_id.as_str(),
            status = %app.status,
            "installed app"
        );
    }
    report.listings.push(Listing {
        label: label.to_owned(),
        apps,
    });
    Ok(())
}
