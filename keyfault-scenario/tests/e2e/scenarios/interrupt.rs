//! Shutdown signals: a run cut short still tears everything down.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, Instant};

use keyfault_scenario::{Driver, ScenarioStage, StepOutcome};

use crate::helpers::backend::{Faults, InProcessBackend};
use crate::helpers::config::test_config;

#[tokio::test]
async fn signal_during_conductor_wait_still_tears_down() {
    // Given: a conductor whose admin interface never comes up before a long deadline
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.readiness.conductor_deadline_ms = 30_000;
    let proxy_socket = config.proxy_socket();
    let backend = InProcessBackend::with_faults(Faults {
        admin_never_listens: true,
        ..Faults::default()
    });
    let driver = Driver::new(config, backend);

    // When: a shutdown signal arrives while the driver waits for it
    let started = Instant::now();
    let report = driver
        .run_until(async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "SIGTERM"
        })
        .await;

    // Then: the wait is abandoned and every started component is stopped
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!report.completed);
    assert_eq!(report.reached, ScenarioStage::Teardown);
    assert_eq!(report.error.as_deref(), Some("interrupted by SIGTERM"));

    let step = report.step("interrupted").unwrap();
    assert_eq!(step.stage, ScenarioStage::ConductorUp);
    assert!(matches!(
        step.outcome,
        StepOutcome::Failed { expected: false, .. }
    ));
    assert_eq!(report.unexpected_failures().count(), 1);

    let order: Vec<&str> = report.teardown.iter().map(|r| r.component.as_str()).collect();
    assert_eq!(order, vec!["signing-proxy", "conductor", "keystore"]);
    assert!(report.teardown.iter().all(|r| r.error.is_none()));
    assert!(driver.backend().keystore().is_stopped());
    assert!(driver.backend().conductor().is_stopped());
    assert!(!proxy_socket.exists());
}

#[tokio::test]
async fn signal_after_completion_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Driver::new(test_config(dir.path()), InProcessBackend::new());

    let report = driver
        .run_until(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "SIGINT"
        })
        .await;

    assert!(report.completed, "unexpected error: {:?}", report.error);
    assert!(report.step("interrupted").is_none());
}

/// Keystore stand-in that records its pid in its third argument and never
/// binds a socket.
fn write_keystore_script(path: &Path) {
    std::fs::write(path, "#!/bin/sh\necho $$ > \"$3\"\nexec sleep 60\n").unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn process_exists(pid: i32) -> bool {
    // SAFETY: signal 0 only checks that the pid exists.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[tokio::test]
async fn sigterm_to_the_binary_terminates_its_children() {
    // Given: the binary waiting on a keystore that never listens
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let script = root.join("fake-keystore.sh");
    write_keystore_script(&script);
    let pid_file = root.join("keystore.pid");
    let report_path = root.join("report.json");
    let config_path = root.join("keyfault.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[general]
log_level = "debug"

[paths]
scratch_dir = "{scratch}"
log_dir = "{log}"

[keystore]
command = "{script}"
extra_args = ["{pid}"]
grace_period_ms = 1000

[readiness]
initial_delay_ms = 20
max_delay_ms = 100
keystore_deadline_ms = 60000

[scenario]
settle_before_teardown_ms = 0
"#,
            scratch = root.join("tmp").display(),
            log = root.join("log").display(),
            script = script.display(),
            pid = pid_file.display(),
        ),
    )
    .unwrap();

    let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_keyfault-scenario"))
        .arg("--config")
        .arg(&config_path)
        .arg("--report")
        .arg(&report_path)
        .current_dir(root)
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let keystore_pid = loop {
        if let Ok(text) = std::fs::read_to_string(&pid_file) {
            if let Ok(pid) = text.trim().parse::<i32>() {
                break pid;
            }
        }
        assert!(Instant::now() < deadline, "keystore never started");
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    assert!(process_exists(keystore_pid));

    // When: the binary receives SIGTERM
    let binary_pid = child.id().unwrap() as i32;
    // SAFETY: the pid is the child this test spawned.
    assert_eq!(unsafe { libc::kill(binary_pid, libc::SIGTERM) }, 0);

    // Then: it tears down the keystore, writes the report and exits non-zero
    let status = tokio::time::timeout(Duration::from_secs(15), child.wait())
        .await
        .expect("binary exits after SIGTERM")
        .unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(!process_exists(keystore_pid));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["completed"], false);
    assert_eq!(report["error"], "interrupted by SIGTERM");
    assert_eq!(report["reached"], "teardown");
    assert_eq!(report["teardown"][0]["component"], "keystore");
    assert!(report["teardown"][0]["error"].is_null());
}
