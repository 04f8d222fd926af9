//! Test configuration.

use std::path::Path;

use keyfault_core::config::KeyfaultConfig;

/// Defaults with every path under `root` and short timings.
pub fn test_config(root: &Path) -> KeyfaultConfig {
    let mut config = KeyfaultConfig::default();
    config.paths.scratch_dir = root.join("tmp");
    config.paths.log_dir = root.join("log");
    config.readiness.initial_delay_ms = 10;
    config.readiness.max_delay_ms = 50;
    config.readiness.keystore_deadline_ms = 1_000;
    config.readiness.proxy_deadline_ms = 1_000;
    config.readiness.conductor_deadline_ms = 1_000;
    config.scenario.settle_before_teardown_ms = 0;
    config.scenario.bundle_path = root.join("test.happ");
    config
        .validate()
        .expect("test config must be valid");
    config
}
