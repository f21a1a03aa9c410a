//! Loading worker configuration from YAML files and environment overrides.

use activity_worker::config::{ConfigManager, ConfigurationError};
use activity_worker::error::ActivityError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("worker.yaml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_bundled_sample_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/activity-worker.yaml");
    let config = ConfigManager::load_with_env(path, Some(HashMap::new())).unwrap();

    assert_eq!(config.activity.name, "transcode");
    assert_eq!(config.worker.poll_timeout(), Duration::from_secs(60));
    assert_eq!(config.worker.network_timeout(), Duration::from_secs(70));
    assert!(config.validation.schemas_dir.is_none());
}

#[test]
fn test_load_from_file_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
activity:
  name: thumbnail
  version: "3"
worker:
  poll_timeout_seconds: 10
  network_timeout_seconds: 15
notification:
  enabled: false
logging:
  log_dir: /tmp/activity-logs
"#,
    );

    let env = HashMap::from([
        (
            "ACTIVITY_WORKER__WORKER__IDENTITY".to_string(),
            "worker-7".to_string(),
        ),
        (
            "ACTIVITY_WORKER__ORCHESTRATION__BASE_URL".to_string(),
            "http://orchestrator:9000".to_string(),
        ),
    ]);
    let config = ConfigManager::load_with_env(&path, Some(env)).unwrap();

    assert_eq!(config.activity.name, "thumbnail");
    assert_eq!(config.worker_identity(), "worker-7");
    assert_eq!(config.orchestration.base_url, "http://orchestrator:9000");
    assert!(!config.notification.enabled);
    assert_eq!(config.logging.log_dir, Path::new("/tmp/activity-logs"));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_missing_file_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigManager::load_with_env(dir.path().join("absent.yaml"), Some(HashMap::new()))
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::LoadError { .. }));
}

#[test]
fn test_missing_activity_name_and_version() {
    let dir = tempfile::tempdir().unwrap();

    let path = write_config(dir.path(), "activity:\n  version: \"1\"\n");
    let err = ConfigManager::load_with_env(&path, Some(HashMap::new())).unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingActivityName));

    let fatal: ActivityError = err.into();
    assert!(fatal.is_fatal());
    assert_eq!(fatal.code(), "NO_ACTIVITY_NAME");

    let path = write_config(dir.path(), "activity:\n  name: transcode\n");
    let err = ConfigManager::load_with_env(&path, Some(HashMap::new())).unwrap_err();
    assert_eq!(err.code(), "NO_ACTIVITY_VERSION");
}

#[test]
fn test_default_identity_is_unique_per_call() {
    let config = ConfigManager::load_from_yaml_str(
        "activity:\n  name: transcode\n  version: \"1\"\n",
        Some(HashMap::new()),
    )
    .unwrap();

    let first = config.worker_identity();
    assert!(first.starts_with("transcode-"));
    assert_ne!(first, config.worker_identity());
}
