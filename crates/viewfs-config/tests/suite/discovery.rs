use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tempfile::tempdir;
use viewfs::FileProvider;
use viewfs_config::{discover_config_path, load_for_dir, ConfigError, ViewFsConfig, CONFIG_ENV_VAR};

// Discovery reads process-wide environment; serialize every test in this file.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner())
}

#[test]
fn discovers_root_file_before_dot_dir() {
    let _guard = env_lock();
    let temp = tempdir().unwrap();
    fs::create_dir(temp.path().join(".viewfs")).unwrap();
    fs::write(temp.path().join(".viewfs/config.toml"), "").unwrap();
    assert_eq!(
        discover_config_path(temp.path()),
        Some(temp.path().join(".viewfs/config.toml"))
    );

    fs::write(temp.path().join("viewfs.toml"), "").unwrap();
    assert_eq!(
        discover_config_path(temp.path()),
        Some(temp.path().join("viewfs.toml"))
    );
}

#[test]
fn env_var_overrides_discovery() {
    let _guard = env_lock();
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("viewfs.toml"), "").unwrap();

    std::env::set_var(CONFIG_ENV_VAR, "custom.toml");
    let discovered = discover_config_path(temp.path());
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(discovered, Some(temp.path().join("custom.toml")));
}

#[test]
fn missing_config_loads_defaults() {
    let _guard = env_lock();
    let temp = tempdir().unwrap();
    assert_eq!(load_for_dir(temp.path()).unwrap(), ViewFsConfig::default());
}

#[test]
fn relative_paths_resolve_against_config_dir() {
    let _guard = env_lock();
    let temp = tempdir().unwrap();
    fs::create_dir_all(temp.path().join("app/Views")).unwrap();
    fs::write(temp.path().join("app/Views/Index.cshtml"), "index").unwrap();
    fs::write(
        temp.path().join("viewfs.toml"),
        r#"
[application]
name = "App"
path = "app"

[watch]
poll_interval_ms = 250
"#,
    )
    .unwrap();

    let config = load_for_dir(temp.path()).unwrap();
    assert_eq!(config.config_dir.as_deref(), Some(temp.path()));

    let provider = config.overlay_provider().unwrap();
    assert_eq!(provider.roots().physical_root(), temp.path().join("app"));
    assert_eq!(provider.poll_interval().as_millis(), 250);

    let info = provider
        .file_info(Some("Areas/App/Views/Index.cshtml"))
        .found()
        .unwrap();
    assert_eq!(info.read_to_string().unwrap(), "index");
}

#[test]
fn unreadable_config_reports_path() {
    let _guard = env_lock();
    let err = ViewFsConfig::load_from_path(Path::new("/definitely/not/here/viewfs.toml"))
        .unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert!(path.ends_with("viewfs.toml")),
        other => panic!("expected io error, got {other:?}"),
    }
}
