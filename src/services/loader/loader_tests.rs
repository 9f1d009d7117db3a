use super::*;

#[test]
fn parses_minimal_config() {
    let cfg = config_from_str(
        "backend_url: http://lab-host:8911\nworkflow_euid: WF42\nheader: Accessioning\n",
    )
    .unwrap();
    assert_eq!(cfg.backend_url, "http://lab-host:8911");
    assert_eq!(cfg.workflow_euid, "WF42");
    assert_eq!(cfg.header.as_deref(), Some("Accessioning"));
}

#[test]
fn rejects_config_without_backend_url() {
    assert!(config_from_str("workflow_euid: WF42\n").is_err());
}

#[test]
fn loads_config_from_env_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        "backend_url: http://127.0.0.1:1\nworkflow_euid: WF1\n",
    )
    .unwrap();
    std::env::set_var(CONFIG_DIR_ENV, dir.path());
    let cfg = load_config().unwrap();
    std::env::remove_var(CONFIG_DIR_ENV);
    assert_eq!(cfg.workflow_euid, "WF1");
}
