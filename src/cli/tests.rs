use super::*;
use crate::core::config::WorkspaceConfig;
use std::fs;
use tempfile::TempDir;

fn parse_args(argv: &[&str]) -> Args {
    Args::try_parse_from(argv)
        .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
}

fn workspace(settings: WorkspaceConfig) -> ResolvedWorkspace {
    ResolvedWorkspace {
        name: "acme".into(),
        settings,
    }
}

#[test]
fn parses_all_flags() {
    let args = parse_args(&[
        "parley",
        "--config",
        "/tmp/parley.toml",
        "-w",
        "acme",
        "--debug",
        "--log",
        "/tmp/parley.log",
    ]);
    assert_eq!(args.config, Some(PathBuf::from("/tmp/parley.toml")));
    assert_eq!(args.workspace.as_deref(), Some("acme"));
    assert!(args.debug);
    assert_eq!(args.log, Some(PathBuf::from("/tmp/parley.log")));
}

#[test]
fn defaults_are_empty() {
    let args = parse_args(&["parley"]);
    assert!(args.config.is_none());
    assert!(args.workspace.is_none());
    assert!(!args.debug);
    assert!(args.log.is_none());
}

#[test]
fn unknown_flags_are_rejected() {
    assert!(Args::try_parse_from(["parley", "--model", "x"]).is_err());
}

#[test]
fn explicit_config_path_is_loaded() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "default_workspace = \"acme\"\n\n[workspaces.acme]\ntoken = \"xoxp\"\n",
    )
    .expect("write config");

    let args = parse_args(&["parley", "--config", path.to_str().expect("utf8 path")]);
    let config = load_config(&args).expect("load");
    assert_eq!(config.default_workspace.as_deref(), Some("acme"));
    assert!(config.resolve_workspace(None).is_ok());
}

#[test]
fn startup_errors_describe_their_cause() {
    let err = StartupError::from(ConfigError::NoWorkspace);
    assert!(err.source().is_some());

    let err = StartupError::Terminal(io::Error::new(io::ErrorKind::Other, "not a tty"));
    assert_eq!(err.to_string(), "Terminal unavailable: not a tty");
}

#[test]
fn display_name_wins_for_local_user() {
    let resolved = workspace(WorkspaceConfig {
        token: "t".into(),
        display_name: Some("ada".into()),
        ..WorkspaceConfig::default()
    });
    assert_eq!(local_user(&resolved), "ada");
}

#[tokio::test]
async fn replay_setting_selects_replay_transport() {
    let resolved = workspace(WorkspaceConfig {
        replay: Some(PathBuf::from("/nonexistent/parley-replay.jsonl")),
        ..WorkspaceConfig::default()
    });
    // Only the replay transport reads the file, so only it can fail here.
    let result = service_for(&resolved).connect(&resolved).await;
    assert!(matches!(result, Err(ServiceError::Connect { .. })));

    let loopback = workspace(WorkspaceConfig {
        token: "t".into(),
        ..WorkspaceConfig::default()
    });
    assert!(service_for(&loopback).connect(&loopback).await.is_ok());
}
