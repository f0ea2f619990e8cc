use std::fs;
use std::path::PathBuf;

use rlora_agg::settings::{DEFAULT_DIMENSIONS, DEFAULT_SIM_DURATION_SECONDS, PROTOCOLS_ENV, ROOT_ENV};
use rlora_agg::{aggregate_all, load_settings, MetricKind, Settings};
use rlora_core::errors::AggError;

#[test]
fn yaml_roots_resolve_against_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rlora.yaml");
    fs::write(
        &path,
        "data_root: campaign/raw\nprotocols: [MiRS, Aloha]\ncoverage:\n  number_nodes: [10, 20]\n",
    )
    .unwrap();

    let settings = load_settings(&path).unwrap();
    assert_eq!(settings.data_dir(), dir.path().join("campaign/raw"));
    assert_eq!(settings.output_dir(), dir.path().join("data_aggregated"));
    assert_eq!(settings.protocols, vec!["MiRS", "Aloha"]);
    assert_eq!(settings.dimensions.len(), DEFAULT_DIMENSIONS.len());
    assert_eq!(settings.sim_duration_seconds, DEFAULT_SIM_DURATION_SECONDS);
    assert_eq!(settings.coverage.number_nodes, vec![10, 20]);
    assert_eq!(settings.coverage.ttnm_values.len(), 25);
}

#[test]
fn environment_overrides_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rlora.yaml");
    fs::write(&path, "output_root: /srv/reports\nprotocols: [Csma]\n").unwrap();

    let mut settings = load_settings(&path).unwrap();
    settings.apply_env(|key| match key {
        ROOT_ENV => Some("/campaign".to_string()),
        PROTOCOLS_ENV => Some("MiRS".to_string()),
        _ => None,
    });
    assert_eq!(settings.data_dir(), PathBuf::from("/campaign/data"));
    assert_eq!(settings.output_dir(), PathBuf::from("/srv/reports"));
    assert_eq!(settings.protocols, vec!["MiRS"]);
}

#[test]
fn environment_root_keeps_file_relative_roots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rlora.yaml");
    fs::write(&path, "data_root: campaign/raw\n").unwrap();

    let mut settings = load_settings(&path).unwrap();
    settings.apply_env(|key| match key {
        ROOT_ENV => Some("/elsewhere".to_string()),
        _ => None,
    });
    assert_eq!(settings.data_dir(), dir.path().join("campaign/raw"));
    assert_eq!(settings.output_dir(), PathBuf::from("/elsewhere/data_aggregated"));
}

#[test]
fn malformed_yaml_is_a_serde_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rlora.yaml");
    fs::write(&path, "protocols: {not: [a list\n").unwrap();
    let err = load_settings(&path).unwrap_err();
    assert!(matches!(err, AggError::Serde(_)));
    assert!(!err.is_data_error());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_settings(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, AggError::Io(_)));
}

#[test]
fn empty_protocol_list_fails_before_scanning() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::with_base_dir(dir.path());
    settings.protocols.clear();
    let err = aggregate_all(&[MetricKind::CollisionPerNode], &settings).unwrap_err();
    assert!(matches!(err, AggError::Config(_)));
    assert!(!settings.output_dir().exists());
}
