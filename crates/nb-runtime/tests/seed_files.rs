//! File-backed configuration and seed loading, end to end.

use std::fs;

use nb_runtime::{RuntimeConfig, RuntimeError, SeedFile, build_kernel, run_kernel};
use tempfile::TempDir;

const TRIANGLE: &str = r#"{
    "atoms": [
        {"name": "Socrates", "strength": 0.99, "confidence": 0.95},
        {"name": "Human"},
        {"name": "Mortal"}
    ],
    "links": [
        {"type": "InheritanceLink", "outgoing": ["Socrates", "Human"]},
        {"type": "InheritanceLink", "outgoing": ["Human", "Mortal"], "strength": 0.98}
    ],
    "stimuli": [{"name": "Socrates", "amount": 300.0}]
}"#;

#[test]
fn config_and_seed_from_disk() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("nanobrain.toml");
    fs::write(
        &config_path,
        "[unified]\ntime_crystal_dimensions = 3\n\n[unified.attention]\ndiffusion_rate = 0.3\n",
    )
    .unwrap();
    let seed_path = dir.path().join("triangle.json");
    fs::write(&seed_path, TRIANGLE).unwrap();

    let config = RuntimeConfig::load(&config_path).unwrap();
    assert_eq!(config.unified.time_crystal_dimensions, 3);

    let kernel = build_kernel(&config.unified).unwrap();
    let report = SeedFile::load(&seed_path).unwrap().apply(&kernel).unwrap();
    assert_eq!(report.atoms, 3);
    assert_eq!(report.links, 2);

    let run = run_kernel(&kernel, 10, 3).unwrap();
    assert_eq!(run.metrics.total_atoms, 3);
    assert_eq!(run.metrics.total_links, 2);
    // Activation spreads from the stimulated atom into the hub.
    assert_eq!(run.focus[0].name, "Human");
    assert!(run.metrics.consciousness_emergence > 0.0);
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[time]\n[unified]\ntime_crystal_dimensions = 0\n").unwrap();
    let err = RuntimeConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("time_crystal_dimensions"), "{err}");
    assert!(matches!(err, RuntimeError::Engine(_)));
}
