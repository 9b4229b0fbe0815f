// CLASSIFICATION: COMMUNITY
// Filename: config_env.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

use heep::compact::IdMode;
use heep::config::{get_config, set_config, ConfigError, EngineConfig};
use heep::wire::DeviceId;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

const VARS: &[&str] = &[
    "HEEP_CONFIG",
    "HEEP_DEVICE_ID",
    "HEEP_ACK_TIMEOUT_TICKS",
    "HEEP_ACK_RETRY_COUNT",
    "HEEP_ID_MODE",
    "HEEP_MEMORY_CAPACITY",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn load_file_then_env_overrides() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("heep.json");
    fs::write(
        &path,
        r#"{"device_id":[1,1,1,1],"ack_timeout_ticks":50,"id_mode":"indexed"}"#,
    )
    .unwrap();
    std::env::set_var("HEEP_CONFIG", &path);
    std::env::set_var("HEEP_DEVICE_ID", "c0ffee01");
    std::env::set_var("HEEP_ACK_RETRY_COUNT", "5");
    let cfg = EngineConfig::load();
    clear_env();
    let cfg = cfg.unwrap();
    assert_eq!(cfg.device_id(), DeviceId::new([0xC0, 0xFF, 0xEE, 0x01]));
    assert_eq!(cfg.ack_timeout_ticks, 50);
    assert_eq!(cfg.ack_retry_count, 5);
    assert_eq!(cfg.id_mode, IdMode::Indexed);
}

#[test]
#[serial]
fn bad_env_values_are_rejected() {
    clear_env();
    std::env::set_var("HEEP_DEVICE_ID", "c0ffee");
    let short_id = EngineConfig::load();
    std::env::set_var("HEEP_DEVICE_ID", "01020304");
    std::env::set_var("HEEP_ID_MODE", "wide");
    let bad_mode = EngineConfig::load();
    std::env::remove_var("HEEP_ID_MODE");
    std::env::set_var("HEEP_ACK_TIMEOUT_TICKS", "250");
    let wraps = EngineConfig::load();
    clear_env();
    assert!(matches!(short_id, Err(ConfigError::Env { var: "HEEP_DEVICE_ID", .. })));
    assert!(matches!(bad_mode, Err(ConfigError::Env { var: "HEEP_ID_MODE", .. })));
    assert!(matches!(wraps, Err(ConfigError::Invalid(_))));
}

#[test]
#[serial]
fn missing_file_is_an_io_error() {
    clear_env();
    let dir = tempdir().unwrap();
    std::env::set_var("HEEP_CONFIG", dir.path().join("absent.json"));
    let cfg = EngineConfig::load();
    clear_env();
    assert!(matches!(cfg, Err(ConfigError::Io(_))));
}

#[test]
#[serial]
fn global_config_round_trip() {
    let original = get_config().unwrap();
    let cfg = EngineConfig {
        memory_capacity: 128,
        ..EngineConfig::default()
    };
    set_config(cfg.clone()).unwrap();
    assert_eq!(get_config().unwrap(), cfg);
    let invalid = EngineConfig {
        memory_capacity: 4,
        ..EngineConfig::default()
    };
    assert!(set_config(invalid).is_err());
    assert_eq!(get_config().unwrap(), cfg);
    set_config(original).unwrap();
}
