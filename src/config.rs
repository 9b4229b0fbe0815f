// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Engine configuration.
//!
//! Capacities and ack timing are fixed per device build. They are read from
//! a JSON file named by `HEEP_CONFIG`, then overridden by individual
//! `HEEP_*` variables, then validated.

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use heep_wire::{DeviceId, STANDARD_ID_SIZE};
use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ack::{RetryPolicy, ENTRY_HEADER_LEN};
use crate::compact::IdMode;

/// Smallest output buffer that still fits every fixed status response.
pub const MIN_OUTPUT_CAPACITY: usize = 96;

/// Memory records and the dynamic memory size field are one byte wide.
pub const MAX_MEMORY_CAPACITY: usize = 255;

/// Smallest store that can hold a standard-id record with a short payload.
pub const MIN_MEMORY_CAPACITY: usize = 16;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("engine config lock poisoned")]
    LockPoisoned,
}

/// Build-time capacities and timing for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Standard id reported in every response.
    pub device_id: [u8; STANDARD_ID_SIZE],
    /// Reported in the client-data record of a memory dump.
    pub firmware_version: u8,
    /// Bytes available to the device memory store.
    pub memory_capacity: usize,
    /// Largest response the dispatcher may write.
    pub output_capacity: usize,
    /// Bytes available to the ack/retry buffer.
    pub ack_capacity: usize,
    /// Ack timeout in 10 ms ticks.
    pub ack_timeout_ticks: u8,
    /// Retry opportunities spread across one timeout window.
    pub ack_retry_count: u8,
    /// Ticks between ack sweeps.
    pub sweep_interval_ticks: u8,
    /// Whether stored ids keep the standard width or use an index.
    pub id_mode: IdMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device_id: [0x01, 0x02, 0x03, 0x04],
            firmware_version: 1,
            memory_capacity: 255,
            output_capacity: 200,
            ack_capacity: 200,
            ack_timeout_ticks: 100,
            ack_retry_count: 4,
            sweep_interval_ticks: 10,
            id_mode: IdMode::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Load from `HEEP_CONFIG` when set, apply `HEEP_*` overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("HEEP_CONFIG") {
            Ok(path) => {
                debug!("loading engine config from {path}");
                let text = fs::read_to_string(&path)?;
                serde_json::from_str(&text)?
            }
            Err(_) => Self::default(),
        };
        let cfg = base.with_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `HEEP_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(value) = env_var("HEEP_DEVICE_ID") {
            let bytes = hex::decode(value.trim()).map_err(|_| ConfigError::Env {
                var: "HEEP_DEVICE_ID",
                value: value.clone(),
            })?;
            self.device_id = bytes.try_into().map_err(|_| ConfigError::Env {
                var: "HEEP_DEVICE_ID",
                value,
            })?;
        }
        if let Some(value) = env_var("HEEP_FIRMWARE_VERSION") {
            self.firmware_version = parse_env("HEEP_FIRMWARE_VERSION", value)?;
        }
        if let Some(value) = env_var("HEEP_MEMORY_CAPACITY") {
            self.memory_capacity = parse_env("HEEP_MEMORY_CAPACITY", value)?;
        }
        if let Some(value) = env_var("HEEP_OUTPUT_CAPACITY") {
            self.output_capacity = parse_env("HEEP_OUTPUT_CAPACITY", value)?;
        }
        if let Some(value) = env_var("HEEP_ACK_CAPACITY") {
            self.ack_capacity = parse_env("HEEP_ACK_CAPACITY", value)?;
        }
        if let Some(value) = env_var("HEEP_ACK_TIMEOUT_TICKS") {
            self.ack_timeout_ticks = parse_env("HEEP_ACK_TIMEOUT_TICKS", value)?;
        }
        if let Some(value) = env_var("HEEP_ACK_RETRY_COUNT") {
            self.ack_retry_count = parse_env("HEEP_ACK_RETRY_COUNT", value)?;
        }
        if let Some(value) = env_var("HEEP_SWEEP_INTERVAL_TICKS") {
            self.sweep_interval_ticks = parse_env("HEEP_SWEEP_INTERVAL_TICKS", value)?;
        }
        if let Some(value) = env_var("HEEP_ID_MODE") {
            self.id_mode = match value.trim() {
                "standard" => IdMode::Standard,
                "indexed" => IdMode::Indexed,
                _ => {
                    return Err(ConfigError::Env {
                        var: "HEEP_ID_MODE",
                        value,
                    })
                }
            };
        }
        Ok(self)
    }

    /// Reject configurations the engine cannot honour.
    ///
    /// Ack timestamps wrap at 256 ticks and the displacement between two
    /// samples is only correct across a single wrap, so an entry must be
    /// examined by a sweep before 256 ticks have passed since it was stored.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry_policy()?;
        if self.sweep_interval_ticks == 0 {
            return Err(ConfigError::Invalid("sweep interval must be at least one tick".into()));
        }
        let horizon = u16::from(self.ack_timeout_ticks) + u16::from(self.sweep_interval_ticks);
        if horizon >= 256 {
            return Err(ConfigError::Invalid(format!(
                "ack timeout {} plus sweep interval {} must stay below 256 ticks",
                self.ack_timeout_ticks, self.sweep_interval_ticks
            )));
        }
        if !(MIN_MEMORY_CAPACITY..=MAX_MEMORY_CAPACITY).contains(&self.memory_capacity) {
            return Err(ConfigError::Invalid(format!(
                "memory capacity {} outside {MIN_MEMORY_CAPACITY}..={MAX_MEMORY_CAPACITY}",
                self.memory_capacity
            )));
        }
        if self.output_capacity < MIN_OUTPUT_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "output capacity {} below {MIN_OUTPUT_CAPACITY}",
                self.output_capacity
            )));
        }
        if self.ack_capacity < ENTRY_HEADER_LEN + 2 {
            return Err(ConfigError::Invalid(format!(
                "ack capacity {} cannot hold a single entry",
                self.ack_capacity
            )));
        }
        Ok(())
    }

    /// Standard id of this device.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(self.device_id)
    }

    /// Retry schedule derived from the ack timing fields.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(self.ack_timeout_ticks, self.ack_retry_count)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

static CONFIG: Lazy<RwLock<EngineConfig>> = Lazy::new(|| RwLock::new(EngineConfig::default()));

/// Replace the process-wide default configuration.
pub fn set_config(cfg: EngineConfig) -> Result<(), ConfigError> {
    cfg.validate()?;
    let mut guard = CONFIG.write().map_err(|_| ConfigError::LockPoisoned)?;
    *guard = cfg;
    Ok(())
}

/// Get a clone of the process-wide default configuration.
pub fn get_config() -> Result<EngineConfig, ConfigError> {
    CONFIG
        .read()
        .map_err(|_| ConfigError::LockPoisoned)
        .map(|g| g.clone())
}
