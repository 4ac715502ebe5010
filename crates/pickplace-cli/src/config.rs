//! Controller configuration – reads/writes `pickplace.toml`.

use pickplace_perception::DetectorConfig;
use pickplace_runtime::CycleConfig;
use pickplace_types::RigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::scenario::ScenarioConfig;

/// Env var naming the config file.
pub const CONFIG_PATH_VAR: &str = "PICKPLACE_CONFIG";

/// Everything the binary needs to build and run a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Robot model; selects the camera through `detector.camera_map`.
    #[serde(default = "default_robot_name")]
    pub robot_name: String,

    /// Control tick period in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u32,

    /// Arm joint velocity applied once at startup.
    #[serde(default = "default_velocity")]
    pub velocity: f64,

    /// Ticks to run before stopping; `0` runs until Ctrl-C.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub cycle: CycleConfig,

    #[serde(default)]
    pub scenario: ScenarioConfig,
}

fn default_robot_name() -> String {
    "UR5e".to_string()
}
fn default_tick_period_ms() -> u32 {
    32
}
fn default_velocity() -> f64 {
    1.2
}
fn default_max_ticks() -> u64 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            robot_name: default_robot_name(),
            tick_period_ms: default_tick_period_ms(),
            velocity: default_velocity(),
            max_ticks: default_max_ticks(),
            detector: DetectorConfig::default(),
            cycle: CycleConfig::default(),
            scenario: ScenarioConfig::default(),
        }
    }
}

/// Path from `PICKPLACE_CONFIG`, else `./pickplace.toml`.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("pickplace.toml"))
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.  Env overrides are applied to a loaded file.
pub fn load_from(path: &PathBuf) -> Result<Option<Config>, RigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| RigError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| RigError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `PICKPLACE_*` overrides.  Unparseable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `PICKPLACE_ROBOT` | `robot_name` |
/// | `PICKPLACE_TICK_MS` | `tick_period_ms` |
/// | `PICKPLACE_MAX_TICKS` | `max_ticks` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("PICKPLACE_ROBOT")
        && !v.trim().is_empty()
    {
        cfg.robot_name = v.trim().to_string();
    }
    if let Ok(v) = std::env::var("PICKPLACE_TICK_MS")
        && let Ok(ms) = v.parse::<u32>()
        && ms > 0
    {
        cfg.tick_period_ms = ms;
    }
    if let Ok(v) = std::env::var("PICKPLACE_MAX_TICKS")
        && let Ok(n) = v.parse::<u64>()
    {
        cfg.max_ticks = n;
    }
}

/// Write `cfg` as pretty TOML, creating parent directories.
pub fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), RigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| RigError::Config(format!("failed to create {}: {}", parent.display(), e)))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RigError::Config(format!("failed to serialize: {}", e)))?;
    fs::write(path, raw)
        .map_err(|e| RigError::Config(format!("failed to write {}: {}", path.display(), e)))
}

/// Parse the positional velocity argument.  `None` when absent or not a
/// finite number.
pub fn parse_velocity(arg: Option<&str>) -> Option<f64> {
    arg?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
