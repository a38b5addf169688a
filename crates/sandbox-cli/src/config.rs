//! Sandbox configuration – reads/writes `~/.avr/sandbox.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use sandbox_runtime::ControllerConfig;
use sandbox_types::SandboxError;
use serde::{Deserialize, Serialize};

/// Persisted sandbox configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket port the relay connects to.
    #[serde(default = "default_bridge_port")]
    pub bridge_port: u16,

    /// Per-topic bus buffer size.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// PCM channel of the large dumper.
    #[serde(default = "default_large_dumper_channel")]
    pub large_dumper_channel: i32,

    /// PCM channel of the small dumper.
    #[serde(default = "default_small_dumper_channel")]
    pub small_dumper_channel: i32,

    #[serde(default = "default_small_dumper_dump_abs")]
    pub small_dumper_dump_abs: i32,

    #[serde(default = "default_small_dumper_rest_abs")]
    pub small_dumper_rest_abs: i32,

    /// How long tag colours stay lit, in seconds.
    #[serde(default = "default_tag_color_seconds")]
    pub tag_color_seconds: f64,

    /// Highest tag id that lights the acquired colour.
    #[serde(default = "default_max_acquired_tag_id")]
    pub max_acquired_tag_id: i32,
}

fn default_bridge_port() -> u16 {
    9191
}
fn default_bus_capacity() -> usize {
    256
}
fn default_large_dumper_channel() -> i32 {
    4
}
fn default_small_dumper_channel() -> i32 {
    5
}
fn default_small_dumper_dump_abs() -> i32 {
    1800
}
fn default_small_dumper_rest_abs() -> i32 {
    1000
}
fn default_tag_color_seconds() -> f64 {
    0.35
}
fn default_max_acquired_tag_id() -> i32 {
    6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bridge_port: default_bridge_port(),
            bus_capacity: default_bus_capacity(),
            large_dumper_channel: default_large_dumper_channel(),
            small_dumper_channel: default_small_dumper_channel(),
            small_dumper_dump_abs: default_small_dumper_dump_abs(),
            small_dumper_rest_abs: default_small_dumper_rest_abs(),
            tag_color_seconds: default_tag_color_seconds(),
            max_acquired_tag_id: default_max_acquired_tag_id(),
        }
    }
}

impl Config {
    /// Controller settings derived from this file; everything not
    /// configurable keeps its built-in default.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            large_dumper_channel: self.large_dumper_channel,
            small_dumper_channel: self.small_dumper_channel,
            small_dumper_dump_abs: self.small_dumper_dump_abs,
            small_dumper_rest_abs: self.small_dumper_rest_abs,
            tag_color_seconds: self.tag_color_seconds,
            max_acquired_tag_id: self.max_acquired_tag_id,
            ..ControllerConfig::default()
        }
    }
}

/// Return the path to `~/.avr/sandbox.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".avr").join("sandbox.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, SandboxError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, SandboxError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| SandboxError::Config(format!("failed to read {}: {e}", path.display())))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| SandboxError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `SANDBOX_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SANDBOX_BRIDGE_PORT` | `bridge_port` |
/// | `SANDBOX_BUS_CAPACITY` | `bus_capacity` |
/// | `SANDBOX_LARGE_DUMPER_CHANNEL` | `large_dumper_channel` |
/// | `SANDBOX_SMALL_DUMPER_CHANNEL` | `small_dumper_channel` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(port) = env_parse("SANDBOX_BRIDGE_PORT") {
        cfg.bridge_port = port;
    }
    if let Some(capacity) = env_parse::<usize>("SANDBOX_BUS_CAPACITY")
        && capacity > 0
    {
        cfg.bus_capacity = capacity;
    }
    if let Some(channel) = env_parse("SANDBOX_LARGE_DUMPER_CHANNEL") {
        cfg.large_dumper_channel = channel;
    }
    if let Some(channel) = env_parse("SANDBOX_SMALL_DUMPER_CHANNEL") {
        cfg.small_dumper_channel = channel;
    }
}

/// Built-in defaults with the environment overrides applied, for when the
/// file is missing or unreadable.
pub fn default_with_env_overrides() -> Config {
    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    cfg
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Save the config to disk, creating `~/.avr/` if necessary.
pub fn save(cfg: &Config) -> Result<(), SandboxError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), SandboxError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SandboxError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| SandboxError::Config(format!("failed to serialize: {e}")))?;
    // Owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| SandboxError::Config(format!("failed to write {}: {e}", path.display())))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| SandboxError::Config(format!("failed to write {}: {e}", path.display())))?;
    Ok(())
}
