//! CLI configuration – reads/writes `~/.trajex/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use trajex_runtime::{DEFAULT_POLL_RATE_HZ, ExecutorConfig};
use trajex_tf::TfBuffer;
use trajex_types::{ARM_BASE_FRAME, TrajError, Transform3D};

/// A fixed transform loaded into the frame graph at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTransform {
    pub parent_frame: String,
    pub child_frame: String,
    /// Maps poses in `child_frame` into `parent_frame`.
    pub transform: Transform3D,
}

/// Persisted user configuration stored in `~/.trajex/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Monitoring ticks per second.
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: f64,

    /// The arm's canonical frame; every waypoint is converted into it.  Must
    /// name the frame the controller reports in (`jaco_api_origin` for the
    /// simulated arm); change it only together with `transforms`.
    #[serde(default = "default_base_frame")]
    pub base_frame: String,

    /// Append every feedback message to this file as JSON lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_log: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<StaticTransform>,
}

fn default_poll_rate_hz() -> f64 {
    DEFAULT_POLL_RATE_HZ
}
fn default_base_frame() -> String {
    ARM_BASE_FRAME.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_rate_hz: default_poll_rate_hz(),
            base_frame: default_base_frame(),
            feedback_log: None,
            transforms: Vec::new(),
        }
    }
}

impl Config {
    /// Validate the poll settings and turn them into an [`ExecutorConfig`].
    pub fn executor_config(&self) -> Result<ExecutorConfig, TrajError> {
        ExecutorConfig::from_rate(self.poll_rate_hz, &self.base_frame)
    }

    /// A frame graph holding every configured static transform.
    pub fn frame_graph(&self) -> TfBuffer {
        let tf = TfBuffer::new();
        for t in &self.transforms {
            tf.set_transform(&t.parent_frame, &t.child_frame, t.transform);
        }
        tf
    }
}

/// Return the path to `~/.trajex/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".trajex").join("config.toml")
}

/// Load the config from disk, falling back to defaults when the file does not
/// exist.  Environment overrides are applied either way.
pub fn load() -> Result<Config, TrajError> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if it is missing.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, TrajError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| TrajError::Config(format!("failed to read {}: {e}", path.display())))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| TrajError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `TRAJEX_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TRAJEX_POLL_RATE_HZ` | `poll_rate_hz` |
/// | `TRAJEX_BASE_FRAME` | `base_frame` |
/// | `TRAJEX_FEEDBACK_LOG` | `feedback_log` |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("TRAJEX_POLL_RATE_HZ")
        && let Ok(rate) = v.trim().parse::<f64>()
    {
        cfg.poll_rate_hz = rate;
    }
    if let Ok(v) = std::env::var("TRAJEX_BASE_FRAME")
        && !v.is_empty()
    {
        cfg.base_frame = v;
    }
    if let Ok(v) = std::env::var("TRAJEX_FEEDBACK_LOG")
        && !v.is_empty()
    {
        cfg.feedback_log = Some(PathBuf::from(v));
    }
}

/// Save the config to `~/.trajex/config.toml`.
pub fn save(cfg: &Config) -> Result<PathBuf, TrajError> {
    let path = config_path();
    save_to(cfg, &path)?;
    Ok(path)
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), TrajError> {
    let io_err = |what: &str, e: std::io::Error| TrajError::Config(format!("{what} {}: {e}", path.display()));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err("failed to create directory for", e))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| TrajError::Config(format!("failed to serialize config: {e}")))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| io_err("failed to write", e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| io_err("failed to write", e))?;
    Ok(())
}
