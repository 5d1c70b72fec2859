//! Configuration loading for the power device daemon.
//!
//! The daemon reads a single flat `key=value` file (default
//! `/etc/upowerd.conf`, overridable via `UPOWER_CONF_FILE_NAME`) for warning
//! thresholds and policy, plus `UPOWER_HISTORY_DIR` for where per-device
//! history series are persisted. There is no TOML schema, no module tree, and
//! no hot-reload: the daemon reads this once at startup.

mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use error::Error;

const DEFAULT_CONF_PATH: &str = "/etc/upowerd.conf";
const DEFAULT_HISTORY_DIR: &str = "/var/lib/upower";

/// Action the daemon reports via `GetCriticalAction` when the global warning
/// level reaches `action`. The daemon itself never invokes this action; it is
/// informational for the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticalPowerAction {
    /// Suspend to RAM and disk.
    HybridSleep,
    /// Suspend to disk only.
    Hibernate,
    /// Power off.
    PowerOff,
}

impl CriticalPowerAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "HybridSleep" => Some(Self::HybridSleep),
            "Hibernate" => Some(Self::Hibernate),
            "PowerOff" => Some(Self::PowerOff),
            _ => None,
        }
    }

    /// The string exposed over the bus via `GetCriticalAction`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HybridSleep => "HybridSleep",
            Self::Hibernate => "Hibernate",
            Self::PowerOff => "PowerOff",
        }
    }
}

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Percentage at or below which a device enters `low`.
    pub percentage_low: f64,
    /// Percentage at or below which a device enters `critical`.
    pub percentage_critical: f64,
    /// Percentage at or below which a device enters `action`.
    pub percentage_action: f64,
    /// Seconds of estimated time-to-empty at or below which a device enters `low`.
    pub time_low: u64,
    /// Seconds of estimated time-to-empty at or below which a device enters `critical`.
    pub time_critical: u64,
    /// Seconds of estimated time-to-empty at or below which a device enters `action`.
    pub time_action: u64,
    /// When true, the time-based thresholds above are ignored.
    pub use_percentage_for_policy: bool,
    /// Action reported via `GetCriticalAction`.
    pub critical_power_action: CriticalPowerAction,
    /// Directory where per-device history series are persisted.
    pub history_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            percentage_low: 10.0,
            percentage_critical: 5.0,
            percentage_action: 2.0,
            time_low: 600,
            time_critical: 300,
            time_action: 120,
            use_percentage_for_policy: false,
            critical_power_action: CriticalPowerAction::HybridSleep,
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
        }
    }
}

impl Config {
    /// Loads configuration from the environment and the config file it
    /// resolves to.
    ///
    /// Resolution order: `UPOWER_CONF_FILE_NAME` if set, else
    /// `/etc/upowerd.conf`. A missing config file is not an error — the
    /// built-in defaults apply. `UPOWER_HISTORY_DIR` overrides the history
    /// directory regardless of what the config file says.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be read, or
    /// contains a malformed line or an invalid value for a recognized key.
    pub fn load() -> Result<Self, Error> {
        let conf_path = std::env::var("UPOWER_CONF_FILE_NAME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONF_PATH));

        let mut config = Self::load_from_file(&conf_path)?;

        if let Ok(history_dir) = std::env::var("UPOWER_HISTORY_DIR") {
            config.history_dir = PathBuf::from(history_dir);
        }

        Ok(config)
    }

    /// Loads configuration from a specific file path, falling back to
    /// defaults for any key the file omits or if the file is absent.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, or contains a
    /// malformed line or an invalid value for a recognized key.
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, Error> {
        let mut values = HashMap::new();

        for (idx, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::MalformedLine {
                    path: path.to_path_buf(),
                    line_no: idx + 1,
                    line: raw_line.to_string(),
                });
            };

            values.insert(key.trim().to_string(), value.trim().to_string());
        }

        let mut config = Self::default();

        if let Some(v) = values.get("PercentageLow") {
            config.percentage_low = parse_f64(path, "PercentageLow", v)?;
        }
        if let Some(v) = values.get("PercentageCritical") {
            config.percentage_critical = parse_f64(path, "PercentageCritical", v)?;
        }
        if let Some(v) = values.get("PercentageAction") {
            config.percentage_action = parse_f64(path, "PercentageAction", v)?;
        }
        if let Some(v) = values.get("TimeLow") {
            config.time_low = parse_u64(path, "TimeLow", v)?;
        }
        if let Some(v) = values.get("TimeCritical") {
            config.time_critical = parse_u64(path, "TimeCritical", v)?;
        }
        if let Some(v) = values.get("TimeAction") {
            config.time_action = parse_u64(path, "TimeAction", v)?;
        }
        if let Some(v) = values.get("UsePercentageForPolicy") {
            config.use_percentage_for_policy = parse_bool(path, "UsePercentageForPolicy", v)?;
        }
        if let Some(v) = values.get("CriticalPowerAction") {
            config.critical_power_action =
                CriticalPowerAction::parse(v).ok_or_else(|| Error::InvalidValue {
                    path: path.to_path_buf(),
                    key: "CriticalPowerAction".to_string(),
                    value: v.clone(),
                })?;
        }

        Ok(config)
    }
}

impl upowerd_traits::Static for Config {
    type Error = Error;
    type Context<'a> = ();

    /// Equivalent to [`Config::load`]; exists so call sites that are
    /// generic over [`upowerd_traits::Static`] can fetch a `Config` the
    /// same way they fetch any other one-shot model.
    async fn get(_context: ()) -> Result<Self, Error> {
        Self::load()
    }
}

fn parse_f64(path: &Path, key: &str, raw: &str) -> Result<f64, Error> {
    raw.parse().map_err(|_| Error::InvalidValue {
        path: path.to_path_buf(),
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_u64(path: &Path, key: &str, raw: &str) -> Result<u64, Error> {
    raw.parse().map_err(|_| Error::InvalidValue {
        path: path.to_path_buf(),
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_bool(path: &Path, key: &str, raw: &str) -> Result<bool, Error> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidValue {
            path: path.to_path_buf(),
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.percentage_low, 10.0);
        assert_eq!(config.percentage_critical, 5.0);
        assert_eq!(config.percentage_action, 2.0);
        assert_eq!(config.time_low, 600);
        assert_eq!(config.time_critical, 300);
        assert_eq!(config.time_action, 120);
        assert!(!config.use_percentage_for_policy);
        assert_eq!(config.critical_power_action, CriticalPowerAction::HybridSleep);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from_file(Path::new("/nonexistent/upowerd.conf")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_recognized_keys() {
        let contents = "PercentageLow=15\nTimeCritical=240\nUsePercentageForPolicy=true\n";
        let config = Config::parse(contents, Path::new("test.conf")).unwrap();
        assert_eq!(config.percentage_low, 15.0);
        assert_eq!(config.time_critical, 240);
        assert!(config.use_percentage_for_policy);
        assert_eq!(config.percentage_critical, 5.0);
    }

    #[test]
    fn ignores_blank_lines_and_comments() {
        let contents = "# a comment\n\nPercentageLow=8\n";
        let config = Config::parse(contents, Path::new("test.conf")).unwrap();
        assert_eq!(config.percentage_low, 8.0);
    }

    #[test]
    fn rejects_malformed_line() {
        let contents = "not-a-key-value-pair\n";
        let err = Config::parse(contents, Path::new("test.conf")).unwrap_err();
        assert!(matches!(err, Error::MalformedLine { .. }));
    }

    #[test]
    fn rejects_invalid_value() {
        let contents = "PercentageLow=not-a-number\n";
        let err = Config::parse(contents, Path::new("test.conf")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn rejects_unknown_critical_power_action() {
        let contents = "CriticalPowerAction=Nonsense\n";
        let err = Config::parse(contents, Path::new("test.conf")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn loads_from_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upowerd.conf");
        std::fs::write(&path, "PercentageCritical=7\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.percentage_critical, 7.0);
    }
}
