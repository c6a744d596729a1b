//! Logging configuration.
//!
//! Resolution order, later wins: built-in defaults, `TT_LOG` and
//! `TT_LOG_FORMAT`, then `-v`/`-q` and `--log-format`. A set `RUST_LOG`
//! replaces the level filter entirely (see [`super::init_logging`]).

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Environment variable holding a [`LogLevel`] name.
pub const LEVEL_ENV: &str = "TT_LOG";

/// Environment variable holding a [`LogFormat`] name.
pub const FORMAT_ENV: &str = "TT_LOG_FORMAT";

/// Where log lines go and how they look. Both go to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `tracing_subscriber::fmt` lines for a terminal.
    #[default]
    Human,
    /// One JSON object per event, for batch runs.
    Jsonl,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!(
                "unknown log format '{}' (expected human or jsonl)",
                other
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum level written for the `tt_core` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    const NAMES: [(LogLevel, &'static str); 6] = [
        (LogLevel::Trace, "trace"),
        (LogLevel::Debug, "debug"),
        (LogLevel::Info, "info"),
        (LogLevel::Warn, "warn"),
        (LogLevel::Error, "error"),
        (LogLevel::Off, "off"),
    ];

    pub fn as_str(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, name)| *name)
            .unwrap_or("info")
    }

    /// Level implied by `-v` repetitions and `-q`; `None` keeps the default.
    ///
    /// `-q` leaves only errors so stdout/stderr stay machine-readable.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Option<LogLevel> {
        match (quiet, verbose) {
            (true, _) => Some(LogLevel::Error),
            (false, 0) => None,
            (false, 1) => Some(LogLevel::Debug),
            (false, _) => Some(LogLevel::Trace),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = match s.trim().to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "none" | "quiet" => "off".to_string(),
            other => other.to_string(),
        };
        Self::NAMES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(level, _)| *level)
            .ok_or_else(|| format!("unknown log level '{}'", s))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

/// Resolved logging settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Colour the human format. Ignored for JSONL.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment and CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// Resolve with an arbitrary variable lookup.
    ///
    /// Unparseable variable values are ignored rather than fatal: a typo in
    /// `TT_LOG` must not stop a classification run.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let defaults = LogConfig::default();
        let level = cli_level
            .or_else(|| lookup(LEVEL_ENV).and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.level);
        let format = cli_format
            .or_else(|| lookup(FORMAT_ENV).and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.format);
        let ansi = lookup("NO_COLOR").map_or(true, |v| v.is_empty());
        LogConfig { format, level, ansi }
    }

    /// Turn colour off, e.g. for `--no-color`.
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Directive used when `RUST_LOG` is absent.
    pub fn directive(&self) -> String {
        format!("tt_core={}", self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn format_names() {
        assert_eq!("Human".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Jsonl.to_string(), "jsonl");
    }

    #[test]
    fn level_names_round_trip() {
        for (level, name) in LogLevel::NAMES {
            assert_eq!(level.to_string(), name);
            assert_eq!(name.parse::<LogLevel>().unwrap(), level);
        }
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("quiet".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn verbosity_flags() {
        assert_eq!(LogLevel::from_verbosity(0, false), None);
        assert_eq!(LogLevel::from_verbosity(1, false), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_verbosity(4, false), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_verbosity(2, true), Some(LogLevel::Error));
    }

    #[test]
    fn environment_then_cli() {
        let env = vars(&[("TT_LOG", "debug"), ("TT_LOG_FORMAT", "jsonl")]);
        let config = LogConfig::resolve(&env, None, None);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Jsonl);
        assert_eq!(config.directive(), "tt_core=debug");

        let config = LogConfig::resolve(&env, Some(LogLevel::Error), Some(LogFormat::Human));
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.format, LogFormat::Human);
    }

    #[test]
    fn bad_environment_values_fall_back() {
        let config = LogConfig::resolve(vars(&[("TT_LOG", "chatty")]), None, None);
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn no_color_disables_ansi() {
        assert!(!LogConfig::resolve(vars(&[("NO_COLOR", "1")]), None, None).ansi);
        assert!(LogConfig::resolve(vars(&[("NO_COLOR", "")]), None, None).ansi);
        assert!(!LogConfig::default().without_ansi().ansi);
    }
}
