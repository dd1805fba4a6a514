//! Runtime configuration
//!
//! Defaults match the behaviour expected from an instrumented process with no
//! setup at all. Every field can be overridden through `HITSTACK_*`
//! environment variables, read once when the process-wide registry is built.

use crate::domain::ConfigError;
use log::warn;
use std::str::FromStr;

/// Maximum number of return addresses kept per captured stack
pub const DEFAULT_MAX_FRAMES: usize = 256;

/// Maximum number of addresses handed to one line-tool invocation
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Name (or path) of the external line-resolution tool
pub const DEFAULT_ADDR2LINE: &str = "addr2line";

pub const ENV_LINE_BACKEND: &str = "HITSTACK_LINE_BACKEND";
pub const ENV_ADDR2LINE: &str = "HITSTACK_ADDR2LINE";
pub const ENV_BATCH_SIZE: &str = "HITSTACK_BATCH_SIZE";
pub const ENV_MAX_FRAMES: &str = "HITSTACK_MAX_FRAMES";

/// Where source file/line information comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBackend {
    /// Batched `addr2line` subprocess calls
    #[default]
    Addr2line,
    /// In-process DWARF lookup
    Dwarf,
    /// No line resolution; frames keep `??`
    Off,
}

impl FromStr for LineBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "addr2line" | "external" => Ok(LineBackend::Addr2line),
            "dwarf" | "gimli" => Ok(LineBackend::Dwarf),
            "off" | "none" | "disabled" => Ok(LineBackend::Off),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_frames: usize,
    pub batch_size: usize,
    /// Ask the line backend for the chain of inlined call sites
    pub unwind_inline: bool,
    pub line_backend: LineBackend,
    pub addr2line_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            batch_size: DEFAULT_BATCH_SIZE,
            unwind_inline: true,
            line_backend: LineBackend::default(),
            addr2line_path: DEFAULT_ADDR2LINE.to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with the environment, ignoring (and logging) bad values
    #[must_use]
    pub fn from_env() -> Self {
        Self::overlay(|var| std::env::var(var).ok(), |err| warn!("Ignoring configuration: {err}"))
    }

    /// Defaults overlaid with the environment
    ///
    /// # Errors
    /// Returns the first invalid `HITSTACK_*` value encountered
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`Config::try_from_env`] with an injectable variable source
    ///
    /// # Errors
    /// Returns the first invalid value encountered
    pub fn try_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut first_error = None;
        let config = Self::overlay(lookup, |err| {
            first_error.get_or_insert(err);
        });
        match first_error {
            Some(err) => Err(err),
            None => Ok(config),
        }
    }

    fn overlay(
        lookup: impl Fn(&str) -> Option<String>,
        mut on_error: impl FnMut(ConfigError),
    ) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_LINE_BACKEND) {
            match value.parse() {
                Ok(backend) => config.line_backend = backend,
                Err(err) => on_error(err),
            }
        }

        if let Some(value) = lookup(ENV_ADDR2LINE) {
            if value.trim().is_empty() {
                on_error(ConfigError::InvalidValue {
                    var: ENV_ADDR2LINE,
                    value,
                    reason: "must not be empty".to_string(),
                });
            } else {
                config.addr2line_path = value;
            }
        }

        if let Some(value) = lookup(ENV_BATCH_SIZE) {
            match parse_positive(ENV_BATCH_SIZE, &value) {
                Ok(n) => config.batch_size = n,
                Err(err) => on_error(err),
            }
        }

        if let Some(value) = lookup(ENV_MAX_FRAMES) {
            match parse_positive(ENV_MAX_FRAMES, &value) {
                Ok(n) => config.max_frames = n,
                Err(err) => on_error(err),
            }
        }

        config
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_frames, 256);
        assert_eq!(config.batch_size, 100);
        assert!(config.unwind_inline);
        assert_eq!(config.line_backend, LineBackend::Addr2line);
        assert_eq!(config.addr2line_path, "addr2line");
    }

    #[test]
    fn test_overlay_from_lookup() {
        let config = Config::try_from_lookup(lookup_from(&[
            (ENV_LINE_BACKEND, "DWARF"),
            (ENV_ADDR2LINE, "/opt/binutils/bin/addr2line"),
            (ENV_BATCH_SIZE, "16"),
        ]))
        .unwrap();
        assert_eq!(config.line_backend, LineBackend::Dwarf);
        assert_eq!(config.addr2line_path, "/opt/binutils/bin/addr2line");
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.max_frames, DEFAULT_MAX_FRAMES);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = Config::try_from_lookup(lookup_from(&[(ENV_BATCH_SIZE, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: ENV_BATCH_SIZE, .. }));

        let err = Config::try_from_lookup(lookup_from(&[(ENV_LINE_BACKEND, "gdb")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownBackend("gdb".to_string()));
    }

    #[test]
    fn test_backend_aliases() {
        assert_eq!("off".parse::<LineBackend>().unwrap(), LineBackend::Off);
        assert_eq!(" none ".parse::<LineBackend>().unwrap(), LineBackend::Off);
        assert_eq!("external".parse::<LineBackend>().unwrap(), LineBackend::Addr2line);
    }
}
