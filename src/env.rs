use std::str::FromStr;

use log::LevelFilter;

use crate::runtime::DEFAULT_CAPACITY;

pub const LOG_VAR: &str = "RASP_LOG";
pub const MEMORY_VAR: &str = "RASP_MEMORY";

/// Settings read from the environment once, then passed to whoever needs them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    pub log_level: LevelFilter,
    pub memory_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LevelFilter::Warn,
            memory_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Unset or malformed values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Config::default();
        Config {
            log_level: parse_var(&lookup, LOG_VAR).unwrap_or(default.log_level),
            memory_capacity: parse_var(&lookup, MEMORY_VAR)
                .filter(|capacity| *capacity > 0)
                .unwrap_or(default.memory_capacity),
        }
    }
}

fn parse_var<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name)?.trim().parse().ok()
}
