//! Driver configuration options
//!
//! Drivers describe the options they accept with [`CreateFlag`]; the host
//! collects values into [`DriverOptions`] and hands them to
//! `Driver::set_config_from_flags`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Description of a single option recognized by a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFlag {
    /// Option name (e.g. "ovh-region")
    pub name: &'static str,

    /// Environment variable consulted when the option is absent
    pub env_var: Option<&'static str>,

    /// Help text
    pub usage: &'static str,

    /// Default value
    pub value: FlagValue,
}

/// Typed option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    String(String),
    Bool(bool),
}

impl FlagValue {
    fn parse_like(&self, raw: &str) -> FlagValue {
        match self {
            FlagValue::String(_) => FlagValue::String(raw.to_string()),
            FlagValue::Bool(_) => FlagValue::Bool(matches!(raw, "1" | "true" | "TRUE" | "yes")),
        }
    }
}

impl CreateFlag {
    pub fn string(
        name: &'static str,
        env_var: Option<&'static str>,
        usage: &'static str,
        default: &str,
    ) -> Self {
        Self {
            name,
            env_var,
            usage,
            value: FlagValue::String(default.to_string()),
        }
    }

    pub fn bool(name: &'static str, env_var: Option<&'static str>, usage: &'static str) -> Self {
        Self {
            name,
            env_var,
            usage,
            value: FlagValue::Bool(false),
        }
    }
}

/// Option values keyed by flag name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverOptions {
    values: HashMap<String, FlagValue>,

    /// Keys whose value was read from the environment
    #[serde(skip)]
    from_env: HashSet<String>,
}

impl DriverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from explicit values, filling every absent flag from its
    /// environment variable and then its default
    pub fn with_defaults<I, K>(flags: &[CreateFlag], explicit: I) -> Self
    where
        I: IntoIterator<Item = (K, FlagValue)>,
        K: Into<String>,
    {
        let mut options = Self::new();
        for (key, value) in explicit {
            options.values.insert(key.into(), value);
        }

        for flag in flags {
            if options.values.contains_key(flag.name) {
                continue;
            }

            let from_env = flag
                .env_var
                .and_then(|var| std::env::var(var).ok())
                .filter(|v| !v.is_empty())
                .map(|raw| flag.value.parse_like(&raw));

            let value = match from_env {
                Some(value) => {
                    options.from_env.insert(flag.name.to_string());
                    value
                }
                None => flag.value.clone(),
            };
            options.values.insert(flag.name.to_string(), value);
        }

        options
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.from_env.remove(&key);
        self.values.insert(key, FlagValue::String(value.into()));
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        let key = key.into();
        self.from_env.remove(&key);
        self.values.insert(key, FlagValue::Bool(value));
    }

    /// String value of a flag, empty when unset or not a string
    pub fn string(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(FlagValue::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// Boolean value of a flag, false when unset or not a bool
    pub fn bool(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(FlagValue::Bool(true)))
    }

    /// Whether the value of a flag came from its environment variable
    pub fn is_from_env(&self, key: &str) -> bool {
        self.from_env.contains(key)
    }

    /// String value of a flag given explicitly, empty when it was unset or
    /// only found in the environment
    pub fn explicit_string(&self, key: &str) -> String {
        if self.is_from_env(key) {
            return String::new();
        }
        self.string(key)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}
