use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::validate_env_key;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// Caller-supplied `KEY=value` overrides passed to every stage script.
///
/// Immutable once built; later entries with the same key replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    vars: BTreeMap<String, String>,
}

impl EnvOverrides {
    /// Parse `KEY=value` strings, splitting on the first `=`.
    pub fn parse<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vars = BTreeMap::new();
        for entry in entries {
            let entry = entry.as_ref();
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                PipelineError::config(format!(
                    "Environment variables via --env must be in KEY=value form (got {:?})",
                    entry
                ))
            })?;
            validate_env_key("env", key)?;
            vars.insert(key.to_string(), value.to_string());
        }
        Ok(Self { vars })
    }

    pub fn from_map(map: BTreeMap<String, String>) -> Result<Self> {
        for key in map.keys() {
            validate_env_key("environment", key)?;
        }
        Ok(Self { vars: map })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// 啟動時擷取一次的行程環境快照，之後只讀
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl HostEnvironment {
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// UTF-8 value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(OsStr::new(key)).and_then(|v| v.to_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}
