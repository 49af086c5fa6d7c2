//! Container options.
//!
//! Options are plain values with sensible defaults. With the `config`
//! feature they can also be read from JSON, YAML or the environment.

use std::fmt;
use std::str::FromStr;

use crate::error::ContainerError;

/// Maximum resolution chain length when nothing else is configured.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// What the registry does when a capability is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum DuplicatePolicy {
    /// Fail with [`ContainerError::DuplicateRegistration`].
    #[default]
    Reject,
    /// Last registration wins.
    Replace,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicatePolicy::Reject => "reject",
            DuplicatePolicy::Replace => "replace",
        })
    }
}

impl FromStr for DuplicatePolicy {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "replace" => Ok(DuplicatePolicy::Replace),
            other => Err(ContainerError::Config {
                message: format!("unknown duplicate policy `{other}`"),
            }),
        }
    }
}

/// Behaviour switches for a [`Registry`](crate::Registry) and the container
/// it builds.
///
/// # Examples
///
/// ```rust
/// use scoped_registry::{ContainerOptions, DuplicatePolicy, Registry};
///
/// let options = ContainerOptions {
///     duplicate_policy: DuplicatePolicy::Replace,
///     validate_on_build: true,
///     ..ContainerOptions::default()
/// };
///
/// let mut registry = Registry::with_options(options);
/// registry.add_instance(1u8).unwrap();
/// registry.add_instance(2u8).unwrap(); // replaces the first
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    pub duplicate_policy: DuplicatePolicy,
    /// Check declared dependencies when the registry is built.
    pub validate_on_build: bool,
    pub max_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            validate_on_build: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(feature = "config")]
impl ContainerOptions {
    pub const ENV_DUPLICATES: &'static str = "SCOPED_REGISTRY_DUPLICATES";
    pub const ENV_VALIDATE: &'static str = "SCOPED_REGISTRY_VALIDATE";
    pub const ENV_MAX_DEPTH: &'static str = "SCOPED_REGISTRY_MAX_DEPTH";

    /// Reads options from a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ContainerError> {
        serde_json::from_str::<Self>(json)
            .map_err(|e| ContainerError::Config { message: e.to_string() })
            .and_then(Self::checked)
    }

    /// Reads options from a YAML document; missing fields keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ContainerError> {
        serde_yaml::from_str::<Self>(yaml)
            .map_err(|e| ContainerError::Config { message: e.to_string() })
            .and_then(Self::checked)
    }

    /// Overlays the `SCOPED_REGISTRY_*` environment variables on the defaults.
    pub fn from_env() -> Result<Self, ContainerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ContainerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(value) = lookup(Self::ENV_DUPLICATES) {
            options.duplicate_policy = value.parse()?;
        }
        if let Some(value) = lookup(Self::ENV_VALIDATE) {
            options.validate_on_build = parse_flag(Self::ENV_VALIDATE, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_MAX_DEPTH) {
            options.max_depth = value.trim().parse().map_err(|_| ContainerError::Config {
                message: format!("{} must be a positive integer, got `{value}`", Self::ENV_MAX_DEPTH),
            })?;
        }
        Self::checked(options)
    }

    fn checked(self) -> Result<Self, ContainerError> {
        if self.max_depth == 0 {
            return Err(ContainerError::Config {
                message: "max_depth must be greater than zero".to_string(),
            });
        }
        Ok(self)
    }
}

#[cfg(feature = "config")]
fn parse_flag(key: &str, value: &str) -> Result<bool, ContainerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ContainerError::Config {
            message: format!("{key} must be a boolean, got `{value}`"),
        }),
    }
}
