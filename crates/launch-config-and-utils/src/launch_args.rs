//! Launch arguments in the `name:=value` form used by ROS launch.

use crate::{CoreError, CoreResult};
use std::collections::BTreeMap;

/// A launch argument a scenario declares before it can be launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredArgument {
    pub name: String,
    pub default: Option<String>,
    pub description: String,
}

impl DeclaredArgument {
    /// Declare an argument with no default; omitting it is a configuration error.
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
            description: description.to_string(),
        }
    }

    pub fn with_default(name: &str, default: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            default: Some(default.to_string()),
            description: description.to_string(),
        }
    }
}

/// Values supplied by the caller for declared launch arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchArguments {
    values: BTreeMap<String, String>,
}

impl LaunchArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name:=value` pairs. Later occurrences win.
    pub fn parse<I, S>(raw: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = BTreeMap::new();
        for item in raw {
            let item = item.as_ref();
            let (name, value) = item
                .split_once(":=")
                .ok_or_else(|| CoreError::InvalidLaunchArgument(item.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(CoreError::InvalidLaunchArgument(item.to_string()));
            }
            values.insert(name.to_string(), value.to_string());
        }
        Ok(Self { values })
    }

    /// Set (or replace) a value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Resolve every declared argument, applying defaults.
    ///
    /// Fails on the first declared argument that has neither a value nor a default.
    pub fn resolve(&self, declared: &[DeclaredArgument]) -> CoreResult<BTreeMap<String, String>> {
        let mut resolved = BTreeMap::new();
        for argument in declared {
            let value = self
                .values
                .get(&argument.name)
                .cloned()
                .or_else(|| argument.default.clone())
                .ok_or_else(|| CoreError::MissingLaunchArgument(argument.name.clone()))?;
            resolved.insert(argument.name.clone(), value);
        }
        Ok(resolved)
    }
}
