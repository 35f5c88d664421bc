//! Child-process environment derived from the ambient environment.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// An immutable snapshot of environment variables handed to child processes.
///
/// Built once at startup from the harness's own environment. The ambient
/// environment is never modified; overrides produce a new snapshot. Names and
/// values are kept as raw OS strings, so variables that are not valid UTF-8
/// reach children untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl ProcessEnvironment {
    /// Snapshot the current process environment.
    pub fn from_ambient() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Build an environment from explicit pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Return a copy of this environment with `name` set to `value`.
    pub fn with_override(&self, name: &str, value: &str) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(name.into(), value.into());
        Self { vars }
    }

    /// Derive the child environment: the ambient one with the middleware
    /// selector variable pinned.
    pub fn derive_with_selector(selector: &str, implementation: &str) -> Self {
        Self::from_ambient().with_override(selector, implementation)
    }

    /// Raw value of `name`.
    pub fn get_os(&self, name: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(name)).map(OsString::as_os_str)
    }

    /// Value of `name`, if set and valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_os(name).and_then(OsStr::to_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
