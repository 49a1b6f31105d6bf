//! Placeholder expression resolution.
//!
//! Header values may embed `{{TAG:NAME}}` tokens:
//!
//! | Tag    | Source                                   |
//! |--------|------------------------------------------|
//! | `ENV`  | process environment variable             |
//! | `PROP` | configured property                      |
//! | `SYS`  | `HOSTNAME` or `PID` of the running process |
//!
//! Tokens whose lookup yields nothing become the empty string. Tokens with
//! any other tag are left as written. Substituted text is never re-scanned.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::headers::identity::RuntimeIdentity;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Z]+):([^}]+)\}\}").expect("placeholder pattern is valid")
});

/// Sources a placeholder can be resolved against.
pub trait Lookups {
    /// `ENV` lookup.
    fn env(&self, name: &str) -> Option<String>;

    /// `PROP` lookup.
    fn property(&self, name: &str) -> Option<String>;

    /// `SYS` lookup.
    fn system(&self, name: &str) -> Option<String>;
}

/// Lookups backed by the real process environment.
#[derive(Debug, Clone)]
pub struct ProcessLookups {
    properties: HashMap<String, String>,
    identity: RuntimeIdentity,
}

impl ProcessLookups {
    /// Create lookups over the given properties and the current process identity.
    pub fn new(properties: HashMap<String, String>) -> Self {
        Self::with_identity(properties, RuntimeIdentity::current().clone())
    }

    pub fn with_identity(properties: HashMap<String, String>, identity: RuntimeIdentity) -> Self {
        Self {
            properties,
            identity,
        }
    }
}

impl Lookups for ProcessLookups {
    fn env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn system(&self, name: &str) -> Option<String> {
        system_value(&self.identity, name)
    }
}

/// The fixed `SYS` registry.
pub fn system_value(identity: &RuntimeIdentity, key: &str) -> Option<String> {
    match key {
        "HOSTNAME" => Some(identity.host_name.clone()),
        "PID" => Some(identity.pid.to_string()),
        _ => None,
    }
}

/// Substitute every `{{TAG:NAME}}` token in `input`.
pub fn resolve<L: Lookups + ?Sized>(input: &str, lookups: &L) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps[2].trim();
            let value = match &caps[1] {
                "ENV" => lookups.env(name),
                "PROP" => lookups.property(name),
                "SYS" => lookups.system(name),
                _ => return caps[0].to_string(),
            };
            value.unwrap_or_default()
        })
        .into_owned()
}

/// Like [`resolve`], treating an absent input as empty.
pub fn resolve_optional<L: Lookups + ?Sized>(input: Option<&str>, lookups: &L) -> String {
    input.map(|s| resolve(s, lookups)).unwrap_or_default()
}
