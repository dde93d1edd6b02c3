//! Realm configuration.

use crate::error::{BoundaryError, BoundaryResult};
use crate::origin::Origin;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name given to realms that are not configured with one.
pub const DEFAULT_REALM_NAME: &str = "realm";

/// Options used to construct a [`Realm`](crate::Realm).
///
/// # Examples
///
/// ```
/// use realm::RealmOptions;
///
/// let options = RealmOptions::from_json(
///     r#"{ "name": "page", "origin": "https://example.com:443/index.html", "capabilities": ["Window"] }"#,
/// )
/// .unwrap();
/// assert_eq!(options.origin.as_deref(), Some("https://example.com"));
/// assert!(options.has_capability("Window"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RealmOptions {
    /// Realm name, shown in stack traces
    pub name: String,
    /// Serialized origin of the realm
    pub origin: Option<String>,
    /// Optional exposed capabilities enabled for the realm
    pub capabilities: BTreeSet<String>,
}

impl Default for RealmOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_REALM_NAME.to_string(),
            origin: None,
            capabilities: BTreeSet::new(),
        }
    }
}

impl RealmOptions {
    /// Options with the given name and nothing else.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the origin from a URL or a serialized origin.
    pub fn with_origin(mut self, origin: &str) -> BoundaryResult<Self> {
        self.origin = Some(normalize_origin(origin)?);
        Ok(self)
    }

    /// Enable a capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Whether `capability` is enabled.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Parse options from JSON, normalizing the origin.
    pub fn from_json(json: &str) -> BoundaryResult<Self> {
        let options: RealmOptions = serde_json::from_str(json)
            .map_err(|err| BoundaryError::InvalidOptions(err.to_string()))?;
        options.normalized()
    }

    /// Serialize options to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate and normalize every field.
    pub fn normalized(mut self) -> BoundaryResult<Self> {
        if let Some(origin) = self.origin.take() {
            self.origin = Some(normalize_origin(&origin)?);
        }
        Ok(self)
    }
}

fn normalize_origin(origin: &str) -> BoundaryResult<String> {
    Origin::parse(origin)
        .map(|origin| origin.serialize())
        .map_err(|err| BoundaryError::InvalidOptions(format!("origin {:?}: {}", origin, err)))
}
