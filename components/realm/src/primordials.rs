//! Read-only snapshot of a realm's intrinsic bindings.
//!
//! The snapshot is taken once, right after the realm is created, so guest
//! code that later replaces or mutates built-ins cannot influence trusted
//! logic that resolves them through [`Primordials`].

use core_types::{ErrorKind, ObjectId, Value};
use engine::{Engine, PropertySlot};
use std::collections::BTreeMap;
use tracing::debug;

/// Captured intrinsic bindings keyed by dotted path.
///
/// Data properties are recorded under their path (`TypeError.prototype`),
/// accessors as `path[[get]]` and `path[[set]]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Primordials {
    entries: BTreeMap<String, Value>,
}

impl Primordials {
    /// Walk every own property reachable from `global`.
    ///
    /// An object already being walked on the current path is recorded but
    /// not re-entered, which cuts cycles such as `globalThis` and
    /// `X.prototype.constructor`.
    pub fn capture(engine: &dyn Engine, global: ObjectId) -> Self {
        let mut primordials = Self::default();
        let mut path = vec![global];
        primordials.copy_all(engine, "", global, &mut path);
        debug!(%global, count = primordials.len(), "captured primordials");
        primordials
    }

    fn copy_all(
        &mut self,
        engine: &dyn Engine,
        prefix: &str,
        source: ObjectId,
        path: &mut Vec<ObjectId>,
    ) {
        for key in engine.own_keys(source) {
            let name = format!("{}{}", prefix, key);
            match engine.get_own_property(source, &key) {
                Some(PropertySlot::Data(value)) => {
                    self.entries.insert(name.clone(), value.clone());
                    if let Value::Object(child) = value {
                        if !path.contains(&child) {
                            path.push(child);
                            self.copy_all(engine, &format!("{}.", name), child, path);
                            path.pop();
                        }
                    }
                }
                Some(PropertySlot::Accessor { get, set }) => {
                    if let Some(get) = get {
                        self.entries
                            .insert(format!("{}[[get]]", name), Value::Object(get));
                    }
                    if let Some(set) = set {
                        self.entries
                            .insert(format!("{}[[set]]", name), Value::Object(set));
                    }
                }
                None => {}
            }
        }
    }

    /// Record a binding that was not reachable at capture time.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    /// Value captured under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Object captured under `name`.
    pub fn object(&self, name: &str) -> Option<ObjectId> {
        self.get(name).and_then(Value::as_object)
    }

    /// `<kind>.prototype` as captured.
    pub fn error_prototype(&self, kind: ErrorKind) -> Option<ObjectId> {
        self.object(&format!("{}.prototype", kind.name()))
    }

    /// Number of captured bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate captured bindings in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Built-in error prototypes of one realm, used to classify thrown values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorCatalog {
    prototypes: Vec<(ObjectId, ErrorKind)>,
}

impl ErrorCatalog {
    /// Catalog built from captured primordials.
    pub fn from_primordials(primordials: &Primordials) -> Self {
        let prototypes = ErrorKind::ALL
            .into_iter()
            .filter_map(|kind| Some((primordials.error_prototype(kind)?, kind)))
            .collect();
        Self { prototypes }
    }

    /// Prototype of `kind`, if it was captured.
    pub fn prototype(&self, kind: ErrorKind) -> Option<ObjectId> {
        self.prototypes
            .iter()
            .find(|(_, candidate)| *candidate == kind)
            .map(|(prototype, _)| *prototype)
    }

    /// Kind whose prototype is exactly `prototype`.
    pub fn kind_of_prototype(&self, prototype: ObjectId) -> Option<ErrorKind> {
        self.prototypes
            .iter()
            .find(|(candidate, _)| *candidate == prototype)
            .map(|(_, kind)| *kind)
    }

    /// Classify `object` by the nearest built-in error prototype on its
    /// chain; values matching none are generic errors.
    pub fn classify(&self, engine: &dyn Engine, object: ObjectId) -> ErrorKind {
        std::iter::successors(engine.prototype_of(object), |current| {
            engine.prototype_of(*current)
        })
        .take(engine::heap::MAX_PROTOTYPE_CHAIN)
        .find_map(|prototype| self.kind_of_prototype(prototype))
        .unwrap_or(ErrorKind::Error)
    }
}
