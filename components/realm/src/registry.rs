//! Bidirectional 1:1 linkage between interface and implementation objects.
//!
//! The forward direction (interface to implementation) and the back-reference
//! (implementation to interface) are kept in two maps that are only ever
//! updated together, so a link is either present in both or in neither.

use crate::error::{BoundaryError, BoundaryResult, LinkSide};
use core_types::{ObjectId, Value};
use engine::heap::MAX_PROTOTYPE_CHAIN;
use engine::Engine;
use std::collections::HashMap;
use tracing::{trace, warn};

/// Anything that may name an object taking part in a linkage.
///
/// Primitives never link, so their lookups always come back empty.
pub trait Linkable {
    /// The object handle, if any.
    fn object_id(&self) -> Option<ObjectId>;
}

impl Linkable for ObjectId {
    fn object_id(&self) -> Option<ObjectId> {
        Some(*self)
    }
}

impl Linkable for Value {
    fn object_id(&self) -> Option<ObjectId> {
        self.as_object()
    }
}

impl Linkable for Option<ObjectId> {
    fn object_id(&self) -> Option<ObjectId> {
        *self
    }
}

impl<T: Linkable + ?Sized> Linkable for &T {
    fn object_id(&self) -> Option<ObjectId> {
        (**self).object_id()
    }
}

/// Exclusive interface/implementation pairs of one realm.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    implementations: HashMap<ObjectId, ObjectId>,
    interfaces: HashMap<ObjectId, ObjectId>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live links.
    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    /// Whether no link exists.
    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }

    /// Implementation linked directly to `object`.
    pub fn own_implementation_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.implementations.get(&object.object_id()?).copied()
    }

    /// Interface linked directly to `object`.
    pub fn own_interface_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.interfaces.get(&object.object_id()?).copied()
    }

    /// Interface of `object`.
    ///
    /// Back-references are never inherited, so this only inspects the object
    /// itself.
    pub fn interface_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.own_interface_of(object)
    }

    /// Implementation of `object`, falling back to the nearest link on its
    /// prototype chain.
    pub fn implementation_of(&self, engine: &dyn Engine, object: impl Linkable) -> Option<ObjectId> {
        let start = object.object_id()?;
        std::iter::successors(Some(start), |current| engine.prototype_of(*current))
            .take(MAX_PROTOTYPE_CHAIN)
            .find_map(|current| self.implementations.get(&current).copied())
    }

    /// Whether `object` itself owns an implementation.
    pub fn has_own_implementation(&self, object: impl Linkable) -> bool {
        self.own_implementation_of(object).is_some()
    }

    /// Whether `object` itself owns an interface.
    pub fn has_own_interface(&self, object: impl Linkable) -> bool {
        self.own_interface_of(object).is_some()
    }

    /// Whether `object` or any of its prototypes owns an implementation.
    pub fn has_implementation(&self, engine: &dyn Engine, object: impl Linkable) -> bool {
        self.implementation_of(engine, object).is_some()
    }

    /// Whether `object` owns an interface.
    pub fn has_interface(&self, object: impl Linkable) -> bool {
        self.interface_of(object).is_some()
    }

    /// Link `interface` to `implementation`.
    ///
    /// Relinking an identical pair is a no-op. If either side already holds a
    /// different counterpart nothing changes and a conflict is returned.
    pub fn set_implementation(
        &mut self,
        interface: impl Linkable,
        implementation: impl Linkable,
    ) -> BoundaryResult<()> {
        let (Some(interface), Some(implementation)) =
            (interface.object_id(), implementation.object_id())
        else {
            return Err(BoundaryError::NotAnObject);
        };
        if let Some(existing) = self.implementations.get(&interface) {
            if *existing == implementation {
                return Ok(());
            }
            warn!(%interface, %existing, %implementation, "interface already linked");
            return Err(BoundaryError::LinkageConflict {
                side: LinkSide::Interface,
            });
        }
        if let Some(existing) = self.interfaces.get(&implementation) {
            if *existing == interface {
                return Ok(());
            }
            warn!(%implementation, %existing, %interface, "implementation already linked");
            return Err(BoundaryError::LinkageConflict {
                side: LinkSide::Implementation,
            });
        }
        trace!(%interface, %implementation, "link");
        self.implementations.insert(interface, implementation);
        self.interfaces.insert(implementation, interface);
        Ok(())
    }

    /// Unlink `object` from its own implementation, returning it.
    pub fn remove_implementation_of(&mut self, object: impl Linkable) -> Option<ObjectId> {
        let interface = object.object_id()?;
        let implementation = self.implementations.remove(&interface)?;
        self.interfaces.remove(&implementation);
        trace!(%interface, %implementation, "unlink");
        Some(implementation)
    }

    /// Unlink `object` from its own interface, returning it.
    pub fn remove_interface_of(&mut self, object: impl Linkable) -> Option<ObjectId> {
        let implementation = object.object_id()?;
        let interface = self.interfaces.remove(&implementation)?;
        self.implementations.remove(&interface);
        trace!(%interface, %implementation, "unlink");
        Some(interface)
    }
}
