//! Arena storage for engine objects.
//!
//! Objects are never moved or freed: an [`ObjectId`] stays valid for the
//! lifetime of the heap that issued it.

use crate::capability::{EngineError, NativeCallback, PropertySlot};
use crate::parser::Program;
use core_types::{ObjectId, Value};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Hard upper bound for `[[Prototype]]` chain traversals.
pub const MAX_PROTOTYPE_CHAIN: usize = 10_000;

/// What runs when a function object is called.
#[derive(Clone)]
pub enum FunctionBody {
    /// Host callback
    Native(NativeCallback),
    /// Compiled guest code
    Script {
        /// Parsed body
        program: Rc<Program>,
        /// Parameter names bound to positional arguments
        params: Rc<[String]>,
    },
}

impl fmt::Debug for FunctionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionBody::Native(_) => write!(f, "Native(..)"),
            FunctionBody::Script { params, .. } => {
                f.debug_struct("Script").field("params", params).finish()
            }
        }
    }
}

/// Function internals.
#[derive(Debug, Clone)]
pub struct FunctionData {
    /// Name used in stack frames
    pub name: String,
    /// Whether `new` is allowed
    pub constructor: bool,
    /// Code to run
    pub body: FunctionBody,
}

/// Object internals.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Callable object
    Function(FunctionData),
    /// Error object with its nested errors
    Error {
        /// Aggregated errors, empty for non-aggregates
        errors: Vec<Value>,
    },
}

/// A heap slot.
pub struct HeapObject {
    /// Global of the creating realm
    pub global: ObjectId,
    /// `[[Prototype]]`
    pub prototype: Option<ObjectId>,
    /// Own properties in insertion order
    pub properties: Vec<(String, PropertySlot)>,
    /// Internal kind
    pub kind: ObjectKind,
    /// Host data
    pub internal: Option<Rc<dyn Any>>,
}

impl HeapObject {
    /// Own property by name.
    pub fn property(&self, key: &str) -> Option<&PropertySlot> {
        self.properties
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, slot)| slot)
    }

    /// Insert or replace an own property, keeping the original position.
    pub fn put(&mut self, key: &str, slot: PropertySlot) {
        match self.properties.iter_mut().find(|(name, _)| name == key) {
            Some((_, existing)) => *existing = slot,
            None => self.properties.push((key.to_string(), slot)),
        }
    }

    /// Function internals, if callable.
    pub fn function(&self) -> Option<&FunctionData> {
        match &self.kind {
            ObjectKind::Function(data) => Some(data),
            _ => None,
        }
    }
}

impl fmt::Debug for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapObject")
            .field("global", &self.global)
            .field("prototype", &self.prototype)
            .field("kind", &self.kind)
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Object arena of one engine.
#[derive(Debug)]
pub struct Heap {
    id: u32,
    objects: Vec<HeapObject>,
}

impl Heap {
    /// Create an empty heap with the given engine id.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            objects: Vec::new(),
        }
    }

    /// Handle the next allocation will receive.
    pub fn next_id(&self) -> ObjectId {
        ObjectId::new(self.id, self.objects.len() as u32)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the heap is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Store an object and return its handle.
    pub fn alloc(
        &mut self,
        global: ObjectId,
        prototype: Option<ObjectId>,
        kind: ObjectKind,
    ) -> ObjectId {
        let id = self.next_id();
        self.objects.push(HeapObject {
            global,
            prototype,
            properties: Vec::new(),
            kind,
            internal: None,
        });
        id
    }

    /// Borrow an object.
    pub fn get(&self, id: ObjectId) -> Result<&HeapObject, EngineError> {
        if id.heap() != self.id {
            return Err(EngineError::UnknownObject(id));
        }
        self.objects
            .get(id.index() as usize)
            .ok_or(EngineError::UnknownObject(id))
    }

    /// Mutably borrow an object.
    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut HeapObject, EngineError> {
        if id.heap() != self.id {
            return Err(EngineError::UnknownObject(id));
        }
        self.objects
            .get_mut(id.index() as usize)
            .ok_or(EngineError::UnknownObject(id))
    }

    /// Iterate the prototype chain starting at `id` itself.
    pub fn chain(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        let mut next = Some(id);
        std::iter::from_fn(move || {
            let current = next?;
            next = self.get(current).ok().and_then(|object| object.prototype);
            Some(current)
        })
        .take(MAX_PROTOTYPE_CHAIN)
    }

    /// Find a property along the prototype chain.
    pub fn lookup(&self, id: ObjectId, key: &str) -> Option<PropertySlot> {
        self.chain(id)
            .find_map(|current| self.get(current).ok()?.property(key).cloned())
    }

    /// Find a data property along the prototype chain without running accessors.
    pub fn lookup_data(&self, id: ObjectId, key: &str) -> Option<Value> {
        match self.lookup(id, key)? {
            PropertySlot::Data(value) => Some(value),
            PropertySlot::Accessor { .. } => None,
        }
    }
}
