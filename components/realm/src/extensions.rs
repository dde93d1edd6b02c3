//! Per-realm extension state keyed by type.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Typed store collaborators use to keep their implementation classes and
/// other realm-private state.
///
/// # Examples
///
/// ```
/// use realm::Extensions;
///
/// struct Counter(u32);
///
/// let extensions = Extensions::new();
/// extensions.insert(Counter(1));
/// assert_eq!(extensions.get::<Counter>().map(|c| c.0), Some(1));
/// ```
#[derive(Default)]
pub struct Extensions {
    slots: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

impl Extensions {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing any previous value of the same type.
    pub fn insert<T: Any>(&self, value: T) -> Option<Rc<T>> {
        self.slots
            .borrow_mut()
            .insert(TypeId::of::<T>(), Rc::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    /// Value of type `T`, if stored.
    pub fn get<T: Any>(&self) -> Option<Rc<T>> {
        let slot = self.slots.borrow().get(&TypeId::of::<T>()).cloned()?;
        slot.downcast::<T>().ok()
    }

    /// Value of type `T`, created by `init` when missing.
    pub fn get_or_insert_with<T: Any>(&self, init: impl FnOnce() -> T) -> Rc<T> {
        if let Some(existing) = self.get::<T>() {
            return existing;
        }
        let value = Rc::new(init());
        self.slots
            .borrow_mut()
            .insert(TypeId::of::<T>(), value.clone());
        value
    }

    /// Remove the value of type `T`.
    pub fn remove<T: Any>(&self) -> Option<Rc<T>> {
        self.slots
            .borrow_mut()
            .remove(&TypeId::of::<T>())
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    /// Whether a value of type `T` is stored.
    pub fn contains<T: Any>(&self) -> bool {
        self.slots.borrow().contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.slots.borrow().len())
            .finish()
    }
}
