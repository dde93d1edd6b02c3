//! Realm stack and lock stack.
//!
//! Both stacks coalesce: entering the realm already on top, or a privilege
//! state equal to the current one, bumps the top frame's reference count
//! instead of pushing a duplicate frame.

use crate::error::{BoundaryError, BoundaryResult, StackKind};
use crate::realm::Realm;
use std::cell::RefCell;
use tracing::{error, trace};

#[derive(Debug)]
struct RealmFrame {
    realm: Realm,
    refs: usize,
}

thread_local! {
    static REALM_STACK: RefCell<Vec<RealmFrame>> = const { RefCell::new(Vec::new()) };
}

/// Push `realm` or bump the top frame.
pub(crate) fn push_realm(realm: &Realm) {
    REALM_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.last_mut() {
            Some(top) if top.realm == *realm => top.refs += 1,
            _ => stack.push(RealmFrame {
                realm: realm.clone(),
                refs: 1,
            }),
        }
        trace!(realm = %realm.name(), depth = stack.len(), "enter realm");
    });
}

/// Release one reference of the top frame, which must belong to `realm`.
pub(crate) fn pop_realm(realm: &Realm) -> BoundaryResult<()> {
    let released = REALM_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.last_mut() {
            Some(top) if top.realm == *realm => {
                top.refs -= 1;
                let released = if top.refs == 0 { stack.pop() } else { None };
                trace!(realm = %realm.name(), depth = stack.len(), "leave realm");
                Ok(released)
            }
            _ => Err(BoundaryError::StackViolation(StackKind::Realm)),
        }
    });
    match released {
        // the popped frame may hold the last handle of its realm; drop it
        // outside the stack borrow
        Ok(frame) => {
            drop(frame);
            Ok(())
        }
        Err(err) => {
            error!(realm = %realm.name(), "leave of a realm that is not on top of the realm stack");
            Err(err)
        }
    }
}

/// Realm on top of the stack.
pub(crate) fn top_realm() -> Option<Realm> {
    REALM_STACK.with(|stack| stack.borrow().last().map(|frame| frame.realm.clone()))
}

/// Frames of the realm stack, bottom first, with their reference counts.
pub fn realm_stack() -> Vec<(Realm, usize)> {
    REALM_STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .map(|frame| (frame.realm.clone(), frame.refs))
            .collect()
    })
}

/// One frame of a realm's lock stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockFrame {
    /// Whether the privilege state of this frame is locked
    pub locked: bool,
    /// Number of coalesced entries
    pub refs: usize,
}

/// Privilege-state stack of one realm.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LockStack {
    frames: Vec<LockFrame>,
}

impl LockStack {
    /// Create an empty, unlocked stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a privilege state.
    pub fn push(&mut self, locked: bool) {
        match self.frames.last_mut() {
            Some(top) if top.locked == locked => top.refs += 1,
            _ => self.frames.push(LockFrame { locked, refs: 1 }),
        }
    }

    /// Leave a privilege state, which must be the current one.
    pub fn pop(&mut self, locked: bool) -> BoundaryResult<()> {
        match self.frames.last_mut() {
            Some(top) if top.locked == locked => {
                top.refs -= 1;
                if top.refs == 0 {
                    self.frames.pop();
                }
                Ok(())
            }
            _ => Err(BoundaryError::StackViolation(StackKind::Lock)),
        }
    }

    /// Current privilege state; an empty stack is unlocked.
    pub fn is_locked(&self) -> bool {
        self.frames.last().is_some_and(|top| top.locked)
    }

    /// Frames, bottom first.
    pub fn frames(&self) -> &[LockFrame] {
        &self.frames
    }

    /// Number of frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

fn fail_on_drop(realm: &Realm, result: BoundaryResult<()>) {
    if let Err(err) = result {
        error!(realm = %realm.name(), %err, "scope released out of order");
        if !std::thread::panicking() {
            panic!("{}", err);
        }
    }
}

/// Keeps a realm entered until dropped.
#[derive(Debug)]
#[must_use = "the realm is left as soon as the scope is dropped"]
pub struct RealmScope {
    realm: Realm,
}

impl RealmScope {
    pub(crate) fn new(realm: &Realm) -> Self {
        realm.enter();
        Self {
            realm: realm.clone(),
        }
    }
}

impl Drop for RealmScope {
    fn drop(&mut self) {
        fail_on_drop(&self.realm, self.realm.leave());
    }
}

/// Keeps a realm locked until dropped.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the scope is dropped"]
pub struct LockScope {
    realm: Realm,
}

impl LockScope {
    pub(crate) fn new(realm: &Realm) -> Self {
        realm.enter_lock();
        Self {
            realm: realm.clone(),
        }
    }
}

impl Drop for LockScope {
    fn drop(&mut self) {
        fail_on_drop(&self.realm, self.realm.leave_lock());
    }
}

/// Keeps a realm unlocked until dropped.
#[derive(Debug)]
#[must_use = "the unlock is released as soon as the scope is dropped"]
pub struct UnlockScope {
    realm: Realm,
}

impl UnlockScope {
    pub(crate) fn new(realm: &Realm) -> Self {
        realm.enter_unlock();
        Self {
            realm: realm.clone(),
        }
    }
}

impl Drop for UnlockScope {
    fn drop(&mut self) {
        fail_on_drop(&self.realm, self.realm.leave_unlock());
    }
}
