//! Execution strategy of boundary-crossing callables.

use crate::callable::{Callee, Invocation};
use crate::realm::Realm;
use crate::remap;
use core_types::JsResult;
use tracing::trace;

/// How a boundary-crossing callable reaches its trusted callee.
///
/// Each realm holds one of these in a mutable slot that the lock stack
/// swaps: [`Dispatch::Locked`] while guest code runs with revoked privilege,
/// [`Dispatch::Direct`] otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Call the callee as is
    #[default]
    Direct,
    /// Unlock around the callee and remap whatever it throws
    Locked,
}

impl Dispatch {
    /// Run `callee` under this strategy.
    pub fn execute(self, realm: &Realm, callee: &Callee, invocation: Invocation) -> JsResult {
        trace!(realm = %realm.name(), dispatch = ?self, callee = %invocation.callee, "dispatch");
        match self {
            Dispatch::Direct => callee(realm, invocation),
            Dispatch::Locked => {
                let _unlock = realm.unlock_scope();
                callee(realm, invocation).map_err(|thrown| remap::remap(realm, thrown))
            }
        }
    }
}
