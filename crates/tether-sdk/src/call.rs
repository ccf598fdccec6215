//! Call protocol
//!
//! ```text
//! Begin → PushCallable → PushArgs → InstallErrorHandler → ProtectedInvoke
//!       → ConvertResult | PropagateError → End
//! ```
//!
//! `Object::call` and `Object::call_field` perform the first three steps under
//! a [`StackGuard`](crate::guard::StackGuard) and hand over to [`invoke`]. The
//! guard, not this module, restores the stack on every exit path.

use crate::error::{BindResult, Error};
use crate::machine::Machine;
use crate::marshal::CallReturn;

/// Install the traceback handler below the callable, run the protected call
/// and convert the outcome.
///
/// Expects the stack to hold, above absolute depth `base`, the callable
/// followed by `argc` arguments.
pub(crate) fn invoke<'m, R>(machine: &'m dyn Machine, base: i32, argc: i32) -> BindResult<R>
where
    R: CallReturn<'m>,
{
    let handler = base + 1;
    machine.push_traceback();
    machine.insert(handler);

    if let Err(fault) = machine.protected_call(argc, R::RESULTS, handler) {
        let message = machine.describe(-1);
        tracing::debug!(%fault, %message, "protected call failed");
        return Err(Error::Call { fault, message });
    }

    // Stack: handler at base + 1, first result (if any) at base + 2
    R::collect(machine, handler + 1)
}
