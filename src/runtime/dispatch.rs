//! Function dispatch over possibly-pending inputs.
//!
//! The target, the receiver, and every argument may each be ready or still
//! pending. When everything is ready the body runs immediately and failures
//! surface synchronously at the call site; otherwise the call is composed
//! onto the pending inputs and its outcome settles the resulting
//! computation, and only it.

use std::collections::VecDeque;

use tracing::trace;

use crate::graph::value::Value;
use crate::runtime::error::ChainError;
use crate::runtime::eventual::Produced;
use crate::runtime::realm::Realm;

type Finish = Box<dyn FnOnce(&Realm, Vec<Value>) -> Result<Produced, ChainError>>;

/// Invoke `target` as a function with the given receiver and arguments.
///
/// The receiver reaches the body raw, never as a handle. A non-function
/// target fails with `NotCallable`; a fault from the body is forwarded
/// unchanged.
pub(crate) fn call(
    realm: &Realm,
    target: Produced,
    receiver: Produced,
    args: Vec<Produced>,
) -> Result<Produced, ChainError> {
    target.and_then(realm, move |realm, target_value| match target_value {
        Value::Function(func) => receiver.and_then(realm, move |realm, this| {
            trace!(function = func.name(), "dispatching call");
            let finish: Finish = Box::new(move |realm, ready_args| {
                func.call(realm, &this, &ready_args).map_err(ChainError::from)
            });
            gather(realm, args.into(), Vec::new(), finish)
        }),
        other => Err(ChainError::NotCallable(format!(
            "{} is not a function",
            other.kind()
        ))),
    })
}

/// Resolve `remaining` left to right, then hand the ready values to `finish`.
/// Ready prefixes are consumed synchronously; the first pending input turns
/// the rest of the work into a composed step over it.
fn gather(
    realm: &Realm,
    mut remaining: VecDeque<Produced>,
    mut ready: Vec<Value>,
    finish: Finish,
) -> Result<Produced, ChainError> {
    while let Some(next) = remaining.pop_front() {
        match next {
            Produced::Ready(value) => ready.push(value),
            Produced::Pending(pending) => {
                return Ok(Produced::Pending(pending.and_then(move |realm, value| {
                    ready.push(value);
                    gather(realm, remaining, ready, finish)
                })));
            }
        }
    }
    finish(realm, ready)
}
