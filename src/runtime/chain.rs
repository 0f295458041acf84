//! Deferred chains: navigation over values that do not exist yet.
//!
//! A chain is a thin navigational wrapper around one
//! [`Eventual`](crate::runtime::eventual::Eventual). Building further links
//! is synchronous and never blocks — each hop is composed onto the previous
//! computation at construction time, and the whole pipeline executes once,
//! driven by the realm's job queue.
//!
//! A chain keeps its full surface after settling: links can still be added,
//! observers still fire, and awaiting again re-yields the same handle. The
//! suspension surface (`settle`, the observers) is a set of methods, so a
//! domain member that happens to be called `then` is just another name to
//! `get` and never collides with it.

use std::fmt;

use tracing::trace;

use crate::graph::value::Value;
use crate::runtime::dispatch;
use crate::runtime::error::ChainError;
use crate::runtime::eventual::{ChainState, Eventual, Produced};
use crate::runtime::handle::Handle;
use crate::runtime::realm::Realm;
use crate::runtime::resolve;

#[derive(Clone)]
pub struct Chain {
    eventual: Eventual,
}

impl Chain {
    pub(crate) fn from_eventual(eventual: Eventual) -> Chain {
        Chain { eventual }
    }

    /// The underlying computation this chain navigates over.
    pub fn eventual(&self) -> &Eventual {
        &self.eventual
    }

    pub fn state(&self) -> ChainState {
        self.eventual.state()
    }

    /// Chain a member read off the eventual value.
    pub fn get(&self, name: &str) -> Chain {
        trace!(member = name, "composing member link");
        let name = name.to_string();
        Chain {
            eventual: self
                .eventual
                .and_then(move |realm, value| resolve::member(realm, &value, &name)),
        }
    }

    /// Chain a method call; the eventual value is the receiver. Arguments
    /// are captured now, through the unwrap mapping — a deferred argument
    /// makes the call wait for it. An argument this realm cannot unwrap
    /// fails the new chain immediately.
    pub fn call(&self, name: &str, args: &[Handle]) -> Chain {
        trace!(member = name, args = args.len(), "composing call link");
        let name = name.to_string();
        let parts = match self.eventual.realm() {
            Some(realm) => args
                .iter()
                .map(|handle| realm.unwrap(handle))
                .collect::<Result<Vec<_>, _>>(),
            None => Err(ChainError::Stalled(
                "realm has been dropped; the call can never run".to_string(),
            )),
        };
        match parts {
            Ok(parts) => Chain {
                eventual: self.eventual.and_then(move |realm, receiver| {
                    let target = resolve::member(realm, &receiver, &name)?;
                    dispatch::call(realm, target, Produced::Ready(receiver), parts)
                }),
            },
            Err(error) => Chain {
                eventual: Eventual::new_failed(self.eventual.realm_weak(), error),
            },
        }
    }

    /// Chain a call of the eventual value itself as a function. The receiver
    /// handle is captured at call time and resolved through the unwrap
    /// mapping, so the body sees a raw receiver, awaited first if it is
    /// still pending.
    pub fn invoke(&self, this: Option<&Handle>, args: &[Handle]) -> Result<Chain, ChainError> {
        let realm = self.realm()?;
        let receiver = match this {
            Some(handle) => realm.unwrap(handle)?,
            None => Produced::Ready(Value::Undefined),
        };
        let parts = args
            .iter()
            .map(|handle| realm.unwrap(handle))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Chain {
            eventual: self.eventual.and_then(move |realm, target| {
                dispatch::call(realm, Produced::Ready(target), receiver, parts)
            }),
        })
    }

    /// Drive the realm until this chain settles, then yield the handle of
    /// the settled value — the same handle instance `wrap` would return, so
    /// identity is preserved through suspension. Awaiting again later yields
    /// it again.
    pub fn settle(&self) -> Result<Handle, ChainError> {
        let value = self.eventual.await_result()?;
        let realm = self.realm()?;
        realm.wrap(value)
    }

    /// Observe successful settlement. The observer receives the settled
    /// value's handle and fires at most once, from the job queue.
    pub fn on_success<F>(&self, f: F)
    where
        F: FnOnce(Handle) + 'static,
    {
        self.eventual.when_done(move |realm, outcome| {
            if let Ok(value) = outcome {
                if let Ok(handle) = realm.wrap(value) {
                    f(handle);
                }
            }
        });
    }

    /// Observe failure. Also fires when the chain settles to a value the
    /// factory refuses to wrap, with that error.
    pub fn on_failure<F>(&self, f: F)
    where
        F: FnOnce(ChainError) + 'static,
    {
        self.eventual.when_done(move |realm, outcome| match outcome {
            Err(error) => f(error),
            Ok(value) => {
                if let Err(error) = realm.wrap(value) {
                    f(error);
                }
            }
        });
    }

    /// Observe settlement either way.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce() + 'static,
    {
        self.eventual.when_done(move |_realm, _outcome| f());
    }

    fn realm(&self) -> Result<Realm, ChainError> {
        match self.eventual.realm() {
            Some(realm) => Ok(realm),
            None => Err(ChainError::Stalled(
                "realm has been dropped; the chain can no longer be driven".to_string(),
            )),
        }
    }
}

impl PartialEq for Chain {
    fn eq(&self, other: &Self) -> bool {
        self.eventual.same_core(&other.eventual)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chain({:?})", self.state())
    }
}
