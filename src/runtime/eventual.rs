//! Single-settlement computations.
//!
//! An [`Eventual`] is a value that may not exist yet. It is in exactly one of
//! three states — pending, settled with a value, or failed with an error —
//! and the transition out of pending is one-way and happens at most once, no
//! matter how many callbacks are registered or how often the result is read.
//!
//! Reactions never run inline from the settling call. Settlement records the
//! outcome and enqueues each registered reaction on the owning realm's job
//! queue; the queue is drained only inside an explicit await or
//! [`Realm::drain`](crate::runtime::realm::Realm::drain). Registering a
//! reaction after settlement enqueues it immediately, so late observers see
//! the outcome on the next drain.
//!
//! External sources settle through a [`Completer`], which is consumed by the
//! settling call. Settling twice is therefore unrepresentable rather than a
//! runtime error.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::graph::fault::Fault;
use crate::graph::value::Value;
use crate::runtime::error::ChainError;
use crate::runtime::realm::{Realm, RealmInner};

/// Observable lifecycle of a computation or chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Pending,
    Settled,
    Failed,
}

/// A value that is either already at hand or still being computed.
///
/// This is the currency of member resolution and dispatch: operations that
/// can finish synchronously return `Ready` and stay synchronous; anything
/// touching a pending input returns `Pending`.
#[derive(Clone)]
pub enum Produced {
    Ready(Value),
    Pending(Eventual),
}

impl Produced {
    /// Feed this value into `f`: immediately if it is ready, as a composed
    /// step of the pending computation otherwise.
    pub fn and_then<F>(self, realm: &Realm, f: F) -> Result<Produced, ChainError>
    where
        F: FnOnce(&Realm, Value) -> Result<Produced, ChainError> + 'static,
    {
        match self {
            Produced::Ready(value) => f(realm, value),
            Produced::Pending(pending) => Ok(Produced::Pending(pending.and_then(f))),
        }
    }
}

impl std::fmt::Debug for Produced {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Produced::Ready(v) => write!(f, "Produced::Ready({:?})", v),
            Produced::Pending(_) => write!(f, "Produced::Pending(..)"),
        }
    }
}

enum EventualState {
    Pending,
    Settled(Value),
    Failed(ChainError),
}

type Reaction = Box<dyn FnOnce(&Realm, Result<Value, ChainError>)>;

pub(crate) struct EventualCore {
    realm: Weak<RealmInner>,
    state: EventualState,
    reactions: Vec<Reaction>,
}

/// A single-settlement pending computation bound to one realm.
#[derive(Clone)]
pub struct Eventual {
    core: Rc<RefCell<EventualCore>>,
}

impl Eventual {
    pub(crate) fn new_pending(realm: Weak<RealmInner>) -> (Eventual, Completer) {
        let core = Rc::new(RefCell::new(EventualCore {
            realm,
            state: EventualState::Pending,
            reactions: Vec::new(),
        }));
        (
            Eventual { core: core.clone() },
            Completer { core, fired: false },
        )
    }

    pub(crate) fn new_settled(realm: Weak<RealmInner>, value: Value) -> Eventual {
        Eventual {
            core: Rc::new(RefCell::new(EventualCore {
                realm,
                state: EventualState::Settled(value),
                reactions: Vec::new(),
            })),
        }
    }

    pub(crate) fn new_failed(realm: Weak<RealmInner>, error: ChainError) -> Eventual {
        Eventual {
            core: Rc::new(RefCell::new(EventualCore {
                realm,
                state: EventualState::Failed(error),
                reactions: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> ChainState {
        match self.core.borrow().state {
            EventualState::Pending => ChainState::Pending,
            EventualState::Settled(_) => ChainState::Settled,
            EventualState::Failed(_) => ChainState::Failed,
        }
    }

    /// The recorded outcome, if the computation has left the pending state.
    pub(crate) fn outcome(&self) -> Option<Result<Value, ChainError>> {
        match &self.core.borrow().state {
            EventualState::Pending => None,
            EventualState::Settled(v) => Some(Ok(v.clone())),
            EventualState::Failed(e) => Some(Err(e.clone())),
        }
    }

    /// Register a reaction that fires exactly once with the outcome.
    ///
    /// If the computation is already settled the reaction is enqueued on the
    /// realm's job queue right away and runs on the next drain.
    pub fn when_done<F>(&self, f: F)
    where
        F: FnOnce(&Realm, Result<Value, ChainError>) + 'static,
    {
        self.push_reaction(Box::new(f));
    }

    /// Compose a further step over this computation.
    ///
    /// `f` runs once the value is available; a `Produced::Pending` returned
    /// by `f` is flattened, so the result settles with the inner value rather
    /// than with a nested computation. A failure of this computation, or an
    /// error returned by `f`, fails the composed computation with the same
    /// error, unchanged.
    pub fn and_then<F>(&self, f: F) -> Eventual
    where
        F: FnOnce(&Realm, Value) -> Result<Produced, ChainError> + 'static,
    {
        let realm = self.core.borrow().realm.clone();
        let downstream = Rc::new(RefCell::new(EventualCore {
            realm,
            state: EventualState::Pending,
            reactions: Vec::new(),
        }));
        let target = downstream.clone();
        self.push_reaction(Box::new(move |realm, outcome| match outcome {
            Ok(value) => match f(realm, value) {
                Ok(Produced::Ready(ready)) => settle_core(&target, Ok(ready)),
                Ok(Produced::Pending(pending)) => {
                    pending.push_reaction(Box::new(move |_realm, inner| {
                        settle_core(&target, inner)
                    }));
                }
                Err(e) => settle_core(&target, Err(e)),
            },
            Err(e) => settle_core(&target, Err(e)),
        }));
        Eventual { core: downstream }
    }

    /// Transform the settled value in place.
    pub fn map<F>(&self, f: F) -> Eventual
    where
        F: FnOnce(Value) -> Value + 'static,
    {
        self.and_then(move |_realm, value| Ok(Produced::Ready(f(value))))
    }

    /// Drive the realm's job queue until this computation settles.
    ///
    /// Returns `Stalled` if the queue runs dry while the computation is
    /// still pending — the computation is left untouched, and a fresh await
    /// after the external source completes will succeed. Returns
    /// `BudgetExhausted` when the realm's job budget is spent first.
    pub fn await_result(&self) -> Result<Value, ChainError> {
        let mut executed = 0usize;
        loop {
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            let upgraded = self.core.borrow().realm.upgrade();
            let realm = match upgraded {
                Some(inner) => Realm::from_inner(inner),
                None => {
                    return Err(ChainError::Stalled(
                        "realm has been dropped; the computation can no longer settle"
                            .to_string(),
                    ))
                }
            };
            if let Some(budget) = realm.config().job_budget {
                if executed >= budget {
                    return Err(ChainError::BudgetExhausted(format!(
                        "await executed {} jobs without settling",
                        executed
                    )));
                }
            }
            if !realm.run_one_job() {
                return Err(ChainError::Stalled(
                    "job queue is empty but the computation is still pending".to_string(),
                ));
            }
            executed += 1;
        }
    }

    pub(crate) fn realm(&self) -> Option<Realm> {
        let upgraded = self.core.borrow().realm.upgrade();
        upgraded.map(Realm::from_inner)
    }

    pub(crate) fn realm_weak(&self) -> Weak<RealmInner> {
        self.core.borrow().realm.clone()
    }

    pub(crate) fn belongs_to(&self, realm: &Realm) -> bool {
        match self.core.borrow().realm.upgrade() {
            Some(inner) => Rc::ptr_eq(&inner, &realm.inner),
            None => false,
        }
    }

    pub(crate) fn same_core(&self, other: &Eventual) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    fn push_reaction(&self, reaction: Reaction) {
        match self.outcome() {
            None => self.core.borrow_mut().reactions.push(reaction),
            Some(outcome) => {
                let upgraded = self.core.borrow().realm.upgrade();
                match upgraded {
                    Some(inner) => {
                        let realm = Realm::from_inner(inner);
                        realm.enqueue(Box::new(move |realm| reaction(realm, outcome)));
                    }
                    None => {
                        trace!("realm gone; dropping reaction registered after settlement");
                    }
                }
            }
        }
    }
}

/// Single-use settling handle for an externally driven computation.
///
/// Consuming `self` on both paths makes a second settlement a type error.
/// Dropping a completer without settling leaves the computation pending
/// forever; that is legal but usually a bug, so it is logged.
pub struct Completer {
    core: Rc<RefCell<EventualCore>>,
    fired: bool,
}

impl Completer {
    pub fn complete(mut self, value: Value) {
        self.fired = true;
        settle_core(&self.core, Ok(value));
    }

    pub fn fail(mut self, fault: Fault) {
        self.fired = true;
        settle_core(&self.core, Err(ChainError::Forwarded(fault)));
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if !self.fired {
            warn!("completer dropped without settling; its computation stays pending");
        }
    }
}

fn settle_core(core: &Rc<RefCell<EventualCore>>, outcome: Result<Value, ChainError>) {
    let (reactions, realm) = {
        let mut inner = core.borrow_mut();
        if !matches!(inner.state, EventualState::Pending) {
            return;
        }
        inner.state = match &outcome {
            Ok(v) => EventualState::Settled(v.clone()),
            Err(e) => EventualState::Failed(e.clone()),
        };
        (
            std::mem::replace(&mut inner.reactions, Vec::new()),
            inner.realm.clone(),
        )
    };
    match &outcome {
        Ok(_) => debug!(reactions = reactions.len(), "computation settled"),
        Err(e) => debug!(error = %e, "computation failed"),
    }
    if let Some(inner) = realm.upgrade() {
        let realm = Realm::from_inner(inner);
        for reaction in reactions {
            let each = outcome.clone();
            realm.enqueue(Box::new(move |realm| reaction(realm, each)));
        }
    }
}
