//! The realm: one single-threaded chaining context.
//!
//! A realm owns the identity registry, the job queue, and the configuration
//! that all handles and chains minted from it share. Realms are `Rc`-shared
//! and never cross threads; suspension happens only inside explicit awaits
//! and [`Realm::drain`], never during navigation or call construction.
//!
//! Each realm carries an unforgeable id. Handles are valid only in the realm
//! that minted them; presenting one elsewhere is reported with both realm
//! ids so the mismatch can be traced.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::graph::fault::Fault;
use crate::graph::value::Value;
use crate::runtime::chain::Chain;
use crate::runtime::config::{is_protocol_name, AliasPolicy, RealmConfig};
use crate::runtime::error::ChainError;
use crate::runtime::eventual::{Completer, Eventual, Produced};
use crate::runtime::handle::{FuncProxy, Handle, ObjectProxy, ProxyCore};
use crate::runtime::registry::{IdentityRegistry, RawKey, RawSlot};

pub(crate) type Job = Box<dyn FnOnce(&Realm)>;

pub(crate) struct RealmInner {
    pub(crate) id: Uuid,
    pub(crate) config: RealmConfig,
    pub(crate) registry: RefCell<IdentityRegistry>,
    pub(crate) jobs: RefCell<VecDeque<Job>>,
    pub(crate) next_proxy_id: Cell<u64>,
}

#[derive(Clone)]
pub struct Realm {
    pub(crate) inner: Rc<RealmInner>,
}

impl Realm {
    pub fn new() -> Self {
        Self::with_config(RealmConfig::default())
    }

    pub fn with_config(config: RealmConfig) -> Self {
        let id = Uuid::new_v4();
        debug!(realm = %id.to_hyphenated(), "realm created");
        Realm {
            inner: Rc::new(RealmInner {
                id,
                config,
                registry: RefCell::new(IdentityRegistry::new()),
                jobs: RefCell::new(VecDeque::new()),
                next_proxy_id: Cell::new(1),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<RealmInner>) -> Realm {
        Realm { inner }
    }

    /// This realm's unforgeable identity, in hyphenated form.
    pub fn id(&self) -> String {
        self.inner.id.to_hyphenated().to_string()
    }

    pub fn config(&self) -> &RealmConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Handles
    // ------------------------------------------------------------------

    /// Produce the handle for a raw value.
    ///
    /// Primitives pass through untouched. Objects and functions are paired
    /// with exactly one live handle: wrapping the same raw twice returns the
    /// same handle instance. Values outside the taxonomy are refused.
    pub fn wrap(&self, value: Value) -> Result<Handle, ChainError> {
        match value {
            Value::Object(raw) => {
                self.check_alias_policy(&raw.borrow().member_names())?;
                let key = RawKey::Object(Rc::as_ptr(&raw) as usize);
                let slot = RawSlot::Object(Rc::downgrade(&raw));
                let core = self.adopt(key, slot, Value::Object(raw))?;
                Ok(Handle::Object(ObjectProxy::new(core)))
            }
            Value::Function(raw) => {
                self.check_alias_policy(&raw.member_names())?;
                let key = RawKey::Function(Rc::as_ptr(&raw) as usize);
                let slot = RawSlot::Function(Rc::downgrade(&raw));
                let core = self.adopt(key, slot, Value::Function(raw))?;
                Ok(Handle::Function(FuncProxy::new(core)))
            }
            Value::Opaque(_) => Err(ChainError::UnsupportedValueKind(
                "opaque host value cannot be wrapped".to_string(),
            )),
            primitive => Ok(Handle::Primitive(primitive)),
        }
    }

    /// Map a handle back to the raw side: a ready value for settled handles,
    /// the underlying computation for deferred ones.
    ///
    /// Handles minted by another realm are refused; forwarding work on a
    /// receiver this realm has never seen would be unsafe.
    pub fn unwrap(&self, handle: &Handle) -> Result<Produced, ChainError> {
        match handle {
            Handle::Primitive(value) => Ok(Produced::Ready(value.clone())),
            Handle::Object(proxy) => self.raw_of_core(proxy.core()),
            Handle::Function(proxy) => self.raw_of_core(proxy.core()),
            Handle::Deferred(chain) => {
                if !chain.eventual().belongs_to(self) {
                    return Err(self.foreign_handle_error(chain.eventual().realm()));
                }
                Ok(Produced::Pending(chain.eventual().clone()))
            }
        }
    }

    /// Adopt an externally produced computation as a navigable chain.
    pub fn chain_of(&self, pending: Eventual) -> Result<Chain, ChainError> {
        if !pending.belongs_to(self) {
            return Err(self.foreign_handle_error(pending.realm()));
        }
        Ok(Chain::from_eventual(pending))
    }

    /// Live handle pairings in this realm, for inspection and tests.
    pub fn tracked_handles(&self) -> usize {
        self.inner.registry.borrow().live_count()
    }

    // ------------------------------------------------------------------
    // Pending computations
    // ------------------------------------------------------------------

    /// A fresh unsettled computation plus its single-use settling handle.
    pub fn pending(&self) -> (Eventual, Completer) {
        Eventual::new_pending(Rc::downgrade(&self.inner))
    }

    /// A computation already settled with `value`.
    pub fn ready(&self, value: Value) -> Eventual {
        Eventual::new_settled(Rc::downgrade(&self.inner), value)
    }

    /// A computation already failed with a graph fault.
    pub fn failed(&self, fault: Fault) -> Eventual {
        Eventual::new_failed(Rc::downgrade(&self.inner), ChainError::Forwarded(fault))
    }

    /// A computation settled by a queued job on the next drain. This is the
    /// asynchronous-step analog: the body runs from the job queue, never
    /// inline at the call site.
    pub fn later<F>(&self, body: F) -> Eventual
    where
        F: FnOnce() -> Result<Value, Fault> + 'static,
    {
        let (eventual, completer) = self.pending();
        self.enqueue(Box::new(move |_realm| match body() {
            Ok(value) => completer.complete(value),
            Err(fault) => completer.fail(fault),
        }));
        eventual
    }

    // ------------------------------------------------------------------
    // Job queue
    // ------------------------------------------------------------------

    /// Run queued jobs until the queue is empty.
    ///
    /// Returns the number of jobs executed. Fails with `BudgetExhausted` if
    /// the queue does not quiesce within the configured job budget; the
    /// budget is checked before each job, so no job past it ever runs.
    pub fn drain(&self) -> Result<usize, ChainError> {
        let mut executed = 0usize;
        loop {
            if self.inner.jobs.borrow().is_empty() {
                break;
            }
            if let Some(budget) = self.inner.config.job_budget {
                if executed >= budget {
                    return Err(ChainError::BudgetExhausted(format!(
                        "drained {} jobs without quiescing",
                        executed
                    )));
                }
            }
            self.run_one_job();
            executed += 1;
        }
        debug!(jobs = executed, "realm drained");
        Ok(executed)
    }

    pub(crate) fn enqueue(&self, job: Job) {
        self.inner.jobs.borrow_mut().push_back(job);
    }

    pub(crate) fn run_one_job(&self) -> bool {
        let job = self.inner.jobs.borrow_mut().pop_front();
        match job {
            Some(job) => {
                trace!("running job");
                job(self);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn adopt(&self, key: RawKey, slot: RawSlot, raw: Value) -> Result<Rc<ProxyCore>, ChainError> {
        let mut registry = self.inner.registry.borrow_mut();
        if let Some(existing) = registry.lookup(&key) {
            return Ok(existing);
        }
        let id = self.inner.next_proxy_id.get();
        self.inner.next_proxy_id.set(id + 1);
        let core = Rc::new(ProxyCore {
            id,
            raw,
            realm: Rc::downgrade(&self.inner),
        });
        registry.register(key, &core, slot)?;
        trace!(proxy = id, "minted handle");
        Ok(core)
    }

    fn raw_of_core(&self, core: &Rc<ProxyCore>) -> Result<Produced, ChainError> {
        match core.realm.upgrade() {
            Some(inner) if Rc::ptr_eq(&inner, &self.inner) => {}
            other => {
                return Err(self.foreign_handle_error(other.map(Realm::from_inner)));
            }
        }
        match self.inner.registry.borrow().raw_of(core.id) {
            Some(raw) => Ok(Produced::Ready(raw)),
            None => Err(ChainError::UnmappedHandle(format!(
                "handle #{} has no live pairing in realm {}",
                core.id,
                self.id()
            ))),
        }
    }

    fn foreign_handle_error(&self, origin: Option<Realm>) -> ChainError {
        match origin {
            Some(realm) => ChainError::UnmappedHandle(format!(
                "handle belongs to realm {}, not realm {}",
                realm.id(),
                self.id()
            )),
            None => ChainError::UnmappedHandle(format!(
                "handle's originating realm is gone; it cannot be used in realm {}",
                self.id()
            )),
        }
    }

    fn check_alias_policy(&self, member_names: &[String]) -> Result<(), ChainError> {
        if self.inner.config.alias_policy != AliasPolicy::Reject {
            return Ok(());
        }
        for name in member_names {
            if is_protocol_name(name) {
                return Err(ChainError::ReservedName(format!(
                    "member '{}' collides with the settlement protocol",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
