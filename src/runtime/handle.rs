//! Handles: what callers hold instead of raw values.
//!
//! A handle is one of four explicit shapes. Primitives pass through as
//! themselves. Objects and functions get an identity-stable proxy: the same
//! raw value always yields the same proxy instance while any holder keeps it
//! alive. A value that does not exist yet is a deferred chain.
//!
//! Equality between handles is instance identity for proxies and chains and
//! value equality for primitives, which is exactly the identity contract of
//! the registry.

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::graph::value::Value;
use crate::runtime::chain::Chain;
use crate::runtime::dispatch;
use crate::runtime::error::ChainError;
use crate::runtime::eventual::{ChainState, Produced};
use crate::runtime::realm::{Realm, RealmInner};
use crate::runtime::registry::RawKey;
use crate::runtime::resolve;

/// Shared identity cell behind an object or function proxy.
///
/// Holds its raw value strongly (a live handle pins what it refers to) and
/// its realm weakly. Dropping the last clone removes the registry pairing;
/// if the registry is mid-borrow the eviction is queued instead. Lookups
/// treat dead entries as absent either way.
pub(crate) struct ProxyCore {
    pub(crate) id: u64,
    pub(crate) raw: Value,
    pub(crate) realm: Weak<RealmInner>,
}

impl Drop for ProxyCore {
    fn drop(&mut self) {
        let inner = match self.realm.upgrade() {
            Some(inner) => inner,
            None => return,
        };
        let key = match RawKey::of(&self.raw) {
            Some(key) => key,
            None => return,
        };
        let id = self.id;
        match inner.registry.try_borrow_mut() {
            Ok(mut registry) => registry.evict(&key, id),
            Err(_) => {
                trace!(proxy = id, "registry busy; eviction queued");
                inner.jobs.borrow_mut().push_back(Box::new(move |realm| {
                    realm.inner.registry.borrow_mut().evict(&key, id);
                }));
            }
        };
    }
}

/// Identity-stable handle to an object.
#[derive(Clone)]
pub struct ObjectProxy {
    core: Rc<ProxyCore>,
}

impl ObjectProxy {
    pub(crate) fn new(core: Rc<ProxyCore>) -> Self {
        ObjectProxy { core }
    }

    pub(crate) fn core(&self) -> &Rc<ProxyCore> {
        &self.core
    }

    fn realm(&self) -> Result<Realm, ChainError> {
        realm_of(&self.core)
    }

    /// The raw value this handle stands for.
    pub fn raw(&self) -> &Value {
        &self.core.raw
    }

    /// Member names declared by the underlying shape.
    pub fn member_names(&self) -> Vec<String> {
        match &self.core.raw {
            Value::Object(object) => object.borrow().member_names(),
            _ => Vec::new(),
        }
    }

    /// Read a member. Ready results come back as handles immediately; a
    /// getter that produces a pending computation yields a deferred handle.
    pub fn get(&self, name: &str) -> Result<Handle, ChainError> {
        let realm = self.realm()?;
        let produced = resolve::member(&realm, &self.core.raw, name)?;
        resolve::wrap_produced(&realm, produced)
    }

    /// Call a member as a method of this object. The receiver reaches the
    /// function raw; when everything involved is ready the call happens
    /// right now and errors surface at this call site.
    pub fn call(&self, name: &str, args: &[Handle]) -> Result<Handle, ChainError> {
        let realm = self.realm()?;
        let target = resolve::member(&realm, &self.core.raw, name)?;
        let parts = unwrap_args(&realm, args)?;
        let out = dispatch::call(
            &realm,
            target,
            Produced::Ready(self.core.raw.clone()),
            parts,
        )?;
        resolve::wrap_produced(&realm, out)
    }
}

impl fmt::Debug for ObjectProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectProxy(#{})", self.core.id)
    }
}

/// Identity-stable handle to a function. Callable, and navigable like an
/// object through the function's own declared members.
#[derive(Clone)]
pub struct FuncProxy {
    core: Rc<ProxyCore>,
}

impl FuncProxy {
    pub(crate) fn new(core: Rc<ProxyCore>) -> Self {
        FuncProxy { core }
    }

    pub(crate) fn core(&self) -> &Rc<ProxyCore> {
        &self.core
    }

    fn realm(&self) -> Result<Realm, ChainError> {
        realm_of(&self.core)
    }

    pub fn raw(&self) -> &Value {
        &self.core.raw
    }

    pub fn member_names(&self) -> Vec<String> {
        match &self.core.raw {
            Value::Function(func) => func.member_names(),
            _ => Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Result<Handle, ChainError> {
        let realm = self.realm()?;
        let produced = resolve::member(&realm, &self.core.raw, name)?;
        resolve::wrap_produced(&realm, produced)
    }

    /// Call one of the function's own members as a method, with the function
    /// value itself as the receiver.
    pub fn call(&self, name: &str, args: &[Handle]) -> Result<Handle, ChainError> {
        let realm = self.realm()?;
        let target = resolve::member(&realm, &self.core.raw, name)?;
        let parts = unwrap_args(&realm, args)?;
        let out = dispatch::call(
            &realm,
            target,
            Produced::Ready(self.core.raw.clone()),
            parts,
        )?;
        resolve::wrap_produced(&realm, out)
    }

    /// Invoke the function. `this` defaults to `Undefined`; a deferred
    /// receiver or argument turns the call into a composed pending step.
    pub fn invoke(&self, this: Option<&Handle>, args: &[Handle]) -> Result<Handle, ChainError> {
        let realm = self.realm()?;
        let receiver = match this {
            Some(handle) => realm.unwrap(handle)?,
            None => Produced::Ready(Value::Undefined),
        };
        let parts = unwrap_args(&realm, args)?;
        let out = dispatch::call(
            &realm,
            Produced::Ready(self.core.raw.clone()),
            receiver,
            parts,
        )?;
        resolve::wrap_produced(&realm, out)
    }
}

impl fmt::Debug for FuncProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuncProxy(#{})", self.core.id)
    }
}

/// A caller-held reference into the chaining runtime.
#[derive(Clone)]
pub enum Handle {
    /// A primitive, passed through the factory unchanged.
    Primitive(Value),
    /// A navigable object.
    Object(ObjectProxy),
    /// A callable, navigable function.
    Function(FuncProxy),
    /// A value that is still being produced.
    Deferred(Chain),
}

impl Handle {
    pub fn kind(&self) -> &'static str {
        match self {
            Handle::Primitive(_) => "primitive",
            Handle::Object(_) => "object",
            Handle::Function(_) => "function",
            Handle::Deferred(_) => "deferred",
        }
    }

    /// Read a member, deferring when this handle is itself deferred.
    pub fn get(&self, name: &str) -> Result<Handle, ChainError> {
        match self {
            Handle::Primitive(value) => Err(ChainError::NotNavigable(format!(
                "cannot read member '{}' of {}",
                name,
                value.kind()
            ))),
            Handle::Object(proxy) => proxy.get(name),
            Handle::Function(proxy) => proxy.get(name),
            Handle::Deferred(chain) => Ok(Handle::Deferred(chain.get(name))),
        }
    }

    /// Call a member as a method of this handle's value.
    pub fn call(&self, name: &str, args: &[Handle]) -> Result<Handle, ChainError> {
        match self {
            Handle::Primitive(value) => Err(ChainError::NotNavigable(format!(
                "cannot call member '{}' of {}",
                name,
                value.kind()
            ))),
            Handle::Object(proxy) => proxy.call(name, args),
            Handle::Function(proxy) => proxy.call(name, args),
            Handle::Deferred(chain) => Ok(Handle::Deferred(chain.call(name, args))),
        }
    }

    /// Invoke this handle's value as a function.
    pub fn invoke(&self, this: Option<&Handle>, args: &[Handle]) -> Result<Handle, ChainError> {
        match self {
            Handle::Primitive(value) => Err(ChainError::NotCallable(format!(
                "{} is not a function",
                value.kind()
            ))),
            Handle::Object(_) => Err(ChainError::NotCallable(
                "object is not a function".to_string(),
            )),
            Handle::Function(proxy) => proxy.invoke(this, args),
            Handle::Deferred(chain) => chain.invoke(this, args).map(Handle::Deferred),
        }
    }

    /// Await this handle. Settled handles come back as themselves; a
    /// deferred handle drives the realm until its value is available and
    /// yields that value's handle.
    pub fn settle(&self) -> Result<Handle, ChainError> {
        match self {
            Handle::Deferred(chain) => chain.settle(),
            settled => Ok(settled.clone()),
        }
    }

    pub fn state(&self) -> ChainState {
        match self {
            Handle::Deferred(chain) => chain.state(),
            _ => ChainState::Settled,
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Handle::Primitive(a), Handle::Primitive(b)) => a == b,
            (Handle::Object(a), Handle::Object(b)) => Rc::ptr_eq(&a.core, &b.core),
            (Handle::Function(a), Handle::Function(b)) => Rc::ptr_eq(&a.core, &b.core),
            (Handle::Deferred(a), Handle::Deferred(b)) => a.eventual().same_core(b.eventual()),
            _ => false,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Primitive(value) => write!(f, "Handle::Primitive({:?})", value),
            Handle::Object(proxy) => write!(f, "Handle::Object(#{})", proxy.core.id),
            Handle::Function(proxy) => write!(f, "Handle::Function(#{})", proxy.core.id),
            Handle::Deferred(chain) => write!(f, "Handle::Deferred({:?})", chain.state()),
        }
    }
}

fn realm_of(core: &Rc<ProxyCore>) -> Result<Realm, ChainError> {
    match core.realm.upgrade() {
        Some(inner) => Ok(Realm::from_inner(inner)),
        None => Err(ChainError::UnmappedHandle(format!(
            "handle #{}'s realm has been dropped",
            core.id
        ))),
    }
}

fn unwrap_args(realm: &Realm, args: &[Handle]) -> Result<Vec<Produced>, ChainError> {
    args.iter().map(|handle| realm.unwrap(handle)).collect()
}
