//! The identity registry — one live handle per raw value.
//!
//! Pairings are held weakly on both sides: the registry keeps neither the
//! raw value nor the handle alive. A live entry means a live handle (which
//! itself pins its raw), so a pointer key can never be reused while its
//! entry is live. Dead entries are treated as absent by every reader and
//! pruned opportunistically.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::graph::function::FuncDef;
use crate::graph::object::ObjectData;
use crate::graph::value::Value;
use crate::runtime::error::ChainError;
use crate::runtime::handle::ProxyCore;

/// Pointer identity of a reference-variant raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RawKey {
    Object(usize),
    Function(usize),
}

impl RawKey {
    pub(crate) fn of(value: &Value) -> Option<RawKey> {
        match value {
            Value::Object(o) => Some(RawKey::Object(Rc::as_ptr(o) as usize)),
            Value::Function(f) => Some(RawKey::Function(Rc::as_ptr(f) as usize)),
            _ => None,
        }
    }
}

/// Non-owning pointer back to the raw value of a pairing.
pub(crate) enum RawSlot {
    Object(Weak<RefCell<ObjectData>>),
    Function(Weak<FuncDef>),
}

pub(crate) struct IdentityRegistry {
    forward: HashMap<RawKey, Weak<ProxyCore>>,
    reverse: HashMap<u64, RawSlot>,
}

impl IdentityRegistry {
    pub(crate) fn new() -> Self {
        IdentityRegistry {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Find the live handle for a raw value, pruning a dead entry on miss.
    pub(crate) fn lookup(&mut self, key: &RawKey) -> Option<Rc<ProxyCore>> {
        match self.forward.get(key) {
            Some(weak) => match weak.upgrade() {
                Some(core) => Some(core),
                None => {
                    self.forward.remove(key);
                    None
                }
            },
            None => None,
        }
    }

    /// Record a raw/handle pairing.
    ///
    /// Registering the same pairing again is a no-op. Registering a raw that
    /// is already paired with a different live handle is a usage error and is
    /// reported, not papered over.
    pub(crate) fn register(
        &mut self,
        key: RawKey,
        core: &Rc<ProxyCore>,
        slot: RawSlot,
    ) -> Result<(), ChainError> {
        if let Some(existing) = self.forward.get(&key).and_then(|weak| weak.upgrade()) {
            if Rc::ptr_eq(&existing, core) {
                return Ok(());
            }
            warn!(proxy = existing.id, "raw value already paired with a live handle");
            return Err(ChainError::RegistryConflict(format!(
                "raw value is already paired with live handle #{}",
                existing.id
            )));
        }
        self.forward.insert(key, Rc::downgrade(core));
        self.reverse.insert(core.id, slot);
        Ok(())
    }

    /// Recover the raw value paired with a handle id, if the pairing is live.
    pub(crate) fn raw_of(&self, proxy_id: u64) -> Option<Value> {
        match self.reverse.get(&proxy_id)? {
            RawSlot::Object(weak) => weak.upgrade().map(Value::Object),
            RawSlot::Function(weak) => weak.upgrade().map(Value::Function),
        }
    }

    /// Remove the pairing for a handle that is going (or has gone) away.
    ///
    /// The forward entry is only removed if it is dead or still names this
    /// handle; a queued eviction that runs after the raw has been re-wrapped
    /// must not disturb the newer pairing.
    pub(crate) fn evict(&mut self, key: &RawKey, proxy_id: u64) {
        let stale = match self.forward.get(key) {
            Some(weak) => match weak.upgrade() {
                Some(core) => core.id == proxy_id,
                None => true,
            },
            None => false,
        };
        if stale {
            self.forward.remove(key);
        }
        if self.reverse.remove(&proxy_id).is_some() {
            debug!(proxy = proxy_id, "evicted handle pairing");
        }
    }

    /// How many pairings currently have a live handle.
    pub(crate) fn live_count(&self) -> usize {
        self.forward
            .values()
            .filter(|weak| weak.upgrade().is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::object::ObjectData;

    fn sample_raw() -> Value {
        Value::Object(ObjectData::named("sample").into_ref())
    }

    fn core_for(id: u64, raw: &Value) -> Rc<ProxyCore> {
        Rc::new(ProxyCore {
            id,
            raw: raw.clone(),
            realm: Weak::new(),
        })
    }

    fn slot_for(raw: &Value) -> RawSlot {
        match raw {
            Value::Object(o) => RawSlot::Object(Rc::downgrade(o)),
            Value::Function(f) => RawSlot::Function(Rc::downgrade(f)),
            _ => panic!("primitive values have no slot"),
        }
    }

    #[test]
    fn test_register_then_lookup() {
        let mut registry = IdentityRegistry::new();
        let raw = sample_raw();
        let key = RawKey::of(&raw).unwrap();
        let core = core_for(1, &raw);
        registry.register(key, &core, slot_for(&raw)).unwrap();
        let found = registry.lookup(&key).unwrap();
        assert!(Rc::ptr_eq(&found, &core));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.raw_of(1), Some(raw));
    }

    #[test]
    fn test_reregistering_same_pairing_is_noop() {
        let mut registry = IdentityRegistry::new();
        let raw = sample_raw();
        let key = RawKey::of(&raw).unwrap();
        let core = core_for(1, &raw);
        registry.register(key, &core, slot_for(&raw)).unwrap();
        registry.register(key, &core, slot_for(&raw)).unwrap();
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_conflicting_registration_is_reported() {
        let mut registry = IdentityRegistry::new();
        let raw = sample_raw();
        let key = RawKey::of(&raw).unwrap();
        let first = core_for(1, &raw);
        let second = core_for(2, &raw);
        registry.register(key, &first, slot_for(&raw)).unwrap();
        let result = registry.register(key, &second, slot_for(&raw));
        match result {
            Err(ChainError::RegistryConflict(_)) => {}
            other => panic!("expected conflict, got {:?}", other),
        }
        // First pairing stays authoritative.
        assert!(Rc::ptr_eq(&registry.lookup(&key).unwrap(), &first));
    }

    #[test]
    fn test_dead_entry_is_pruned_on_lookup() {
        let mut registry = IdentityRegistry::new();
        let raw = sample_raw();
        let key = RawKey::of(&raw).unwrap();
        let core = core_for(1, &raw);
        registry.register(key, &core, slot_for(&raw)).unwrap();
        drop(core);
        assert!(registry.lookup(&key).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_evict_removes_pairing() {
        let mut registry = IdentityRegistry::new();
        let raw = sample_raw();
        let key = RawKey::of(&raw).unwrap();
        let core = core_for(1, &raw);
        registry.register(key, &core, slot_for(&raw)).unwrap();
        registry.evict(&key, 1);
        assert!(registry.lookup(&key).is_none());
        assert!(registry.raw_of(1).is_none());
    }

    #[test]
    fn test_stale_eviction_keeps_newer_pairing() {
        let mut registry = IdentityRegistry::new();
        let raw = sample_raw();
        let key = RawKey::of(&raw).unwrap();
        let old = core_for(1, &raw);
        registry.register(key, &old, slot_for(&raw)).unwrap();
        drop(old);
        let newer = core_for(2, &raw);
        registry.lookup(&key); // prunes the dead entry
        registry.register(key, &newer, slot_for(&raw)).unwrap();
        // A queued eviction for the old handle arrives late.
        registry.evict(&key, 1);
        assert!(Rc::ptr_eq(&registry.lookup(&key).unwrap(), &newer));
        assert!(registry.raw_of(2).is_some());
    }
}
