//! Member resolution over raw values.

use tracing::{trace, warn};

use crate::graph::object::Member;
use crate::graph::value::Value;
use crate::runtime::chain::Chain;
use crate::runtime::config::{is_protocol_name, AliasPolicy};
use crate::runtime::error::ChainError;
use crate::runtime::eventual::Produced;
use crate::runtime::handle::Handle;
use crate::runtime::realm::Realm;

/// Read a declared member off a raw value.
///
/// Objects and functions resolve against their declared shape: an absent
/// name yields `Undefined`, a field yields its stored value, and a getter
/// runs now with the raw receiver. Values without a shape are not navigable.
pub(crate) fn member(realm: &Realm, source: &Value, name: &str) -> Result<Produced, ChainError> {
    if realm.config().alias_policy == AliasPolicy::Allow && is_protocol_name(name) {
        warn!(member = name, "navigating a settlement-protocol spelling");
    }
    trace!(member = name, kind = source.kind(), "resolving member");
    match source {
        Value::Object(object) => {
            let found = object.borrow().member(name).cloned();
            read_member(realm, source, found)
        }
        Value::Function(func) => read_member(realm, source, func.member(name)),
        other => Err(ChainError::NotNavigable(format!(
            "cannot read member '{}' of {}",
            name,
            other.kind()
        ))),
    }
}

fn read_member(
    realm: &Realm,
    receiver: &Value,
    member: Option<Member>,
) -> Result<Produced, ChainError> {
    match member {
        None => Ok(Produced::Ready(Value::Undefined)),
        Some(Member::Field(value)) => Ok(Produced::Ready(value)),
        Some(Member::Getter(getter)) => getter(realm, receiver).map_err(ChainError::from),
    }
}

/// Classify a produced value into the handle space: ready values go through
/// the handle factory, pending ones become navigable chains.
pub(crate) fn wrap_produced(realm: &Realm, produced: Produced) -> Result<Handle, ChainError> {
    match produced {
        Produced::Ready(value) => realm.wrap(value),
        Produced::Pending(pending) => Ok(Handle::Deferred(Chain::from_eventual(pending))),
    }
}
