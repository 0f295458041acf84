//! Native functions.
//!
//! A function is a named native body plus its own declared member map, so a
//! function value stays navigable the same way an object is.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::graph::fault::Fault;
use crate::graph::object::Member;
use crate::graph::value::{FuncRef, Value};
use crate::runtime::eventual::Produced;
use crate::runtime::realm::Realm;

/// Signature for native function bodies. `this` is the raw receiver; the
/// arguments arrive as raw values. A body may return a ready value or a
/// pending computation minted from the realm it is given.
pub type NativeFn = Box<dyn Fn(&Realm, &Value, &[Value]) -> Result<Produced, Fault>>;

pub struct FuncDef {
    name: String,
    body: NativeFn,
    members: RefCell<HashMap<String, Member>>,
}

impl FuncDef {
    /// Wrap a native body into a shared function definition.
    pub fn native(
        name: impl Into<String>,
        body: impl Fn(&Realm, &Value, &[Value]) -> Result<Produced, Fault> + 'static,
    ) -> FuncRef {
        Rc::new(FuncDef {
            name: name.into(),
            body: Box::new(body),
            members: RefCell::new(HashMap::new()),
        })
    }

    pub fn call(&self, realm: &Realm, this: &Value, args: &[Value]) -> Result<Produced, Fault> {
        (self.body)(realm, this, args)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, name: &str) -> Option<Member> {
        self.members.borrow().get(name).cloned()
    }

    /// Attach or replace a member on this function.
    pub fn define_member(&self, name: impl Into<String>, member: Member) {
        self.members.borrow_mut().insert(name.into(), member);
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members.borrow().keys().cloned().collect()
    }
}
