//! Declared object shapes.
//!
//! An object exposes an explicit map of member names. Every name a handle can
//! navigate is enumerated here up front; there is no dynamic trapping of
//! arbitrary names. A member is either a plain field or a getter that computes
//! its value from the receiver on each read.

use std::collections::HashMap;
use std::rc::Rc;

use crate::graph::fault::Fault;
use crate::graph::function::FuncDef;
use crate::graph::value::Value;
use crate::runtime::eventual::Produced;
use crate::runtime::realm::Realm;

/// Signature for getter members. The receiver is the raw value the member is
/// being read from, never a handle.
pub type GetterFn = Rc<dyn Fn(&Realm, &Value) -> Result<Produced, Fault>>;

/// A single declared member of an object or function shape.
pub enum Member {
    /// A stored value, returned as-is on every read.
    Field(Value),
    /// A computed value. May produce a ready value or a pending computation.
    Getter(GetterFn),
}

impl Clone for Member {
    fn clone(&self) -> Self {
        match self {
            Member::Field(v) => Member::Field(v.clone()),
            Member::Getter(g) => Member::Getter(g.clone()),
        }
    }
}

/// A named object with a declared member map.
///
/// Built fluently and then frozen into an [`ObjectRef`](crate::graph::value::ObjectRef):
///
/// ```
/// use tether::graph::object::ObjectData;
///
/// let root = ObjectData::named("root")
///     .add_field("hello", "world")
///     .into_ref();
/// assert_eq!(root.borrow().name(), "root");
/// ```
pub struct ObjectData {
    name: String,
    members: HashMap<String, Member>,
}

impl ObjectData {
    /// Start building an object with the given diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        ObjectData {
            name: name.into(),
            members: HashMap::new(),
        }
    }

    /// Add a plain field member.
    pub fn add_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), Member::Field(value.into()));
        self
    }

    /// Add a getter member, computed from the raw receiver on each read.
    pub fn add_getter(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&Realm, &Value) -> Result<Produced, Fault> + 'static,
    ) -> Self {
        self.members
            .insert(name.into(), Member::Getter(Rc::new(getter)));
        self
    }

    /// Add a native method. The function receives the raw receiver as `this`.
    pub fn add_method(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&Realm, &Value, &[Value]) -> Result<Produced, Fault> + 'static,
    ) -> Self {
        let name = name.into();
        let func = FuncDef::native(name.clone(), body);
        self.members.insert(name, Member::Field(Value::Function(func)));
        self
    }

    /// Finish building and produce the shared reference form.
    pub fn into_ref(self) -> crate::graph::value::ObjectRef {
        Rc::new(std::cell::RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Insert or replace a member outside the builder flow.
    pub fn insert(&mut self, name: impl Into<String>, member: Member) {
        self.members.insert(name.into(), member);
    }

    /// Every navigable member name, in no particular order.
    pub fn member_names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }
}
