//! # tether - deferred chaining over asynchronously produced object graphs
//!
//! A caller holding a handle to a value that may already exist, may still be
//! pending, or may only exist after one more asynchronous step can write a
//! single chained expression — member reads and method calls — and defer
//! resolution to one final suspension point. Two chains that resolve to the
//! same underlying value produce the same handle.
//!
//! ## Quick Start
//!
//! ### Wrapping a graph and chaining synchronously
//!
//! ```
//! use tether::graph::object::ObjectData;
//! use tether::graph::value::Value;
//! use tether::runtime::eventual::Produced;
//! use tether::runtime::handle::Handle;
//! use tether::runtime::realm::Realm;
//!
//! let realm = Realm::new();
//! let root = Value::Object(
//!     ObjectData::named("root")
//!         .add_field("hello", "world")
//!         .add_method("this_func", |_realm, this, _args| {
//!             Ok(Produced::Ready(this.clone()))
//!         })
//!         .into_ref(),
//! );
//!
//! let handle = realm.wrap(root.clone()).unwrap();
//!
//! // Wrapping the same raw value twice yields the same handle instance.
//! assert_eq!(realm.wrap(root).unwrap(), handle);
//!
//! // Primitives pass through as themselves.
//! assert_eq!(
//!     handle.get("hello").unwrap(),
//!     Handle::Primitive(Value::from("world"))
//! );
//!
//! // When everything is already settled, calls run right now.
//! assert_eq!(handle.call("this_func", &[]).unwrap(), handle);
//! ```
//!
//! ### Deferred navigation and one suspension point
//!
//! ```
//! use tether::graph::object::ObjectData;
//! use tether::graph::value::Value;
//! use tether::runtime::eventual::{ChainState, Produced};
//! use tether::runtime::realm::Realm;
//!
//! let realm = Realm::new();
//! let root = Value::Object(
//!     ObjectData::named("root")
//!         .add_method("async_this_func", |realm, this, _args| {
//!             let this = this.clone();
//!             Ok(Produced::Pending(realm.later(move || Ok(this))))
//!         })
//!         .into_ref(),
//! );
//!
//! let handle = realm.wrap(root).unwrap();
//!
//! // Navigation never blocks: the call is composed, not executed.
//! let deferred = handle.call("async_this_func", &[]).unwrap();
//! assert_eq!(deferred.state(), ChainState::Pending);
//!
//! // One await drives the realm's job queue and settles the pipeline.
//! let settled = deferred.settle().unwrap();
//! assert_eq!(settled, handle);
//! ```
//!
//! ### Chaining over an external source
//!
//! ```
//! use tether::graph::object::ObjectData;
//! use tether::graph::value::Value;
//! use tether::runtime::handle::Handle;
//! use tether::runtime::realm::Realm;
//!
//! let realm = Realm::new();
//! let (eventual, completer) = realm.pending();
//! let chain = realm.chain_of(eventual).unwrap();
//!
//! // Links can be built before any data exists.
//! let greeting = chain.get("greeting");
//!
//! completer.complete(Value::Object(
//!     ObjectData::named("payload").add_field("greeting", "hi").into_ref(),
//! ));
//!
//! match greeting.settle().unwrap() {
//!     Handle::Primitive(value) => assert_eq!(value, Value::from("hi")),
//!     other => panic!("unexpected handle {:?}", other),
//! }
//! ```
//!
//! ## How It Works
//!
//! 1. **Explicit shapes**: every object and function declares its member map
//!    up front ([`graph::object::ObjectData`]); there is no dynamic trapping
//!    of arbitrary names. Members are plain fields, getters, or native
//!    methods that receive the raw receiver as `this`.
//!
//! 2. **One handle per value**: the realm's identity registry pairs each
//!    object or function with at most one live handle. The pairing is weak
//!    on both sides and evicted when the last holder lets go, so the
//!    registry never keeps a graph alive.
//!
//! 3. **Composition, then one execution**: every `get`/`call` link is
//!    composed onto the underlying single-settlement computation
//!    ([`runtime::eventual::Eventual`]) at construction time. Nothing runs
//!    until an explicit await drives the realm's job queue; work that can
//!    finish synchronously does, including error propagation.
//!
//! 4. **Failures travel whole**: a fault raised anywhere in the graph
//!    settles the chain it belongs to — and only it — into failed state,
//!    and arrives at observers exactly as raised.
//!
//! ## Architecture
//!
//! - **[`graph`]** - the raw value model (values, shapes, functions, faults)
//! - **[`runtime`]** - the chaining machinery
//!   - **[`runtime::realm`]** - identity registry, job queue, configuration
//!   - **[`runtime::eventual`]** - single-settlement computations
//!   - **[`runtime::handle`]** - identity-stable handles and proxies
//!   - **[`runtime::chain`]** - deferred navigation

#[macro_use]
extern crate lazy_static;

pub mod graph;
pub mod runtime;
