//! Tests for call dispatch: receiver delivery, argument readiness, explicit
//! receivers via invoke, and the refusal paths for non-callable targets.

extern crate tether;

use tether::graph::function::FuncDef;
use tether::graph::object::{Member, ObjectData};
use tether::graph::value::Value;
use tether::runtime::error::ChainError;
use tether::runtime::eventual::{ChainState, Produced};
use tether::runtime::handle::Handle;
use tether::runtime::realm::Realm;

/// Builds an object whose methods cover the dispatch surface: a synchronous
/// echo, a receiver-reading greeter, deferred variants of both, and the echo
/// function reachable through an asynchronous getter.
fn greeter() -> Value {
    let echo = FuncDef::native("echo", |_realm, _this, args| {
        Ok(Produced::Ready(
            args.first().cloned().unwrap_or(Value::Undefined),
        ))
    });
    let async_echo = echo.clone();
    let root = ObjectData::named("greeter")
        .add_field("prefix", "Hello, ")
        .add_field("echo", Value::Function(echo))
        .add_getter("async_echo", move |realm, _this| {
            let func = async_echo.clone();
            Ok(Produced::Pending(
                realm.later(move || Ok(Value::Function(func))),
            ))
        })
        .add_method("greet", |_realm, this, args| {
            let name = match args.first() {
                Some(Value::String(name)) => name.clone(),
                _ => "stranger".to_string(),
            };
            let prefix = match this {
                Value::Object(object) => match object.borrow().member("prefix") {
                    Some(Member::Field(Value::String(prefix))) => prefix.clone(),
                    _ => String::new(),
                },
                _ => String::new(),
            };
            Ok(Produced::Ready(Value::from(format!("{}{}", prefix, name))))
        })
        .add_method("join", |_realm, _this, args| {
            let mut out = String::new();
            for arg in args {
                if let Value::String(part) = arg {
                    out.push_str(part);
                }
            }
            Ok(Produced::Ready(Value::from(out)))
        })
        .add_method("delayed_value", |realm, _this, _args| {
            Ok(Produced::Pending(
                realm.later(|| Ok(Value::from("eventually"))),
            ))
        });
    Value::Object(root.into_ref())
}

fn read_prefix() -> Value {
    Value::Function(FuncDef::native("read_prefix", |_realm, this, _args| {
        let prefix = match this {
            Value::Object(object) => match object.borrow().member("prefix") {
                Some(Member::Field(value)) => value.clone(),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        };
        Ok(Produced::Ready(prefix))
    }))
}

// ============================================================================
// Synchronous dispatch
// ============================================================================

mod sync_dispatch_tests {
    use super::*;

    #[test]
    fn test_method_call_with_a_ready_argument() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        let out = handle
            .call("greet", &[Handle::Primitive(Value::from("World"))])
            .unwrap();
        assert_eq!(out, Handle::Primitive(Value::from("Hello, World")));
    }

    #[test]
    fn test_missing_arguments_arrive_as_nothing() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        let out = handle.call("greet", &[]).unwrap();
        assert_eq!(out, Handle::Primitive(Value::from("Hello, stranger")));
    }

    #[test]
    fn test_the_receiver_is_the_raw_object() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        // `greet` reads `prefix` straight off the receiver.
        let out = handle
            .call("greet", &[Handle::Primitive(Value::from("you"))])
            .unwrap();
        assert_eq!(out, Handle::Primitive(Value::from("Hello, you")));
    }

    #[test]
    fn test_function_member_then_invoke() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        let echo = handle.get("echo").unwrap();
        assert_eq!(echo.kind(), "function");
        let out = echo
            .invoke(None, &[Handle::Primitive(Value::from(9))])
            .unwrap();
        assert_eq!(out, Handle::Primitive(Value::Number(9.0)));
    }

    #[test]
    fn test_method_call_on_a_function_value() {
        let realm = Realm::new();
        let func = read_prefix();
        if let Value::Function(def) = &func {
            def.define_member(
                "describe",
                Member::Field(Value::Function(FuncDef::native(
                    "describe",
                    |_realm, this, _args| {
                        // The receiver is the function value the member hangs off.
                        let name = match this {
                            Value::Function(owner) => owner.name().to_string(),
                            _ => String::new(),
                        };
                        Ok(Produced::Ready(Value::from(format!("function {}", name))))
                    },
                ))),
            );
        }
        let handle = realm.wrap(func).unwrap();
        let out = handle.call("describe", &[]).unwrap();
        assert_eq!(out, Handle::Primitive(Value::from("function read_prefix")));
    }
}

// ============================================================================
// Explicit receivers
// ============================================================================

mod invoke_tests {
    use super::*;

    #[test]
    fn test_invoke_with_an_explicit_receiver() {
        let realm = Realm::new();
        let func = realm.wrap(read_prefix()).unwrap();
        let receiver = realm.wrap(greeter()).unwrap();
        let out = func.invoke(Some(&receiver), &[]).unwrap();
        assert_eq!(out, Handle::Primitive(Value::from("Hello, ")));
    }

    #[test]
    fn test_invoke_without_a_receiver_sees_nothing() {
        let realm = Realm::new();
        let func = realm.wrap(read_prefix()).unwrap();
        let out = func.invoke(None, &[]).unwrap();
        assert_eq!(out, Handle::Primitive(Value::Undefined));
    }

    #[test]
    fn test_invoke_with_a_deferred_receiver() {
        let realm = Realm::new();
        let func = realm.wrap(read_prefix()).unwrap();
        let (eventual, completer) = realm.pending();
        let receiver = Handle::Deferred(realm.chain_of(eventual).unwrap());

        let out = func.invoke(Some(&receiver), &[]).unwrap();
        assert_eq!(out.state(), ChainState::Pending);
        completer.complete(greeter());
        assert_eq!(
            out.settle().unwrap(),
            Handle::Primitive(Value::from("Hello, "))
        );
    }
}

// ============================================================================
// Deferred targets and arguments
// ============================================================================

mod deferred_dispatch_tests {
    use super::*;

    #[test]
    fn test_async_method_defers_its_result() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        let out = handle.call("delayed_value", &[]).unwrap();
        assert_eq!(out.state(), ChainState::Pending);
        assert_eq!(
            out.settle().unwrap(),
            Handle::Primitive(Value::from("eventually"))
        );
    }

    #[test]
    fn test_deferred_argument_is_awaited_before_the_body_runs() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        let pending_arg = handle.call("delayed_value", &[]).unwrap();

        let out = handle.call("echo", &[pending_arg]).unwrap();
        assert_eq!(out.state(), ChainState::Pending);
        assert_eq!(
            out.settle().unwrap(),
            Handle::Primitive(Value::from("eventually"))
        );
    }

    #[test]
    fn test_argument_order_survives_a_pending_middle() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        let pending_arg = handle.call("delayed_value", &[]).unwrap();

        let out = handle
            .call(
                "join",
                &[
                    Handle::Primitive(Value::from("<")),
                    pending_arg,
                    Handle::Primitive(Value::from(">")),
                ],
            )
            .unwrap();
        assert_eq!(
            out.settle().unwrap(),
            Handle::Primitive(Value::from("<eventually>"))
        );
    }

    #[test]
    fn test_invoking_a_function_that_does_not_exist_yet() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        // `async_echo` produces the function itself asynchronously.
        let func = handle.get("async_echo").unwrap();
        assert_eq!(func.state(), ChainState::Pending);
        let out = func
            .invoke(None, &[Handle::Primitive(Value::from("late"))])
            .unwrap();
        assert_eq!(out.settle().unwrap(), Handle::Primitive(Value::from("late")));
    }
}

// ============================================================================
// Refusals
// ============================================================================

mod refusal_tests {
    use super::*;

    #[test]
    fn test_calling_a_data_member_is_refused() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        match handle.call("prefix", &[]) {
            Err(ChainError::NotCallable(msg)) => assert!(msg.contains("string")),
            other => panic!("expected not callable, got {:?}", other),
        }
    }

    #[test]
    fn test_calling_an_absent_member_is_refused() {
        let realm = Realm::new();
        let handle = realm.wrap(greeter()).unwrap();
        match handle.call("nope", &[]) {
            Err(ChainError::NotCallable(msg)) => assert!(msg.contains("undefined")),
            other => panic!("expected not callable, got {:?}", other),
        }
    }

    #[test]
    fn test_deferred_not_callable_fails_the_chain() {
        let realm = Realm::new();
        let (eventual, completer) = realm.pending();
        let chain = realm.chain_of(eventual).unwrap();
        let out = chain.call("prefix", &[]);

        completer.complete(greeter());
        match out.settle() {
            Err(ChainError::NotCallable(_)) => {}
            other => panic!("expected not callable, got {:?}", other),
        }
        assert_eq!(out.state(), ChainState::Failed);
    }

    #[test]
    fn test_foreign_arguments_are_refused_synchronously() {
        let home = Realm::new();
        let away = Realm::new();
        let handle = home.wrap(greeter()).unwrap();
        let stranger = away.wrap(greeter()).unwrap();
        match handle.call("echo", &[stranger]) {
            Err(ChainError::UnmappedHandle(_)) => {}
            other => panic!("expected unmapped handle, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_arguments_fail_a_chain_up_front() {
        let home = Realm::new();
        let away = Realm::new();
        let (eventual, _completer) = home.pending();
        let chain = home.chain_of(eventual).unwrap();
        let stranger = away.wrap(greeter()).unwrap();

        // The bad argument is caught at composition time, not at settlement.
        let out = chain.call("echo", &[stranger]);
        assert_eq!(out.state(), ChainState::Failed);
        match out.settle() {
            Err(ChainError::UnmappedHandle(_)) => {}
            other => panic!("expected unmapped handle, got {:?}", other),
        }
    }
}
