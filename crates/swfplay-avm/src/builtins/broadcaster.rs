//! `AsBroadcaster`.
//!
//! `AsBroadcaster.initialize(obj)` turns any object into an event source:
//! it attaches a weak listener registry and the `addListener`,
//! `removeListener` and `broadcastMessage` methods.

use super::{arg, define_method};
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::object::ObjectRef;
use crate::runtime::property::PropFlags;
use crate::runtime::value::Value;

pub(super) fn install(avm: &mut Avm) {
    let broadcaster = avm.new_object();
    define_method(avm, &broadcaster, "initialize", initialize);
    avm.global()
        .define("AsBroadcaster", Value::Object(broadcaster), PropFlags::DONT_ENUM);
}

/// Gives `target` a listener registry and the broadcaster methods.
pub fn attach(avm: &Avm, target: &ObjectRef) {
    target.init_listeners();
    define_method(avm, target, "addListener", add_listener);
    define_method(avm, target, "removeListener", remove_listener);
    define_method(avm, target, "broadcastMessage", broadcast_message);
}

/// `AsBroadcaster.initialize(obj)`.
pub fn initialize(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    if let Some(target) = arg(args, 0).as_object() {
        attach(avm, target);
    }
    Ok(Value::Undefined)
}

/// `addListener(listener)` - whether the listener was registered.
pub fn add_listener(_avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let listener = arg(args, 0);
    let added = match (this.as_object(), listener.as_object()) {
        (Some(source), Some(listener)) => source
            .with_listeners(|registry| registry.add(listener))
            .unwrap_or(false),
        _ => false,
    };
    Ok(Value::Boolean(added))
}

/// `removeListener(listener)` - whether the listener was registered.
pub fn remove_listener(_avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let listener = arg(args, 0);
    let removed = match (this.as_object(), listener.as_object()) {
        (Some(source), Some(listener)) => source
            .with_listeners(|registry| registry.remove(listener))
            .unwrap_or(false),
        _ => false,
    };
    Ok(Value::Boolean(removed))
}

/// `broadcastMessage(event, ...args)` - calls `event` on every live
/// listener.
pub fn broadcast_message(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let Some(registry) = this.as_object().and_then(ObjectRef::listeners) else {
        return Ok(Value::Undefined);
    };
    let version = avm.version();
    let event = arg(args, 0).to_string_with(avm, version)?;
    let rest = args.get(1..).unwrap_or_default();
    registry.notify_with(avm, &event, rest)?;
    Ok(Value::Undefined)
}
