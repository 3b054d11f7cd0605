//! Built-in objects and global functions.
//!
//! - `Object`, `Function`, `Number`, `String`, `Boolean`
//! - Global functions (`isNaN`, `parseInt`, `ASSetPropFlags`, `ASnative`, ...)
//! - `AsBroadcaster`, `Key` and `Mouse`
//!
//! Every native shares the [`NativeFunction`] signature: the VM context,
//! the receiver and the arguments.

pub mod boolean;
pub mod broadcaster;
pub mod function;
pub mod global;
pub mod key;
pub mod mouse;
pub mod number;
pub mod object;
pub mod string;

use crate::runtime::context::Avm;
use crate::runtime::function::{FunctionRef, NativeFunction};
use crate::runtime::object::ObjectRef;
use crate::runtime::property::PropFlags;
use crate::runtime::value::Value;

/// Installs every built-in into a fresh context.
pub(crate) fn install(avm: &mut Avm) {
    object::install(avm);
    function::install(avm);
    number::install(avm);
    string::install(avm);
    boolean::install(avm);
    global::install(avm);
    broadcaster::install(avm);
    key::install(avm);
    mouse::install(avm);
}

/// Defines a native method on `target`, hidden from enumeration.
fn define_method(avm: &Avm, target: &ObjectRef, name: &str, call: NativeFunction) -> FunctionRef {
    let method = avm.native_function(name, call, None);
    target.define(name, Value::Function(method.clone()), PropFlags::DONT_ENUM);
    method
}

/// Defines a global constructor whose `prototype` is `prototype`.
fn define_constructor(
    avm: &Avm,
    name: &str,
    call: NativeFunction,
    construct: NativeFunction,
    prototype: &ObjectRef,
) -> FunctionRef {
    let constructor = avm.native_function(name, call, Some(construct));
    constructor.object().define(
        "prototype",
        Value::Object(prototype.clone()),
        PropFlags::DONT_ENUM | PropFlags::DONT_DELETE,
    );
    avm.global()
        .define(name, Value::Function(constructor.clone()), PropFlags::DONT_ENUM);
    constructor
}

/// The argument at `index`, or `undefined`.
fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// The boxed primitive of a receiver, or the receiver itself.
fn unbox(this: &Value) -> Value {
    match this {
        Value::Object(obj) => obj.primitive().unwrap_or_else(|| this.clone()),
        other => other.clone(),
    }
}
