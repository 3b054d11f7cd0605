//! The `Boolean` constructor and `Boolean.prototype`.

use super::{arg, define_constructor, define_method, unbox};
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::value::Value;

pub(super) fn install(avm: &mut Avm) {
    let proto = avm.prototypes().boolean.clone();
    define_method(avm, &proto, "toString", to_string);
    define_method(avm, &proto, "valueOf", value_of);
    define_constructor(avm, "Boolean", boolean_call, boolean_construct, &proto);
}

/// `Boolean(value)`.
pub fn boolean_call(_avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(arg(args, 0).to_boolean()))
}

/// `new Boolean(value)` - stores the boolean in the instance.
pub fn boolean_construct(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let b = boolean_call(avm, this, args)?;
    if let Some(obj) = this.as_object() {
        obj.set_primitive(Some(b));
    }
    Ok(Value::Undefined)
}

/// `Boolean.prototype.toString()`.
pub fn to_string(_avm: &mut Avm, this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::String(this_boolean(this).to_string()))
}

/// `Boolean.prototype.valueOf()`.
pub fn value_of(_avm: &mut Avm, this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(this_boolean(this)))
}

fn this_boolean(this: &Value) -> bool {
    match unbox(this) {
        Value::Boolean(b) => b,
        _ => false,
    }
}
