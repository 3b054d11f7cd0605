//! The `Object` constructor and `Object.prototype`.

use super::{arg, define_constructor, define_method};
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::value::Value;

pub(super) fn install(avm: &mut Avm) {
    let proto = avm.prototypes().object.clone();
    define_method(avm, &proto, "toString", to_string);
    define_method(avm, &proto, "valueOf", value_of);
    define_method(avm, &proto, "hasOwnProperty", has_own_property);
    define_method(avm, &proto, "isPropertyEnumerable", is_property_enumerable);
    define_method(avm, &proto, "isPrototypeOf", is_prototype_of);
    define_constructor(avm, "Object", object_call, object_construct, &proto);
}

// ============================================================================
// Constructor
// ============================================================================

/// `Object(value)` - returns objects as they are, boxes primitives, and
/// creates a new object otherwise.
pub fn object_call(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let value = arg(args, 0);
    if value.is_nullish() {
        return Ok(Value::Object(avm.new_object()));
    }
    value.to_object(avm)
}

/// `new Object(value)`. Without an argument the fresh instance is kept.
pub fn object_construct(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let value = arg(args, 0);
    if value.is_nullish() {
        return Ok(Value::Undefined);
    }
    value.to_object(avm)
}

// ============================================================================
// Object.prototype
// ============================================================================

/// `Object.prototype.toString()`.
pub fn to_string(_avm: &mut Avm, _this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::String("[object Object]".to_string()))
}

/// `Object.prototype.valueOf()` - the receiver itself.
pub fn value_of(_avm: &mut Avm, this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(this.clone())
}

/// `Object.prototype.hasOwnProperty(name)`.
pub fn has_own_property(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let version = avm.version();
    let name = arg(args, 0).to_string_with(avm, version)?;
    let found = this
        .as_object()
        .is_some_and(|obj| obj.has_own_property(&name, version));
    Ok(Value::Boolean(found))
}

/// `Object.prototype.isPropertyEnumerable(name)` - own, visible and not
/// hidden from enumeration.
pub fn is_property_enumerable(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let version = avm.version();
    let name = arg(args, 0).to_string_with(avm, version)?;
    let enumerable = this.as_object().is_some_and(|obj| {
        obj.has_own_property(&name, version)
            && obj.attributes(&name).is_some_and(|attrs| attrs.is_enumerable())
    });
    Ok(Value::Boolean(enumerable))
}

/// `Object.prototype.isPrototypeOf(value)`.
pub fn is_prototype_of(_avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let value = arg(args, 0);
    let result = match (this.as_object(), value.as_object()) {
        (Some(proto), Some(obj)) => obj.inherits_from(proto),
        _ => false,
    };
    Ok(Value::Boolean(result))
}
