//! `Function.prototype`.
//!
//! Provides `call` and `apply`. `Function` itself cannot build functions
//! from source text; calling it yields `undefined`.

use super::{arg, define_constructor, define_method};
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::value::Value;

pub(super) fn install(avm: &mut Avm) {
    let proto = avm.prototypes().function.clone();
    define_method(avm, &proto, "call", call);
    define_method(avm, &proto, "apply", apply);
    define_method(avm, &proto, "toString", to_string);
    define_constructor(avm, "Function", function_constructor, function_constructor, &proto);
}

/// `Function()` - not supported, yields `undefined`.
pub fn function_constructor(_avm: &mut Avm, _this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::Undefined)
}

/// `Function.prototype.toString()`.
pub fn to_string(_avm: &mut Avm, _this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::String("[type Function]".to_string()))
}

/// `Function.prototype.call(thisArg, ...args)`.
pub fn call(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let Value::Function(function) = this else {
        return Ok(Value::Undefined);
    };
    let receiver = arg(args, 0);
    let rest = args.get(1..).unwrap_or_default();
    avm.call_function(function, &receiver, rest)
}

/// `Function.prototype.apply(thisArg, argArray)`.
///
/// The argument array is read through its `length` and index slots.
pub fn apply(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let Value::Function(function) = this else {
        return Ok(Value::Undefined);
    };
    let receiver = arg(args, 0);
    let list = arg(args, 1);
    let call_args = match list.as_object() {
        Some(array) => {
            let version = avm.version();
            let len = array.get("length", version).map_or(0.0, |v| v.to_number());
            let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
            (0..len)
                .map(|i| array.get(&i.to_string(), version).unwrap_or_default())
                .collect()
        }
        None => Vec::new(),
    };
    avm.call_function(function, &receiver, &call_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swfplay_macros::assert_number;

    fn sum_with_this(_: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
        let base = this.to_number();
        Ok(Value::Number(args.iter().fold(base, |acc, v| acc + v.to_number())))
    }

    #[test]
    fn test_call_forwards_receiver_and_args() {
        let mut avm = Avm::default();
        let f = Value::Function(avm.native_function("sum", sum_with_this, None));
        let result = call(&mut avm, &f, &[Value::from(10.0), Value::from(1.0), Value::from(2.0)]).unwrap();
        assert_number!(result, 13.0);
    }

    #[test]
    fn test_apply_reads_array_like() {
        let mut avm = Avm::default();
        let f = Value::Function(avm.native_function("sum", sum_with_this, None));
        let list = avm.new_array(vec![Value::from(1.0), Value::from(2.0), Value::from(3.0)]);
        let result = apply(&mut avm, &f, &[Value::from(0.0), Value::Object(list)]).unwrap();
        assert_number!(result, 6.0);
    }

    #[test]
    fn test_call_on_non_function() {
        let mut avm = Avm::default();
        assert_eq!(call(&mut avm, &Value::from(1.0), &[]), Ok(Value::Undefined));
    }

    #[test]
    fn test_functions_inherit_call() {
        let avm = Avm::default();
        let f = Value::Function(avm.native_function("sum", sum_with_this, None));
        assert!(avm.get_member(&f, "call").is_function());
        assert_eq!(avm.get_member(&f, "toString").type_of(), "function");
    }
}
