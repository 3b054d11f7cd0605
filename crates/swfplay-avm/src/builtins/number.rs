//! The `Number` constructor and `Number.prototype`.

use super::{arg, define_constructor, define_method, unbox};
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::convert::{format_number, to_integer};
use crate::runtime::property::PropFlags;
use crate::runtime::value::Value;

// ============================================================================
// Number Constants
// ============================================================================

/// `Number.MAX_VALUE`
pub const MAX_VALUE: f64 = f64::MAX;

/// `Number.MIN_VALUE` - smallest positive denormal
pub const MIN_VALUE: f64 = 5e-324;

const CONSTANTS: [(&str, f64); 5] = [
    ("MAX_VALUE", MAX_VALUE),
    ("MIN_VALUE", MIN_VALUE),
    ("NaN", f64::NAN),
    ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
    ("POSITIVE_INFINITY", f64::INFINITY),
];

pub(super) fn install(avm: &mut Avm) {
    let proto = avm.prototypes().number.clone();
    define_method(avm, &proto, "toString", to_string);
    define_method(avm, &proto, "valueOf", value_of);
    let constructor = define_constructor(avm, "Number", number_call, number_construct, &proto);
    for (name, value) in CONSTANTS {
        constructor.object().define(
            name,
            Value::Number(value),
            PropFlags::DONT_ENUM | PropFlags::DONT_DELETE | PropFlags::READ_ONLY,
        );
    }
}

// ============================================================================
// Constructor
// ============================================================================

/// `Number(value)` - converts to a number; 0 without an argument.
pub fn number_call(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(arg(args, 0).to_number_with(avm)?))
}

/// `new Number(value)` - stores the number in the instance.
pub fn number_construct(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let n = number_call(avm, this, args)?;
    if let Some(obj) = this.as_object() {
        obj.set_primitive(Some(n));
    }
    Ok(Value::Undefined)
}

// ============================================================================
// Number.prototype
// ============================================================================

/// `Number.prototype.toString(radix)`.
///
/// Radixes outside 2..=36 and non-integral values print in base 10.
pub fn to_string(_avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let n = this_number(this);
    let radix = match args.first() {
        Some(value) if !value.is_undefined() => to_integer(value.to_number()),
        _ => 10.0,
    };
    if radix == 10.0 || !(2.0..=36.0).contains(&radix) || !n.is_finite() || n.fract() != 0.0 {
        return Ok(Value::String(format_number(n)));
    }
    if n.abs() >= i64::MAX as f64 {
        return Ok(Value::String(format_number(n)));
    }
    let digits = format_radix(n.abs() as i64, radix as u32);
    Ok(Value::String(if n < 0.0 { format!("-{digits}") } else { digits }))
}

/// `Number.prototype.valueOf()`.
pub fn value_of(_avm: &mut Avm, this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(this_number(this)))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn this_number(this: &Value) -> f64 {
    match unbox(this) {
        Value::Number(n) => n,
        _ => f64::NAN,
    }
}

/// Formats a non-negative integer in the given radix.
fn format_radix(mut n: i64, radix: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_string();
    }

    let mut result = Vec::new();
    let radix = i64::from(radix);

    while n > 0 {
        result.push(DIGITS[(n % radix) as usize] as char);
        n /= radix;
    }

    result.into_iter().rev().collect()
}
