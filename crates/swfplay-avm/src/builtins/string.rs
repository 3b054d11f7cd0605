//! The `String` constructor and `String.prototype`.
//!
//! Indices count characters, not bytes.

use super::{arg, define_constructor, define_method, unbox};
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::convert::{to_integer, to_uint32};
use crate::runtime::value::Value;

pub(super) fn install(avm: &mut Avm) {
    let proto = avm.prototypes().string.clone();
    define_method(avm, &proto, "toString", to_string);
    define_method(avm, &proto, "valueOf", to_string);
    define_method(avm, &proto, "charAt", char_at);
    define_method(avm, &proto, "charCodeAt", char_code_at);
    define_method(avm, &proto, "indexOf", index_of);
    define_method(avm, &proto, "lastIndexOf", last_index_of);
    define_method(avm, &proto, "substr", substr);
    define_method(avm, &proto, "substring", substring);
    let constructor = define_constructor(avm, "String", string_call, string_construct, &proto);
    define_method(avm, constructor.object(), "fromCharCode", from_char_code);
}

// ============================================================================
// Constructor
// ============================================================================

/// `String(value)` - converts to a string; empty without an argument.
pub fn string_call(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::String(String::new()));
    }
    let version = avm.version();
    Ok(Value::String(arg(args, 0).to_string_with(avm, version)?))
}

/// `new String(value)` - stores the string in the instance.
pub fn string_construct(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let s = string_call(avm, this, args)?;
    if let Some(obj) = this.as_object() {
        obj.set_primitive(Some(s));
    }
    Ok(Value::Undefined)
}

/// `String.fromCharCode(...codes)`.
pub fn from_char_code(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let mut result = String::new();
    for value in args {
        let code = to_uint32(value.to_number_with(avm)?) & 0xFFFF;
        if let Some(c) = char::from_u32(code) {
            result.push(c);
        }
    }
    Ok(Value::String(result))
}

// ============================================================================
// String.prototype
// ============================================================================

/// `String.prototype.toString()` and `valueOf()`.
pub fn to_string(avm: &mut Avm, this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::String(this_string(avm, this)?))
}

/// `String.prototype.charAt(index)` - empty outside the string.
pub fn char_at(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let chars = this_chars(avm, this)?;
    let index = index_arg(avm, args, 0, 0.0)?;
    let c = position(index, chars.len()).map(|i| chars[i].to_string());
    Ok(Value::String(c.unwrap_or_default()))
}

/// `String.prototype.charCodeAt(index)` - `NaN` outside the string.
pub fn char_code_at(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let chars = this_chars(avm, this)?;
    let index = index_arg(avm, args, 0, 0.0)?;
    let code = position(index, chars.len()).map_or(f64::NAN, |i| f64::from(u32::from(chars[i])));
    Ok(Value::Number(code))
}

/// `String.prototype.indexOf(search, from)`.
pub fn index_of(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let chars = this_chars(avm, this)?;
    let needle = string_arg(avm, args, 0)?;
    let from = index_arg(avm, args, 1, 0.0)?.max(0.0) as usize;
    let found = (from..=chars.len().saturating_sub(needle.len()))
        .find(|&i| i + needle.len() <= chars.len() && chars[i..i + needle.len()] == needle[..]);
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

/// `String.prototype.lastIndexOf(search, from)`.
pub fn last_index_of(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let chars = this_chars(avm, this)?;
    let needle = string_arg(avm, args, 0)?;
    if needle.len() > chars.len() {
        return Ok(Value::Number(-1.0));
    }
    let last = chars.len() - needle.len();
    let from = index_arg(avm, args, 1, last as f64)?;
    if from < 0.0 {
        return Ok(Value::Number(-1.0));
    }
    let from = (from as usize).min(last);
    let found = (0..=from).rev().find(|&i| chars[i..i + needle.len()] == needle[..]);
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

/// `String.prototype.substr(start, length)`.
///
/// A negative start counts from the end. A missing length takes the rest.
pub fn substr(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let chars = this_chars(avm, this)?;
    let len = chars.len() as f64;
    let start = index_arg(avm, args, 0, 0.0)?;
    let start = if start < 0.0 { (len + start).max(0.0) } else { start.min(len) };
    let count = index_arg(avm, args, 1, len)?;
    let end = (start + count.max(0.0)).min(len);
    Ok(Value::String(chars[start as usize..end.max(start) as usize].iter().collect()))
}

/// `String.prototype.substring(start, end)`.
///
/// Both ends are clamped to the string; reversed ends are swapped.
pub fn substring(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
    let chars = this_chars(avm, this)?;
    let len = chars.len() as f64;
    let start = index_arg(avm, args, 0, 0.0)?.clamp(0.0, len);
    let end = index_arg(avm, args, 1, len)?.clamp(0.0, len);
    let (from, to) = if start <= end { (start, end) } else { (end, start) };
    Ok(Value::String(chars[from as usize..to as usize].iter().collect()))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn this_string(avm: &mut Avm, this: &Value) -> Result<String> {
    let version = avm.version();
    match unbox(this) {
        Value::String(s) => Ok(s),
        other => other.to_string_with(avm, version),
    }
}

fn this_chars(avm: &mut Avm, this: &Value) -> Result<Vec<char>> {
    Ok(this_string(avm, this)?.chars().collect())
}

fn string_arg(avm: &mut Avm, args: &[Value], index: usize) -> Result<Vec<char>> {
    let version = avm.version();
    Ok(arg(args, index).to_string_with(avm, version)?.chars().collect())
}

/// An integer argument; `default` when missing or undefined.
fn index_arg(avm: &mut Avm, args: &[Value], index: usize, default: f64) -> Result<f64> {
    match args.get(index) {
        Some(value) if !value.is_undefined() => Ok(to_integer(value.to_number_with(avm)?)),
        _ => Ok(default),
    }
}

fn position(index: f64, len: usize) -> Option<usize> {
    (index >= 0.0 && index < len as f64).then_some(index as usize)
}
