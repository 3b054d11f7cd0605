//! Global functions.
//!
//! Number parsing (`parseInt`, `parseFloat`, `isNaN`, `isFinite`) plus the
//! player-specific `ASSetPropFlags` and `ASnative`.

use super::arg;
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::convert::{to_int32, to_integer};
use crate::runtime::function::NativeFunction;
use crate::runtime::property::PropFlags;
use crate::runtime::value::Value;
use tracing::debug;

pub(super) fn install(avm: &mut Avm) {
    let functions: [(&str, NativeFunction); 6] = [
        ("isNaN", is_nan),
        ("isFinite", is_finite),
        ("parseInt", parse_int),
        ("parseFloat", parse_float),
        ("ASSetPropFlags", as_set_prop_flags),
        ("ASnative", as_native),
    ];
    for (name, call) in functions {
        let function = avm.native_function(name, call, None);
        avm.global().define(name, Value::Function(function), PropFlags::DONT_ENUM);
    }
    avm.global().define(
        "NaN",
        Value::Number(f64::NAN),
        PropFlags::DONT_ENUM | PropFlags::DONT_DELETE,
    );
    avm.global().define(
        "Infinity",
        Value::Number(f64::INFINITY),
        PropFlags::DONT_ENUM | PropFlags::DONT_DELETE,
    );
}

// ============================================================================
// Number parsing
// ============================================================================

/// `parseInt(string, radix)`.
///
/// Without a radix, `0x` selects hexadecimal and a leading `0` octal.
pub fn parse_int(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let version = avm.version();
    let input = arg(args, 0).to_string_with(avm, version)?;
    let radix = match args.get(1) {
        Some(value) if !value.is_undefined() => to_int32(value.to_number_with(avm)?),
        _ => 0,
    };

    let s = input.trim_start();
    let (sign, s) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let has_hex_prefix = s.starts_with("0x") || s.starts_with("0X");

    let radix = match radix {
        0 if has_hex_prefix => 16,
        0 if s.starts_with('0') && s.len() > 1 => 8,
        0 => 10,
        2..=36 => radix as u32,
        _ => return Ok(Value::Number(f64::NAN)),
    };
    let s = if radix == 16 && has_hex_prefix { &s[2..] } else { s };

    let mut result = 0.0;
    let mut found_digit = false;
    for c in s.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        found_digit = true;
        result = result * f64::from(radix) + f64::from(digit);
    }

    if !found_digit {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(sign * result))
}

/// `parseFloat(string)` - the longest numeric prefix.
pub fn parse_float(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let version = avm.version();
    let input = arg(args, 0).to_string_with(avm, version)?;
    Ok(Value::Number(float_prefix(input.trim_start())))
}

fn float_prefix(s: &str) -> f64 {
    for (prefix, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if s.starts_with(prefix) {
            return value;
        }
    }

    let bytes = s.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_start = end;
    end = digits(end);
    let mut mantissa_digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(f64::NAN)
}

/// `isNaN(value)`.
pub fn is_nan(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(arg(args, 0).to_number_with(avm)?.is_nan()))
}

/// `isFinite(value)`.
pub fn is_finite(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(arg(args, 0).to_number_with(avm)?.is_finite()))
}

// ============================================================================
// Player functions
// ============================================================================

/// `ASSetPropFlags(object, names, set, clear)`.
///
/// `names` is a comma-separated list, an array of names, or `null` for
/// every own slot. Only the user-changeable bits are honoured; locked slots
/// refuse to drop protection bits.
pub fn as_set_prop_flags(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let target = arg(args, 0);
    let Some(obj) = target.as_object() else {
        debug!("ASSetPropFlags on a non-object ignored");
        return Ok(Value::Undefined);
    };
    let set = flag_arg(avm, args, 2)?;
    let clear = flag_arg(avm, args, 3)?;
    let version = avm.version();

    let names: Vec<String> = match arg(args, 1) {
        Value::Null => obj.own_keys(),
        Value::Object(list) => {
            let len = list.get("length", version).map_or(0.0, |v| v.to_number());
            let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
            (0..len)
                .filter_map(|i| list.get(&i.to_string(), version))
                .map(|name| name.to_string_versioned(version))
                .collect()
        }
        other => other
            .to_string_with(avm, version)?
            .split(',')
            .map(|name| name.trim().to_string())
            .collect(),
    };

    for name in names {
        if !obj.set_flags(&name, set, clear) {
            debug!(property = %name, "flags unchanged");
        }
    }
    Ok(Value::Undefined)
}

fn flag_arg(avm: &mut Avm, args: &[Value], index: usize) -> Result<PropFlags> {
    let bits = match args.get(index) {
        Some(value) if !value.is_nullish() => to_integer(value.to_number_with(avm)?),
        _ => 0.0,
    };
    let bits = PropFlags::from_bits_truncate(to_int32(bits) as u16);
    Ok(bits & PropFlags::USER_MASK)
}

/// `ASnative(major, minor)` - a native table entry, or `undefined`.
pub fn as_native(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let major = to_int32(arg(args, 0).to_number_with(avm)?);
    let minor = to_int32(arg(args, 1).to_number_with(avm)?);
    let (Ok(major), Ok(minor)) = (u16::try_from(major), u16::try_from(minor)) else {
        return Ok(Value::Undefined);
    };
    Ok(avm
        .get_native(major, minor)
        .map_or(Value::Undefined, Value::Function))
}
