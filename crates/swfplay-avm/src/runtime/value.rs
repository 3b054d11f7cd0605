//! Script value representation.

use super::convert::{format_number, parse_number};
use super::function::FunctionRef;
use super::object::ObjectRef;
use crate::error::{Error, Result};
use std::fmt;

/// A script value.
///
/// Object and function handles are reference counted and shared between
/// every value that holds a copy. Cloning a value clones the handle, never
/// the referent.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// String
    String(String),
    /// Number (IEEE 754 double)
    Number(f64),
    /// Shared object handle
    Object(ObjectRef),
    /// Shared function handle
    Function(FunctionRef),
    /// Symbolic movie clip path, resolved lazily
    MovieRef(String),
}

/// Preferred result of [`Value::to_primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveHint {
    /// No preference (`valueOf` first)
    #[default]
    Default,
    /// Numeric context (`valueOf` first)
    Number,
    /// String context (`toString` first)
    String,
}

/// Collaborator behind the object coercion hooks.
///
/// The VM context implements this by calling script methods. Pure code can
/// use [`PlainConversions`].
pub trait ConversionHost {
    /// Produces the primitive value of an object, function or clip reference.
    fn default_value(&mut self, value: &Value, hint: PrimitiveHint) -> Result<Value>;

    /// Wraps a boolean, number or string in its object form.
    fn box_primitive(&mut self, value: &Value) -> Result<Value>;
}

/// Conversions that never run script code.
///
/// Objects answer their boxed primitive, otherwise `NaN` in numeric context
/// and `"[object Object]"` elsewhere. Primitives cannot be boxed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainConversions;

impl ConversionHost for PlainConversions {
    fn default_value(&mut self, value: &Value, hint: PrimitiveHint) -> Result<Value> {
        let primitive = match value {
            Value::Object(obj) => obj.primitive(),
            Value::Function(func) => func.object().primitive(),
            Value::MovieRef(path) => return Ok(Value::String(path.clone())),
            other => return Ok(other.clone()),
        };
        Ok(match (primitive, hint) {
            (Some(primitive), _) => primitive,
            (None, PrimitiveHint::Number) => Value::Number(f64::NAN),
            (None, _) if value.is_function() => Value::String("[type Function]".to_string()),
            (None, _) => Value::String("[object Object]".to_string()),
        })
    }

    fn box_primitive(&mut self, value: &Value) -> Result<Value> {
        Err(Error::TypeConversion(value.type_of()))
    }
}

impl Value {
    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is null or undefined.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Returns true for objects and functions.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Function(_))
    }

    /// Returns true for undefined, null, booleans, strings and numbers.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Boolean(_) | Value::String(_) | Value::Number(_)
        )
    }

    /// Returns true if this value is a `NaN` number.
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    /// Returns true if this value is an infinite number.
    pub fn is_infinite(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_infinite())
    }

    /// Returns true if this value is a finite number.
    pub fn is_finite(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_finite())
    }

    /// The object behind an object or function value.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            Value::Function(func) => Some(func.object()),
            _ => None,
        }
    }

    /// The function behind a function value.
    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Returns the `typeof` name of this value.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::MovieRef(_) => "movieclip",
        }
    }

    /// Converts the value to a number without running script code.
    ///
    /// Objects answer their boxed primitive, or `NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Object(obj) => obj.primitive().map_or(f64::NAN, |p| p.to_number()),
            Value::Function(_) | Value::MovieRef(_) => f64::NAN,
        }
    }

    /// Converts the value to a number, asking `host` for object primitives.
    pub fn to_number_with(&self, host: &mut dyn ConversionHost) -> Result<f64> {
        if self.is_primitive() {
            return Ok(self.to_number());
        }
        Ok(self.to_primitive(PrimitiveHint::Number, host)?.to_number())
    }

    /// Converts the value to a boolean.
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) | Value::MovieRef(_) => true,
        }
    }

    /// Converts the value to a string as seen by `version`, without running
    /// script code.
    ///
    /// `undefined` prints as the empty string below version 7.
    pub fn to_string_versioned(&self, version: u8) -> String {
        match self {
            Value::Undefined if version < 7 => String::new(),
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Object(obj) => match obj.primitive() {
                Some(primitive) => primitive.to_string_versioned(version),
                None => "[object Object]".to_string(),
            },
            Value::Function(_) => "[type Function]".to_string(),
            Value::MovieRef(path) => path.clone(),
        }
    }

    /// Converts the value to a string, asking `host` for object primitives.
    pub fn to_string_with(&self, host: &mut dyn ConversionHost, version: u8) -> Result<String> {
        if self.is_primitive() {
            return Ok(self.to_string_versioned(version));
        }
        let primitive = self.to_primitive(PrimitiveHint::String, host)?;
        Ok(primitive.to_string_versioned(version))
    }

    /// Returns self for primitives, otherwise the host's default value.
    pub fn to_primitive(&self, hint: PrimitiveHint, host: &mut dyn ConversionHost) -> Result<Value> {
        if self.is_primitive() {
            return Ok(self.clone());
        }
        host.default_value(self, hint)
    }

    /// Wraps primitives in their object form.
    ///
    /// Objects, functions and clip references pass through; `undefined`
    /// and `null` fail.
    pub fn to_object(&self, host: &mut dyn ConversionHost) -> Result<Value> {
        match self {
            Value::Undefined | Value::Null => Err(Error::TypeConversion(self.type_of())),
            Value::Boolean(_) | Value::Number(_) | Value::String(_) => host.box_primitive(self),
            Value::Object(_) | Value::Function(_) | Value::MovieRef(_) => Ok(self.clone()),
        }
    }

    /// Identity comparison (`===`). `NaN` equals nothing.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::MovieRef(a), Value::MovieRef(b)) => a == b,
            _ => false,
        }
    }

    /// Coercing comparison (`==`).
    pub fn loose_equals(&self, other: &Value, host: &mut dyn ConversionHost) -> Result<bool> {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => Ok(true),
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => Ok(false),
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a == b),
            (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
                Ok(*n == parse_number(s))
            }
            (Value::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other, host),
            (_, Value::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number()), host),
            (Value::Object(_) | Value::Function(_), Value::Object(_) | Value::Function(_)) => {
                Ok(matches!((self.as_object(), other.as_object()), (Some(a), Some(b)) if a.ptr_eq(b)))
            }
            (Value::MovieRef(a), Value::MovieRef(b)) => Ok(a == b),
            (a, b) if !a.is_primitive() => {
                let primitive = a.to_primitive(PrimitiveHint::Default, host)?;
                if primitive.is_primitive() {
                    primitive.loose_equals(b, host)
                } else {
                    Ok(false)
                }
            }
            (a, b) => b.loose_equals(a, host),
        }
    }

    /// Replaces the value with a string.
    pub fn set_string(&mut self, s: impl Into<String>) {
        *self = Value::String(s.into());
    }

    /// Replaces the value with a number.
    pub fn set_number(&mut self, n: f64) {
        *self = Value::Number(n);
    }

    /// Replaces the value with a boolean.
    pub fn set_bool(&mut self, b: bool) {
        *self = Value::Boolean(b);
    }

    /// Replaces the value with an object handle.
    pub fn set_object(&mut self, obj: ObjectRef) {
        *self = Value::Object(obj);
    }

    /// Replaces the value with a function handle.
    pub fn set_function(&mut self, func: FunctionRef) {
        *self = Value::Function(func);
    }

    /// Replaces the value with undefined.
    pub fn set_undefined(&mut self) {
        *self = Value::Undefined;
    }

    /// Replaces the value with null.
    pub fn set_null(&mut self) {
        *self = Value::Null;
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_versioned(7))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<FunctionRef> for Value {
    fn from(func: FunctionRef) -> Self {
        Value::Function(func)
    }
}
