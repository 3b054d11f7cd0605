//! Function representation.

use super::context::Avm;
use super::object::{ObjectRef, ScriptObject};
use super::value::Value;
use crate::error::Result;
use crate::vm::ActionBuffer;
use std::fmt;
use std::sync::Arc;
use swfplay_macros::flag_set;

/// A native (Rust) function: receives the VM context, `this` and the
/// arguments.
pub type NativeFunction = fn(&mut Avm, &Value, &[Value]) -> Result<Value>;

flag_set! {
    /// Register preload and suppression flags of the second calling
    /// convention.
    pub struct PreloadFlags: u16 {
        /// Load `this` into the next register
        const PRELOAD_THIS = 0x0001;
        /// Do not define `this`
        const SUPPRESS_THIS = 0x0002;
        /// Load `arguments` into the next register
        const PRELOAD_ARGUMENTS = 0x0004;
        /// Do not define `arguments`
        const SUPPRESS_ARGUMENTS = 0x0008;
        /// Load `super` into the next register
        const PRELOAD_SUPER = 0x0010;
        /// Do not define `super`
        const SUPPRESS_SUPER = 0x0020;
        /// Load `_root` into the next register
        const PRELOAD_ROOT = 0x0040;
        /// Load `_parent` into the next register
        const PRELOAD_PARENT = 0x0080;
        /// Load `_global` into the next register
        const PRELOAD_GLOBAL = 0x0100;
    }
}

/// How a scripted function binds its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Parameters become named locals; `arguments` is always defined.
    V1,
    /// Parameters may map to local registers.
    V2 {
        /// Size of the local register file
        register_count: u8,
        /// Preload and suppression flags
        flags: PreloadFlags,
    },
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Target register, or 0 for a named local
    pub register: u8,
}

impl Param {
    /// A parameter bound by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            register: 0,
        }
    }
}

/// A function defined by bytecode.
#[derive(Debug, Clone)]
pub struct ScriptFunction {
    /// The function name, empty for anonymous functions
    pub name: String,
    /// Declared parameters
    pub params: Vec<Param>,
    /// Calling convention
    pub convention: Convention,
    /// Buffer holding the body
    pub buffer: ActionBuffer,
    /// First byte of the body
    pub start: usize,
    /// One past the last byte of the body
    pub end: usize,
    /// Constant pool active at definition time
    pub constants: Arc<[String]>,
    /// Scopes captured at definition time, innermost first
    pub scope: Vec<ObjectRef>,
}

impl ScriptFunction {
    /// Returns the arity (number of parameters).
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// The closed set of callable things.
#[derive(Clone)]
pub enum Callable {
    /// A native Rust function
    Native {
        /// The function name
        name: String,
        /// Behaviour when called
        call: NativeFunction,
        /// Behaviour under `new`, when it differs from `call`
        construct: Option<NativeFunction>,
    },
    /// A function defined by bytecode
    Script(ScriptFunction),
    /// A method bound to a receiver
    Bound {
        /// The `this` value for every call
        receiver: Value,
        /// The bound method
        method: FunctionRef,
    },
}

impl Callable {
    /// The function name.
    pub fn name(&self) -> &str {
        match self {
            Callable::Native { name, .. } => name,
            Callable::Script(func) => &func.name,
            Callable::Bound { method, .. } => method.name(),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native { name, .. } => write!(f, "NativeFunction({})", name),
            Callable::Script(func) => write!(f, "Function({:?})", func.name),
            Callable::Bound { method, .. } => write!(f, "Bound({})", method.name()),
        }
    }
}

/// Shared handle to a callable plus its own property bag.
///
/// The property bag holds `prototype` and any slots scripts add to the
/// function. Identity is the identity of the bag.
#[derive(Clone)]
pub struct FunctionRef {
    callable: Arc<Callable>,
    object: ObjectRef,
}

impl FunctionRef {
    /// Creates a function whose property bag inherits from `proto`.
    pub fn new(callable: Callable, proto: Option<ObjectRef>) -> Self {
        Self {
            callable: Arc::new(callable),
            object: ObjectRef::new(ScriptObject::new(proto)),
        }
    }

    /// The callable behaviour.
    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    /// The property bag.
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// The function name.
    pub fn name(&self) -> &str {
        self.callable.name()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &FunctionRef) -> bool {
        self.object.ptr_eq(&other.object)
    }

    /// The `prototype` slot used by `new` and `instanceof`.
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.object
            .get_own("prototype", u8::MAX)
            .and_then(|value| value.as_object().cloned())
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.callable.as_ref(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Avm, _: &Value, _: &[Value]) -> Result<Value> {
        Ok(Value::Undefined)
    }

    fn native(name: &str) -> FunctionRef {
        FunctionRef::new(
            Callable::Native {
                name: name.to_string(),
                call: noop,
                construct: None,
            },
            None,
        )
    }

    #[test]
    fn test_function_identity() {
        let f = native("f");
        let g = native("f");
        assert!(f.ptr_eq(&f.clone()));
        assert!(!f.ptr_eq(&g));
    }

    #[test]
    fn test_names() {
        let f = native("show");
        assert_eq!(f.name(), "show");
        assert_eq!(format!("{:?}", f), "NativeFunction(show)");

        let bound = FunctionRef::new(
            Callable::Bound {
                receiver: Value::Null,
                method: f,
            },
            None,
        );
        assert_eq!(bound.name(), "show");
    }

    #[test]
    fn test_prototype_slot() {
        let f = native("Ctor");
        assert!(f.prototype().is_none());
        let proto = ObjectRef::with_proto(None);
        f.object().set("prototype", Value::Object(proto.clone()), 7).unwrap();
        assert!(f.prototype().is_some_and(|p| p.ptr_eq(&proto)));
    }

    #[test]
    fn test_script_function_arity() {
        let func = ScriptFunction {
            name: "add".into(),
            params: vec![Param::named("a"), Param::named("b")],
            convention: Convention::V1,
            buffer: ActionBuffer::from(vec![0u8]),
            start: 0,
            end: 1,
            constants: Arc::from(Vec::new()),
            scope: Vec::new(),
        };
        assert_eq!(func.arity(), 2);
    }
}
