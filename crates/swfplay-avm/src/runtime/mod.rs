//! Script runtime types and the VM context.

pub mod context;
pub mod convert;
pub mod environment;
pub mod function;
pub mod input;
pub mod listener;
pub mod object;
pub mod property;
pub mod value;

pub use context::{Avm, HostInterface, Prototypes, TargetResolver};
pub use environment::{Activation, Environment, WithEntry};
pub use function::{Callable, FunctionRef, NativeFunction, PreloadFlags, ScriptFunction};
pub use input::{InputEvent, InputSender, KeyState};
pub use listener::ListenerBroadcast;
pub use object::{ObjectRef, ScriptObject, WeakObjectRef};
pub use property::{PropFlags, PropertyAttributes};
pub use value::{ConversionHost, PlainConversions, PrimitiveHint, Value};
