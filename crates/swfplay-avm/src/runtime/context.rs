//! The VM context.
//!
//! One [`Avm`] exists per player instance. It owns the global object, the
//! built-in prototypes, the native function table, the global registers, the
//! input queue and the watchdog state, and it is the entry point for running
//! instruction buffers and calling script functions.

use super::function::{Callable, FunctionRef, NativeFunction};
use super::input::{InputEvent, InputSender, KeyState};
use super::object::{ObjectRef, ScriptObject};
use super::property::PropFlags;
use super::value::{ConversionHost, PlainConversions, PrimitiveHint, Value};
use crate::builtins;
use crate::config::VmConfig;
use crate::error::{Error, Result};
use crate::vm::{ActionBuffer, ExecutionThread, InterruptHandle, thread};
use crossbeam::channel::{self, Receiver, Sender};
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Number of registers shared by all code outside function-v2 frames.
pub const GLOBAL_REGISTERS: usize = 4;

/// Answers requests the core cannot serve itself, such as hiding the
/// pointer.
pub trait HostInterface: Send {
    /// Handles `request` (for example `"Mouse.hide"`). `None` means the
    /// request is not supported.
    fn call(&mut self, request: &str, args: &[Value]) -> Option<Value>;
}

/// Resolves movie clip paths such as `_root.menu` or `_level0`.
pub trait TargetResolver: Send {
    /// The value a path designates, or `None` when it does not exist.
    fn resolve(&self, path: &str) -> Option<Value>;
}

/// The built-in prototype objects.
#[derive(Debug, Clone)]
pub struct Prototypes {
    /// `Object.prototype`
    pub object: ObjectRef,
    /// `Function.prototype`
    pub function: ObjectRef,
    /// `Number.prototype`
    pub number: ObjectRef,
    /// `String.prototype`
    pub string: ObjectRef,
    /// `Boolean.prototype`
    pub boolean: ObjectRef,
}

/// The scripting VM context.
pub struct Avm {
    config: VmConfig,
    global: ObjectRef,
    prototypes: Prototypes,
    natives: FxHashMap<(u16, u16), FunctionRef>,
    registers: [Value; GLOBAL_REGISTERS],
    input_tx: Sender<InputEvent>,
    input_rx: Receiver<InputEvent>,
    keys: KeyState,
    mouse_position: (f64, f64),
    key_object: ObjectRef,
    mouse_object: ObjectRef,
    host: Option<Box<dyn HostInterface>>,
    resolver: Option<Box<dyn TargetResolver>>,
    interrupt: InterruptHandle,
    actions: u64,
    call_depth: u32,
    started: Instant,
}

impl Avm {
    /// Creates a context with the built-ins installed.
    pub fn new(config: VmConfig) -> Self {
        let object = ObjectRef::with_proto(None);
        let proto = || Some(object.clone());
        let prototypes = Prototypes {
            function: ObjectRef::with_proto(proto()),
            number: ObjectRef::new(ScriptObject::boxed(Value::Number(0.0), proto())),
            string: ObjectRef::new(ScriptObject::boxed(Value::String(String::new()), proto())),
            boolean: ObjectRef::new(ScriptObject::boxed(Value::Boolean(false), proto())),
            object: object.clone(),
        };
        let (input_tx, input_rx) = channel::unbounded();

        let mut avm = Self {
            global: ObjectRef::with_proto(proto()),
            key_object: ObjectRef::with_proto(proto()),
            mouse_object: ObjectRef::with_proto(proto()),
            config,
            prototypes,
            natives: FxHashMap::default(),
            registers: Default::default(),
            input_tx,
            input_rx,
            keys: KeyState::default(),
            mouse_position: (0.0, 0.0),
            host: None,
            resolver: None,
            interrupt: InterruptHandle::new(),
            actions: 0,
            call_depth: 0,
            started: Instant::now(),
        };
        builtins::install(&mut avm);
        avm
    }

    /// The configuration in effect.
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// The bytecode version.
    pub fn version(&self) -> u8 {
        self.config.swf_version
    }

    /// The global object.
    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    /// The built-in prototypes.
    pub fn prototypes(&self) -> &Prototypes {
        &self.prototypes
    }

    /// The `Key` object.
    pub fn key_object(&self) -> &ObjectRef {
        &self.key_object
    }

    /// The `Mouse` object.
    pub fn mouse_object(&self) -> &ObjectRef {
        &self.mouse_object
    }

    /// A plain object inheriting from `Object.prototype`.
    pub fn new_object(&self) -> ObjectRef {
        ObjectRef::with_proto(Some(self.prototypes.object.clone()))
    }

    /// An object holding `elements` at indices `0..n` plus a `length`.
    pub fn new_array(&self, elements: Vec<Value>) -> ObjectRef {
        let array = self.new_object();
        let len = elements.len();
        for (i, element) in elements.into_iter().enumerate() {
            array.define(&i.to_string(), element, PropFlags::empty());
        }
        array.define("length", Value::Number(len as f64), PropFlags::DONT_ENUM);
        array
    }

    /// Wraps a callable. Script functions get a fresh `prototype` object.
    pub fn new_function(&self, callable: Callable) -> FunctionRef {
        let is_script = matches!(callable, Callable::Script(_));
        let function = FunctionRef::new(callable, Some(self.prototypes.function.clone()));
        if is_script {
            function.object().define(
                "prototype",
                Value::Object(self.new_object()),
                PropFlags::DONT_ENUM | PropFlags::DONT_DELETE,
            );
        }
        function
    }

    /// Wraps a native function.
    pub fn native_function(
        &self,
        name: &str,
        call: NativeFunction,
        construct: Option<NativeFunction>,
    ) -> FunctionRef {
        self.new_function(Callable::Native {
            name: name.to_string(),
            call,
            construct,
        })
    }

    /// A function that always calls `method` with `receiver` as `this`.
    pub fn bound_method(&self, receiver: Value, method: FunctionRef) -> FunctionRef {
        self.new_function(Callable::Bound { receiver, method })
    }

    /// Registers a native table entry reachable through `ASnative`.
    pub fn register_native(&mut self, major: u16, minor: u16, function: FunctionRef) {
        self.natives.insert((major, minor), function);
    }

    /// Looks up a native table entry.
    pub fn get_native(&self, major: u16, minor: u16) -> Option<FunctionRef> {
        self.natives.get(&(major, minor)).cloned()
    }

    /// Reads a global register.
    pub fn global_register(&self, index: usize) -> Option<&Value> {
        self.registers.get(index)
    }

    /// Writes a global register. Returns false when out of range.
    pub fn set_global_register(&mut self, index: usize, value: Value) -> bool {
        match self.registers.get_mut(index) {
            Some(register) => {
                *register = value;
                true
            }
            None => false,
        }
    }

    /// Runs a whole buffer at top level.
    ///
    /// A run that is not nested inside another starts a fresh action budget.
    #[instrument(level = "debug", skip_all, fields(len = buffer.len()))]
    pub fn run(&mut self, buffer: &ActionBuffer) -> Result<Option<Value>> {
        if self.call_depth == 0 {
            self.actions = 0;
        }
        let mut thread = ExecutionThread::new(self, buffer);
        let result = thread.run(self);
        if let Err(err) = &result {
            if err.aborts_script() {
                warn!(error = %err, "script aborted");
            }
        }
        result
    }

    /// Calls `function` with the given receiver and arguments.
    ///
    /// Faults inside a scripted callee end that call and yield `undefined`.
    /// Errors raised by native functions and watchdog errors propagate.
    pub fn call_function(&mut self, function: &FunctionRef, this: &Value, args: &[Value]) -> Result<Value> {
        let limit = self.config.recursion_limit;
        if self.call_depth >= limit {
            return Err(Error::CallDepthExceeded { limit });
        }
        self.call_depth += 1;
        let result = match function.callable() {
            Callable::Native { call, .. } => call(self, this, args),
            Callable::Script(script) => thread::call_script(self, function, script, this, args),
            Callable::Bound { receiver, method } => self.call_function(method, receiver, args),
        };
        self.call_depth -= 1;
        result
    }

    /// Calls `callee` if it is a function.
    pub fn call_value(&mut self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value> {
        match callee {
            Value::Function(function) => self.call_function(function, this, args),
            other => Err(Error::NotCallable(other.to_string_versioned(self.version()))),
        }
    }

    /// Calls the method `name` of `receiver`.
    pub fn call_method(&mut self, receiver: &Value, name: &str, args: &[Value]) -> Result<Value> {
        match self.get_member(receiver, name) {
            Value::Function(method) => self.call_function(&method, receiver, args),
            _ => Err(Error::NotCallable(name.to_string())),
        }
    }

    /// Runs `constructor` under `new`.
    ///
    /// The instance inherits from the constructor's `prototype`. A
    /// constructor returning an object replaces the instance.
    pub fn construct(&mut self, constructor: &FunctionRef, args: &[Value]) -> Result<Value> {
        let proto = constructor
            .prototype()
            .unwrap_or_else(|| self.prototypes.object.clone());
        let instance = ObjectRef::with_proto(Some(proto));
        let ctor = Value::Function(constructor.clone());
        instance.define("__constructor__", ctor.clone(), PropFlags::DONT_ENUM);
        instance.define("constructor", ctor, PropFlags::DONT_ENUM);
        let this = Value::Object(instance);

        let result = match constructor.callable() {
            Callable::Native {
                construct: Some(construct),
                ..
            } => construct(self, &this, args)?,
            _ => self.call_function(constructor, &this, args)?,
        };
        Ok(if result.is_object() { result } else { this })
    }

    /// Reads a member of any value. Primitives read through their
    /// prototype; missing members read as `undefined`.
    pub fn get_member(&self, target: &Value, name: &str) -> Value {
        let version = self.version();
        let found = match target {
            Value::Object(obj) => obj.get(name, version),
            Value::Function(function) => function.object().get(name, version),
            Value::String(s) if name == "length" => Some(Value::Number(s.chars().count() as f64)),
            Value::String(_) => self.prototypes.string.get(name, version),
            Value::Number(_) => self.prototypes.number.get(name, version),
            Value::Boolean(_) => self.prototypes.boolean.get(name, version),
            Value::MovieRef(path) => match self.resolve_target(path) {
                Some(resolved) if !matches!(resolved, Value::MovieRef(_)) => {
                    Some(self.get_member(&resolved, name))
                }
                _ => None,
            },
            Value::Undefined | Value::Null => None,
        };
        found.unwrap_or_default()
    }

    /// Writes a member. Writes to primitives are dropped.
    pub fn set_member(&mut self, target: &Value, name: &str, value: Value) -> Result<()> {
        let version = self.version();
        match target {
            Value::Object(obj) => obj.set(name, value, version),
            Value::Function(function) => function.object().set(name, value, version),
            Value::MovieRef(path) => match self.resolve_target(path) {
                Some(resolved) if !matches!(resolved, Value::MovieRef(_)) => {
                    self.set_member(&resolved, name, value)
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Counts one action against the budget and polls the interrupt flag.
    pub(crate) fn tick(&mut self) -> Result<()> {
        if self.interrupt.take() {
            return Err(Error::Interrupted);
        }
        self.actions += 1;
        match self.config.max_actions {
            Some(limit) if self.actions > limit => Err(Error::InstructionLimit { limit }),
            _ => Ok(()),
        }
    }

    /// A handle that stops the running script from another thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Starts a new action budget.
    pub fn reset_action_budget(&mut self) {
        self.actions = 0;
    }

    /// Actions executed since the budget was last reset.
    pub fn actions_executed(&self) -> u64 {
        self.actions
    }

    /// Milliseconds since the context was created.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_millis() as f64
    }

    /// Installs the host collaborator.
    pub fn set_host(&mut self, host: impl HostInterface + 'static) {
        self.host = Some(Box::new(host));
    }

    /// Forwards a request to the host. `None` without a host or when the
    /// host declines.
    pub fn host_call(&mut self, request: &str, args: &[Value]) -> Option<Value> {
        self.host.as_mut()?.call(request, args)
    }

    /// Installs the movie clip path resolver.
    pub fn set_target_resolver(&mut self, resolver: impl TargetResolver + 'static) {
        self.resolver = Some(Box::new(resolver));
    }

    /// Resolves a movie clip path.
    pub fn resolve_target(&self, path: &str) -> Option<Value> {
        self.resolver.as_ref()?.resolve(path)
    }

    /// A handle for queueing input events.
    pub fn input_sender(&self) -> InputSender {
        InputSender(self.input_tx.clone())
    }

    /// Current key map.
    pub fn key_state(&self) -> &KeyState {
        &self.keys
    }

    /// Last reported pointer position.
    pub fn mouse_position(&self) -> (f64, f64) {
        self.mouse_position
    }

    /// Delivers queued input events to the `Key` and `Mouse` listeners.
    /// Returns the number of events processed.
    #[instrument(level = "debug", skip(self))]
    pub fn process_input(&mut self) -> Result<usize> {
        let mut processed = 0;
        while let Ok(event) = self.input_rx.try_recv() {
            processed += 1;
            let (target, event_name) = match event {
                InputEvent::KeyDown { code, ascii } => {
                    self.keys.press(code, ascii);
                    (self.key_object.clone(), "onKeyDown")
                }
                InputEvent::KeyUp { code, .. } => {
                    self.keys.release(code);
                    (self.key_object.clone(), "onKeyUp")
                }
                InputEvent::MouseDown => (self.mouse_object.clone(), "onMouseDown"),
                InputEvent::MouseUp => (self.mouse_object.clone(), "onMouseUp"),
                InputEvent::MouseMove { x, y } => {
                    self.mouse_position = (x, y);
                    (self.mouse_object.clone(), "onMouseMove")
                }
            };
            match target.listeners() {
                Some(listeners) => {
                    listeners.notify(self, event_name)?;
                }
                None => debug!(event = event_name, "no listener registry"),
            }
        }
        Ok(processed)
    }
}

impl Default for Avm {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

impl ConversionHost for Avm {
    fn default_value(&mut self, value: &Value, hint: PrimitiveHint) -> Result<Value> {
        if let Value::MovieRef(_) = value {
            return PlainConversions.default_value(value, hint);
        }
        let order = match hint {
            PrimitiveHint::String => ["toString", "valueOf"],
            PrimitiveHint::Default | PrimitiveHint::Number => ["valueOf", "toString"],
        };
        for name in order {
            if let Value::Function(method) = self.get_member(value, name) {
                let result = self.call_function(&method, value, &[])?;
                if result.is_primitive() {
                    return Ok(result);
                }
            }
        }
        PlainConversions.default_value(value, hint)
    }

    fn box_primitive(&mut self, value: &Value) -> Result<Value> {
        let proto = match value {
            Value::Boolean(_) => &self.prototypes.boolean,
            Value::Number(_) => &self.prototypes.number,
            Value::String(_) => &self.prototypes.string,
            other => return Err(Error::TypeConversion(other.type_of())),
        };
        let boxed = ScriptObject::boxed(value.clone(), Some(proto.clone()));
        Ok(Value::Object(ObjectRef::new(boxed)))
    }
}
