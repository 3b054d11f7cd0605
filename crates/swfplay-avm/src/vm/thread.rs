//! The action execution engine.
//!
//! An [`ExecutionThread`] walks one instruction buffer (or the byte range of
//! one function body) against one [`Environment`]. Calls into other script
//! functions start a nested thread and run it to completion before control
//! returns.

mod ops;

use super::action::ActionBuffer;
use crate::error::{BytecodeFault, Error, Result};
use crate::runtime::context::Avm;
use crate::runtime::environment::{Activation, Environment};
use crate::runtime::function::{Convention, FunctionRef, PreloadFlags, ScriptFunction};
use crate::runtime::property::PropFlags;
use crate::runtime::value::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Lifecycle of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Executing actions
    Running,
    /// A called function is executing
    AwaitingFunctionReturn,
    /// Reached the end of its range
    Stopped,
    /// Aborted by a fault
    Faulted,
}

/// What kind of code the thread runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallContext {
    /// A whole buffer
    TopLevel,
    /// A function using the first calling convention
    Function1,
    /// A function using the second calling convention
    Function2,
}

/// Interpreter state for one buffer or function body.
#[derive(Debug)]
pub struct ExecutionThread {
    buffer: ActionBuffer,
    start_pc: usize,
    pc: usize,
    stop_pc: usize,
    next_pc: usize,
    context: CallContext,
    state: ThreadState,
    env: Environment,
    stack: Vec<Value>,
    constants: Arc<[String]>,
    retval: Option<Value>,
}

impl ExecutionThread {
    /// Prepares to run a whole buffer at top level.
    pub fn new(avm: &Avm, buffer: &ActionBuffer) -> Self {
        Self {
            buffer: buffer.clone(),
            start_pc: 0,
            pc: 0,
            stop_pc: buffer.len(),
            next_pc: 0,
            context: CallContext::TopLevel,
            state: ThreadState::Running,
            env: Environment::new(avm.global().clone(), avm.version()),
            stack: Vec::new(),
            constants: Arc::from(Vec::new()),
            retval: None,
        }
    }

    /// Prepares to run `script` as a call with the given receiver and
    /// arguments.
    pub fn for_function(
        avm: &Avm,
        function: &FunctionRef,
        script: &ScriptFunction,
        this: &Value,
        args: &[Value],
    ) -> Self {
        let version = avm.version();
        let this = if this.is_nullish() {
            Value::Object(avm.global().clone())
        } else {
            this.clone()
        };

        let (context, activation) = match script.convention {
            Convention::V1 => {
                let activation = Activation::new(0);
                for (i, param) in script.params.iter().enumerate() {
                    let arg = args.get(i).cloned().unwrap_or_default();
                    activation.locals.define(&param.name, arg, PropFlags::empty());
                }
                activation.locals.define(
                    "arguments",
                    arguments_object(avm, function, args),
                    PropFlags::DONT_ENUM,
                );
                (CallContext::Function1, activation)
            }
            Convention::V2 {
                register_count,
                flags,
            } => {
                let mut activation = Activation::new(usize::from(register_count));
                preload(avm, &mut activation, flags, function, &this, args);
                for (i, param) in script.params.iter().enumerate() {
                    let arg = args.get(i).cloned().unwrap_or_default();
                    match activation.registers.get_mut(usize::from(param.register)) {
                        Some(slot) if param.register != 0 => *slot = arg,
                        _ => activation.locals.define(&param.name, arg, PropFlags::empty()),
                    }
                }
                (CallContext::Function2, activation)
            }
        };

        Self {
            buffer: script.buffer.clone(),
            start_pc: script.start,
            pc: script.start,
            stop_pc: script.end,
            next_pc: script.start,
            context,
            state: ThreadState::Running,
            env: Environment::for_call(
                avm.global().clone(),
                version,
                this,
                activation,
                script.scope.clone(),
            ),
            stack: Vec::new(),
            constants: script.constants.clone(),
            retval: None,
        }
    }

    /// Offset of the current action.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Offset of the action that runs next.
    pub fn next_pc(&self) -> usize {
        self.next_pc
    }

    /// End of the executing range.
    pub fn stop_pc(&self) -> usize {
        self.stop_pc
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// The calling convention in effect.
    pub fn context(&self) -> CallContext {
        self.context
    }

    /// Whether the thread runs a function body.
    pub fn is_function_call(&self) -> bool {
        self.context != CallContext::TopLevel
    }

    /// The scope chain.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The scope chain.
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// The operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Runs until the end of the range, a `Return`, or a fault.
    ///
    /// Returns the value passed to `Return`, if any. A fault leaves
    /// already committed effects in place and reports the error.
    pub fn run(&mut self, avm: &mut Avm) -> Result<Option<Value>> {
        while self.state == ThreadState::Running {
            if self.pc >= self.stop_pc {
                self.state = ThreadState::Stopped;
                break;
            }
            self.env.unwind_with(self.pc);
            if let Err(err) = avm.tick().and_then(|()| self.step(avm)) {
                self.state = ThreadState::Faulted;
                self.env.clear_with();
                if !err.aborts_script() {
                    warn!(pc = self.pc, error = %err, "thread faulted");
                }
                return Err(err);
            }
            self.pc = self.next_pc;
        }
        self.env.clear_with();
        Ok(self.retval.take())
    }

    fn step(&mut self, avm: &mut Avm) -> Result<()> {
        let buffer = self.buffer.clone();
        let action = buffer.decode(self.pc, self.stop_pc)?;
        self.next_pc = action.next_pc;
        if avm.config().trace_actions {
            trace!(
                target: "swfplay::actions",
                pc = action.pc,
                action = action.name(),
                operand_len = action.operand.len(),
            );
        }
        match action.code {
            Some(code) => self.execute(avm, code, &action),
            None => {
                debug!(pc = action.pc, opcode = action.opcode, "unknown action skipped");
                Ok(())
            }
        }
    }

    /// Moves `next_pc` by `offset` bytes. The target must stay inside the
    /// executing range.
    pub fn skip(&mut self, offset: isize) -> Result<()> {
        let target = self.next_pc as i64 + offset as i64;
        if target < self.start_pc as i64 || target > self.stop_pc as i64 {
            return Err(BytecodeFault::InvalidJump {
                pc: self.pc,
                target,
            }
            .into());
        }
        self.next_pc = target as usize;
        Ok(())
    }

    /// Reads a variable. Supports `this`, `_global`, dotted paths and
    /// `target:variable` paths. Unbound names read as `undefined`.
    pub fn get_variable(&self, avm: &Avm, name: &str) -> Value {
        match name {
            "this" => return self.env.this().clone(),
            "_global" => return Value::Object(self.env.global().clone()),
            _ => {}
        }
        if let Some((target, var)) = name.rsplit_once(':') {
            let target = self.resolve_path(avm, target);
            return avm.get_member(&target, var);
        }
        if let Some((head, rest)) = name.split_once('.') {
            let mut value = self.get_variable(avm, head);
            for part in rest.split('.') {
                value = avm.get_member(&value, part);
            }
            return value;
        }
        if let Some(value) = self.env.resolve(name) {
            return value;
        }
        if name.starts_with('_') {
            return avm.resolve_target(name).unwrap_or_default();
        }
        Value::Undefined
    }

    fn resolve_path(&self, avm: &Avm, path: &str) -> Value {
        if path.is_empty() {
            return self.env.this().clone();
        }
        match avm.resolve_target(path) {
            Some(target) => target,
            None => self.get_variable(avm, path),
        }
    }

    /// Assigns a variable. Protected slots refuse silently; returns whether
    /// the write happened.
    pub fn set_variable(&mut self, avm: &mut Avm, name: &str, value: Value) -> bool {
        let result = if let Some((target, var)) = name.rsplit_once(':') {
            let target = self.resolve_path(avm, target);
            avm.set_member(&target, var, value)
        } else if let Some((path, var)) = name.rsplit_once('.') {
            let target = self.get_variable(avm, path);
            avm.set_member(&target, var, value)
        } else {
            self.env.assign(name, value)
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                debug!(variable = name, error = %err, "assignment ignored");
                false
            }
        }
    }

    /// Defines a local inside a function, or assigns at top level.
    pub fn set_local_variable(&mut self, avm: &mut Avm, name: &str, value: Value) -> bool {
        if self.env.in_function() {
            self.env.declare_local(name, value)
        } else {
            self.set_variable(avm, name, value)
        }
    }

    /// Deletes a variable. Refusals are silent.
    pub fn delete_variable(&mut self, name: &str) -> bool {
        self.env.remove(name)
    }

    /// Function2 frames address only their own registers; everything else
    /// sees the four global ones.
    fn get_register(&self, avm: &Avm, index: u8, action: &'static str) -> Result<Value> {
        let slot = usize::from(index);
        let value = if self.context == CallContext::Function2 {
            self.env.activation().and_then(|a| a.registers.get(slot))
        } else {
            avm.global_register(slot)
        };
        value.cloned().ok_or_else(|| self.register_fault(index, action))
    }

    fn set_register(&mut self, avm: &mut Avm, index: u8, value: Value, action: &'static str) -> Result<()> {
        let slot = usize::from(index);
        let stored = if self.context == CallContext::Function2 {
            match self.env.activation_mut().and_then(|a| a.registers.get_mut(slot)) {
                Some(register) => {
                    *register = value;
                    true
                }
                None => false,
            }
        } else {
            avm.set_global_register(slot, value)
        };
        if stored {
            Ok(())
        } else {
            Err(self.register_fault(index, action))
        }
    }

    fn register_fault(&self, index: u8, action: &'static str) -> Error {
        match self.context {
            CallContext::Function2 => BytecodeFault::UnknownRegister { pc: self.pc, index }.into(),
            _ => BytecodeFault::CallingConvention { pc: self.pc, action }.into(),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pops the operand stack. An empty stack yields `undefined`.
    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }
}

fn arguments_object(avm: &Avm, function: &FunctionRef, args: &[Value]) -> Value {
    let obj = avm.new_array(args.to_vec());
    obj.define("callee", Value::Function(function.clone()), PropFlags::DONT_ENUM);
    Value::Object(obj)
}

fn preload(
    avm: &Avm,
    activation: &mut Activation,
    flags: PreloadFlags,
    function: &FunctionRef,
    this: &Value,
    args: &[Value],
) {
    let super_object = this
        .as_object()
        .and_then(|obj| obj.proto())
        .and_then(|proto| proto.proto())
        .map_or(Value::Undefined, Value::Object);

    let mut next = 1;
    let mut load = |activation: &mut Activation, value: Value| {
        if let Some(register) = activation.registers.get_mut(next) {
            *register = value;
        }
        next += 1;
    };

    if flags.contains(PreloadFlags::PRELOAD_THIS) {
        load(activation, this.clone());
    }
    if flags.contains(PreloadFlags::PRELOAD_ARGUMENTS) {
        load(activation, arguments_object(avm, function, args));
    } else if !flags.contains(PreloadFlags::SUPPRESS_ARGUMENTS) {
        activation.locals.define(
            "arguments",
            arguments_object(avm, function, args),
            PropFlags::DONT_ENUM,
        );
    }
    if flags.contains(PreloadFlags::PRELOAD_SUPER) {
        load(activation, super_object);
    } else if !flags.contains(PreloadFlags::SUPPRESS_SUPER) {
        activation.locals.define("super", super_object, PropFlags::DONT_ENUM);
    }
    if flags.contains(PreloadFlags::PRELOAD_ROOT) {
        load(activation, Value::MovieRef("_root".to_string()));
    }
    if flags.contains(PreloadFlags::PRELOAD_PARENT) {
        load(activation, Value::MovieRef("_parent".to_string()));
    }
    if flags.contains(PreloadFlags::PRELOAD_GLOBAL) {
        load(activation, Value::Object(avm.global().clone()));
    }
}

/// Runs a scripted function to completion.
///
/// Faults end the call only: the caller receives `undefined`. Errors that
/// abort the script propagate.
pub(crate) fn call_script(
    avm: &mut Avm,
    function: &FunctionRef,
    script: &ScriptFunction,
    this: &Value,
    args: &[Value],
) -> Result<Value> {
    let mut thread = ExecutionThread::for_function(avm, function, script, this, args);
    match thread.run(avm) {
        Ok(retval) => Ok(retval.unwrap_or_default()),
        Err(err) if err.aborts_script() => Err(err),
        Err(err) => {
            debug!(function = function.name(), error = %err, "call returned undefined after fault");
            Ok(Value::Undefined)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;
    use crate::vm::action::ActionCode;
    use crate::vm::writer::{ActionWriter, PushItem};
    use swfplay_macros::{assert_fault, assert_matches};

    fn avm() -> Avm {
        Avm::new(VmConfig::default())
    }

    #[test]
    fn test_top_level_construction() {
        let avm = avm();
        let buffer = ActionBuffer::from(vec![0x17, 0x00]);
        let thread = ExecutionThread::new(&avm, &buffer);
        assert_eq!(thread.pc(), 0);
        assert_eq!(thread.stop_pc(), 2);
        assert_eq!(thread.context(), CallContext::TopLevel);
        assert_eq!(thread.state(), ThreadState::Running);
        assert!(!thread.is_function_call());
    }

    #[test]
    fn test_run_stops_at_end_of_range() {
        let mut avm = avm();
        let mut w = ActionWriter::new();
        w.push_number(1.0);
        let buffer = w.finish_without_end();
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert_eq!(thread.run(&mut avm), Ok(None));
        assert_eq!(thread.state(), ThreadState::Stopped);
        assert_eq!(thread.stack(), &[Value::from(1.0)]);
    }

    #[test]
    fn test_skip_bounds() {
        let avm = avm();
        let buffer = ActionBuffer::from(vec![0x17; 10]);
        let mut thread = ExecutionThread::new(&avm, &buffer);
        thread.next_pc = 4;
        thread.skip(6).unwrap();
        assert_eq!(thread.next_pc(), 10);
        thread.skip(-10).unwrap();
        assert_eq!(thread.next_pc(), 0);
        assert_fault!(thread.skip(-1), Error::Bytecode(BytecodeFault::InvalidJump { target: -1, .. }));
        assert_fault!(thread.skip(11), Error::Bytecode(BytecodeFault::InvalidJump { .. }));
        assert_eq!(thread.next_pc(), 0);
    }

    #[test]
    fn test_truncated_action_faults_thread() {
        let mut avm = avm();
        let buffer = ActionBuffer::from(vec![0x96, 0x09, 0x00, 0x00]);
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert_fault!(thread.run(&mut avm), Error::Bytecode(BytecodeFault::Truncated { pc: 0 }));
        assert_eq!(thread.state(), ThreadState::Faulted);
    }

    #[test]
    fn test_fault_keeps_committed_effects() {
        let mut avm = avm();
        let mut w = ActionWriter::new();
        w.push(&[PushItem::str("done"), PushItem::Boolean(true)])
            .action(ActionCode::SetVariable)
            .raw(0x96, &[0xEE]);
        let buffer = w.finish();
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert!(thread.run(&mut avm).is_err());
        assert_eq!(avm.global().get("done", 7), Some(Value::from(true)));
    }

    #[test]
    fn test_variable_helpers() {
        let mut avm = avm();
        let buffer = ActionBuffer::from(vec![0x00]);
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert!(thread.set_variable(&mut avm, "x", Value::from(3.0)));
        assert_eq!(thread.get_variable(&avm, "x"), Value::from(3.0));
        assert!(thread.set_local_variable(&mut avm, "y", Value::from(4.0)));
        assert_eq!(avm.global().get("y", 7), Some(Value::from(4.0)));
        assert!(thread.delete_variable("x"));
        assert_eq!(thread.get_variable(&avm, "x"), Value::Undefined);
        assert_matches!(thread.get_variable(&avm, "this"), Value::Object(_));
    }

    #[test]
    fn test_read_only_assignment_is_silent() {
        let mut avm = avm();
        avm.global().define("k", Value::from(1.0), PropFlags::READ_ONLY);
        let buffer = ActionBuffer::from(vec![0x00]);
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert!(!thread.set_variable(&mut avm, "k", Value::from(2.0)));
        assert_eq!(thread.get_variable(&avm, "k"), Value::from(1.0));
    }

    #[test]
    fn test_dotted_paths() {
        let mut avm = avm();
        let inner = avm.new_object();
        avm.global().set("outer", Value::Object(inner.clone()), 7).unwrap();
        let buffer = ActionBuffer::from(vec![0x00]);
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert!(thread.set_variable(&mut avm, "outer.leaf", Value::from("v")));
        assert_eq!(inner.get("leaf", 7), Some(Value::from("v")));
        assert_eq!(thread.get_variable(&avm, "outer.leaf"), Value::from("v"));
    }

    #[test]
    fn test_global_registers_outside_function2() {
        let mut avm = avm();
        let buffer = ActionBuffer::from(vec![0x00]);
        let mut thread = ExecutionThread::new(&avm, &buffer);
        thread.set_register(&mut avm, 3, Value::from(9.0), "StoreRegister").unwrap();
        assert_eq!(thread.get_register(&avm, 3, "Push").unwrap(), Value::from(9.0));
        assert_fault!(
            thread.get_register(&avm, 4, "Push"),
            Error::Bytecode(BytecodeFault::CallingConvention { action: "Push", .. })
        );
    }
}
