//! Action handlers.

use super::{ExecutionThread, ThreadState};
use crate::error::{BytecodeFault, Result};
use crate::runtime::context::Avm;
use crate::runtime::convert::{to_int32, to_integer, to_uint32};
use crate::runtime::environment::WithEntry;
use crate::runtime::function::{Callable, Convention, Param, PreloadFlags, ScriptFunction};
use crate::runtime::object::ObjectRef;
use crate::runtime::property::PropFlags;
use crate::runtime::value::{PrimitiveHint, Value};
use crate::vm::action::{Action, ActionCode, OperandReader, push_type};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl ExecutionThread {
    pub(super) fn execute(&mut self, avm: &mut Avm, code: ActionCode, action: &Action<'_>) -> Result<()> {
        use ActionCode as A;

        match code {
            A::End => self.next_pc = self.stop_pc,

            // Arithmetic
            A::Add => self.binary_number(avm, |a, b| a + b)?,
            A::Subtract => self.binary_number(avm, |a, b| a - b)?,
            A::Multiply => self.binary_number(avm, |a, b| a * b)?,
            A::Divide => self.binary_number(avm, |a, b| a / b)?,
            A::Modulo => self.binary_number(avm, |a, b| a % b)?,
            A::Increment => {
                let n = self.pop_number(avm)?;
                self.push(Value::Number(n + 1.0));
            }
            A::Decrement => {
                let n = self.pop_number(avm)?;
                self.push(Value::Number(n - 1.0));
            }
            A::Add2 => self.add2(avm)?,

            // Comparison
            A::Equals => self.numeric_compare(avm, |a, b| a == b)?,
            A::Less => self.numeric_compare(avm, |a, b| a < b)?,
            A::Less2 => self.less2(avm, false)?,
            A::Greater => self.less2(avm, true)?,
            A::Equals2 => {
                let b = self.pop();
                let a = self.pop();
                let equal = a.loose_equals(&b, avm)?;
                self.push(Value::Boolean(equal));
            }
            A::StrictEquals => {
                let b = self.pop();
                let a = self.pop();
                self.push(Value::Boolean(a.strict_equals(&b)));
            }
            A::StringEquals => self.string_compare(avm, |a, b| a == b)?,
            A::StringLess => self.string_compare(avm, |a, b| a < b)?,
            A::StringGreater => self.string_compare(avm, |a, b| a > b)?,
            A::InstanceOf => {
                let constructor = self.pop();
                let value = self.pop();
                self.push(Value::Boolean(instance_of(&value, &constructor)));
            }

            // Logic
            A::And => {
                let b = self.pop().to_boolean();
                let a = self.pop().to_boolean();
                self.push_bool(avm, a && b);
            }
            A::Or => {
                let b = self.pop().to_boolean();
                let a = self.pop().to_boolean();
                self.push_bool(avm, a || b);
            }
            A::Not => {
                let a = self.pop().to_boolean();
                self.push_bool(avm, !a);
            }

            // Bitwise
            A::BitAnd => self.bitwise(avm, |a, b| a & b)?,
            A::BitOr => self.bitwise(avm, |a, b| a | b)?,
            A::BitXor => self.bitwise(avm, |a, b| a ^ b)?,
            A::BitLShift => self.bitwise(avm, |a, b| a.wrapping_shl(b as u32 & 31))?,
            A::BitRShift => self.bitwise(avm, |a, b| a.wrapping_shr(b as u32 & 31))?,
            A::BitURShift => {
                let shift = self.pop_number(avm)?;
                let value = self.pop_number(avm)?;
                let result = to_uint32(value) >> (to_uint32(shift) & 31);
                self.push(Value::Number(f64::from(result)));
            }

            // Strings
            A::StringLength | A::MBStringLength => {
                let s = self.pop_string(avm)?;
                self.push(Value::Number(s.chars().count() as f64));
            }
            A::StringExtract | A::MBStringExtract => self.string_extract(avm)?,
            A::StringAdd => {
                let b = self.pop_string(avm)?;
                let a = self.pop_string(avm)?;
                self.push(Value::String(a + &b));
            }
            A::CharToAscii | A::MBCharToAscii => {
                let s = self.pop_string(avm)?;
                let code = s.chars().next().map_or(0.0, |c| f64::from(u32::from(c)));
                self.push(Value::Number(code));
            }
            A::AsciiToChar | A::MBAsciiToChar => {
                let n = self.pop_number(avm)?;
                let c = char::from_u32(to_uint32(n)).filter(|&c| c != '\0');
                self.push(Value::String(c.map(String::from).unwrap_or_default()));
            }

            // Conversion
            A::ToInteger => {
                let n = self.pop_number(avm)?;
                self.push(Value::Number(to_integer(n)));
            }
            A::ToNumber => {
                let n = self.pop_number(avm)?;
                self.push(Value::Number(n));
            }
            A::ToString => {
                let s = self.pop_string(avm)?;
                self.push(Value::String(s));
            }
            A::TypeOf => {
                let value = self.pop();
                self.push(Value::String(value.type_of().to_string()));
            }
            A::TargetPath => {
                let value = self.pop();
                let path = match value {
                    Value::MovieRef(path) => Value::String(path),
                    _ => Value::Undefined,
                };
                self.push(path);
            }

            // Stack
            A::Pop => {
                self.pop();
            }
            A::PushDuplicate => {
                let top = self.stack.last().cloned().unwrap_or_default();
                self.push(top);
            }
            A::StackSwap => {
                let a = self.pop();
                let b = self.pop();
                self.push(a);
                self.push(b);
            }
            A::Push => self.push_action(avm, action)?,
            A::ConstantPool => self.constant_pool(action)?,
            A::StoreRegister => {
                let index = OperandReader::new(action).u8()?;
                let value = self.stack.last().cloned().unwrap_or_default();
                self.set_register(avm, index, value, action.name())?;
            }

            // Variables
            A::GetVariable => {
                let name = self.pop_string(avm)?;
                let value = self.get_variable(avm, &name);
                self.push(value);
            }
            A::SetVariable => {
                let value = self.pop();
                let name = self.pop_string(avm)?;
                self.set_variable(avm, &name, value);
            }
            A::DefineLocal => {
                let value = self.pop();
                let name = self.pop_string(avm)?;
                self.set_local_variable(avm, &name, value);
            }
            A::DefineLocal2 => {
                let name = self.pop_string(avm)?;
                self.declare_local(avm, &name);
            }
            A::Delete => {
                let name = self.pop_string(avm)?;
                let target = self.pop();
                let deleted = target
                    .as_object()
                    .is_some_and(|obj| obj.delete(&name, avm.version()));
                self.push(Value::Boolean(deleted));
            }
            A::Delete2 => {
                let name = self.pop_string(avm)?;
                let deleted = self.delete_variable(&name);
                self.push(Value::Boolean(deleted));
            }

            // Members
            A::GetMember => {
                let name = self.pop_string(avm)?;
                let target = self.pop();
                let value = avm.get_member(&target, &name);
                self.push(value);
            }
            A::SetMember => {
                let value = self.pop();
                let name = self.pop_string(avm)?;
                let target = self.pop();
                if let Err(err) = avm.set_member(&target, &name, value) {
                    debug!(member = %name, error = %err, "member assignment ignored");
                }
            }
            A::Enumerate => {
                let name = self.pop_string(avm)?;
                let target = self.get_variable(avm, &name);
                self.enumerate(avm, &target);
            }
            A::Enumerate2 => {
                let target = self.pop();
                self.enumerate(avm, &target);
            }

            // Objects
            A::InitArray => {
                let count = self.pop_count(avm)?;
                let elements: Vec<Value> = (0..count).map(|_| self.pop()).collect();
                self.push(Value::Object(avm.new_array(elements)));
            }
            A::InitObject => self.init_object(avm)?,
            A::NewObject => {
                let name = self.pop_string(avm)?;
                let args = self.pop_args(avm)?;
                let constructor = self.get_variable(avm, &name);
                let instance = self.construct(avm, &constructor, &args, &name)?;
                self.push(instance);
            }
            A::NewMethod => {
                let name = self.pop();
                let target = self.pop();
                let args = self.pop_args(avm)?;
                let method = name.to_string_versioned(avm.version());
                let constructor = if name.is_undefined() || method.is_empty() {
                    target
                } else {
                    avm.get_member(&target, &method)
                };
                let instance = self.construct(avm, &constructor, &args, &method)?;
                self.push(instance);
            }
            A::Extends => self.extends(),

            // Calls
            A::CallFunction => {
                let name = self.pop_string(avm)?;
                let args = self.pop_args(avm)?;
                let callee = self.get_variable(avm, &name);
                let this = self.env.this().clone();
                let result = self.invoke(avm, &callee, &this, &args, &name)?;
                self.push(result);
            }
            A::CallMethod => {
                let name = self.pop();
                let target = self.pop();
                let args = self.pop_args(avm)?;
                let method = name.to_string_versioned(avm.version());
                let (callee, this) = if name.is_undefined() || method.is_empty() {
                    (target, Value::Undefined)
                } else {
                    (avm.get_member(&target, &method), target)
                };
                let result = self.invoke(avm, &callee, &this, &args, &method)?;
                self.push(result);
            }
            A::Return => {
                let value = self.pop();
                self.retval = Some(value);
                self.next_pc = self.stop_pc;
            }

            // Control flow
            A::Jump => {
                let offset = OperandReader::new(action).i16()?;
                self.skip(offset.into())?;
            }
            A::If => {
                let offset = OperandReader::new(action).i16()?;
                if self.pop().to_boolean() {
                    self.skip(offset.into())?;
                }
            }
            A::With => self.with_action(avm, action)?,
            A::DefineFunction => self.define_function(avm, action, false)?,
            A::DefineFunction2 => self.define_function(avm, action, true)?,

            // Host
            A::Trace => {
                let value = self.pop();
                let message = value.to_string_with(avm, 7)?;
                info!(target: "swfplay::trace", "{message}");
            }
            A::GetTime => self.push(Value::Number(avm.elapsed_ms())),

            A::NextFrame
            | A::PrevFrame
            | A::Play
            | A::Stop
            | A::ToggleQuality
            | A::StopSounds
            | A::SetTarget2
            | A::GetProperty
            | A::SetProperty
            | A::CloneSprite
            | A::RemoveSprite
            | A::StartDrag
            | A::EndDrag
            | A::Throw
            | A::CastOp
            | A::ImplementsOp
            | A::RandomNumber
            | A::GotoFrame
            | A::GetUrl
            | A::WaitForFrame
            | A::SetTarget
            | A::GotoLabel
            | A::WaitForFrame2
            | A::Try
            | A::GetUrl2
            | A::Call
            | A::GotoFrame2 => {
                debug!(pc = action.pc, action = code.name(), "unsupported action skipped");
            }
        }
        Ok(())
    }

    fn pop_number(&mut self, avm: &mut Avm) -> Result<f64> {
        self.pop().to_number_with(avm)
    }

    fn pop_string(&mut self, avm: &mut Avm) -> Result<String> {
        let version = avm.version();
        self.pop().to_string_with(avm, version)
    }

    /// Pops a count operand, clamped to the values actually on the stack.
    fn pop_count(&mut self, avm: &mut Avm) -> Result<usize> {
        let n = self.pop_number(avm)?;
        let count = if n.is_finite() && n > 0.0 { n as usize } else { 0 };
        Ok(count.min(self.stack.len()))
    }

    fn pop_args(&mut self, avm: &mut Avm) -> Result<Vec<Value>> {
        let count = self.pop_count(avm)?;
        Ok((0..count).map(|_| self.pop()).collect())
    }

    /// Comparison results are booleans from version 5, numbers before.
    fn push_bool(&mut self, avm: &Avm, b: bool) {
        let value = if avm.version() >= 5 {
            Value::Boolean(b)
        } else {
            Value::Number(if b { 1.0 } else { 0.0 })
        };
        self.push(value);
    }

    fn binary_number(&mut self, avm: &mut Avm, op: impl FnOnce(f64, f64) -> f64) -> Result<()> {
        let b = self.pop_number(avm)?;
        let a = self.pop_number(avm)?;
        self.push(Value::Number(op(a, b)));
        Ok(())
    }

    fn numeric_compare(&mut self, avm: &mut Avm, op: impl FnOnce(f64, f64) -> bool) -> Result<()> {
        let b = self.pop_number(avm)?;
        let a = self.pop_number(avm)?;
        self.push_bool(avm, op(a, b));
        Ok(())
    }

    fn string_compare(&mut self, avm: &mut Avm, op: impl FnOnce(&str, &str) -> bool) -> Result<()> {
        let b = self.pop_string(avm)?;
        let a = self.pop_string(avm)?;
        self.push_bool(avm, op(&a, &b));
        Ok(())
    }

    fn bitwise(&mut self, avm: &mut Avm, op: impl FnOnce(i32, i32) -> i32) -> Result<()> {
        let b = self.pop_number(avm)?;
        let a = self.pop_number(avm)?;
        self.push(Value::Number(f64::from(op(to_int32(a), to_int32(b)))));
        Ok(())
    }

    fn add2(&mut self, avm: &mut Avm) -> Result<()> {
        let b = self.pop();
        let a = self.pop();
        let a = a.to_primitive(PrimitiveHint::Default, avm)?;
        let b = b.to_primitive(PrimitiveHint::Default, avm)?;
        let result = if matches!(a, Value::String(_)) || matches!(b, Value::String(_)) {
            let version = avm.version();
            Value::String(a.to_string_versioned(version) + &b.to_string_versioned(version))
        } else {
            Value::Number(a.to_number() + b.to_number())
        };
        self.push(result);
        Ok(())
    }

    /// `a < b`, or `a > b` when `greater` is set. Comparisons involving
    /// `NaN` push `undefined`.
    fn less2(&mut self, avm: &mut Avm, greater: bool) -> Result<()> {
        let b = self.pop();
        let a = self.pop();
        let (lhs, rhs) = if greater { (b, a) } else { (a, b) };
        let lhs = lhs.to_primitive(PrimitiveHint::Number, avm)?;
        let rhs = rhs.to_primitive(PrimitiveHint::Number, avm)?;
        let result = match (&lhs, &rhs) {
            (Value::String(x), Value::String(y)) => Value::Boolean(x < y),
            _ => {
                let (x, y) = (lhs.to_number(), rhs.to_number());
                if x.is_nan() || y.is_nan() {
                    Value::Undefined
                } else {
                    Value::Boolean(x < y)
                }
            }
        };
        self.push(result);
        Ok(())
    }

    /// Substring by 1-based index and length. A negative or `NaN` length
    /// takes the rest of the string.
    fn string_extract(&mut self, avm: &mut Avm) -> Result<()> {
        let count = self.pop_number(avm)?;
        let index = self.pop_number(avm)?;
        let s = self.pop_string(avm)?;
        let chars: Vec<char> = s.chars().collect();
        let start = ((to_integer(index) - 1.0).max(0.0) as usize).min(chars.len());
        let available = chars.len() - start;
        let len = if count.is_nan() || count < 0.0 {
            available
        } else {
            (count as usize).min(available)
        };
        self.push(Value::String(chars[start..start + len].iter().collect()));
        Ok(())
    }

    fn push_action(&mut self, avm: &Avm, action: &Action<'_>) -> Result<()> {
        let mut reader = OperandReader::new(action);
        while !reader.is_empty() {
            let value = match reader.u8()? {
                push_type::STRING => Value::String(reader.cstr()?),
                push_type::FLOAT => Value::Number(f64::from(reader.f32()?)),
                push_type::NULL => Value::Null,
                push_type::UNDEFINED => Value::Undefined,
                push_type::REGISTER => {
                    let index = reader.u8()?;
                    self.get_register(avm, index, action.name())?
                }
                push_type::BOOLEAN => Value::Boolean(reader.u8()? != 0),
                push_type::DOUBLE => Value::Number(reader.f64_swapped()?),
                push_type::INTEGER => Value::Number(f64::from(reader.i32()?)),
                push_type::CONSTANT8 => {
                    let index = usize::from(reader.u8()?);
                    self.constant(index).ok_or_else(|| reader.fault())?
                }
                push_type::CONSTANT16 => {
                    let index = usize::from(reader.u16()?);
                    self.constant(index).ok_or_else(|| reader.fault())?
                }
                _ => return Err(reader.fault().into()),
            };
            self.push(value);
        }
        Ok(())
    }

    fn constant(&self, index: usize) -> Option<Value> {
        self.constants.get(index).map(|s| Value::String(s.clone()))
    }

    fn constant_pool(&mut self, action: &Action<'_>) -> Result<()> {
        let mut reader = OperandReader::new(action);
        let count = reader.u16()?;
        let mut pool = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            pool.push(reader.cstr()?);
        }
        self.constants = Arc::from(pool);
        Ok(())
    }

    /// Binds `name` to `undefined` in the activation unless it already
    /// exists there. At top level, binds it globally when unbound.
    fn declare_local(&mut self, avm: &mut Avm, name: &str) {
        let version = avm.version();
        let exists = self
            .env
            .activation()
            .map(|activation| activation.locals.has_own_property(name, version));
        match exists {
            Some(false) => {
                self.env.declare_local(name, Value::Undefined);
            }
            Some(true) => {}
            None => {
                if self.env.resolve(name).is_none() {
                    self.set_variable(avm, name, Value::Undefined);
                }
            }
        }
    }

    /// Pushes a `null` marker followed by every enumerable key of `target`.
    fn enumerate(&mut self, avm: &Avm, target: &Value) {
        self.push(Value::Null);
        if let Some(obj) = target.as_object() {
            for key in obj.enumerable_keys(avm.version()) {
                self.push(Value::String(key));
            }
        }
    }

    fn init_object(&mut self, avm: &mut Avm) -> Result<()> {
        let count = self.pop_count(avm)?;
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let value = self.pop();
            let name = self.pop_string(avm)?;
            pairs.push((name, value));
        }
        let obj = avm.new_object();
        for (name, value) in pairs.into_iter().rev() {
            obj.define(&name, value, PropFlags::empty());
        }
        self.push(Value::Object(obj));
        Ok(())
    }

    /// Makes `subclass.prototype` a fresh object inheriting from
    /// `superclass.prototype`.
    fn extends(&mut self) {
        let superclass = self.pop();
        let subclass = self.pop();
        let (Value::Function(parent), Value::Function(child)) = (&superclass, &subclass) else {
            debug!("extends on a non-function ignored");
            return;
        };
        let proto = ObjectRef::with_proto(parent.prototype());
        proto.define("__constructor__", superclass.clone(), PropFlags::DONT_ENUM);
        child
            .object()
            .define("prototype", Value::Object(proto), PropFlags::DONT_ENUM | PropFlags::DONT_DELETE);
    }

    fn invoke(
        &mut self,
        avm: &mut Avm,
        callee: &Value,
        this: &Value,
        args: &[Value],
        name: &str,
    ) -> Result<Value> {
        let Value::Function(function) = callee else {
            debug!(function = %name, "call target is not a function");
            return Ok(Value::Undefined);
        };
        self.state = ThreadState::AwaitingFunctionReturn;
        let result = avm.call_function(function, this, args);
        self.state = ThreadState::Running;
        contain(result, name)
    }

    fn construct(&mut self, avm: &mut Avm, constructor: &Value, args: &[Value], name: &str) -> Result<Value> {
        let Value::Function(function) = constructor else {
            debug!(constructor = %name, "new on a non-function");
            return Ok(Value::Undefined);
        };
        self.state = ThreadState::AwaitingFunctionReturn;
        let result = avm.construct(function, args);
        self.state = ThreadState::Running;
        contain(result, name)
    }

    fn with_action(&mut self, avm: &mut Avm, action: &Action<'_>) -> Result<()> {
        let size = OperandReader::new(action).u16()?;
        let end_pc = self.next_pc + usize::from(size);
        if end_pc > self.stop_pc {
            return Err(BytecodeFault::InvalidJump {
                pc: self.pc,
                target: end_pc as i64,
            }
            .into());
        }

        let target = self.pop();
        let object = match &target {
            Value::MovieRef(path) => avm
                .resolve_target(path)
                .and_then(|resolved| resolved.as_object().cloned()),
            Value::Undefined | Value::Null => None,
            other => other
                .to_object(avm)
                .ok()
                .and_then(|boxed| boxed.as_object().cloned()),
        };
        let Some(object) = object else {
            debug!(pc = self.pc, "with target is not an object, block skipped");
            return self.skip(size as isize);
        };

        if let Err(err) = self.env.push_with(WithEntry::new(object, end_pc)) {
            warn!(pc = self.pc, error = %err, "with block skipped");
            self.skip(size as isize)?;
        }
        Ok(())
    }

    fn define_function(&mut self, avm: &mut Avm, action: &Action<'_>, v2: bool) -> Result<()> {
        if v2 && avm.version() < 7 {
            return Err(BytecodeFault::CallingConvention {
                pc: self.pc,
                action: action.name(),
            }
            .into());
        }

        let mut reader = OperandReader::new(action);
        let name = reader.cstr()?;
        let param_count = reader.u16()?;
        let (convention, params) = if v2 {
            let register_count = reader.u8()?;
            let flags = PreloadFlags::from_bits_truncate(reader.u16()?);
            let mut params = Vec::with_capacity(usize::from(param_count));
            for _ in 0..param_count {
                let register = reader.u8()?;
                let name = reader.cstr()?;
                params.push(Param { name, register });
            }
            (Convention::V2 { register_count, flags }, params)
        } else {
            let mut params = Vec::with_capacity(usize::from(param_count));
            for _ in 0..param_count {
                params.push(Param::named(reader.cstr()?));
            }
            (Convention::V1, params)
        };
        let code_size = usize::from(reader.u16()?);

        let start = self.next_pc;
        let end = start + code_size;
        if end > self.stop_pc {
            return Err(BytecodeFault::InvalidJump {
                pc: self.pc,
                target: end as i64,
            }
            .into());
        }

        let script = ScriptFunction {
            name: name.clone(),
            params,
            convention,
            buffer: self.buffer.clone(),
            start,
            end,
            constants: self.constants.clone(),
            scope: self.env.scope_chain(),
        };
        let function = Value::Function(avm.new_function(Callable::Script(script)));
        self.next_pc = end;

        if name.is_empty() {
            self.push(function);
        } else {
            self.set_variable(avm, &name, function);
        }
        Ok(())
    }
}

/// Turns a failed call into `undefined` unless the error aborts the script.
fn contain(result: Result<Value>, name: &str) -> Result<Value> {
    match result {
        Err(err) if !err.aborts_script() => {
            warn!(function = %name, error = %err, "call failed");
            Ok(Value::Undefined)
        }
        other => other,
    }
}

fn instance_of(value: &Value, constructor: &Value) -> bool {
    let (Some(obj), Value::Function(function)) = (value.as_object(), constructor) else {
        return false;
    };
    function
        .prototype()
        .is_some_and(|proto| obj.inherits_from(&proto))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;
    use crate::error::Error;
    use crate::vm::action::ActionBuffer;
    use crate::vm::writer::{ActionWriter, PushItem};
    use swfplay_macros::{assert_fault, assert_matches, assert_number};

    fn run_with(config: VmConfig, buffer: &ActionBuffer) -> (Avm, ExecutionThread) {
        let mut avm = Avm::new(config);
        let mut thread = ExecutionThread::new(&avm, buffer);
        thread.run(&mut avm).unwrap();
        (avm, thread)
    }

    fn stack_after(build: impl FnOnce(&mut ActionWriter)) -> Vec<Value> {
        let mut w = ActionWriter::new();
        build(&mut w);
        let (_, thread) = run_with(VmConfig::default(), &w.finish());
        thread.stack().to_vec()
    }

    #[test]
    fn test_arithmetic() {
        let stack = stack_after(|w| {
            w.push(&[PushItem::Double(7.0), PushItem::Double(2.0)])
                .action(ActionCode::Subtract)
                .push(&[PushItem::Integer(3)])
                .action(ActionCode::Multiply);
        });
        assert_number!(stack[0], 15.0);
    }

    #[test]
    fn test_modulo_and_divide_by_zero() {
        let stack = stack_after(|w| {
            w.push(&[PushItem::Double(7.0), PushItem::Double(4.0)])
                .action(ActionCode::Modulo)
                .push(&[PushItem::Double(1.0), PushItem::Double(0.0)])
                .action(ActionCode::Divide);
        });
        assert_number!(stack[0], 3.0);
        assert_number!(stack[1], f64::INFINITY);
    }

    #[test]
    fn test_add2_concatenates_strings() {
        let stack = stack_after(|w| {
            w.push(&[PushItem::str("n="), PushItem::Double(4.0)])
                .action(ActionCode::Add2)
                .push(&[PushItem::Double(1.0), PushItem::Boolean(true)])
                .action(ActionCode::Add2);
        });
        assert_eq!(stack[0], Value::from("n=4"));
        assert_number!(stack[1], 2.0);
    }

    #[test]
    fn test_comparison_result_type_follows_version() {
        let mut w = ActionWriter::new();
        w.push(&[PushItem::Double(1.0), PushItem::Double(2.0)])
            .action(ActionCode::Less);
        let buffer = w.finish();
        let (_, v4) = run_with(VmConfig::default().with_version(4), &buffer);
        assert_eq!(v4.stack(), &[Value::from(1.0)]);
        let (_, v6) = run_with(VmConfig::default().with_version(6), &buffer);
        assert_eq!(v6.stack(), &[Value::from(true)]);
    }

    #[test]
    fn test_less2_with_nan_is_undefined() {
        let stack = stack_after(|w| {
            w.push(&[PushItem::str("x"), PushItem::Double(1.0)])
                .action(ActionCode::Less2)
                .push(&[PushItem::Double(3.0), PushItem::Double(1.0)])
                .action(ActionCode::Greater);
        });
        assert_eq!(stack[0], Value::Undefined);
        assert_eq!(stack[1], Value::from(true));
    }

    #[test]
    fn test_bitwise_ops() {
        let stack = stack_after(|w| {
            w.push(&[PushItem::Integer(-1), PushItem::Integer(28)])
                .action(ActionCode::BitURShift)
                .push(&[PushItem::Integer(1), PushItem::Integer(33)])
                .action(ActionCode::BitLShift)
                .push(&[PushItem::Integer(6), PushItem::Integer(3)])
                .action(ActionCode::BitXor);
        });
        assert_number!(stack[0], 15.0);
        assert_number!(stack[1], 2.0);
        assert_number!(stack[2], 5.0);
    }

    #[test]
    fn test_string_actions() {
        let stack = stack_after(|w| {
            w.push(&[PushItem::str("hello"), PushItem::Integer(2), PushItem::Integer(3)])
                .action(ActionCode::StringExtract)
                .push_str("abc")
                .action(ActionCode::StringLength)
                .push_str("A")
                .action(ActionCode::CharToAscii)
                .push(&[PushItem::Integer(66)])
                .action(ActionCode::AsciiToChar);
        });
        assert_eq!(stack[0], Value::from("ell"));
        assert_number!(stack[1], 3.0);
        assert_number!(stack[2], 65.0);
        assert_eq!(stack[3], Value::from("B"));
    }

    #[test]
    fn test_stack_underflow_reads_undefined() {
        let stack = stack_after(|w| {
            w.action(ActionCode::TypeOf);
        });
        assert_eq!(stack, vec![Value::from("undefined")]);
    }

    #[test]
    fn test_constant_pool_push() {
        let stack = stack_after(|w| {
            w.constant_pool(&["alpha", "beta"])
                .push(&[PushItem::Constant(1), PushItem::Constant(0)]);
        });
        assert_eq!(stack, vec![Value::from("beta"), Value::from("alpha")]);
    }

    #[test]
    fn test_constant_out_of_range_faults() {
        let mut w = ActionWriter::new();
        w.push(&[PushItem::Constant(3)]);
        let buffer = w.finish();
        let mut avm = Avm::new(VmConfig::default());
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert_fault!(
            thread.run(&mut avm),
            Error::Bytecode(BytecodeFault::MalformedOperand { action: "Push", .. })
        );
    }

    #[test]
    fn test_jump_and_branch() {
        let stack = stack_after(|w| {
            let skip = w.new_label();
            let done = w.new_label();
            w.push(&[PushItem::Boolean(true)])
                .branch_if(skip)
                .push_str("not taken")
                .place(skip)
                .push_str("taken")
                .jump(done)
                .push_str("unreachable")
                .place(done);
        });
        assert_eq!(stack, vec![Value::from("taken")]);
    }

    #[test]
    fn test_jump_outside_buffer_faults() {
        let buffer = ActionBuffer::from(vec![0x99, 0x02, 0x00, 0x10, 0x00, 0x00]);
        let mut avm = Avm::new(VmConfig::default());
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert_fault!(thread.run(&mut avm), Error::Bytecode(BytecodeFault::InvalidJump { target: 21, .. }));
    }

    #[test]
    fn test_init_object_and_member_access() {
        let stack = stack_after(|w| {
            w.push(&[
                PushItem::str("a"),
                PushItem::Integer(1),
                PushItem::str("b"),
                PushItem::Integer(2),
                PushItem::Integer(2),
            ])
            .action(ActionCode::InitObject)
            .push_str("b")
            .action(ActionCode::GetMember);
        });
        assert_number!(stack[0], 2.0);
    }

    #[test]
    fn test_init_array() {
        let (avm, thread) = {
            let mut w = ActionWriter::new();
            w.push(&[PushItem::str("z"), PushItem::str("y"), PushItem::str("x"), PushItem::Integer(3)])
                .action(ActionCode::InitArray);
            run_with(VmConfig::default(), &w.finish())
        };
        let array = thread.stack()[0].as_object().cloned().unwrap();
        assert_eq!(array.get("0", avm.version()), Some(Value::from("x")));
        assert_eq!(array.get("2", avm.version()), Some(Value::from("z")));
        assert_number!(array.get("length", avm.version()).unwrap(), 3.0);
    }

    #[test]
    fn test_enumerate_pushes_marker_then_keys() {
        let mut avm = Avm::new(VmConfig::default());
        let obj = avm.new_object();
        obj.define("first", Value::from(1.0), PropFlags::empty());
        obj.define("hidden", Value::from(2.0), PropFlags::DONT_ENUM);
        avm.global().set("o", Value::Object(obj), 7).unwrap();
        let mut w = ActionWriter::new();
        w.push_str("o").action(ActionCode::Enumerate);
        let buffer = w.finish();
        let mut thread = ExecutionThread::new(&avm, &buffer);
        thread.run(&mut avm).unwrap();
        assert_eq!(thread.stack(), &[Value::Null, Value::from("first")]);
    }

    #[test]
    fn test_store_register_keeps_top() {
        let stack = stack_after(|w| {
            w.push_number(5.0)
                .store_register(1)
                .push(&[PushItem::Register(1)]);
        });
        assert_eq!(stack, vec![Value::from(5.0), Value::from(5.0)]);
    }

    #[test]
    fn test_with_pushes_scope_until_block_end() {
        let mut avm = Avm::new(VmConfig::default());
        let obj = avm.new_object();
        obj.define("x", Value::from("inner"), PropFlags::empty());
        avm.global().set("o", Value::Object(obj), 7).unwrap();
        avm.global().set("x", Value::from("outer"), 7).unwrap();

        let mut w = ActionWriter::new();
        w.push_str("o").action(ActionCode::GetVariable).with_block(|w| {
            w.push_str("x").action(ActionCode::GetVariable);
        });
        w.push_str("x").action(ActionCode::GetVariable);
        let buffer = w.finish();
        let mut thread = ExecutionThread::new(&avm, &buffer);
        thread.run(&mut avm).unwrap();
        assert_eq!(thread.stack(), &[Value::from("inner"), Value::from("outer")]);
    }

    #[test]
    fn test_with_on_undefined_skips_block() {
        let stack = stack_after(|w| {
            w.push(&[PushItem::Undefined]).with_block(|w| {
                w.push_str("inside");
            });
            w.push_str("after");
        });
        assert_eq!(stack, vec![Value::from("after")]);
    }

    fn nested_with(w: &mut ActionWriter, depth: usize) {
        if depth == 0 {
            w.push_str("innermost");
            return;
        }
        w.push_str("o")
            .action(ActionCode::GetVariable)
            .with_block(|w| nested_with(w, depth - 1));
    }

    #[test]
    fn test_with_past_bound_skips_block() {
        let mut avm = Avm::new(VmConfig::default().with_version(5));
        let obj = avm.new_object();
        avm.global().set("o", Value::Object(obj), 5).unwrap();

        let mut w = ActionWriter::new();
        nested_with(&mut w, 8);
        w.push_str("after");
        let buffer = w.finish();
        let mut thread = ExecutionThread::new(&avm, &buffer);
        thread.run(&mut avm).unwrap();
        assert_eq!(thread.stack(), &[Value::from("after")]);
        assert_eq!(thread.state(), ThreadState::Stopped);

        let mut w = ActionWriter::new();
        nested_with(&mut w, 7);
        let buffer = w.finish();
        let mut thread = ExecutionThread::new(&avm, &buffer);
        thread.run(&mut avm).unwrap();
        assert_eq!(thread.stack(), &[Value::from("innermost")]);
    }

    #[test]
    fn test_define_and_call_function() {
        let stack = stack_after(|w| {
            w.define_function("double", &["n"], |w| {
                w.push(&[PushItem::str("n")])
                    .action(ActionCode::GetVariable)
                    .push(&[PushItem::str("n")])
                    .action(ActionCode::GetVariable)
                    .action(ActionCode::Add2)
                    .action(ActionCode::Return);
            });
            w.push(&[PushItem::Integer(21), PushItem::Integer(1), PushItem::str("double")])
                .action(ActionCode::CallFunction);
        });
        assert_number!(stack[0], 42.0);
    }

    #[test]
    fn test_function2_registers() {
        let flags = PreloadFlags::PRELOAD_THIS | PreloadFlags::SUPPRESS_ARGUMENTS | PreloadFlags::SUPPRESS_SUPER;
        let stack = stack_after(|w| {
            w.define_function2("f", 3, flags, &[(2, "a")], |w| {
                w.push(&[PushItem::Register(2), PushItem::Register(2)])
                    .action(ActionCode::Multiply)
                    .action(ActionCode::Return);
            });
            w.push(&[PushItem::Integer(9), PushItem::Integer(1), PushItem::str("f")])
                .action(ActionCode::CallFunction);
        });
        assert_number!(stack[0], 81.0);
    }

    #[test]
    fn test_function2_register_past_count_faults() {
        let flags = PreloadFlags::SUPPRESS_THIS | PreloadFlags::SUPPRESS_ARGUMENTS | PreloadFlags::SUPPRESS_SUPER;
        let stack = stack_after(|w| {
            w.push(&[PushItem::str("global")])
                .store_register(3)
                .action(ActionCode::Pop);
            w.define_function2("f", 2, flags, &[], |w| {
                w.push(&[PushItem::Register(3)]).action(ActionCode::Return);
            });
            w.push(&[PushItem::Integer(0), PushItem::str("f")])
                .action(ActionCode::CallFunction)
                .push(&[PushItem::Register(3)]);
        });
        assert_eq!(stack, vec![Value::Undefined, Value::from("global")]);
    }

    #[test]
    fn test_function2_rejected_before_version_7() {
        let mut w = ActionWriter::new();
        w.define_function2("f", 1, PreloadFlags::empty(), &[], |_| {});
        let buffer = w.finish();
        let mut avm = Avm::new(VmConfig::default().with_version(6));
        let mut thread = ExecutionThread::new(&avm, &buffer);
        assert_fault!(
            thread.run(&mut avm),
            Error::Bytecode(BytecodeFault::CallingConvention { action: "DefineFunction2", .. })
        );
    }

    #[test]
    fn test_faulting_callee_returns_undefined() {
        let stack = stack_after(|w| {
            w.define_function("broken", &[], |w| {
                w.raw(0x96, &[0xEE]);
            });
            w.push(&[PushItem::Integer(0), PushItem::str("broken")])
                .action(ActionCode::CallFunction)
                .push_str("after");
        });
        assert_eq!(stack, vec![Value::Undefined, Value::from("after")]);
    }

    #[test]
    fn test_new_object_with_script_constructor() {
        let mut w = ActionWriter::new();
        w.define_function("Point", &["x"], |w| {
            w.push(&[PushItem::str("this")])
                .action(ActionCode::GetVariable)
                .push(&[PushItem::str("x"), PushItem::str("x")])
                .action(ActionCode::GetVariable)
                .action(ActionCode::SetMember);
        });
        w.push(&[PushItem::Integer(4), PushItem::Integer(1), PushItem::str("Point")])
            .action(ActionCode::NewObject)
            .action(ActionCode::PushDuplicate)
            .push_str("Point")
            .action(ActionCode::GetVariable)
            .action(ActionCode::InstanceOf);
        let (avm, thread) = run_with(VmConfig::default(), &w.finish());
        let point = thread.stack()[0].as_object().cloned().unwrap();
        assert_number!(point.get("x", avm.version()).unwrap(), 4.0);
        assert_eq!(thread.stack()[1], Value::from(true));
    }

    #[test]
    fn test_delete2() {
        let (avm, thread) = {
            let mut w = ActionWriter::new();
            w.push(&[PushItem::str("v"), PushItem::Integer(1)])
                .action(ActionCode::SetVariable)
                .push_str("v")
                .action(ActionCode::Delete2);
            run_with(VmConfig::default(), &w.finish())
        };
        assert_eq!(thread.stack(), &[Value::from(true)]);
        assert!(!avm.global().has_own_property("v", 7));
    }

    #[test]
    fn test_type_of_function() {
        let stack = stack_after(|w| {
            w.define_function("", &[], |_| {});
            w.action(ActionCode::TypeOf);
        });
        assert_matches!(stack.as_slice(), [Value::String(s)] if s.as_str() == "function");
    }
}
