//! The `Key` object.
//!
//! Reads the key map the context keeps up to date in
//! [`Avm::process_input`]. `Key` is a broadcaster: listeners receive
//! `onKeyDown` and `onKeyUp`.

use super::{arg, broadcaster, define_method};
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::convert::to_int32;
use crate::runtime::input::key_code;
use crate::runtime::property::PropFlags;
use crate::runtime::value::Value;

pub(super) fn install(avm: &mut Avm) {
    let key = avm.key_object().clone();
    for (name, code) in key_code::ALL {
        key.define(
            name,
            Value::Number(f64::from(code)),
            PropFlags::DONT_ENUM | PropFlags::DONT_DELETE | PropFlags::READ_ONLY,
        );
    }
    define_method(avm, &key, "isDown", is_down);
    define_method(avm, &key, "isToggled", is_toggled);
    define_method(avm, &key, "getCode", get_code);
    define_method(avm, &key, "getAscii", get_ascii);
    broadcaster::attach(avm, &key);
    avm.global().define("Key", Value::Object(key), PropFlags::DONT_ENUM);
}

/// `Key.isDown(code)`.
pub fn is_down(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let down = key_arg(avm, args)?.is_some_and(|code| avm.key_state().is_down(code));
    Ok(Value::Boolean(down))
}

/// `Key.isToggled(code)` - only caps lock has a toggle state.
pub fn is_toggled(avm: &mut Avm, _this: &Value, args: &[Value]) -> Result<Value> {
    let toggled = key_arg(avm, args)? == Some(key_code::CAPSLOCK) && avm.key_state().caps_lock();
    Ok(Value::Boolean(toggled))
}

/// `Key.getCode()` - key code of the last key pressed.
pub fn get_code(avm: &mut Avm, _this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(f64::from(avm.key_state().last_code())))
}

/// `Key.getAscii()` - character code of the last key pressed.
pub fn get_ascii(avm: &mut Avm, _this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(f64::from(avm.key_state().last_ascii())))
}

fn key_arg(avm: &mut Avm, args: &[Value]) -> Result<Option<u8>> {
    let code = to_int32(arg(args, 0).to_number_with(avm)?);
    Ok(u8::try_from(code).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swfplay_macros::assert_number;

    fn key(avm: &Avm) -> Value {
        avm.global().get("Key", 7).unwrap()
    }

    #[test]
    fn test_constants() {
        let avm = Avm::default();
        let key = key(&avm);
        let obj = key.as_object().unwrap();
        assert_number!(obj.get("LEFT", 7).unwrap(), 37.0);
        assert_number!(obj.get("DELETEKEY", 7).unwrap(), 46.0);
        assert!(obj.set("LEFT", Value::from(0.0), 7).is_err());
        assert!(obj.enumerable_keys(7).is_empty());
    }

    #[test]
    fn test_is_down_follows_input_queue() {
        let mut avm = Avm::default();
        let key = key(&avm);
        let sender = avm.input_sender();
        sender.key_down(key_code::SPACE, 32);
        assert_eq!(avm.process_input(), Ok(1));

        let space = [Value::from(32.0)];
        assert_eq!(avm.call_method(&key, "isDown", &space), Ok(Value::from(true)));
        assert_number!(avm.call_method(&key, "getCode", &[]).unwrap(), 32.0);
        assert_number!(avm.call_method(&key, "getAscii", &[]).unwrap(), 32.0);

        sender.key_down(key_code::LEFT, 0);
        sender.key_up(key_code::SPACE, 32);
        avm.process_input().unwrap();
        assert_eq!(avm.call_method(&key, "isDown", &space), Ok(Value::from(false)));
        assert_number!(avm.call_method(&key, "getCode", &[]).unwrap(), 37.0);
        assert_number!(avm.call_method(&key, "getAscii", &[]).unwrap(), 0.0);
        assert_eq!(avm.call_method(&key, "isDown", &[Value::from(-1.0)]), Ok(Value::from(false)));
    }

    #[test]
    fn test_is_toggled_caps_lock() {
        let mut avm = Avm::default();
        let key = key(&avm);
        avm.input_sender().key_down(key_code::CAPSLOCK, 0);
        avm.process_input().unwrap();
        let caps = [Value::from(20.0)];
        assert_eq!(avm.call_method(&key, "isToggled", &caps), Ok(Value::from(true)));
        assert_eq!(avm.call_method(&key, "isToggled", &[Value::from(37.0)]), Ok(Value::from(false)));
    }

    fn count_presses(avm: &mut Avm, this: &Value, _args: &[Value]) -> Result<Value> {
        let n = avm.get_member(this, "presses").to_number();
        let n = if n.is_nan() { 0.0 } else { n };
        avm.set_member(this, "presses", Value::Number(n + 1.0))?;
        Ok(Value::Undefined)
    }

    #[test]
    fn test_listeners_receive_key_down() {
        let mut avm = Avm::default();
        let key = key(&avm);
        let listener = avm.new_object();
        let handler = avm.native_function("onKeyDown", count_presses, None);
        listener.define("onKeyDown", Value::Function(handler), PropFlags::empty());
        avm.call_method(&key, "addListener", &[Value::Object(listener.clone())])
            .unwrap();

        let sender = avm.input_sender();
        sender.key_down(65, 97);
        sender.key_up(65, 97);
        sender.key_down(66, 98);
        assert_eq!(avm.process_input(), Ok(3));
        assert_number!(listener.get("presses", 7).unwrap(), 2.0);
    }

    /// Counts the press, then unregisters itself and the global `other`.
    fn press_and_unsubscribe(avm: &mut Avm, this: &Value, args: &[Value]) -> Result<Value> {
        count_presses(avm, this, args)?;
        let global = Value::Object(avm.global().clone());
        let key = avm.get_member(&global, "Key");
        let other = avm.get_member(&global, "other");
        let removed_self = avm.call_method(&key, "removeListener", &[this.clone()])?;
        let removed_other = avm.call_method(&key, "removeListener", &[other])?;
        avm.set_member(this, "removedSelf", removed_self)?;
        avm.set_member(this, "removedOther", removed_other)?;
        Ok(Value::Undefined)
    }

    #[test]
    fn test_listeners_removed_during_notify() {
        let mut avm = Avm::default();
        let key = key(&avm);
        let handler = Value::Function(avm.native_function("onKeyDown", press_and_unsubscribe, None));
        let first = avm.new_object();
        let other = avm.new_object();
        first.define("onKeyDown", handler.clone(), PropFlags::empty());
        other.define("onKeyDown", handler, PropFlags::empty());
        avm.global().define("other", Value::Object(other.clone()), PropFlags::empty());
        for listener in [&first, &other] {
            avm.call_method(&key, "addListener", &[Value::Object(listener.clone())])
                .unwrap();
        }

        // The round in progress still reaches `other`.
        avm.input_sender().key_down(65, 97);
        assert_eq!(avm.process_input(), Ok(1));
        assert_number!(first.get("presses", 7).unwrap(), 1.0);
        assert_number!(other.get("presses", 7).unwrap(), 1.0);
        assert_eq!(first.get("removedSelf", 7), Some(Value::from(true)));
        assert_eq!(first.get("removedOther", 7), Some(Value::from(true)));
        assert_eq!(other.get("removedSelf", 7), Some(Value::from(false)));

        avm.input_sender().key_down(66, 98);
        avm.process_input().unwrap();
        assert_number!(first.get("presses", 7).unwrap(), 1.0);
        assert_number!(other.get("presses", 7).unwrap(), 1.0);
    }
}
