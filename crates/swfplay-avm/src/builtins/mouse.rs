//! The `Mouse` object.
//!
//! `show` and `hide` are answered by the host and are also reachable as
//! native table entries 5/0 and 5/1. Listeners receive `onMouseDown`,
//! `onMouseUp` and `onMouseMove`.

use super::broadcaster;
use crate::error::Result;
use crate::runtime::context::Avm;
use crate::runtime::function::NativeFunction;
use crate::runtime::property::PropFlags;
use crate::runtime::value::Value;

const NATIVE_TABLE: u16 = 5;

pub(super) fn install(avm: &mut Avm) {
    let mouse = avm.mouse_object().clone();
    let natives: [(u16, &str, NativeFunction); 2] = [(0, "show", show), (1, "hide", hide)];
    for (minor, name, call) in natives {
        let method = avm.native_function(name, call, None);
        mouse.define(name, Value::Function(method.clone()), PropFlags::DONT_ENUM);
        avm.register_native(NATIVE_TABLE, minor, method);
    }
    broadcaster::attach(avm, &mouse);
    avm.global().define("Mouse", Value::Object(mouse), PropFlags::DONT_ENUM);
}

/// `Mouse.show()` - 1 when the host showed the pointer.
pub fn show(avm: &mut Avm, _this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(host_answer(avm, "Mouse.show"))
}

/// `Mouse.hide()` - 1 when the host hid the pointer.
pub fn hide(avm: &mut Avm, _this: &Value, _args: &[Value]) -> Result<Value> {
    Ok(host_answer(avm, "Mouse.hide"))
}

fn host_answer(avm: &mut Avm, request: &str) -> Value {
    let handled = avm.host_call(request, &[]).is_some_and(|reply| reply.to_boolean());
    Value::Number(if handled { 1.0 } else { 0.0 })
}
