//! Script object representation.
//!
//! Objects are shared through [`ObjectRef`], an atomically reference counted
//! handle. The last handle to drop releases the object immediately, which
//! expires every [`WeakObjectRef`] observing it.

use super::listener::ListenerBroadcast;
use super::property::{PropFlags, PropertyAttributes};
use super::value::Value;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::fmt;
use std::sync::{Arc, Weak};

/// Prototype chains longer than this are treated as cyclic.
pub const MAX_PROTO_DEPTH: usize = 256;

/// A named slot.
#[derive(Debug, Clone)]
pub struct Slot {
    /// The stored value
    pub value: Value,
    /// Attributes gating access
    pub attributes: PropertyAttributes,
}

/// A script object: insertion-ordered slots and an optional prototype.
#[derive(Debug, Default)]
pub struct ScriptObject {
    slots: IndexMap<String, Slot, FxBuildHasher>,
    proto: Option<ObjectRef>,
    primitive: Option<Value>,
    listeners: Option<ListenerBroadcast>,
}

impl ScriptObject {
    /// Creates an empty object.
    pub fn new(proto: Option<ObjectRef>) -> Self {
        Self {
            proto,
            ..Self::default()
        }
    }

    /// Creates a wrapper object around a primitive.
    pub fn boxed(primitive: Value, proto: Option<ObjectRef>) -> Self {
        Self {
            proto,
            primitive: Some(primitive),
            ..Self::default()
        }
    }

    /// Number of own slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the object has no own slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The own slot named `name`, visible or not.
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    /// Own slot names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

/// Shared handle to a [`ScriptObject`].
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<RwLock<ScriptObject>>);

impl ObjectRef {
    /// Wraps an object in a new handle.
    pub fn new(object: ScriptObject) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Creates an empty object inheriting from `proto`.
    pub fn with_proto(proto: Option<ObjectRef>) -> Self {
        Self::new(ScriptObject::new(proto))
    }

    /// Locks the object for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, ScriptObject> {
        self.0.read()
    }

    /// Locks the object for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, ScriptObject> {
        self.0.write()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Creates a weak observer.
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    /// The prototype.
    pub fn proto(&self) -> Option<ObjectRef> {
        self.read().proto.clone()
    }

    /// Replaces the prototype.
    pub fn set_proto(&self, proto: Option<ObjectRef>) {
        self.write().proto = proto;
    }

    /// The boxed primitive, for wrapper objects.
    pub fn primitive(&self) -> Option<Value> {
        self.read().primitive.clone()
    }

    /// Replaces the boxed primitive.
    pub fn set_primitive(&self, primitive: Option<Value>) {
        self.write().primitive = primitive;
    }

    /// Reads an own slot visible to `version`.
    pub fn get_own(&self, name: &str, version: u8) -> Option<Value> {
        let obj = self.read();
        obj.slots
            .get(name)
            .filter(|slot| slot.attributes.is_visible(version))
            .map(|slot| slot.value.clone())
    }

    /// Reads a slot along the prototype chain.
    ///
    /// `__proto__` answers the prototype itself.
    pub fn get(&self, name: &str, version: u8) -> Option<Value> {
        if name == "__proto__" {
            return self.proto().map(Value::Object);
        }
        let mut current = Some(self.clone());
        let mut depth = 0;
        while let Some(obj) = current {
            let guard = obj.read();
            if let Some(slot) = guard.slots.get(name) {
                if slot.attributes.is_visible(version) {
                    return Some(slot.value.clone());
                }
            }
            depth += 1;
            if depth > MAX_PROTO_DEPTH {
                return None;
            }
            current = guard.proto.clone();
        }
        None
    }

    /// Whether an own slot is visible to `version`.
    pub fn has_own_property(&self, name: &str, version: u8) -> bool {
        self.read()
            .slots
            .get(name)
            .is_some_and(|slot| slot.attributes.is_visible(version))
    }

    /// Whether a slot is visible along the prototype chain.
    pub fn has_property(&self, name: &str, version: u8) -> bool {
        name == "__proto__" || self.get(name, version).is_some()
    }

    /// Assigns a slot.
    ///
    /// An own slot is overwritten unless read-only; a writable own slot
    /// hidden from `version` becomes visible. A `STATIC` slot on the prototype chain is
    /// written in place. Otherwise a new own slot is created.
    pub fn set(&self, name: &str, value: Value, version: u8) -> Result<()> {
        if name == "__proto__" {
            self.set_proto(value.as_object().cloned());
            return Ok(());
        }

        {
            let mut obj = self.write();
            if let Some(slot) = obj.slots.get_mut(name) {
                if !slot.attributes.is_writable() {
                    return Err(Error::ProtectionDenied(name.to_string()));
                }
                if !slot.attributes.is_visible(version) {
                    slot.attributes.clear_visible(version);
                }
                slot.value = value;
                return Ok(());
            }
        }

        let mut current = self.proto();
        let mut depth = 0;
        while let Some(proto) = current {
            let mut guard = proto.write();
            if let Some(slot) = guard.slots.get_mut(name) {
                if slot.attributes.is_visible(version) {
                    if !slot.attributes.is_writable() {
                        return Err(Error::ProtectionDenied(name.to_string()));
                    }
                    if slot.attributes.is_static() {
                        slot.value = value;
                        return Ok(());
                    }
                    break;
                }
            }
            depth += 1;
            if depth > MAX_PROTO_DEPTH {
                break;
            }
            current = guard.proto.clone();
        }

        self.write().slots.insert(
            name.to_string(),
            Slot {
                value,
                attributes: PropertyAttributes::default(),
            },
        );
        Ok(())
    }

    /// Creates or replaces an own slot with the given attributes, bypassing
    /// protection.
    pub fn define(&self, name: &str, value: Value, flags: PropFlags) {
        self.write().slots.insert(
            name.to_string(),
            Slot {
                value,
                attributes: PropertyAttributes::new(flags),
            },
        );
    }

    /// Removes an own slot. Refused for `DONT_DELETE` and for slots hidden
    /// from `version`.
    pub fn delete(&self, name: &str, version: u8) -> bool {
        let mut obj = self.write();
        let removable = obj.slots.get(name).is_some_and(|slot| {
            slot.attributes.is_visible(version) && slot.attributes.is_deletable()
        });
        if removable {
            obj.slots.shift_remove(name);
        }
        removable
    }

    /// The attributes of an own slot.
    pub fn attributes(&self, name: &str) -> Option<PropertyAttributes> {
        self.read().slots.get(name).map(|slot| slot.attributes)
    }

    /// Applies [`PropertyAttributes::set_flags`] to an own slot.
    pub fn set_flags(&self, name: &str, set: PropFlags, clear: PropFlags) -> bool {
        self.write()
            .slots
            .get_mut(name)
            .is_some_and(|slot| slot.attributes.set_flags(set, clear))
    }

    /// Locks the attributes of an own slot.
    pub fn lock_slot(&self, name: &str) -> bool {
        match self.write().slots.get_mut(name) {
            Some(slot) => {
                slot.attributes.lock();
                true
            }
            None => false,
        }
    }

    /// Own slot names in insertion order, hidden slots included.
    pub fn own_keys(&self) -> Vec<String> {
        self.read().slots.keys().cloned().collect()
    }

    /// Names a `for..in` loop visits: visible, enumerable slots of the
    /// object and its prototypes. A shadowing own slot hides the inherited
    /// one even when it is not enumerable.
    pub fn enumerable_keys(&self, version: u8) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut keys = Vec::new();
        let mut current = Some(self.clone());
        let mut depth = 0;
        while let Some(obj) = current {
            let guard = obj.read();
            for (name, slot) in &guard.slots {
                if !slot.attributes.is_visible(version) || !seen.insert(name.clone()) {
                    continue;
                }
                if slot.attributes.is_enumerable() {
                    keys.push(name.clone());
                }
            }
            depth += 1;
            if depth > MAX_PROTO_DEPTH {
                break;
            }
            current = guard.proto.clone();
        }
        keys
    }

    /// Whether `proto` appears on the prototype chain.
    pub fn inherits_from(&self, proto: &ObjectRef) -> bool {
        let mut current = self.proto();
        let mut depth = 0;
        while let Some(obj) = current {
            if obj.ptr_eq(proto) {
                return true;
            }
            depth += 1;
            if depth > MAX_PROTO_DEPTH {
                return false;
            }
            current = obj.proto();
        }
        false
    }

    /// A copy of the listener registry, for notification.
    pub fn listeners(&self) -> Option<ListenerBroadcast> {
        self.read().listeners.clone()
    }

    /// Attaches an empty listener registry unless one exists.
    pub fn init_listeners(&self) {
        let mut obj = self.write();
        if obj.listeners.is_none() {
            obj.listeners = Some(ListenerBroadcast::new());
        }
    }

    /// Runs `f` against the listener registry, if any.
    pub fn with_listeners<R>(&self, f: impl FnOnce(&mut ListenerBroadcast) -> R) -> Option<R> {
        self.write().listeners.as_mut().map(f)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:p})", Arc::as_ptr(&self.0))
    }
}

/// Weak observer of an object.
#[derive(Clone, Default)]
pub struct WeakObjectRef(Weak<RwLock<ScriptObject>>);

impl WeakObjectRef {
    /// The object, if it is still alive.
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    /// Whether the object has been released.
    pub fn is_expired(&self) -> bool {
        self.0.strong_count() == 0
    }

    /// Whether this observes `object`.
    pub fn ptr_eq(&self, object: &ObjectRef) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&object.0))
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_expired() {
            f.write_str("WeakObjectRef(expired)")
        } else {
            write!(f, "WeakObjectRef({:p})", self.0.as_ptr())
        }
    }
}
