//! Weak listener registries.
//!
//! Broadcasters hold their listeners weakly: a listener that is released
//! elsewhere silently stops receiving events.

use super::context::Avm;
use super::object::{ObjectRef, WeakObjectRef};
use super::value::Value;
use crate::error::Result;
use tracing::{debug, warn};

/// An ordered set of weakly held listeners.
#[derive(Debug, Clone, Default)]
pub struct ListenerBroadcast {
    entries: Vec<WeakObjectRef>,
}

impl ListenerBroadcast {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listeners that are still alive, in registration order.
    pub fn live(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.entries.iter().filter_map(WeakObjectRef::upgrade)
    }

    /// Registers a listener.
    ///
    /// Refused when the listener is already present, and also whenever any
    /// registered entry has expired. The second rule keeps long-standing
    /// player behaviour: a stale entry blocks new registrations until it is
    /// removed.
    pub fn add(&mut self, listener: &ObjectRef) -> bool {
        if self.entries.iter().any(|entry| entry.ptr_eq(listener)) {
            debug!("listener already registered");
            return false;
        }
        if self.entries.iter().any(WeakObjectRef::is_expired) {
            debug!("listener refused: registry holds an expired entry");
            return false;
        }
        self.entries.push(listener.downgrade());
        true
    }

    /// Removes every entry referring to `listener`. Expired entries stay.
    pub fn remove(&mut self, listener: &ObjectRef) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.ptr_eq(listener));
        self.entries.len() != before
    }

    /// Drops expired entries.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.is_expired());
        before - self.entries.len()
    }

    /// Calls `event` with no arguments on every live listener.
    pub fn notify(&self, avm: &mut Avm, event: &str) -> Result<usize> {
        self.notify_with(avm, event, &[])
    }

    /// Calls `event` on every live listener, in registration order.
    ///
    /// Walks this registry as it was when the call began, so listeners may
    /// register or unregister anyone during the walk. Expired entries and
    /// listeners without the method are skipped. A failing listener is
    /// logged and the walk continues, unless the error aborts the script.
    /// Returns how many listeners were invoked.
    pub fn notify_with(&self, avm: &mut Avm, event: &str, args: &[Value]) -> Result<usize> {
        let mut invoked = 0;
        for entry in &self.entries {
            let Some(listener) = entry.upgrade() else {
                continue;
            };
            let method = listener.get(event, avm.version());
            let Some(Value::Function(method)) = method else {
                continue;
            };
            invoked += 1;
            if let Err(err) = avm.call_function(&method, &Value::Object(listener), args) {
                if err.aborts_script() {
                    return Err(err);
                }
                warn!(event = %event, error = %err, "listener failed");
            }
        }
        Ok(invoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;
    use crate::runtime::function::{Callable, FunctionRef};
    use crate::runtime::property::PropFlags;

    fn count_call(avm: &mut Avm, this: &Value, _: &[Value]) -> Result<Value> {
        if let Some(obj) = this.as_object() {
            let hits = obj.get("hits", avm.version()).map_or(0.0, |v| v.to_number());
            obj.set("hits", Value::from(hits + 1.0), avm.version())?;
        }
        Ok(Value::Undefined)
    }

    fn counter(avm: &Avm) -> ObjectRef {
        let obj = avm.new_object();
        let method = FunctionRef::new(
            Callable::Native {
                name: "onEvent".into(),
                call: count_call,
                construct: None,
            },
            None,
        );
        obj.define("onEvent", Value::Function(method), PropFlags::empty());
        obj
    }

    fn hits(obj: &ObjectRef) -> f64 {
        obj.get("hits", 7).map_or(0.0, |v| v.to_number())
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let a = ObjectRef::with_proto(None);
        let mut registry = ListenerBroadcast::new();
        assert!(registry.add(&a));
        assert!(!registry.add(&a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_refused_while_an_entry_is_expired() {
        let mut registry = ListenerBroadcast::new();
        let gone = ObjectRef::with_proto(None);
        registry.add(&gone);
        drop(gone);

        let fresh = ObjectRef::with_proto(None);
        assert!(!registry.add(&fresh));
        assert_eq!(registry.prune(), 1);
        assert!(registry.add(&fresh));
    }

    #[test]
    fn test_remove() {
        let a = ObjectRef::with_proto(None);
        let b = ObjectRef::with_proto(None);
        let mut registry = ListenerBroadcast::new();
        registry.add(&a);
        registry.add(&b);
        assert!(registry.remove(&a));
        assert!(!registry.remove(&a));
        assert_eq!(registry.live().count(), 1);
    }

    #[test]
    fn test_notify_skips_expired() {
        let mut avm = Avm::new(VmConfig::default());
        let dead = counter(&avm);
        let live = counter(&avm);
        let mut registry = ListenerBroadcast::new();
        registry.add(&dead);
        registry.add(&live);
        drop(dead);

        assert_eq!(registry.notify(&mut avm, "onEvent"), Ok(1));
        assert_eq!(hits(&live), 1.0);
    }

    #[test]
    fn test_notify_skips_listeners_without_method() {
        let mut avm = Avm::new(VmConfig::default());
        let plain = avm.new_object();
        let mut registry = ListenerBroadcast::new();
        registry.add(&plain);
        assert_eq!(registry.notify(&mut avm, "onEvent"), Ok(0));
    }
}
