//! Variable resolution against the scope chain.
//!
//! Lookups walk the `with` stack innermost first, then the activation
//! record of the running function, then the scopes the function captured,
//! and finally the global object.

use super::object::ObjectRef;
use super::value::Value;
use crate::error::{Error, Result};

/// Maximum `with` depth for the given bytecode version.
pub const fn with_stack_limit(version: u8) -> usize {
    if version < 6 { 7 } else { 15 }
}

/// A `with` block scope.
#[derive(Debug, Clone)]
pub struct WithEntry {
    /// The scope object
    pub object: ObjectRef,
    /// Offset where the block ends
    pub end_pc: usize,
}

impl WithEntry {
    /// Creates an entry for a block ending at `end_pc`.
    pub fn new(object: ObjectRef, end_pc: usize) -> Self {
        Self { object, end_pc }
    }
}

/// Local frame of a running function.
#[derive(Debug, Clone)]
pub struct Activation {
    /// Named locals
    pub locals: ObjectRef,
    /// Local registers (second calling convention only)
    pub registers: Vec<Value>,
}

impl Activation {
    /// An activation with no locals.
    pub fn new(register_count: usize) -> Self {
        Self {
            locals: ObjectRef::with_proto(None),
            registers: vec![Value::Undefined; register_count],
        }
    }
}

/// The scope chain of one execution thread.
#[derive(Debug, Clone)]
pub struct Environment {
    global: ObjectRef,
    activation: Option<Activation>,
    captured: Vec<ObjectRef>,
    with_stack: Vec<WithEntry>,
    version: u8,
    this: Value,
}

impl Environment {
    /// A top-level environment; `this` is the global object.
    pub fn new(global: ObjectRef, version: u8) -> Self {
        Self {
            this: Value::Object(global.clone()),
            global,
            activation: None,
            captured: Vec::new(),
            with_stack: Vec::new(),
            version,
        }
    }

    /// An environment for a function call.
    pub fn for_call(
        global: ObjectRef,
        version: u8,
        this: Value,
        activation: Activation,
        captured: Vec<ObjectRef>,
    ) -> Self {
        Self {
            global,
            activation: Some(activation),
            captured,
            with_stack: Vec::new(),
            version,
            this,
        }
    }

    /// The bytecode version lookups are evaluated under.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The global object.
    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    /// The `this` binding.
    pub fn this(&self) -> &Value {
        &self.this
    }

    /// Whether a function activation is present.
    pub fn in_function(&self) -> bool {
        self.activation.is_some()
    }

    /// The activation record, inside a function.
    pub fn activation(&self) -> Option<&Activation> {
        self.activation.as_ref()
    }

    /// The activation record, inside a function.
    pub fn activation_mut(&mut self) -> Option<&mut Activation> {
        self.activation.as_mut()
    }

    /// Active `with` entries, outermost first.
    pub fn with_entries(&self) -> &[WithEntry] {
        &self.with_stack
    }

    /// Current `with` depth.
    pub fn with_depth(&self) -> usize {
        self.with_stack.len()
    }

    /// The `with` bound for this environment's version.
    pub fn with_limit(&self) -> usize {
        with_stack_limit(self.version)
    }

    /// Scope objects in search order, global excluded.
    pub fn scope_chain(&self) -> Vec<ObjectRef> {
        let mut chain: Vec<ObjectRef> = self
            .with_stack
            .iter()
            .rev()
            .map(|entry| entry.object.clone())
            .collect();
        if let Some(activation) = &self.activation {
            chain.push(activation.locals.clone());
        }
        chain.extend(self.captured.iter().cloned());
        chain
    }

    fn find_scope(&self, name: &str) -> Option<ObjectRef> {
        let with_scopes = self.with_stack.iter().rev().map(|entry| &entry.object);
        let local = self.activation.iter().map(|activation| &activation.locals);
        with_scopes
            .chain(local)
            .chain(self.captured.iter())
            .chain(std::iter::once(&self.global))
            .find(|scope| scope.has_property(name, self.version))
            .cloned()
    }

    /// Looks `name` up along the scope chain. The first scope that has the
    /// name wins.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        self.find_scope(name)?.get(name, self.version)
    }

    /// Assigns `name`.
    ///
    /// Overwrites the binding found by [`resolve`](Self::resolve)'s search.
    /// When the name is bound nowhere it is created in the activation
    /// record, or in the global object at top level; never in a `with`
    /// scope.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<()> {
        let scope = match self.find_scope(name) {
            Some(scope) => scope,
            None => self.innermost_writable().clone(),
        };
        scope.set(name, value, self.version)
    }

    fn innermost_writable(&self) -> &ObjectRef {
        match &self.activation {
            Some(activation) => &activation.locals,
            None => &self.global,
        }
    }

    /// Binds `name` directly in the activation record. Returns false at top
    /// level.
    pub fn declare_local(&mut self, name: &str, value: Value) -> bool {
        match &self.activation {
            Some(activation) => activation.locals.set(name, value, self.version).is_ok(),
            None => false,
        }
    }

    /// Deletes the first own binding of `name` along the chain. Returns
    /// false when the name is unbound or the slot refuses deletion.
    pub fn remove(&mut self, name: &str) -> bool {
        let with_scopes = self.with_stack.iter().rev().map(|entry| &entry.object);
        let local = self.activation.iter().map(|activation| &activation.locals);
        let owner = with_scopes
            .chain(local)
            .chain(self.captured.iter())
            .chain(std::iter::once(&self.global))
            .find(|scope| scope.has_own_property(name, self.version))
            .cloned();
        owner.is_some_and(|scope| scope.delete(name, self.version))
    }

    /// Pushes a `with` scope. Fails without touching the stack once the
    /// version bound is reached.
    pub fn push_with(&mut self, entry: WithEntry) -> Result<()> {
        let limit = self.with_limit();
        if self.with_stack.len() >= limit {
            return Err(Error::ScopeBoundExceeded { limit });
        }
        self.with_stack.push(entry);
        Ok(())
    }

    /// Pops the innermost `with` scope.
    pub fn pop_with(&mut self) -> Option<WithEntry> {
        self.with_stack.pop()
    }

    /// Pops every `with` scope whose block ends at or before `pc`.
    pub fn unwind_with(&mut self, pc: usize) {
        while self.with_stack.last().is_some_and(|entry| pc >= entry.end_pc) {
            self.with_stack.pop();
        }
    }

    /// Drops every `with` scope.
    pub fn clear_with(&mut self) {
        self.with_stack.clear();
    }
}
