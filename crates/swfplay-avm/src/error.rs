//! Error types for the scripting core.

use thiserror::Error;

/// Result type for scripting operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors raised while coercing values or executing actions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// `undefined` or `null` cannot become an object
    #[error("cannot convert {0} to an object")]
    TypeConversion(&'static str),

    /// Write or delete against a protected slot
    #[error("property '{0}' is protected")]
    ProtectionDenied(String),

    /// A `with` block would exceed the scope stack bound
    #[error("with stack is full ({limit} entries)")]
    ScopeBoundExceeded {
        /// The bound for the current bytecode version
        limit: usize,
    },

    /// Malformed instruction stream
    #[error("bytecode fault: {0}")]
    Bytecode(#[from] BytecodeFault),

    /// Attempt to call a value that is not a function
    #[error("{0} is not a function")]
    NotCallable(String),

    /// The per-tick action budget ran out
    #[error("action budget of {limit} exhausted")]
    InstructionLimit {
        /// The configured budget
        limit: u64,
    },

    /// The host raised the interrupt flag
    #[error("script interrupted by host")]
    Interrupted,

    /// Nested calls exceeded the recursion limit
    #[error("call depth exceeded {limit}")]
    CallDepthExceeded {
        /// The configured recursion limit
        limit: u32,
    },
}

impl Error {
    /// Whether the error must unwind through every nested call.
    ///
    /// Watchdog errors stop the whole script. Everything else only ends the
    /// thread that raised it.
    pub fn aborts_script(&self) -> bool {
        matches!(
            self,
            Error::InstructionLimit { .. } | Error::Interrupted | Error::CallDepthExceeded { .. }
        )
    }
}

/// Faults in the instruction stream. Each one ends the executing thread.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BytecodeFault {
    /// The action or its operand runs past the end of the executing range
    #[error("action at {pc} is truncated")]
    Truncated {
        /// Offset of the action
        pc: usize,
    },

    /// The operand does not decode for its action
    #[error("malformed operand for {action} at {pc}")]
    MalformedOperand {
        /// Offset of the action
        pc: usize,
        /// Mnemonic of the action
        action: &'static str,
    },

    /// A jump or block leaves the executing range
    #[error("jump from {pc} to {target} leaves the executing range")]
    InvalidJump {
        /// Offset of the action
        pc: usize,
        /// Requested target
        target: i64,
    },

    /// The action is not valid in the current calling convention
    #[error("{action} at {pc} is not valid in this calling context")]
    CallingConvention {
        /// Offset of the action
        pc: usize,
        /// Mnemonic of the action
        action: &'static str,
    },

    /// A register index outside the frame's register file
    #[error("register {index} at {pc} does not exist")]
    UnknownRegister {
        /// Offset of the action
        pc: usize,
        /// Requested register
        index: u8,
    },
}
