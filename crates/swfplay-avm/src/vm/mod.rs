//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `action` - Instruction buffers, action codes and operand decoding
//! - `thread` - The execution thread and its action handlers
//! - `writer` - An assembler for building buffers in code
//! - `limits` - Host-side interruption

pub mod action;
pub mod limits;
pub mod thread;
pub mod writer;

pub use action::{Action, ActionBuffer, ActionCode, OperandReader, push_type};
pub use limits::InterruptHandle;
pub use thread::{CallContext, ExecutionThread, ThreadState};
pub use writer::{ActionWriter, Label, PushItem};
