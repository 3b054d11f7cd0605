//! Assembler for instruction buffers.
//!
//! Used by tests, benchmarks and hosts that synthesize small scripts.
//!
//! ```
//! use swfplay_avm::vm::{ActionCode, ActionWriter, PushItem};
//!
//! let mut w = ActionWriter::new();
//! w.push(&[PushItem::Double(2.0), PushItem::Double(3.0)]);
//! w.action(ActionCode::Add);
//! let buffer = w.finish();
//! assert_eq!(buffer.as_bytes()[0], ActionCode::Push.byte());
//! ```

use super::action::{ActionBuffer, ActionCode, push_type};
use crate::runtime::function::PreloadFlags;

/// One item of a `Push` action.
#[derive(Debug, Clone, PartialEq)]
pub enum PushItem {
    /// Inline string
    String(String),
    /// 32-bit float
    Float(f32),
    /// null
    Null,
    /// undefined
    Undefined,
    /// Register contents
    Register(u8),
    /// Boolean
    Boolean(bool),
    /// 64-bit float
    Double(f64),
    /// 32-bit integer
    Integer(i32),
    /// Constant pool entry
    Constant(u16),
}

impl PushItem {
    /// Shorthand for an inline string.
    pub fn str(s: &str) -> Self {
        PushItem::String(s.to_string())
    }
}

/// A jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug)]
struct Fixup {
    operand_at: usize,
    next_pc: usize,
    label: Label,
}

/// Builds an [`ActionBuffer`] action by action.
#[derive(Debug, Default)]
pub struct ActionWriter {
    bytes: Vec<u8>,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
}

impl ActionWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    /// Emits an action without operand.
    pub fn action(&mut self, code: ActionCode) -> &mut Self {
        self.bytes.push(code.byte());
        self
    }

    /// Emits an action with a raw operand.
    pub fn action_with(&mut self, code: ActionCode, operand: &[u8]) -> &mut Self {
        self.raw(code.byte(), operand)
    }

    /// Emits an arbitrary opcode with a raw operand. Operands are only
    /// written for opcodes with the high bit set.
    pub fn raw(&mut self, opcode: u8, operand: &[u8]) -> &mut Self {
        self.bytes.push(opcode);
        if opcode & 0x80 != 0 {
            self.bytes.extend_from_slice(&(operand.len() as u16).to_le_bytes());
            self.bytes.extend_from_slice(operand);
        }
        self
    }

    /// Emits a `Push` of several items.
    pub fn push(&mut self, items: &[PushItem]) -> &mut Self {
        let mut operand = Vec::new();
        for item in items {
            match item {
                PushItem::String(s) => {
                    operand.push(push_type::STRING);
                    push_cstr(&mut operand, s);
                }
                PushItem::Float(f) => {
                    operand.push(push_type::FLOAT);
                    operand.extend_from_slice(&f.to_le_bytes());
                }
                PushItem::Null => operand.push(push_type::NULL),
                PushItem::Undefined => operand.push(push_type::UNDEFINED),
                PushItem::Register(r) => operand.extend_from_slice(&[push_type::REGISTER, *r]),
                PushItem::Boolean(b) => operand.extend_from_slice(&[push_type::BOOLEAN, u8::from(*b)]),
                PushItem::Double(d) => {
                    let bits = d.to_bits();
                    operand.push(push_type::DOUBLE);
                    operand.extend_from_slice(&((bits >> 32) as u32).to_le_bytes());
                    operand.extend_from_slice(&(bits as u32).to_le_bytes());
                }
                PushItem::Integer(i) => {
                    operand.push(push_type::INTEGER);
                    operand.extend_from_slice(&i.to_le_bytes());
                }
                PushItem::Constant(index) => match u8::try_from(*index) {
                    Ok(small) => operand.extend_from_slice(&[push_type::CONSTANT8, small]),
                    Err(_) => {
                        operand.push(push_type::CONSTANT16);
                        operand.extend_from_slice(&index.to_le_bytes());
                    }
                },
            }
        }
        self.action_with(ActionCode::Push, &operand)
    }

    /// Pushes a string.
    pub fn push_str(&mut self, s: &str) -> &mut Self {
        self.push(&[PushItem::str(s)])
    }

    /// Pushes a double.
    pub fn push_number(&mut self, n: f64) -> &mut Self {
        self.push(&[PushItem::Double(n)])
    }

    /// Emits a `ConstantPool`.
    pub fn constant_pool(&mut self, constants: &[&str]) -> &mut Self {
        let mut operand = (constants.len() as u16).to_le_bytes().to_vec();
        for constant in constants {
            push_cstr(&mut operand, constant);
        }
        self.action_with(ActionCode::ConstantPool, &operand)
    }

    /// Emits a `StoreRegister`.
    pub fn store_register(&mut self, index: u8) -> &mut Self {
        self.action_with(ActionCode::StoreRegister, &[index])
    }

    /// Allocates an unplaced label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Places `label` at the current offset.
    pub fn place(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.bytes.len());
        self
    }

    /// Emits a `Jump` to `label`.
    pub fn jump(&mut self, label: Label) -> &mut Self {
        self.branch(ActionCode::Jump, label)
    }

    /// Emits an `If` to `label`.
    pub fn branch_if(&mut self, label: Label) -> &mut Self {
        self.branch(ActionCode::If, label)
    }

    fn branch(&mut self, code: ActionCode, label: Label) -> &mut Self {
        self.action_with(code, &[0, 0]);
        let next_pc = self.bytes.len();
        self.fixups.push(Fixup {
            operand_at: next_pc - 2,
            next_pc,
            label,
        });
        self
    }

    /// Emits a `With` whose block is produced by `body`. The object must
    /// already be on the stack.
    pub fn with_block(&mut self, body: impl FnOnce(&mut Self)) -> &mut Self {
        self.action_with(ActionCode::With, &[0, 0]);
        let size_at = self.bytes.len() - 2;
        self.sized_block(size_at, body)
    }

    /// Emits a `DefineFunction` whose body is produced by `body`.
    pub fn define_function(
        &mut self,
        name: &str,
        params: &[&str],
        body: impl FnOnce(&mut Self),
    ) -> &mut Self {
        let mut operand = Vec::new();
        push_cstr(&mut operand, name);
        operand.extend_from_slice(&(params.len() as u16).to_le_bytes());
        for param in params {
            push_cstr(&mut operand, param);
        }
        operand.extend_from_slice(&[0, 0]);
        self.action_with(ActionCode::DefineFunction, &operand);
        let size_at = self.bytes.len() - 2;
        self.sized_block(size_at, body)
    }

    /// Emits a `DefineFunction2` whose body is produced by `body`.
    ///
    /// Each parameter is `(register, name)`; register 0 binds by name.
    pub fn define_function2(
        &mut self,
        name: &str,
        register_count: u8,
        flags: PreloadFlags,
        params: &[(u8, &str)],
        body: impl FnOnce(&mut Self),
    ) -> &mut Self {
        let mut operand = Vec::new();
        push_cstr(&mut operand, name);
        operand.extend_from_slice(&(params.len() as u16).to_le_bytes());
        operand.push(register_count);
        operand.extend_from_slice(&flags.bits().to_le_bytes());
        for (register, param) in params {
            operand.push(*register);
            push_cstr(&mut operand, param);
        }
        operand.extend_from_slice(&[0, 0]);
        self.action_with(ActionCode::DefineFunction2, &operand);
        let size_at = self.bytes.len() - 2;
        self.sized_block(size_at, body)
    }

    fn sized_block(&mut self, size_at: usize, body: impl FnOnce(&mut Self)) -> &mut Self {
        let start = self.bytes.len();
        body(self);
        let size = (self.bytes.len() - start) as u16;
        self.bytes[size_at..size_at + 2].copy_from_slice(&size.to_le_bytes());
        self
    }

    /// Emits `End` and resolves jumps.
    ///
    /// # Panics
    ///
    /// Panics if a jump refers to a label that was never placed.
    pub fn finish(mut self) -> ActionBuffer {
        self.action(ActionCode::End);
        self.finish_without_end()
    }

    /// Resolves jumps without appending `End`.
    ///
    /// # Panics
    ///
    /// Panics if a jump refers to a label that was never placed.
    pub fn finish_without_end(mut self) -> ActionBuffer {
        for fixup in &self.fixups {
            let Some(target) = self.labels[fixup.label.0] else {
                panic!("label {} was never placed", fixup.label.0);
            };
            let offset = (target as i64 - fixup.next_pc as i64) as i16;
            self.bytes[fixup.operand_at..fixup.operand_at + 2].copy_from_slice(&offset.to_le_bytes());
        }
        self.fixups.clear();
        ActionBuffer::from(self.bytes)
    }
}

fn push_cstr(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_encoding() {
        let mut w = ActionWriter::new();
        w.push(&[PushItem::str("a"), PushItem::Boolean(true), PushItem::Constant(300)]);
        let buffer = w.finish_without_end();
        assert_eq!(
            buffer.as_bytes(),
            &[0x96, 0x08, 0x00, 0, b'a', 0, 5, 1, 9, 0x2C, 0x01]
        );
    }

    #[test]
    fn test_backward_jump() {
        let mut w = ActionWriter::new();
        let top = w.new_label();
        w.place(top);
        w.action(ActionCode::Pop);
        w.jump(top);
        let buffer = w.finish_without_end();
        // Jump ends at 6, target 0
        assert_eq!(&buffer.as_bytes()[1..], &[0x99, 0x02, 0x00, 0xFA, 0xFF]);
    }

    #[test]
    fn test_with_block_size() {
        let mut w = ActionWriter::new();
        w.with_block(|w| {
            w.action(ActionCode::Pop).action(ActionCode::Pop);
        });
        let buffer = w.finish_without_end();
        assert_eq!(buffer.as_bytes(), &[0x94, 0x02, 0x00, 0x02, 0x00, 0x17, 0x17]);
    }

    #[test]
    fn test_define_function_layout() {
        let mut w = ActionWriter::new();
        w.define_function("f", &["x"], |w| {
            w.action(ActionCode::Return);
        });
        let buffer = w.finish_without_end();
        assert_eq!(
            buffer.as_bytes(),
            &[0x9B, 0x08, 0x00, b'f', 0, 0x01, 0x00, b'x', 0, 0x01, 0x00, 0x3E]
        );
    }

    #[test]
    #[should_panic(expected = "never placed")]
    fn test_unplaced_label_panics() {
        let mut w = ActionWriter::new();
        let label = w.new_label();
        w.jump(label);
        let _ = w.finish();
    }
}
