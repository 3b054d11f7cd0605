//! Instruction buffers and action decoding.
//!
//! An action is one opcode byte. Opcodes with the high bit set are followed
//! by a little-endian `u16` length and that many operand bytes.

use crate::error::BytecodeFault;
use std::fmt;
use std::sync::Arc;
use swfplay_macros::action_codes;

action_codes! {
    /// Action codes known to the interpreter.
    pub enum ActionCode {
        End = 0x00,
        NextFrame = 0x04,
        PrevFrame = 0x05,
        Play = 0x06,
        Stop = 0x07,
        ToggleQuality = 0x08,
        StopSounds = 0x09,
        Add = 0x0A,
        Subtract = 0x0B,
        Multiply = 0x0C,
        Divide = 0x0D,
        Equals = 0x0E,
        Less = 0x0F,
        And = 0x10,
        Or = 0x11,
        Not = 0x12,
        StringEquals = 0x13,
        StringLength = 0x14,
        StringExtract = 0x15,
        Pop = 0x17,
        ToInteger = 0x18,
        GetVariable = 0x1C,
        SetVariable = 0x1D,
        SetTarget2 = 0x20,
        StringAdd = 0x21,
        GetProperty = 0x22,
        SetProperty = 0x23,
        CloneSprite = 0x24,
        RemoveSprite = 0x25,
        Trace = 0x26,
        StartDrag = 0x27,
        EndDrag = 0x28,
        StringLess = 0x29,
        Throw = 0x2A,
        CastOp = 0x2B,
        ImplementsOp = 0x2C,
        RandomNumber = 0x30,
        MBStringLength = 0x31,
        CharToAscii = 0x32,
        AsciiToChar = 0x33,
        GetTime = 0x34,
        MBStringExtract = 0x35,
        MBCharToAscii = 0x36,
        MBAsciiToChar = 0x37,
        Delete = 0x3A,
        Delete2 = 0x3B,
        DefineLocal = 0x3C,
        CallFunction = 0x3D,
        Return = 0x3E,
        Modulo = 0x3F,
        NewObject = 0x40,
        DefineLocal2 = 0x41,
        InitArray = 0x42,
        InitObject = 0x43,
        TypeOf = 0x44,
        TargetPath = 0x45,
        Enumerate = 0x46,
        Add2 = 0x47,
        Less2 = 0x48,
        Equals2 = 0x49,
        ToNumber = 0x4A,
        ToString = 0x4B,
        PushDuplicate = 0x4C,
        StackSwap = 0x4D,
        GetMember = 0x4E,
        SetMember = 0x4F,
        Increment = 0x50,
        Decrement = 0x51,
        CallMethod = 0x52,
        NewMethod = 0x53,
        InstanceOf = 0x54,
        Enumerate2 = 0x55,
        BitAnd = 0x60,
        BitOr = 0x61,
        BitXor = 0x62,
        BitLShift = 0x63,
        BitRShift = 0x64,
        BitURShift = 0x65,
        StrictEquals = 0x66,
        Greater = 0x67,
        StringGreater = 0x68,
        Extends = 0x69,
        GotoFrame = 0x81,
        GetUrl = 0x83,
        StoreRegister = 0x87,
        ConstantPool = 0x88,
        WaitForFrame = 0x8A,
        SetTarget = 0x8B,
        GotoLabel = 0x8C,
        WaitForFrame2 = 0x8D,
        DefineFunction2 = 0x8E,
        Try = 0x8F,
        With = 0x94,
        Push = 0x96,
        Jump = 0x99,
        GetUrl2 = 0x9A,
        DefineFunction = 0x9B,
        If = 0x9D,
        Call = 0x9E,
        GotoFrame2 = 0x9F,
    }
}

/// Push operand item types.
pub mod push_type {
    /// Null-terminated string
    pub const STRING: u8 = 0;
    /// 32-bit float
    pub const FLOAT: u8 = 1;
    /// null
    pub const NULL: u8 = 2;
    /// undefined
    pub const UNDEFINED: u8 = 3;
    /// Register index
    pub const REGISTER: u8 = 4;
    /// Boolean byte
    pub const BOOLEAN: u8 = 5;
    /// 64-bit float, high word first
    pub const DOUBLE: u8 = 6;
    /// 32-bit integer
    pub const INTEGER: u8 = 7;
    /// Constant pool index (u8)
    pub const CONSTANT8: u8 = 8;
    /// Constant pool index (u16)
    pub const CONSTANT16: u8 = 9;
}

/// An immutable, shareable instruction buffer.
#[derive(Clone)]
pub struct ActionBuffer {
    bytes: Arc<[u8]>,
}

impl ActionBuffer {
    /// Wraps raw bytes.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the action at `pc`. The action and its operand must end at
    /// or before `limit`.
    pub fn decode(&self, pc: usize, limit: usize) -> Result<Action<'_>, BytecodeFault> {
        let limit = limit.min(self.bytes.len());
        if pc >= limit {
            return Err(BytecodeFault::Truncated { pc });
        }
        let opcode = self.bytes[pc];
        let code = ActionCode::try_from(opcode).ok();

        if opcode & 0x80 == 0 {
            return Ok(Action {
                pc,
                opcode,
                code,
                operand: &[],
                next_pc: pc + 1,
            });
        }

        if pc + 3 > limit {
            return Err(BytecodeFault::Truncated { pc });
        }
        let length = usize::from(u16::from_le_bytes([self.bytes[pc + 1], self.bytes[pc + 2]]));
        let end = pc + 3 + length;
        if end > limit {
            return Err(BytecodeFault::Truncated { pc });
        }
        Ok(Action {
            pc,
            opcode,
            code,
            operand: &self.bytes[pc + 3..end],
            next_pc: end,
        })
    }
}

impl From<Vec<u8>> for ActionBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for ActionBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for ActionBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionBuffer({} bytes)", self.bytes.len())
    }
}

/// One decoded action.
#[derive(Debug, Clone, Copy)]
pub struct Action<'a> {
    /// Offset of the opcode
    pub pc: usize,
    /// The raw opcode
    pub opcode: u8,
    /// The known code, if any
    pub code: Option<ActionCode>,
    /// Operand bytes
    pub operand: &'a [u8],
    /// Offset of the following action
    pub next_pc: usize,
}

impl Action<'_> {
    /// The mnemonic, or `"Unknown"`.
    pub fn name(&self) -> &'static str {
        self.code.map_or("Unknown", ActionCode::name)
    }
}

/// Cursor over an operand. Every read past the end is a
/// [`BytecodeFault::MalformedOperand`].
#[derive(Debug)]
pub struct OperandReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    pc: usize,
    action: &'static str,
}

impl<'a> OperandReader<'a> {
    /// Reads the operand of `action`.
    pub fn new(action: &Action<'a>) -> Self {
        Self {
            bytes: action.operand,
            pos: 0,
            pc: action.pc,
            action: action.name(),
        }
    }

    /// The fault reported for this operand.
    pub fn fault(&self) -> BytecodeFault {
        BytecodeFault::MalformedOperand {
            pc: self.pc,
            action: self.action,
        }
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BytecodeFault> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(self.fault()),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], BytecodeFault> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads a byte.
    pub fn u8(&mut self) -> Result<u8, BytecodeFault> {
        Ok(self.array::<1>()?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn u16(&mut self) -> Result<u16, BytecodeFault> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    /// Reads a little-endian `i16`.
    pub fn i16(&mut self) -> Result<i16, BytecodeFault> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    /// Reads a little-endian `i32`.
    pub fn i32(&mut self) -> Result<i32, BytecodeFault> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    /// Reads a little-endian `f32`.
    pub fn f32(&mut self) -> Result<f32, BytecodeFault> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    /// Reads a double stored as two little-endian words, high word first.
    pub fn f64_swapped(&mut self) -> Result<f64, BytecodeFault> {
        let high = u32::from_le_bytes(self.array()?);
        let low = u32::from_le_bytes(self.array()?);
        Ok(f64::from_bits((u64::from(high) << 32) | u64::from(low)))
    }

    /// Reads a null-terminated string. Invalid UTF-8 is replaced.
    pub fn cstr(&mut self) -> Result<String, BytecodeFault> {
        let rest = &self.bytes[self.pos.min(self.bytes.len())..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(self.fault());
        };
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swfplay_macros::assert_fault;

    #[test]
    fn test_decode_simple_action() {
        let buffer = ActionBuffer::from(vec![0x0A, 0x00]);
        let action = buffer.decode(0, buffer.len()).unwrap();
        assert_eq!(action.code, Some(ActionCode::Add));
        assert!(action.operand.is_empty());
        assert_eq!(action.next_pc, 1);
    }

    #[test]
    fn test_decode_operand_action() {
        let buffer = ActionBuffer::from(vec![0x99, 0x02, 0x00, 0x05, 0x00, 0x00]);
        let action = buffer.decode(0, buffer.len()).unwrap();
        assert_eq!(action.code, Some(ActionCode::Jump));
        assert_eq!(action.operand, &[0x05, 0x00]);
        assert_eq!(action.next_pc, 5);
    }

    #[test]
    fn test_decode_unknown_code_keeps_length() {
        let buffer = ActionBuffer::from(vec![0xF0, 0x01, 0x00, 0xAA, 0x00]);
        let action = buffer.decode(0, buffer.len()).unwrap();
        assert_eq!(action.code, None);
        assert_eq!(action.name(), "Unknown");
        assert_eq!(action.next_pc, 4);
    }

    #[test]
    fn test_decode_truncated() {
        let buffer = ActionBuffer::from(vec![0x96, 0x05, 0x00, 0x00]);
        assert_fault!(buffer.decode(0, buffer.len()), BytecodeFault::Truncated { pc: 0 });
        let header_only = ActionBuffer::from(vec![0x96, 0x05]);
        assert_fault!(header_only.decode(0, 2), BytecodeFault::Truncated { pc: 0 });
        assert_fault!(header_only.decode(2, 2), BytecodeFault::Truncated { pc: 2 });
    }

    #[test]
    fn test_decode_respects_limit() {
        let buffer = ActionBuffer::from(vec![0x96, 0x01, 0x00, 0x03, 0x00]);
        assert!(buffer.decode(0, 4).is_ok());
        assert_fault!(buffer.decode(0, 3), BytecodeFault::Truncated { pc: 0 });
    }

    #[test]
    fn test_operand_reader() {
        let mut bytes = vec![0x07];
        bytes.extend_from_slice(&(-2i16).to_le_bytes());
        bytes.extend_from_slice(b"hi\0");
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        let buffer = ActionBuffer::from({
            let mut raw = vec![0x96];
            raw.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
            raw.extend_from_slice(&bytes);
            raw
        });
        let action = buffer.decode(0, buffer.len()).unwrap();
        let mut reader = OperandReader::new(&action);
        assert_eq!(reader.u8().unwrap(), 7);
        assert_eq!(reader.i16().unwrap(), -2);
        assert_eq!(reader.cstr().unwrap(), "hi");
        assert_eq!(reader.f32().unwrap(), 1.5);
        assert!(reader.is_empty());
        assert_fault!(reader.u8(), BytecodeFault::MalformedOperand { action: "Push", .. });
    }

    #[test]
    fn test_swapped_double() {
        let bits = 3.25f64.to_bits();
        let mut operand = Vec::new();
        operand.extend_from_slice(&((bits >> 32) as u32).to_le_bytes());
        operand.extend_from_slice(&(bits as u32).to_le_bytes());
        let mut raw = vec![0x96, operand.len() as u8, 0];
        raw.extend_from_slice(&operand);
        let buffer = ActionBuffer::from(raw);
        let action = buffer.decode(0, buffer.len()).unwrap();
        assert_eq!(OperandReader::new(&action).f64_swapped().unwrap(), 3.25);
    }

    #[test]
    fn test_unterminated_string() {
        let buffer = ActionBuffer::from(vec![0x96, 0x02, 0x00, b'a', b'b']);
        let action = buffer.decode(0, buffer.len()).unwrap();
        assert!(OperandReader::new(&action).cstr().is_err());
    }
}
