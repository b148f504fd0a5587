//! Content addressing for IR trees: a normalized tag stream hashed with
//! BLAKE3.
//!
//! Properties:
//! - Renaming a function does not change its hash.
//! - Debug locations and opcode comments do not change the hash.
//! - Any change to an instruction, operand, arity, frame kind or
//!   block structure does.
//! - A program hash covers its pragmas and its function hashes in order.

use std::fmt;

use super::block::{
    CodeBlock, Conditional, ConditionalKind, DataKind, DataPush, FrameKind, Opaque, RepeatKind,
    RepeatLoop, WhileLoop,
};
use super::program::{Function, FunctionKind, Program};
use super::visit::Visitor;
use super::{ControlFlow, GenOpcode, GlobalMode, GlobalOp, HardCode, StackOp, StackOpcode};

// ─── Serialization Format Tags ─────────────────────────────────────

const TAG_STACK: u8 = 0x01;
const TAG_GLOB: u8 = 0x02;
const TAG_OPCODE: u8 = 0x03;
const TAG_HARDCODE: u8 = 0x04;
const TAG_CONTROL: u8 = 0x05;
const TAG_OPAQUE: u8 = 0x06;
const TAG_DATA: u8 = 0x07;
const TAG_BLOCK: u8 = 0x08;
const TAG_BLOCK_END: u8 = 0x09;
const TAG_IF: u8 = 0x0A;
const TAG_REPEAT: u8 = 0x0B;
const TAG_WHILE: u8 = 0x0C;
const TAG_FUNCTION: u8 = 0x0D;
const TAG_PROGRAM: u8 = 0x0E;

const TAG_NONE: u8 = 0x00;
const TAG_SOME: u8 = 0x01;

// Version byte for hash stability
const HASH_VERSION: u8 = 1;

// ─── Content Hash ──────────────────────────────────────────────────

/// Identity of an IR tree: the BLAKE3 digest of its normalized encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(blake3::Hash);

/// Hex digits shown by the short form (40 bits).
const SHORT_DIGITS: usize = 10;

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// Leading hex digits, enough to tell functions of one program apart.
    pub fn to_short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_DIGITS);
        hex
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(#{})", self.to_short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

// ─── Encoder ───────────────────────────────────────────────────────

fn frame_tag(kind: FrameKind) -> u8 {
    match kind {
        FrameKind::PushCont => 0,
        FrameKind::PushRefCont => 1,
        FrameKind::CallRef => 2,
        FrameKind::CallX => 3,
        FrameKind::IfRef => 4,
        FrameKind::IfNotRef => 5,
        FrameKind::IfJmpRef => 6,
        FrameKind::IfNotJmpRef => 7,
        FrameKind::PushRef => 8,
    }
}

fn stack_tag(opcode: StackOpcode) -> u8 {
    match opcode {
        StackOpcode::Drop => 0,
        StackOpcode::PopS => 1,
        StackOpcode::BlkPush => 2,
        StackOpcode::PushS => 3,
        StackOpcode::Dup2 => 4,
        StackOpcode::Push2S => 5,
        StackOpcode::Push3S => 6,
        StackOpcode::Over2 => 7,
        StackOpcode::XchgS0 => 8,
        StackOpcode::XchgSS => 9,
        StackOpcode::BlkDrop2 => 10,
        StackOpcode::Reverse => 11,
        StackOpcode::Rot => 12,
        StackOpcode::RotRev => 13,
    }
}

fn conditional_tag(kind: ConditionalKind) -> u8 {
    match kind {
        ConditionalKind::If => 0,
        ConditionalKind::IfNot => 1,
        ConditionalKind::IfJmp => 2,
        ConditionalKind::IfNotJmp => 3,
        ConditionalKind::IfElse => 4,
        ConditionalKind::IfElseWithJmp => 5,
    }
}

fn function_tag(kind: FunctionKind) -> u8 {
    match kind {
        FunctionKind::Fragment => 0,
        FunctionKind::Macro => 1,
        FunctionKind::MainInternal => 2,
        FunctionKind::MainExternal => 3,
        FunctionKind::OnCodeUpgrade => 4,
        FunctionKind::OnTickTock => 5,
    }
}

/// Feeds a normalized byte stream of the visited tree into BLAKE3.
struct HashEncoder {
    hasher: blake3::Hasher,
}

impl HashEncoder {
    fn new() -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[HASH_VERSION]);
        Self { hasher }
    }

    fn finish(self) -> ContentHash {
        ContentHash(self.hasher.finalize())
    }

    fn write_u8(&mut self, value: u8) {
        self.hasher.update(&[value]);
    }

    fn write_u32(&mut self, value: u32) {
        self.hasher.update(&value.to_le_bytes());
    }

    fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    fn write_str(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    fn write_opt_str(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.write_u8(TAG_SOME);
                self.write_str(value);
            }
            None => self.write_u8(TAG_NONE),
        }
    }
}

impl Visitor for HashEncoder {
    fn visit_stack(&mut self, op: &StackOp) {
        self.write_u8(TAG_STACK);
        self.write_u8(stack_tag(op.opcode()));
        self.write_u8(op.i());
        self.write_u8(op.j());
        self.write_u8(op.k());
    }

    fn visit_glob(&mut self, op: &GlobalOp) {
        self.write_u8(TAG_GLOB);
        self.write_u8(match op.mode() {
            GlobalMode::Get => 0,
            GlobalMode::Set => 1,
            GlobalMode::Exchange => 2,
        });
        self.write_u8(op.index());
    }

    fn visit_opcode(&mut self, op: &GenOpcode) {
        self.write_u8(TAG_OPCODE);
        self.write_str(op.opcode());
        self.write_opt_str(op.arg());
        self.write_u32(op.take());
        self.write_u32(op.ret());
        self.write_bool(op.is_pure());
    }

    fn visit_hardcode(&mut self, code: &HardCode) {
        self.write_u8(TAG_HARDCODE);
        self.write_u32(code.lines().len() as u32);
        for line in code.lines() {
            self.write_str(line);
        }
        let effect = code.stack_effect();
        self.write_u32(effect.take);
        self.write_u32(effect.ret);
        self.write_bool(code.is_pure());
    }

    fn visit_control(&mut self, op: &ControlFlow) {
        self.write_u8(TAG_CONTROL);
        self.write_str(op.opcode());
        self.write_opt_str(op.arg());
        self.write_u32(op.take());
        self.write_u32(op.ret());
    }

    fn visit_opaque(&mut self, opaque: &Opaque) -> bool {
        self.write_u8(TAG_OPAQUE);
        let effect = opaque.stack_effect();
        self.write_u32(effect.take);
        self.write_u32(effect.ret);
        self.write_bool(opaque.is_pure());
        true
    }

    fn visit_data(&mut self, data: &DataPush) -> bool {
        self.write_u8(TAG_DATA);
        self.write_u8(match data.kind() {
            DataKind::PushRef => 0,
            DataKind::PushRefSlice => 1,
            DataKind::PushSlice => 2,
            DataKind::Cell => 3,
        });
        self.write_str(data.data());
        self.write_u8(if data.child().is_some() {
            TAG_SOME
        } else {
            TAG_NONE
        });
        true
    }

    fn visit_block(&mut self, block: &CodeBlock) -> bool {
        self.write_u8(TAG_BLOCK);
        self.write_u8(frame_tag(block.kind()));
        true
    }

    fn end_visit_block(&mut self, _block: &CodeBlock) {
        self.write_u8(TAG_BLOCK_END);
    }

    fn visit_if(&mut self, node: &Conditional) -> bool {
        self.write_u8(TAG_IF);
        self.write_u8(conditional_tag(node.kind()));
        true
    }

    fn visit_repeat(&mut self, node: &RepeatLoop) -> bool {
        self.write_u8(TAG_REPEAT);
        self.write_u8(match node.kind() {
            RepeatKind::Repeat => 0,
            RepeatKind::Until => 1,
        });
        true
    }

    fn visit_while(&mut self, node: &WhileLoop) -> bool {
        self.write_u8(TAG_WHILE);
        self.write_bool(node.with_break());
        true
    }

    fn visit_function(&mut self, function: &Function) -> bool {
        self.write_u8(TAG_FUNCTION);
        self.write_u8(function_tag(function.kind()));
        self.write_u32(function.take());
        self.write_u32(function.ret());
        true
    }
}

// ─── Public API ────────────────────────────────────────────────────

impl CodeBlock {
    pub fn content_hash(&self) -> ContentHash {
        let mut encoder = HashEncoder::new();
        self.accept(&mut encoder);
        encoder.finish()
    }
}

impl Function {
    /// Hash of the function's kind, arity and code. The name is excluded.
    pub fn content_hash(&self) -> ContentHash {
        let mut encoder = HashEncoder::new();
        self.accept(&mut encoder);
        encoder.finish()
    }
}

impl Program {
    pub fn content_hash(&self) -> ContentHash {
        let mut encoder = HashEncoder::new();
        encoder.write_u8(TAG_PROGRAM);
        encoder.write_u32(self.pragmas().len() as u32);
        for pragma in self.pragmas() {
            encoder.write_str(pragma);
        }
        encoder.write_u32(self.functions().len() as u32);
        for function in self.functions() {
            encoder.hasher.update(function.content_hash().as_bytes());
        }
        encoder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::*;
    use crate::ir::Node;

    fn body(lines: &[&str]) -> CodeBlock {
        code_block(
            FrameKind::PushCont,
            lines.iter().map(|l| Node::from(gen(l).unwrap())).collect(),
        )
    }

    fn func(name: &str, lines: &[&str]) -> Function {
        function(name, FunctionKind::Fragment, 2, 1, body(lines)).unwrap()
    }

    #[test]
    fn test_rename_keeps_hash() {
        let a = func("add", &["ADD"]);
        let b = func("plus", &["ADD"]);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_different_code_different_hash() {
        assert_ne!(
            func("f", &["ADD"]).content_hash(),
            func("f", &["SUB"]).content_hash()
        );
        assert_ne!(
            func("f", &["LSHIFT 2"]).content_hash(),
            func("f", &["LSHIFT 3"]).content_hash()
        );
    }

    #[test]
    fn test_comments_and_locations_ignored() {
        let plain = body(&["ADD"]);
        let annotated = code_block(
            FrameKind::PushCont,
            vec![
                make_loc("a.sol", 7).into(),
                gen("ADD;sum").unwrap().into(),
            ],
        );
        assert_eq!(plain.content_hash(), annotated.content_hash());
    }

    #[test]
    fn test_frame_kind_matters() {
        let a = code_block(FrameKind::PushCont, vec![gen("ADD").unwrap().into()]);
        let b = code_block(FrameKind::CallRef, vec![gen("ADD").unwrap().into()]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_block_boundaries_matter() {
        // [ADD, {SUB}] vs [{ADD, SUB}]
        let a = code_block(
            FrameKind::PushCont,
            vec![gen("ADD").unwrap().into(), body(&["SUB"]).into()],
        );
        let b = code_block(FrameKind::PushCont, vec![body(&["ADD", "SUB"]).into()]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_inversion_changes_hash() {
        let node = make_if(ConditionalKind::If, body(&["INC"]), None).unwrap();
        let a = code_block(FrameKind::PushCont, vec![node.clone().into()]);
        let b = code_block(FrameKind::PushCont, vec![node.invert().into()]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_program_hash_is_order_sensitive() {
        let p1 = Program::new(vec![], vec![func("a", &["ADD"]), func("b", &["SUB"])]);
        let p2 = Program::new(vec![], vec![func("b", &["SUB"]), func("a", &["ADD"])]);
        assert_ne!(p1.content_hash(), p2.content_hash());
        assert_eq!(p1.content_hash(), p1.clone().content_hash());
    }

    #[test]
    fn test_hash_display() {
        let hash = func("f", &["ADD"]).content_hash();
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hash.to_short(), hex[..10]);
        assert_eq!(hash.to_string(), format!("#{}", &hex[..10]));
        assert_eq!(format!("{:?}", hash), format!("ContentHash(#{})", &hex[..10]));
        assert_eq!(hash.as_bytes().len(), 32);
    }
}
