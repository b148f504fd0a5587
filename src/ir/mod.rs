//! Instruction-level IR for the TVM backend.
//!
//! Generated code is a tree: a `Program` owns `Function`s, a function owns
//! one `CodeBlock`, and a block owns an ordered list of `Node`s. Leaf nodes
//! map 1:1 to machine instructions. Structural nodes (`Conditional`, loops,
//! `Opaque`, nested `CodeBlock`s) carry their child blocks directly, since
//! the machine has no jump targets, only nested continuations.
//!
//! Nodes are built through the factories in [`builder`], which enforce the
//! machine's operand ranges, and are never mutated afterwards. Passes walk
//! the tree through [`visit::Visitor`].

pub mod block;
pub mod builder;
pub mod error;
pub mod hash;
pub mod opcode;
pub mod print;
pub mod program;
pub mod visit;

use std::fmt;

use serde::Serialize;

pub use block::{
    CodeBlock, Conditional, ConditionalKind, DataKind, DataPush, FrameKind, Opaque, RepeatKind,
    RepeatLoop, WhileLoop,
};
pub use error::IrError;
pub use opcode::{MnemonicLine, OpcodeInfo, StackEffect};
pub use program::{Function, FunctionKind, Program};
pub use visit::Visitor;

// ─── Node ─────────────────────────────────────────────────────────

/// A single IR node. The set of kinds is closed; passes dispatch on it
/// with `match` (or through [`Visitor`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Node {
    // ── Leaves ──
    Loc(DebugLoc),
    Stack(StackOp),
    Glob(GlobalOp),
    Opcode(GenOpcode),
    HardCode(HardCode),
    Control(ControlFlow),

    // ── Containers ──
    Opaque(Opaque),
    Data(DataPush),
    Block(CodeBlock),
    If(Conditional),
    Repeat(RepeatLoop),
    While(WhileLoop),
}

impl Node {
    /// Stack effect of the node, when it is fixed by the node itself.
    ///
    /// Structural nodes return `None`: their effect depends on how the
    /// frame is invoked and on their children.
    pub fn stack_effect(&self) -> Option<StackEffect> {
        match self {
            Node::Loc(_) => Some(StackEffect::new(0, 0)),
            Node::Stack(op) => Some(op.stack_effect()),
            Node::Glob(op) => Some(op.stack_effect()),
            Node::Opcode(op) => Some(op.stack_effect()),
            Node::HardCode(code) => Some(code.stack_effect()),
            Node::Control(op) => Some(op.stack_effect()),
            Node::Opaque(opaque) => Some(opaque.stack_effect()),
            Node::Data(data) if data.kind() == DataKind::Cell => Some(StackEffect::new(0, 0)),
            Node::Data(_) => Some(StackEffect::new(0, 1)),
            Node::Block(_) | Node::If(_) | Node::Repeat(_) | Node::While(_) => None,
        }
    }

    /// Whether the node has no observable effect beyond its stack effect.
    pub fn is_pure(&self) -> bool {
        match self {
            Node::Loc(_) | Node::Stack(_) | Node::Data(_) => true,
            Node::Glob(op) => op.mode() == GlobalMode::Get,
            Node::Opcode(op) => op.is_pure(),
            Node::HardCode(code) => code.is_pure(),
            Node::Opaque(opaque) => opaque.is_pure(),
            Node::Control(_) | Node::Block(_) | Node::If(_) | Node::Repeat(_) | Node::While(_) => {
                false
            }
        }
    }

    /// True for kinds that own child blocks.
    pub fn is_structural(&self) -> bool {
        match self {
            Node::Data(data) => data.child().is_some(),
            Node::Opaque(_) | Node::Block(_) | Node::If(_) | Node::Repeat(_) | Node::While(_) => {
                true
            }
            _ => false,
        }
    }
}

macro_rules! impl_from_for_node {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Self {
                    Node::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_node! {
    DebugLoc => Loc,
    StackOp => Stack,
    GlobalOp => Glob,
    GenOpcode => Opcode,
    HardCode => HardCode,
    ControlFlow => Control,
    Opaque => Opaque,
    DataPush => Data,
    CodeBlock => Block,
    Conditional => If,
    RepeatLoop => Repeat,
    WhileLoop => While,
}

// ─── Debug Location ───────────────────────────────────────────────

/// Source position attached to the instructions that follow it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DebugLoc {
    file: String,
    line: u32,
}

impl DebugLoc {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for DebugLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".loc {}, {}", self.file, self.line)
    }
}

// ─── Stack Operations ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StackOpcode {
    /// Drop `i` items.
    Drop,
    /// Pop the top into slot `i`.
    PopS,
    /// Push `i` copies of the block starting at slot `j`.
    BlkPush,
    /// Push a copy of slot `i`.
    PushS,
    Dup2,
    /// Push copies of slots `i`, `j`.
    Push2S,
    /// Push copies of slots `i`, `j`, `k`.
    Push3S,
    Over2,
    /// Exchange the top with slot `i`.
    XchgS0,
    /// Exchange slots `i` and `j`.
    XchgSS,
    /// Drop `i` items below the top `j` items.
    BlkDrop2,
    /// Reverse `i` items starting at slot `j`.
    Reverse,
    Rot,
    RotRev,
}

/// A stack-manipulation instruction with up to three small operands.
/// Unused operands are zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StackOp {
    opcode: StackOpcode,
    i: u8,
    j: u8,
    k: u8,
}

impl StackOp {
    pub(crate) fn new(opcode: StackOpcode, i: u8, j: u8, k: u8) -> Self {
        Self { opcode, i, j, k }
    }

    pub fn opcode(&self) -> StackOpcode {
        self.opcode
    }

    pub fn i(&self) -> u8 {
        self.i
    }

    pub fn j(&self) -> u8 {
        self.j
    }

    pub fn k(&self) -> u8 {
        self.k
    }

    /// Net stack effect. Items that are only rearranged are not counted.
    pub fn stack_effect(&self) -> StackEffect {
        let (i, j) = (self.i as u32, self.j as u32);
        match self.opcode {
            StackOpcode::Drop => StackEffect::new(i, 0),
            StackOpcode::PopS => StackEffect::new(1, 0),
            StackOpcode::BlkPush => StackEffect::new(0, i),
            StackOpcode::PushS => StackEffect::new(0, 1),
            StackOpcode::Dup2 | StackOpcode::Over2 | StackOpcode::Push2S => StackEffect::new(0, 2),
            StackOpcode::Push3S => StackEffect::new(0, 3),
            StackOpcode::BlkDrop2 => StackEffect::new(i + j, j),
            StackOpcode::XchgS0
            | StackOpcode::XchgSS
            | StackOpcode::Reverse
            | StackOpcode::Rot
            | StackOpcode::RotRev => StackEffect::new(0, 0),
        }
    }
}

impl fmt::Display for StackOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (i, j, k) = (self.i, self.j, self.k);
        match self.opcode {
            StackOpcode::Drop => match i {
                1 => write!(f, "DROP"),
                2..=15 => write!(f, "BLKDROP {}", i),
                _ => write!(f, "PUSHINT {}\nDROPX", i),
            },
            StackOpcode::PopS => match i {
                1 => write!(f, "NIP"),
                _ => write!(f, "POP s{}", i),
            },
            StackOpcode::BlkPush => write!(f, "BLKPUSH {}, {}", i, j),
            StackOpcode::PushS => match i {
                0 => write!(f, "DUP"),
                1 => write!(f, "OVER"),
                _ => write!(f, "PUSH s{}", i),
            },
            StackOpcode::Dup2 => write!(f, "DUP2"),
            StackOpcode::Push2S => write!(f, "PUSH2 s{}, s{}", i, j),
            StackOpcode::Push3S => write!(f, "PUSH3 s{}, s{}, s{}", i, j, k),
            StackOpcode::Over2 => write!(f, "OVER2"),
            StackOpcode::XchgS0 => match i {
                1 => write!(f, "SWAP"),
                _ => write!(f, "XCHG s{}", i),
            },
            StackOpcode::XchgSS => write!(f, "XCHG s{}, s{}", i, j),
            StackOpcode::BlkDrop2 => write!(f, "BLKDROP2 {}, {}", i, j),
            StackOpcode::Reverse => write!(f, "REVERSE {}, {}", i, j),
            StackOpcode::Rot => write!(f, "ROT"),
            StackOpcode::RotRev => write!(f, "ROTREV"),
        }
    }
}

// ─── Global Variables ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum GlobalMode {
    /// Push the global's value.
    Get,
    /// Pop the top into the global.
    Set,
    /// Store the top into the global and push its previous value.
    Exchange,
}

/// Read and/or write of a global-variable slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct GlobalOp {
    mode: GlobalMode,
    index: u8,
}

/// Largest global index with a single-instruction encoding.
const SHORT_GLOBAL: u8 = 31;

impl GlobalOp {
    pub(crate) fn new(mode: GlobalMode, index: u8) -> Self {
        Self { mode, index }
    }

    pub fn mode(&self) -> GlobalMode {
        self.mode
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn stack_effect(&self) -> StackEffect {
        match self.mode {
            GlobalMode::Get => StackEffect::new(0, 1),
            GlobalMode::Set => StackEffect::new(1, 0),
            GlobalMode::Exchange => StackEffect::new(1, 1),
        }
    }

    fn write_get(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index <= SHORT_GLOBAL {
            write!(f, "GETGLOB {}", self.index)
        } else {
            write!(f, "PUSHINT {}\nGETGLOBVAR", self.index)
        }
    }

    fn write_set(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index <= SHORT_GLOBAL {
            write!(f, "SETGLOB {}", self.index)
        } else {
            write!(f, "PUSHINT {}\nSETGLOBVAR", self.index)
        }
    }
}

impl fmt::Display for GlobalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            GlobalMode::Get => self.write_get(f),
            GlobalMode::Set => self.write_set(f),
            GlobalMode::Exchange => {
                self.write_get(f)?;
                writeln!(f)?;
                writeln!(f, "SWAP")?;
                self.write_set(f)
            }
        }
    }
}

// ─── Generic Opcodes ──────────────────────────────────────────────

/// A mnemonic-driven instruction with resolved arity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenOpcode {
    opcode: String,
    arg: Option<String>,
    comment: Option<String>,
    take: u32,
    ret: u32,
    pure: bool,
}

impl GenOpcode {
    pub(crate) fn new(line: MnemonicLine, info: OpcodeInfo) -> Self {
        Self {
            opcode: line.opcode,
            arg: line.arg,
            comment: line.comment,
            take: info.take,
            ret: info.ret,
            pure: info.pure,
        }
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn take(&self) -> u32 {
        self.take
    }

    pub fn ret(&self) -> u32 {
        self.ret
    }

    pub fn is_pure(&self) -> bool {
        self.pure
    }

    pub fn stack_effect(&self) -> StackEffect {
        StackEffect::new(self.take, self.ret)
    }

    /// `OPCODE [ARG]` without the comment.
    pub fn instruction(&self) -> String {
        join_instruction(&self.opcode, self.arg.as_deref())
    }

    /// `OPCODE [ARG] [;COMMENT]`.
    pub fn full_opcode(&self) -> String {
        with_comment(self.instruction(), self.comment.as_deref())
    }
}

impl fmt::Display for GenOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_opcode())
    }
}

fn join_instruction(opcode: &str, arg: Option<&str>) -> String {
    match arg {
        Some(arg) => format!("{} {}", opcode, arg),
        None => opcode.to_string(),
    }
}

fn with_comment(mut text: String, comment: Option<&str>) -> String {
    if let Some(comment) = comment {
        text.push_str(" ;");
        text.push_str(comment);
    }
    text
}

// ─── Control Flow ─────────────────────────────────────────────────

/// Return and throw instructions: `RET`, `IFRET`, `IFNOTRET`, `THROW*`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ControlFlow {
    opcode: String,
    arg: Option<String>,
    comment: Option<String>,
    take: u32,
    ret: u32,
}

impl ControlFlow {
    pub(crate) fn new(line: MnemonicLine, take: u32, ret: u32) -> Self {
        Self {
            opcode: line.opcode,
            arg: line.arg,
            comment: line.comment,
            take,
            ret,
        }
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn take(&self) -> u32 {
        self.take
    }

    pub fn ret(&self) -> u32 {
        self.ret
    }

    pub fn stack_effect(&self) -> StackEffect {
        StackEffect::new(self.take, self.ret)
    }

    pub fn instruction(&self) -> String {
        join_instruction(&self.opcode, self.arg.as_deref())
    }

    pub fn full_opcode(&self) -> String {
        with_comment(self.instruction(), self.comment.as_deref())
    }
}

impl fmt::Display for ControlFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_opcode())
    }
}

// ─── Hard-coded Assembly ──────────────────────────────────────────

/// Assembly lines passed through verbatim with a declared stack effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HardCode {
    lines: Vec<String>,
    take: u32,
    ret: u32,
    pure: bool,
}

impl HardCode {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_pure(&self) -> bool {
        self.pure
    }

    pub fn stack_effect(&self) -> StackEffect {
        StackEffect::new(self.take, self.ret)
    }
}
