//! Structural nodes: code blocks and the constructs that own them.

use std::fmt;

use serde::Serialize;

use super::{Node, StackEffect};

// ─── Code Blocks ──────────────────────────────────────────────────

/// How a code block is invoked and encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FrameKind {
    /// Continuation pushed inline.
    PushCont,
    /// Continuation pushed as a referenced cell.
    PushRefCont,
    /// Called through a cell reference.
    CallRef,
    /// Pushed as a continuation and called by value.
    CallX,
    /// True arm of a reference-encoded `IF`.
    IfRef,
    /// Arm of a reference-encoded `IFNOT`.
    IfNotRef,
    /// Reference-encoded `IFJMP` target.
    IfJmpRef,
    /// Reference-encoded `IFNOTJMP` target.
    IfNotJmpRef,
    /// Pushed as a cell reference.
    PushRef,
}

impl FrameKind {
    /// Assembly token naming this frame kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::PushCont => "PUSHCONT",
            FrameKind::PushRefCont => "PUSHREFCONT",
            FrameKind::CallRef => "CALLREF",
            FrameKind::CallX => "CALLX",
            FrameKind::IfRef => "IFREF",
            FrameKind::IfNotRef => "IFNOTREF",
            FrameKind::IfJmpRef => "IFJMPREF",
            FrameKind::IfNotJmpRef => "IFNOTJMPREF",
            FrameKind::PushRef => "PUSHREF",
        }
    }

    /// True when the frame itself encodes a conditional branch.
    pub fn is_branching(&self) -> bool {
        matches!(
            self,
            FrameKind::IfRef | FrameKind::IfNotRef | FrameKind::IfJmpRef | FrameKind::IfNotJmpRef
        )
    }

    /// The single-armed conditional a branching frame encodes.
    pub fn branch_kind(&self) -> Option<ConditionalKind> {
        match self {
            FrameKind::IfRef => Some(ConditionalKind::If),
            FrameKind::IfNotRef => Some(ConditionalKind::IfNot),
            FrameKind::IfJmpRef => Some(ConditionalKind::IfJmp),
            FrameKind::IfNotJmpRef => Some(ConditionalKind::IfNotJmp),
            _ => None,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered instruction sequence with a fixed frame kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    pub(super) kind: FrameKind,
    pub(super) instructions: Vec<Node>,
}

impl CodeBlock {
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn instructions(&self) -> &[Node] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Take the block apart. A rewritten block is rebuilt with
    /// `builder::code_block`, keeping the kind.
    pub fn into_instructions(self) -> (FrameKind, Vec<Node>) {
        (self.kind, self.instructions)
    }
}

// ─── Conditionals ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ConditionalKind {
    If,
    IfNot,
    IfJmp,
    IfNotJmp,
    IfElse,
    IfElseWithJmp,
}

impl ConditionalKind {
    pub fn is_two_armed(&self) -> bool {
        matches!(self, ConditionalKind::IfElse | ConditionalKind::IfElseWithJmp)
    }

    /// Whether taking the branch leaves the current continuation.
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            ConditionalKind::IfJmp | ConditionalKind::IfNotJmp | ConditionalKind::IfElseWithJmp
        )
    }

    /// Kind of the complementary conditional. Two-armed kinds are their
    /// own inverse (the arms are swapped instead).
    pub fn inverse(&self) -> ConditionalKind {
        match self {
            ConditionalKind::If => ConditionalKind::IfNot,
            ConditionalKind::IfNot => ConditionalKind::If,
            ConditionalKind::IfJmp => ConditionalKind::IfNotJmp,
            ConditionalKind::IfNotJmp => ConditionalKind::IfJmp,
            ConditionalKind::IfElse => ConditionalKind::IfElse,
            ConditionalKind::IfElseWithJmp => ConditionalKind::IfElseWithJmp,
        }
    }

    /// Branch instruction(s) following the arm blocks.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ConditionalKind::If => "IF",
            ConditionalKind::IfNot => "IFNOT",
            ConditionalKind::IfJmp => "IFJMP",
            ConditionalKind::IfNotJmp => "IFNOTJMP",
            ConditionalKind::IfElse => "IFELSE",
            ConditionalKind::IfElseWithJmp => "CONDSEL\nJMPX",
        }
    }
}

/// A guarded branch owning one arm (single-armed kinds) or two.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conditional {
    pub(super) kind: ConditionalKind,
    pub(super) true_body: CodeBlock,
    pub(super) false_body: Option<CodeBlock>,
}

impl Conditional {
    pub fn kind(&self) -> ConditionalKind {
        self.kind
    }

    pub fn true_body(&self) -> &CodeBlock {
        &self.true_body
    }

    /// Present exactly when the kind is two-armed.
    pub fn false_body(&self) -> Option<&CodeBlock> {
        self.false_body.as_ref()
    }

    /// The logical complement: fires its body exactly when `self` would
    /// not. Child blocks are moved, not copied, and keep their frame kind;
    /// a branching frame that no longer matches the kind prints as a plain
    /// continuation followed by the branch instruction.
    pub fn invert(self) -> Conditional {
        let kind = self.kind.inverse();
        match self.false_body {
            Some(false_body) => Conditional {
                kind,
                true_body: false_body,
                false_body: Some(self.true_body),
            },
            None => Conditional {
                kind,
                true_body: self.true_body,
                false_body: None,
            },
        }
    }

    pub fn into_parts(self) -> (ConditionalKind, CodeBlock, Option<CodeBlock>) {
        (self.kind, self.true_body, self.false_body)
    }
}

// ─── Loops ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RepeatKind {
    /// Run the body a counted number of times (count on the stack).
    Repeat,
    /// Run the body, then test the flag it leaves; stop when true.
    Until,
}

impl RepeatKind {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            RepeatKind::Repeat => "REPEAT",
            RepeatKind::Until => "UNTIL",
        }
    }
}

/// Single-body loop (`REPEAT` / `UNTIL`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepeatLoop {
    pub(super) kind: RepeatKind,
    pub(super) body: CodeBlock,
}

impl RepeatLoop {
    pub fn kind(&self) -> RepeatKind {
        self.kind
    }

    pub fn body(&self) -> &CodeBlock {
        &self.body
    }

    pub fn into_body(self) -> (RepeatKind, CodeBlock) {
        (self.kind, self.body)
    }
}

/// Condition-then-body loop (`WHILE` / `WHILEBRK`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WhileLoop {
    pub(super) condition: CodeBlock,
    pub(super) body: CodeBlock,
    pub(super) with_break: bool,
}

impl WhileLoop {
    pub fn condition(&self) -> &CodeBlock {
        &self.condition
    }

    pub fn body(&self) -> &CodeBlock {
        &self.body
    }

    /// Whether the body may leave the loop early (`WHILEBRK`).
    pub fn with_break(&self) -> bool {
        self.with_break
    }

    pub fn mnemonic(&self) -> &'static str {
        if self.with_break {
            "WHILEBRK"
        } else {
            "WHILE"
        }
    }

    pub fn into_parts(self) -> (CodeBlock, CodeBlock, bool) {
        (self.condition, self.body, self.with_break)
    }
}

// ─── Opaque Blocks ────────────────────────────────────────────────

/// A sub-block that generic passes treat as a unit with a declared effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Opaque {
    pub(super) block: CodeBlock,
    pub(super) take: u32,
    pub(super) ret: u32,
    pub(super) pure: bool,
}

impl Opaque {
    pub fn block(&self) -> &CodeBlock {
        &self.block
    }

    pub fn is_pure(&self) -> bool {
        self.pure
    }

    pub fn stack_effect(&self) -> StackEffect {
        StackEffect::new(self.take, self.ret)
    }

    pub fn into_block(self) -> CodeBlock {
        self.block
    }
}

// ─── Data Pushes ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DataKind {
    /// Push a cell reference.
    PushRef,
    /// Push a slice loaded from a referenced cell.
    PushRefSlice,
    /// Push an inline slice.
    PushSlice,
    /// A nested cell inside another data push's child block. It adds a
    /// reference to the enclosing cell and pushes nothing.
    Cell,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::PushRef => "PUSHREF",
            DataKind::PushRefSlice => "PUSHREFSLICE",
            DataKind::PushSlice => "PUSHSLICE",
            DataKind::Cell => ".cell",
        }
    }
}

/// Pushes a literal blob. When the literal encodes code, the code is
/// kept as a child block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataPush {
    pub(super) kind: DataKind,
    pub(super) data: String,
    pub(super) child: Option<CodeBlock>,
}

impl DataPush {
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn child(&self) -> Option<&CodeBlock> {
        self.child.as_ref()
    }
}
