//! Validated node factories.
//!
//! These are the only sanctioned way to build IR nodes. Each factory checks
//! its operands against the machine's compact encodings and returns
//! `IrError::InvariantViolation` when a request cannot be encoded.
//! Degenerate requests are normalized here (a one-item block push is a
//! plain push), so downstream passes never see two spellings of the same
//! instruction.

use super::block::{
    CodeBlock, Conditional, ConditionalKind, DataKind, DataPush, FrameKind, Opaque, RepeatKind,
    RepeatLoop, WhileLoop,
};
use super::error::IrError;
use super::opcode::{self, MnemonicLine};
use super::program::{Function, FunctionKind};
use super::{
    ControlFlow, DebugLoc, GenOpcode, GlobalMode, GlobalOp, HardCode, Node, StackOp, StackOpcode,
};

/// Largest stack slot addressable by a long-form stack instruction.
pub const MAX_SLOT: u32 = 255;
/// Largest operand of the compact (nibble-encoded) stack instructions.
pub const MAX_SHORT_SLOT: u32 = 15;
/// Largest global-variable index. Index 0 is reserved by the machine.
pub const MAX_GLOBAL: u32 = 254;

fn check_range(
    construct: &'static str,
    operand: &str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<u8, IrError> {
    if value < min || value > max {
        return Err(IrError::invariant(
            construct,
            format!("{} {} outside [{}, {}]", operand, value, min, max),
        ));
    }
    // max <= 255 for every caller
    u8::try_from(value).map_err(|_| {
        IrError::invariant(construct, format!("{} {} does not fit a byte", operand, value))
    })
}

// ─── Generic Opcodes ──────────────────────────────────────────────

/// Build a generic opcode from `MNEMONIC [ARG][;COMMENT]`, resolving its
/// stack effect.
pub fn gen(line: &str) -> Result<GenOpcode, IrError> {
    let parsed = MnemonicLine::parse(line);
    let info = opcode::resolve_parsed(&parsed, line)?;
    Ok(GenOpcode::new(parsed, info))
}

/// Hard-coded assembly with a declared stack effect.
pub fn make_hardcode(
    lines: Vec<String>,
    take: u32,
    ret: u32,
    pure: bool,
) -> Result<HardCode, IrError> {
    if lines.is_empty() {
        return Err(IrError::invariant("make_hardcode", "no assembly lines"));
    }
    Ok(HardCode {
        lines,
        take,
        ret,
        pure,
    })
}

pub fn make_loc(file: impl Into<String>, line: u32) -> DebugLoc {
    DebugLoc {
        file: file.into(),
        line,
    }
}

// ─── Stack Operations ─────────────────────────────────────────────

/// Push a copy of slot `i` (`DUP`, `OVER`, `PUSH s(i)`).
pub fn make_push(i: u32) -> Result<StackOp, IrError> {
    let i = check_range("make_push", "index", i, 0, MAX_SLOT)?;
    Ok(StackOp::new(StackOpcode::PushS, i, 0, 0))
}

/// Pop the top into slot `i`.
pub fn make_pop(i: u32) -> Result<StackOp, IrError> {
    let i = check_range("make_pop", "index", i, 1, MAX_SLOT)?;
    Ok(StackOp::new(StackOpcode::PopS, i, 0, 0))
}

/// Drop the top `n` items.
pub fn make_drop(n: u32) -> Result<StackOp, IrError> {
    let n = check_range("make_drop", "count", n, 1, MAX_SLOT)?;
    Ok(StackOp::new(StackOpcode::Drop, n, 0, 0))
}

/// Exchange the top with slot `i`.
pub fn make_xchg_s(i: u32) -> Result<StackOp, IrError> {
    let i = check_range("make_xchg_s", "index", i, 1, MAX_SLOT)?;
    Ok(StackOp::new(StackOpcode::XchgS0, i, 0, 0))
}

/// Exchange slots `i` and `j`.
pub fn make_xchg_s_s(i: u32, j: u32) -> Result<StackOp, IrError> {
    let i = check_range("make_xchg_s_s", "first index", i, 0, MAX_SLOT)?;
    let j = check_range("make_xchg_s_s", "second index", j, 0, MAX_SLOT)?;
    Ok(StackOp::new(StackOpcode::XchgSS, i, j, 0))
}

/// Push `qty` items starting at slot `index`. A single item is a plain push.
pub fn make_blkpush(qty: u32, index: u32) -> Result<StackOp, IrError> {
    let qty = check_range("make_blkpush", "qty", qty, 1, MAX_SHORT_SLOT)?;
    let index = check_range("make_blkpush", "index", index, 0, MAX_SHORT_SLOT)?;
    if qty == 1 {
        log::trace!("BLKPUSH 1, {} normalized to a single push", index);
        return make_push(index as u32);
    }
    Ok(StackOp::new(StackOpcode::BlkPush, qty, index, 0))
}

pub fn make_push2(i: u32, j: u32) -> Result<StackOp, IrError> {
    let i = check_range("make_push2", "first index", i, 0, MAX_SHORT_SLOT)?;
    let j = check_range("make_push2", "second index", j, 0, MAX_SHORT_SLOT)?;
    Ok(StackOp::new(StackOpcode::Push2S, i, j, 0))
}

pub fn make_push3(i: u32, j: u32, k: u32) -> Result<StackOp, IrError> {
    let i = check_range("make_push3", "first index", i, 0, MAX_SHORT_SLOT)?;
    let j = check_range("make_push3", "second index", j, 0, MAX_SHORT_SLOT)?;
    let k = check_range("make_push3", "third index", k, 0, MAX_SHORT_SLOT)?;
    Ok(StackOp::new(StackOpcode::Push3S, i, j, k))
}

/// Drop `dropped` items lying below the top `left` items. Dropping the
/// single item under the top is `POP s1`.
pub fn make_blkdrop2(dropped: u32, left: u32) -> Result<StackOp, IrError> {
    let dropped = check_range("make_blkdrop2", "dropped", dropped, 1, MAX_SHORT_SLOT)?;
    let left = check_range("make_blkdrop2", "left", left, 0, MAX_SHORT_SLOT)?;
    if dropped == 1 && left == 1 {
        log::trace!("BLKDROP2 1, 1 normalized to POP s1");
        return make_pop(1);
    }
    Ok(StackOp::new(StackOpcode::BlkDrop2, dropped, left, 0))
}

/// Reverse `i` items starting at slot `j`.
pub fn make_reverse(i: u32, j: u32) -> Result<StackOp, IrError> {
    let i = check_range("make_reverse", "count", i, 0, MAX_SLOT)?;
    let j = check_range("make_reverse", "offset", j, 0, MAX_SLOT)?;
    Ok(StackOp::new(StackOpcode::Reverse, i, j, 0))
}

pub fn make_dup2() -> StackOp {
    StackOp::new(StackOpcode::Dup2, 0, 0, 0)
}

pub fn make_over2() -> StackOp {
    StackOp::new(StackOpcode::Over2, 0, 0, 0)
}

pub fn make_rot() -> StackOp {
    StackOp::new(StackOpcode::Rot, 0, 0, 0)
}

pub fn make_rotrev() -> StackOp {
    StackOp::new(StackOpcode::RotRev, 0, 0, 0)
}

// ─── Globals ──────────────────────────────────────────────────────

fn make_glob(construct: &'static str, mode: GlobalMode, index: u32) -> Result<GlobalOp, IrError> {
    let index = check_range(construct, "global index", index, 1, MAX_GLOBAL)?;
    Ok(GlobalOp::new(mode, index))
}

pub fn make_get_glob(index: u32) -> Result<GlobalOp, IrError> {
    make_glob("make_get_glob", GlobalMode::Get, index)
}

pub fn make_set_glob(index: u32) -> Result<GlobalOp, IrError> {
    make_glob("make_set_glob", GlobalMode::Set, index)
}

/// Store the top into the global and push the previous value.
pub fn make_exchange_glob(index: u32) -> Result<GlobalOp, IrError> {
    make_glob("make_exchange_glob", GlobalMode::Exchange, index)
}

// ─── Control Flow ─────────────────────────────────────────────────

pub fn make_ret() -> ControlFlow {
    ControlFlow::new(MnemonicLine::parse("RET"), 0, 0)
}

pub fn make_ifret() -> ControlFlow {
    ControlFlow::new(MnemonicLine::parse("IFRET"), 1, 0)
}

pub fn make_ifnotret() -> ControlFlow {
    ControlFlow::new(MnemonicLine::parse("IFNOTRET"), 1, 0)
}

/// Build a THROW-family instruction (`THROWIF 100`, `THROWANY`, ...).
pub fn make_throw(line: &str) -> Result<ControlFlow, IrError> {
    let parsed = MnemonicLine::parse(line);
    let info = opcode::resolve_throw_parsed(&parsed, line)?;
    Ok(ControlFlow::new(parsed, info.take, info.ret))
}

/// Build a conditional. Single-armed kinds take no false arm; two-armed
/// kinds require one. A branching arm frame (`IFREF`, ...) must encode
/// the same branch as `kind`, and two-armed kinds take no branching arms.
pub fn make_if(
    kind: ConditionalKind,
    true_body: CodeBlock,
    false_body: Option<CodeBlock>,
) -> Result<Conditional, IrError> {
    match (kind.is_two_armed(), false_body.is_some()) {
        (true, false) => {
            return Err(IrError::invariant(
                "make_if",
                format!("{:?} requires a false arm", kind),
            ))
        }
        (false, true) => {
            return Err(IrError::invariant(
                "make_if",
                format!("{:?} cannot carry a false arm", kind),
            ))
        }
        _ => {}
    }
    let arms = std::iter::once(&true_body).chain(false_body.as_ref());
    for arm in arms {
        let frame = arm.kind();
        match frame.branch_kind() {
            Some(_) if kind.is_two_armed() => {
                return Err(IrError::invariant(
                    "make_if",
                    format!("{:?} arm cannot be a {} frame", kind, frame),
                ))
            }
            Some(encoded) if encoded != kind => {
                return Err(IrError::invariant(
                    "make_if",
                    format!("{} frame encodes {:?}, not {:?}", frame, encoded, kind),
                ))
            }
            _ => {}
        }
    }
    Ok(Conditional {
        kind,
        true_body,
        false_body,
    })
}

/// The complement of `node`, reusing its child blocks.
pub fn invert_conditional(node: Conditional) -> Conditional {
    node.invert()
}

pub fn make_repeat(body: CodeBlock) -> RepeatLoop {
    RepeatLoop {
        kind: RepeatKind::Repeat,
        body,
    }
}

pub fn make_until(body: CodeBlock) -> RepeatLoop {
    RepeatLoop {
        kind: RepeatKind::Until,
        body,
    }
}

pub fn make_while(condition: CodeBlock, body: CodeBlock, with_break: bool) -> WhileLoop {
    WhileLoop {
        condition,
        body,
        with_break,
    }
}

// ─── Containers ───────────────────────────────────────────────────

pub fn code_block(kind: FrameKind, instructions: Vec<Node>) -> CodeBlock {
    CodeBlock { kind, instructions }
}

pub fn make_opaque(block: CodeBlock, take: u32, ret: u32, pure: bool) -> Opaque {
    Opaque {
        block,
        take,
        ret,
        pure,
    }
}

/// Push a literal. `child` holds the code the literal encodes, if any.
pub fn make_data_push(
    kind: DataKind,
    data: impl Into<String>,
    child: Option<CodeBlock>,
) -> Result<DataPush, IrError> {
    if kind == DataKind::Cell {
        return Err(IrError::invariant(
            "make_data_push",
            "a .cell only appears inside another push's child block, use make_cell",
        ));
    }
    data_push("make_data_push", kind, data.into(), child)
}

/// A nested `.cell` for the child block of a data push.
pub fn make_cell(
    data: impl Into<String>,
    child: Option<CodeBlock>,
) -> Result<DataPush, IrError> {
    data_push("make_cell", DataKind::Cell, data.into(), child)
}

fn data_push(
    construct: &'static str,
    kind: DataKind,
    data: String,
    child: Option<CodeBlock>,
) -> Result<DataPush, IrError> {
    if kind == DataKind::PushSlice && child.is_some() {
        return Err(IrError::invariant(
            construct,
            "an inline slice cannot own a code block",
        ));
    }
    if data.is_empty() && child.is_none() {
        return Err(IrError::invariant(
            construct,
            format!("{} without data", kind.as_str()),
        ));
    }
    Ok(DataPush { kind, data, child })
}

/// Push a plain data cell reference.
pub fn make_pushref(data: impl Into<String>) -> Result<DataPush, IrError> {
    make_data_push(DataKind::PushRef, data, None)
}

pub fn function(
    name: impl Into<String>,
    kind: FunctionKind,
    take: u32,
    ret: u32,
    block: CodeBlock,
) -> Result<Function, IrError> {
    let name = name.into();
    if name.trim().is_empty() {
        return Err(IrError::invariant("function", "empty function name"));
    }
    Ok(Function {
        name,
        kind,
        take,
        ret,
        block,
    })
}

#[cfg(test)]
mod tests;
