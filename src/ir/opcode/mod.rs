//! Opcode metadata: mnemonic line parsing and stack-effect resolution.
//!
//! Every generic opcode node carries its `(take, ret, pure)` triple,
//! resolved once here so later passes never re-parse mnemonic text.
//! Resolution order: the fixed table, then the dictionary families, then
//! the opcodes whose arity depends on their immediate argument.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use super::error::IrError;

// ─── Stack Effect ─────────────────────────────────────────────────

/// Number of values an instruction pops (`take`) and pushes (`ret`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StackEffect {
    pub take: u32,
    pub ret: u32,
}

impl StackEffect {
    pub const fn new(take: u32, ret: u32) -> Self {
        Self { take, ret }
    }

    /// Net change of the stack height.
    pub fn delta(&self) -> i64 {
        self.ret as i64 - self.take as i64
    }
}

/// Resolved metadata for one opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub take: u32,
    pub ret: u32,
    pub pure: bool,
}

impl OpcodeInfo {
    const fn new(take: u32, ret: u32, pure: bool) -> Self {
        Self { take, ret, pure }
    }

    pub fn effect(&self) -> StackEffect {
        StackEffect::new(self.take, self.ret)
    }
}

// ─── Mnemonic Lines ───────────────────────────────────────────────

/// A generator line `MNEMONIC [ARG][;COMMENT]` split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MnemonicLine {
    pub opcode: String,
    pub arg: Option<String>,
    pub comment: Option<String>,
}

impl MnemonicLine {
    pub fn parse(line: &str) -> Self {
        let (code, comment) = match find_unescaped_semicolon(line) {
            Some(pos) => (&line[..pos], Some(line[pos + 1..].to_string())),
            None => (line, None),
        };
        let code = code.trim();
        let (opcode, arg) = match code.split_once(char::is_whitespace) {
            Some((opcode, rest)) => {
                let arg = rest.trim();
                let arg = if arg.is_empty() {
                    None
                } else {
                    Some(arg.to_string())
                };
                (opcode.to_string(), arg)
            }
            None => (code.to_string(), None),
        };
        Self {
            opcode,
            arg,
            comment,
        }
    }
}

fn find_unescaped_semicolon(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (pos, c) in line.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            ';' if !escaped => return Some(pos),
            _ => escaped = false,
        }
    }
    None
}

// ─── Fixed Table ──────────────────────────────────────────────────

/// Opcodes with a fixed stack effect: `(mnemonic, take, ret, pure)`.
const FIXED_OPCODES: &[(&str, u32, u32, bool)] = &[
    // ── (0, 0) ──
    ("ACCEPT", 0, 0, false),
    ("COMMIT", 0, 0, false),
    ("PRINTSTR", 0, 0, false),
    // ── (0, 1) ──
    ("BLOCKLT", 0, 1, true),
    ("FALSE", 0, 1, true),
    ("GETPARAM", 0, 1, true),
    ("LTIME", 0, 1, true),
    ("MYADDR", 0, 1, true),
    ("NEWC", 0, 1, true),
    ("NEWDICT", 0, 1, true),
    ("NIL", 0, 1, true),
    ("NOW", 0, 1, true),
    ("NULL", 0, 1, true),
    ("PUSHINT", 0, 1, true),
    ("PUSHPOW2DEC", 0, 1, true),
    ("PUSHSLICE", 0, 1, true),
    ("RANDSEED", 0, 1, true),
    ("RANDU256", 0, 1, false),
    ("TRUE", 0, 1, true),
    // ── (1, 0) ──
    ("ADDRAND", 1, 0, false),
    ("ENDS", 1, 0, false),
    ("SETCODE", 1, 0, false),
    ("SETRAND", 1, 0, false),
    // ── (1, 1) ──
    ("ABS", 1, 1, false),
    ("ADDCONST", 1, 1, false),
    ("BBITS", 1, 1, false),
    ("BDEPTH", 1, 1, false),
    ("BINDUMP", 1, 1, false),
    ("BLESS", 1, 1, false),
    ("BREFS", 1, 1, false),
    ("BREMBITS", 1, 1, false),
    ("BREMREFS", 1, 1, false),
    ("CDEPTH", 1, 1, false),
    ("CTOS", 1, 1, false),
    ("DEC", 1, 1, false),
    ("DICTEMPTY", 1, 1, false),
    ("ENDC", 1, 1, false),
    ("EQINT", 1, 1, false),
    ("FIRST", 1, 1, false),
    ("FITS", 1, 1, false),
    ("GTINT", 1, 1, false),
    ("HASHCU", 1, 1, false),
    ("HASHSU", 1, 1, false),
    ("HEXDUMP", 1, 1, false),
    ("INC", 1, 1, false),
    ("INDEX", 1, 1, false),
    ("INDEX2", 1, 1, false),
    ("INDEX3", 1, 1, false),
    ("ISNEG", 1, 1, false),
    ("ISNNEG", 1, 1, false),
    ("ISNPOS", 1, 1, false),
    ("ISNULL", 1, 1, false),
    ("ISPOS", 1, 1, false),
    ("ISZERO", 1, 1, false),
    ("LESSINT", 1, 1, false),
    ("MODPOW2", 1, 1, false),
    ("MULCONST", 1, 1, false),
    ("NEGATE", 1, 1, false),
    ("NEQINT", 1, 1, false),
    ("NOT", 1, 1, false),
    // alias for NOT
    ("BITNOT", 1, 1, false),
    ("PARSEMSGADDR", 1, 1, false),
    ("PLDDICT", 1, 1, false),
    ("PLDI", 1, 1, false),
    ("PLDREF", 1, 1, false),
    ("PLDREFIDX", 1, 1, false),
    ("PLDU", 1, 1, false),
    ("RAND", 1, 1, false),
    ("SBITS", 1, 1, false),
    ("SDEMPTY", 1, 1, false),
    ("SDEPTH", 1, 1, false),
    ("SECOND", 1, 1, false),
    ("SEMPTY", 1, 1, false),
    ("SGN", 1, 1, false),
    ("SHA256U", 1, 1, false),
    ("SREFS", 1, 1, false),
    ("STONE", 1, 1, false),
    ("STRDUMP", 1, 1, false),
    ("STSLICECONST", 1, 1, false),
    ("STZERO", 1, 1, false),
    ("THIRD", 1, 1, false),
    ("TLEN", 1, 1, false),
    ("UFITS", 1, 1, false),
    // ── (1, 2) ──
    ("BBITREFS", 1, 2, false),
    ("BREMBITREFS", 1, 2, false),
    ("LDDICT", 1, 2, false),
    ("LDGRAMS", 1, 2, false),
    ("LDI", 1, 2, false),
    ("LDMSGADDR", 1, 2, false),
    ("LDOPTREF", 1, 2, false),
    ("LDREF", 1, 2, false),
    ("LDREFRTOS", 1, 2, false),
    ("LDSLICE", 1, 2, false),
    ("LDU", 1, 2, false),
    ("LDVARUINT32", 1, 2, false),
    ("REWRITESTDADDR", 1, 2, false),
    ("SBITREFS", 1, 2, false),
    ("TPOP", 1, 2, false),
    ("UNPAIR", 1, 2, false),
    // ── (2, 0) ──
    ("RAWRESERVE", 2, 0, false),
    ("SENDRAWMSG", 2, 0, false),
    // ── (2, 1) ──
    ("ADD", 2, 1, false),
    ("AND", 2, 1, false),
    ("CMP", 2, 1, false),
    ("DIV", 2, 1, false),
    ("DIVC", 2, 1, false),
    ("DIVR", 2, 1, false),
    ("EQUAL", 2, 1, false),
    ("GEQ", 2, 1, false),
    ("GREATER", 2, 1, false),
    ("INDEXVAR", 2, 1, false),
    ("LEQ", 2, 1, false),
    ("LESS", 2, 1, false),
    ("MAX", 2, 1, false),
    ("MIN", 2, 1, false),
    ("MOD", 2, 1, false),
    ("MUL", 2, 1, false),
    ("NEQ", 2, 1, false),
    ("OR", 2, 1, false),
    ("PAIR", 2, 1, false),
    ("SCHKBITSQ", 2, 1, false),
    ("SCHKREFSQ", 2, 1, false),
    ("SDEQ", 2, 1, false),
    ("SDLEXCMP", 2, 1, false),
    ("SDSKIPFIRST", 2, 1, false),
    ("SETINDEX", 2, 1, false),
    ("SETINDEXQ", 2, 1, false),
    ("STB", 2, 1, false),
    ("STBR", 2, 1, false),
    ("STBREF", 2, 1, false),
    ("STBREFR", 2, 1, false),
    ("STDICT", 2, 1, false),
    ("STGRAMS", 2, 1, false),
    ("STI", 2, 1, false),
    ("STIR", 2, 1, false),
    ("STONES", 2, 1, false),
    ("STOPTREF", 2, 1, false),
    ("STREF", 2, 1, false),
    ("STREFR", 2, 1, false),
    ("STSLICE", 2, 1, false),
    ("STSLICER", 2, 1, false),
    ("STU", 2, 1, false),
    ("STUR", 2, 1, false),
    ("STVARUINT32", 2, 1, false),
    ("STZEROES", 2, 1, false),
    ("SUB", 2, 1, false),
    ("SUBR", 2, 1, false),
    ("TPUSH", 2, 1, false),
    ("XOR", 2, 1, false),
    // ── (2, 2) ──
    ("DIVMOD", 2, 2, false),
    ("LDIX", 2, 2, false),
    ("LDSLICEX", 2, 2, false),
    ("LDUX", 2, 2, false),
    ("MINMAX", 2, 2, false),
    // ── (2, 3) ──
    ("CDATASIZE", 2, 3, false),
    ("SDATASIZE", 2, 3, false),
    // ── (3, 0) ──
    ("RAWRESERVEX", 3, 0, false),
    // ── (3, 1) ──
    ("CHKSIGNS", 3, 1, false),
    ("CHKSIGNU", 3, 1, false),
    ("MULDIV", 3, 1, false),
    ("MULDIVC", 3, 1, false),
    ("MULDIVR", 3, 1, false),
    ("SCHKBITREFSQ", 3, 1, false),
    ("SETINDEXVAR", 3, 1, false),
    ("SSKIPFIRST", 3, 1, false),
    ("STUX", 3, 1, false),
    ("TRIPLE", 3, 1, false),
    // ── (3, 2) ──
    ("DICTDEL", 3, 2, false),
    ("DICTIDEL", 3, 2, false),
    ("DICTUDEL", 3, 2, false),
    ("MULDIVMOD", 3, 2, false),
    ("SPLIT", 3, 2, false),
];

/// THROW family: `(mnemonic, take)`. None of them produce values.
// THROWANY and THROWARG are documented as taking one value; the machine
// reference hints they may take two. Kept as documented until confirmed.
const THROW_OPCODES: &[(&str, u32)] = &[
    ("THROW", 0),
    ("THROWANY", 1),
    ("THROWANYIF", 2),
    ("THROWANYIFNOT", 2),
    ("THROWARG", 1),
    ("THROWARGANY", 2),
    ("THROWARGANYIF", 3),
    ("THROWARGANYIFNOT", 3),
    ("THROWARGIF", 2),
    ("THROWARGIFNOT", 2),
    ("THROWIF", 1),
    ("THROWIFNOT", 1),
];

static OPCODES: LazyLock<HashMap<&'static str, OpcodeInfo>> = LazyLock::new(|| {
    FIXED_OPCODES
        .iter()
        .map(|&(name, take, ret, pure)| (name, OpcodeInfo::new(take, ret, pure)))
        .collect()
});

static THROWS: LazyLock<HashMap<&'static str, OpcodeInfo>> = LazyLock::new(|| {
    THROW_OPCODES
        .iter()
        .map(|&(name, take)| (name, OpcodeInfo::new(take, 0, false)))
        .collect()
});

/// Iterate over every fixed-arity opcode and its metadata.
pub fn fixed_opcodes() -> impl Iterator<Item = (&'static str, OpcodeInfo)> {
    FIXED_OPCODES
        .iter()
        .map(|&(name, take, ret, pure)| (name, OpcodeInfo::new(take, ret, pure)))
}

/// Iterate over every THROW-family mnemonic and its metadata.
pub fn throw_opcodes() -> impl Iterator<Item = (&'static str, OpcodeInfo)> {
    THROW_OPCODES
        .iter()
        .map(|&(name, take)| (name, OpcodeInfo::new(take, 0, false)))
}

// ─── Family Rules ─────────────────────────────────────────────────

/// Matches `DICT[I|U]?<middle>[REF|B]?`.
fn is_dict_family(op: &str, middles: &[&str]) -> bool {
    let Some(rest) = op.strip_prefix("DICT") else {
        return false;
    };
    let rest = rest
        .strip_prefix('I')
        .or_else(|| rest.strip_prefix('U'))
        .unwrap_or(rest);
    middles.iter().any(|middle| match rest.strip_prefix(middle) {
        Some(suffix) => matches!(suffix, "" | "REF" | "B"),
        None => false,
    })
}

fn numeric_arg(parsed: &MnemonicLine, line: &str) -> Result<u32, IrError> {
    let arg = parsed.arg.as_deref().ok_or_else(|| {
        IrError::invariant(
            "resolve_opcode",
            format!("`{}` requires a numeric argument: `{}`", parsed.opcode, line),
        )
    })?;
    arg.parse::<u32>().map_err(|_| {
        IrError::invariant(
            "resolve_opcode",
            format!(
                "`{}` argument `{}` is not a non-negative integer",
                parsed.opcode, arg
            ),
        )
    })
}

pub(crate) fn resolve_parsed(parsed: &MnemonicLine, line: &str) -> Result<OpcodeInfo, IrError> {
    let op = parsed.opcode.as_str();
    if let Some(info) = OPCODES.get(op) {
        return Ok(*info);
    }
    let has_arg = parsed.arg.is_some();
    let info = if is_dict_family(op, &["SET"]) {
        OpcodeInfo::new(4, 1, false)
    } else if is_dict_family(op, &["REPLACE", "ADD"]) {
        OpcodeInfo::new(4, 2, false)
    } else if op == "TUPLE" {
        OpcodeInfo::new(numeric_arg(parsed, line)?, 1, false)
    } else if op == "UNTUPLE" {
        OpcodeInfo::new(1, numeric_arg(parsed, line)?, false)
    } else if op == "LSHIFT" || op == "RSHIFT" {
        OpcodeInfo::new(if has_arg { 1 } else { 2 }, 1, false)
    } else if op == "MULRSHIFT" {
        OpcodeInfo::new(if has_arg { 2 } else { 3 }, 1, false)
    } else {
        log::debug!("no opcode rule for `{}`", line);
        return Err(IrError::unresolvable(op, line));
    };
    log::trace!("family rule resolved `{}` to {:?}", line, info);
    Ok(info)
}

/// Resolve the `(take, ret, pure)` metadata of a generic opcode line.
pub fn resolve_opcode(line: &str) -> Result<OpcodeInfo, IrError> {
    resolve_parsed(&MnemonicLine::parse(line), line)
}

pub(crate) fn resolve_throw_parsed(
    parsed: &MnemonicLine,
    line: &str,
) -> Result<OpcodeInfo, IrError> {
    match THROWS.get(parsed.opcode.as_str()) {
        Some(info) => Ok(*info),
        None => {
            log::debug!("no THROW rule for `{}`", line);
            Err(IrError::unresolvable(parsed.opcode.as_str(), line))
        }
    }
}

/// Resolve a THROW-family line (`THROWIF 100`, `THROWANY`, ...).
pub fn resolve_throw(line: &str) -> Result<OpcodeInfo, IrError> {
    resolve_throw_parsed(&MnemonicLine::parse(line), line)
}
