//! Fatal IR construction errors.
//!
//! Both kinds are programming errors in the caller (the code generator or a
//! rewriting pass). They are never recovered locally: factories return them,
//! callers propagate with `?`, and compilation stops.

use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrError {
    /// An operand, or a combination of operands, breaks a documented
    /// encoding or structural constraint.
    InvariantViolation {
        construct: &'static str,
        detail: String,
    },
    /// The requested mnemonic has no stack-effect rule in the opcode table.
    Unresolvable { construct: String, line: String },
}

impl IrError {
    pub(crate) fn invariant(construct: &'static str, detail: impl Into<String>) -> Self {
        IrError::InvariantViolation {
            construct,
            detail: detail.into(),
        }
    }

    pub(crate) fn unresolvable(construct: impl Into<String>, line: impl Into<String>) -> Self {
        IrError::Unresolvable {
            construct: construct.into(),
            line: line.into(),
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, IrError::InvariantViolation { .. })
    }

    pub fn is_unresolvable(&self) -> bool {
        matches!(self, IrError::Unresolvable { .. })
    }

    /// Convert into a diagnostic. For unresolvable mnemonics the span points
    /// at the mnemonic inside the offending line, so the diagnostic should be
    /// rendered with that line as its source.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            IrError::InvariantViolation { construct, detail } => Diagnostic::error(
                format!("invariant violated in `{}`: {}", construct, detail),
                Span::dummy(),
            )
            .with_note("the code generator requested a node the target cannot encode".to_string()),
            IrError::Unresolvable { construct, line } => Diagnostic::error(
                format!("no stack effect known for `{}`", construct),
                Span::find(line, construct),
            )
            .with_note("the opcode table has no entry or family rule for this mnemonic".to_string())
            .with_help("add the opcode to the metadata table with its (take, ret) arity".to_string()),
        }
    }

    /// The source text a diagnostic for this error should be rendered
    /// against.
    pub fn source_line(&self) -> &str {
        match self {
            IrError::InvariantViolation { .. } => "",
            IrError::Unresolvable { line, .. } => line,
        }
    }
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrError::InvariantViolation { construct, detail } => {
                write!(f, "invariant violation in {}: {}", construct, detail)
            }
            IrError::Unresolvable { construct, line } => {
                write!(f, "unresolvable construct `{}` in `{}`", construct, line)
            }
        }
    }
}

impl std::error::Error for IrError {}
