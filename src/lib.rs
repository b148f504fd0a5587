//! Instruction-level intermediate representation for a TVM code generator.
//!
//! The crate provides the node tree the backend emits into, the opcode
//! metadata table that gives every instruction its stack effect, validated
//! factories, a visitor protocol for passes, an assembly printer, and
//! content hashing.

pub mod diagnostic;
pub mod ir;
pub mod span;

// Re-exports: the common entry points at the crate root
pub use diagnostic::{render_diagnostics, Diagnostic};
pub use ir::builder;
pub use ir::hash::ContentHash;
pub use ir::opcode::{resolve_opcode, resolve_throw};
pub use ir::print::{print_block, print_function, print_program, PrintConfig};
pub use ir::{
    CodeBlock, Conditional, ConditionalKind, FrameKind, Function, FunctionKind, IrError, Node,
    Program, StackEffect, Visitor,
};
