//! AsmPrinter: renders an IR tree as TVM assembly text.
//!
//! Nested code blocks print as `KIND {` ... `}` using the frame-kind
//! vocabulary; structural nodes print their arm blocks first and their
//! branch or loop instruction after them, the way the machine consumes
//! continuations from the stack.


use super::block::{
    CodeBlock, Conditional, DataKind, DataPush, FrameKind, Opaque, RepeatLoop, WhileLoop,
};
use super::program::{Function, Program};
use super::visit::Visitor;
use super::{ControlFlow, DebugLoc, GenOpcode, GlobalOp, HardCode, StackOp};

// ─── Configuration ────────────────────────────────────────────────

/// Output style of the printer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrintConfig {
    /// One level of indentation.
    pub indent: String,
    /// Emit trailing `;comment`s of generic opcodes.
    pub emit_comments: bool,
    /// Emit `.loc file, line` directives.
    pub emit_locations: bool,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            emit_comments: true,
            emit_locations: false,
        }
    }
}

impl PrintConfig {
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn with_comments(mut self, emit: bool) -> Self {
        self.emit_comments = emit;
        self
    }

    pub fn with_locations(mut self, emit: bool) -> Self {
        self.emit_locations = emit;
        self
    }
}

// ─── Entry Points ─────────────────────────────────────────────────

pub fn print_program(program: &Program, config: &PrintConfig) -> String {
    let mut printer = AsmPrinter::new(config.clone());
    program.accept(&mut printer);
    printer.finish()
}

pub fn print_function(function: &Function, config: &PrintConfig) -> String {
    let mut printer = AsmPrinter::new(config.clone());
    function.accept(&mut printer);
    printer.finish()
}

pub fn print_block(block: &CodeBlock, config: &PrintConfig) -> String {
    let mut printer = AsmPrinter::new(config.clone());
    block.accept(&mut printer);
    printer.finish()
}

// ─── Printer ──────────────────────────────────────────────────────

pub struct AsmPrinter {
    config: PrintConfig,
    lines: Vec<String>,
    depth: usize,
    functions_printed: usize,
}

impl AsmPrinter {
    pub fn new(config: PrintConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
            depth: 0,
            functions_printed: 0,
        }
    }

    /// The printed text, one instruction per line, newline-terminated.
    pub fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Emit `text`, which may span several lines, at the current depth.
    fn emit(&mut self, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                self.lines.push(String::new());
            } else {
                let indent = self.config.indent.repeat(self.depth);
                self.lines.push(format!("{}{}", indent, line));
            }
        }
    }

    fn open(&mut self, header: &str) {
        self.emit(&format!("{} {{", header));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.emit("}");
    }

    /// Print `block`'s instructions under `header` instead of its own kind.
    fn emit_body(&mut self, header: &str, block: &CodeBlock) {
        self.open(header);
        for node in block.instructions() {
            node.accept(self);
        }
        self.close();
    }

    fn emit_instruction(&mut self, instruction: String, full: String) {
        if self.config.emit_comments {
            self.emit(&full);
        } else {
            self.emit(&instruction);
        }
    }
}

impl Visitor for AsmPrinter {
    fn visit_loc(&mut self, loc: &DebugLoc) {
        if self.config.emit_locations {
            self.emit(&loc.to_string());
        }
    }

    fn visit_stack(&mut self, op: &StackOp) {
        self.emit(&op.to_string());
    }

    fn visit_glob(&mut self, op: &GlobalOp) {
        self.emit(&op.to_string());
    }

    fn visit_opcode(&mut self, op: &GenOpcode) {
        self.emit_instruction(op.instruction(), op.full_opcode());
    }

    fn visit_hardcode(&mut self, code: &HardCode) {
        for line in code.lines() {
            self.emit(line);
        }
    }

    fn visit_control(&mut self, op: &ControlFlow) {
        self.emit_instruction(op.instruction(), op.full_opcode());
    }

    fn visit_opaque(&mut self, _opaque: &Opaque) -> bool {
        true
    }

    fn visit_data(&mut self, data: &DataPush) -> bool {
        if data.kind() == DataKind::PushSlice {
            self.emit(&format!("PUSHSLICE {}", data.data()));
            return false;
        }
        self.open(data.kind().as_str());
        if !data.data().is_empty() {
            self.emit(&format!(".blob {}", data.data()));
        }
        if let Some(child) = data.child() {
            for node in child.instructions() {
                node.accept(self);
            }
        }
        self.close();
        false
    }

    fn visit_block(&mut self, block: &CodeBlock) -> bool {
        self.open(block.kind().as_str());
        true
    }

    fn end_visit_block(&mut self, _block: &CodeBlock) {
        self.close();
    }

    fn visit_if(&mut self, node: &Conditional) -> bool {
        let arm = node.true_body();
        if let Some(false_body) = node.false_body() {
            arm.accept(self);
            false_body.accept(self);
            self.emit(node.kind().mnemonic());
            return false;
        }
        match arm.kind().branch_kind() {
            // IFREF-style frames already carry the branch
            Some(encoded) if encoded == node.kind() => arm.accept(self),
            // Inverted since construction: the frame's branch is stale
            Some(_) => {
                self.emit_body(FrameKind::PushRefCont.as_str(), arm);
                self.emit(node.kind().mnemonic());
            }
            None => {
                arm.accept(self);
                self.emit(node.kind().mnemonic());
            }
        }
        false
    }

    fn visit_repeat(&mut self, node: &RepeatLoop) -> bool {
        node.body().accept(self);
        self.emit(node.kind().mnemonic());
        false
    }

    fn visit_while(&mut self, node: &WhileLoop) -> bool {
        node.condition().accept(self);
        node.body().accept(self);
        self.emit(node.mnemonic());
        false
    }

    fn visit_function(&mut self, function: &Function) -> bool {
        if self.functions_printed > 0 {
            self.lines.push(String::new());
        }
        self.functions_printed += 1;
        self.emit(&format!("{} {}", function.kind().directive(), function.name()));
        self.depth += 1;
        for node in function.block().instructions() {
            node.accept(self);
        }
        self.depth -= 1;
        false
    }

    fn visit_program(&mut self, program: &Program) -> bool {
        for pragma in program.pragmas() {
            self.emit(&format!(".pragma {}", pragma));
        }
        if !program.pragmas().is_empty() && !program.functions().is_empty() {
            self.lines.push(String::new());
        }
        true
    }
}
