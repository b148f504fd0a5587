//! Visitor protocol.
//!
//! Every node kind has one pre-visit callback. Container callbacks return
//! `bool`: `true` descends into the children, `false` skips them.
//! `CodeBlock` also gets `end_visit_block`, which fires after its children
//! whether or not they were visited. Traversal is depth-first and follows
//! child-declaration order: true arm before false arm, condition before
//! body.
//!
//! All callbacks default to "do nothing, descend", so a pass overrides
//! only the kinds it cares about.

use super::block::{CodeBlock, Conditional, DataPush, Opaque, RepeatLoop, WhileLoop};
use super::program::{Function, Program};
use super::{ControlFlow, DebugLoc, GenOpcode, GlobalOp, HardCode, Node, StackOp};

pub trait Visitor {
    // ── Leaves ──
    fn visit_loc(&mut self, _loc: &DebugLoc) {}
    fn visit_stack(&mut self, _op: &StackOp) {}
    fn visit_glob(&mut self, _op: &GlobalOp) {}
    fn visit_opcode(&mut self, _op: &GenOpcode) {}
    fn visit_hardcode(&mut self, _code: &HardCode) {}
    fn visit_control(&mut self, _op: &ControlFlow) {}

    // ── Containers ──
    fn visit_opaque(&mut self, _opaque: &Opaque) -> bool {
        true
    }
    fn visit_data(&mut self, _data: &DataPush) -> bool {
        true
    }
    fn visit_block(&mut self, _block: &CodeBlock) -> bool {
        true
    }
    fn end_visit_block(&mut self, _block: &CodeBlock) {}
    fn visit_if(&mut self, _node: &Conditional) -> bool {
        true
    }
    fn visit_repeat(&mut self, _node: &RepeatLoop) -> bool {
        true
    }
    fn visit_while(&mut self, _node: &WhileLoop) -> bool {
        true
    }
    fn visit_function(&mut self, _function: &Function) -> bool {
        true
    }
    fn visit_program(&mut self, _program: &Program) -> bool {
        true
    }
}

impl Node {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Node::Loc(loc) => visitor.visit_loc(loc),
            Node::Stack(op) => visitor.visit_stack(op),
            Node::Glob(op) => visitor.visit_glob(op),
            Node::Opcode(op) => visitor.visit_opcode(op),
            Node::HardCode(code) => visitor.visit_hardcode(code),
            Node::Control(op) => visitor.visit_control(op),
            Node::Opaque(opaque) => opaque.accept(visitor),
            Node::Data(data) => data.accept(visitor),
            Node::Block(block) => block.accept(visitor),
            Node::If(node) => node.accept(visitor),
            Node::Repeat(node) => node.accept(visitor),
            Node::While(node) => node.accept(visitor),
        }
    }
}

impl CodeBlock {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit_block(self) {
            for node in &self.instructions {
                node.accept(visitor);
            }
        }
        visitor.end_visit_block(self);
    }
}

impl Opaque {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit_opaque(self) {
            self.block.accept(visitor);
        }
    }
}

impl DataPush {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit_data(self) {
            if let Some(child) = &self.child {
                child.accept(visitor);
            }
        }
    }
}

impl Conditional {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit_if(self) {
            self.true_body.accept(visitor);
            if let Some(false_body) = &self.false_body {
                false_body.accept(visitor);
            }
        }
    }
}

impl RepeatLoop {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit_repeat(self) {
            self.body.accept(visitor);
        }
    }
}

impl WhileLoop {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit_while(self) {
            self.condition.accept(visitor);
            self.body.accept(visitor);
        }
    }
}

impl Function {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit_function(self) {
            self.block.accept(visitor);
        }
    }
}

impl Program {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit_program(self) {
            for function in self.functions() {
                function.accept(visitor);
            }
        }
    }
}
