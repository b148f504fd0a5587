//! Functions and the top-level program container.

use std::fmt;

use serde::Serialize;

use super::CodeBlock;

/// Role of a function in the final artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionKind {
    /// Private function, called by reference.
    Fragment,
    /// Inlined at every call site.
    Macro,
    /// Internal message entry point.
    MainInternal,
    /// External message entry point.
    MainExternal,
    OnCodeUpgrade,
    OnTickTock,
}

impl FunctionKind {
    /// Assembler directive introducing a function of this kind.
    pub fn directive(&self) -> &'static str {
        match self {
            FunctionKind::Fragment => ".fragment",
            FunctionKind::Macro => ".macro",
            FunctionKind::MainInternal => ".internal",
            FunctionKind::MainExternal => ".external",
            FunctionKind::OnCodeUpgrade => ".on-code-upgrade",
            FunctionKind::OnTickTock => ".on-tick-tock",
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

/// A named callable unit owning one code block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Function {
    pub(super) name: String,
    pub(super) kind: FunctionKind,
    pub(super) take: u32,
    pub(super) ret: u32,
    pub(super) block: CodeBlock,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// Declared number of arguments.
    pub fn take(&self) -> u32 {
        self.take
    }

    /// Declared number of return values.
    pub fn ret(&self) -> u32 {
        self.ret
    }

    pub fn block(&self) -> &CodeBlock {
        &self.block
    }

    pub fn into_block(self) -> CodeBlock {
        self.block
    }
}

/// The top-level artifact handed to the encoder. Function order is the
/// layout order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Program {
    pragmas: Vec<String>,
    functions: Vec<Function>,
}

impl Program {
    pub fn new(pragmas: Vec<String>, functions: Vec<Function>) -> Self {
        Self { pragmas, functions }
    }

    pub fn pragmas(&self) -> &[String] {
        &self.pragmas
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// First function with the given name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn into_functions(self) -> Vec<Function> {
        self.functions
    }
}
