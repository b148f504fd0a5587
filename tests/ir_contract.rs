//! Contract tests over the public API: what a code generator and its
//! passes can rely on.

use tvm_ir::builder::*;
use tvm_ir::diagnostic::Severity;
use tvm_ir::ir::opcode::fixed_opcodes;
use tvm_ir::ir::{DataKind, GenOpcode, StackOp};
use tvm_ir::{
    print_function, resolve_opcode, resolve_throw, CodeBlock, Conditional, ConditionalKind,
    FrameKind, Function, FunctionKind, IrError, Node, PrintConfig, Program, StackEffect, Visitor,
};

fn block(ops: &[&str]) -> CodeBlock {
    code_block(
        FrameKind::PushCont,
        ops.iter().map(|op| Node::from(gen(op).unwrap())).collect(),
    )
}

fn effect(line: &str) -> (u32, u32) {
    let info = resolve_opcode(line).unwrap();
    (info.take, info.ret)
}

// ── Opcode metadata ──

#[test]
fn test_table_lookup_matches_iteration() {
    let mut seen = 0;
    for (name, info) in fixed_opcodes() {
        assert_eq!(resolve_opcode(name).unwrap(), info);
        seen += 1;
    }
    assert!(seen > 100);
}

#[test]
fn test_parametric_families() {
    assert_eq!(effect("TUPLE 5"), (5, 1));
    assert_eq!(effect("UNTUPLE 3"), (1, 3));
    assert_eq!(effect("LSHIFT"), (2, 1));
    assert_eq!(effect("LSHIFT 4"), (1, 1));
    assert_eq!(effect("DICTISETREF"), (4, 1));
    assert_eq!(effect("DICTUADDB"), (4, 2));
}

#[test]
fn test_unknown_mnemonic_is_fatal() {
    let err = resolve_opcode("NOSUCHOP 1").unwrap_err();
    assert!(err.is_unresolvable());
    assert!(resolve_throw("THROWIF 7").is_ok());
    assert!(resolve_throw("ADD").is_err());
}

#[test]
fn test_generic_opcode_round_trip() {
    let op = gen("STU 64;store uint").unwrap();
    assert_eq!(op.to_string(), "STU 64 ;store uint");
}

// ── Factories ──

#[test]
fn test_push_boundaries() {
    assert!(make_push(256).is_err());
    assert!(make_push(255).is_ok());
    assert!(make_push(0).is_ok());
}

#[test]
fn test_degenerate_requests_normalize() {
    assert_eq!(make_blkpush(1, 7).unwrap(), make_push(7).unwrap());
    assert_eq!(make_blkdrop2(1, 1).unwrap(), make_pop(1).unwrap());
}

#[test]
fn test_inversion_contract() {
    let one = make_if(ConditionalKind::IfJmp, block(&["INC"]), None).unwrap();
    assert_eq!(one.clone().invert().invert(), one);

    let two = make_if(
        ConditionalKind::IfElse,
        block(&["INC"]),
        Some(block(&["DEC"])),
    )
    .unwrap();
    let (kind, t, f) = two.clone().invert().into_parts();
    assert_eq!(kind, ConditionalKind::IfElse);
    assert_eq!(&t, two.false_body().unwrap());
    assert_eq!(f.as_ref(), Some(two.true_body()));
}

// ── Visitor ──

#[derive(Default)]
struct Events(Vec<String>);

impl Visitor for Events {
    fn visit_opcode(&mut self, op: &GenOpcode) {
        self.0.push(op.instruction());
    }
    fn visit_block(&mut self, block: &CodeBlock) -> bool {
        self.0.push(format!("enter {}", block.kind()));
        block.kind() != FrameKind::CallRef
    }
    fn end_visit_block(&mut self, block: &CodeBlock) {
        self.0.push(format!("leave {}", block.kind()));
    }
    fn visit_if(&mut self, _node: &Conditional) -> bool {
        self.0.push("if".into());
        true
    }
}

#[test]
fn test_two_armed_visit_order() {
    let node = make_if(
        ConditionalKind::IfElseWithJmp,
        block(&["INC"]),
        Some(block(&["DEC"])),
    )
    .unwrap();
    let mut events = Events::default();
    Node::from(node).accept(&mut events);
    assert_eq!(
        events.0,
        [
            "if",
            "enter PUSHCONT",
            "INC",
            "leave PUSHCONT",
            "enter PUSHCONT",
            "DEC",
            "leave PUSHCONT",
        ]
    );
}

#[test]
fn test_skipped_block_still_closes() {
    let skipped = code_block(
        FrameKind::CallRef,
        vec![gen("ADD").unwrap().into(), gen("SUB").unwrap().into()],
    );
    let mut events = Events::default();
    skipped.accept(&mut events);
    assert_eq!(events.0, ["enter CALLREF", "leave CALLREF"]);
}

/// A pass that rebuilds a tree, dropping debug locations.
fn strip_locations(block: CodeBlock) -> CodeBlock {
    let (kind, nodes) = block.into_instructions();
    let nodes = nodes
        .into_iter()
        .filter(|node| !matches!(node, Node::Loc(_)))
        .map(|node| match node {
            Node::Block(inner) => Node::Block(strip_locations(inner)),
            other => other,
        })
        .collect();
    code_block(kind, nodes)
}

#[test]
fn test_rewrite_by_rebuilding() {
    let original = code_block(
        FrameKind::PushCont,
        vec![
            make_loc("a.sol", 1).into(),
            gen("ADD").unwrap().into(),
            code_block(
                FrameKind::CallX,
                vec![make_loc("a.sol", 2).into(), gen("SUB").unwrap().into()],
            )
            .into(),
        ],
    );
    let hash = original.content_hash();
    let stripped = strip_locations(original);
    assert_eq!(stripped.len(), 2);
    assert_eq!(stripped.content_hash(), hash);
}

// ── Program hand-off ──

fn sample_program() -> Program {
    let main = function(
        "main",
        FunctionKind::MainExternal,
        0,
        0,
        code_block(
            FrameKind::PushCont,
            vec![
                gen("ACCEPT").unwrap().into(),
                make_get_glob(3).unwrap().into(),
                make_pushref("x{ABCD}").unwrap().into(),
                make_data_push(DataKind::PushSlice, "x{8_}", None)
                    .unwrap()
                    .into(),
                make_ret().into(),
            ],
        ),
    )
    .unwrap();
    Program::new(vec!["upgrade func".into()], vec![main])
}

#[test]
fn test_serialization_is_deterministic() {
    let a = postcard::to_allocvec(&sample_program()).unwrap();
    let b = postcard::to_allocvec(&sample_program()).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
    assert_eq!(
        sample_program().content_hash(),
        sample_program().content_hash()
    );
}

#[test]
fn test_lookup_and_print_function() {
    let program = sample_program();
    let main: &Function = program.function("main").unwrap();
    assert!(program.function("missing").is_none());
    let text = print_function(main, &PrintConfig::default().with_indent(" "));
    assert_eq!(
        text,
        ".external main\n ACCEPT\n GETGLOB 3\n PUSHREF {\n  .blob x{ABCD}\n }\n PUSHSLICE x{8_}\n RET\n"
    );
}

#[test]
fn test_error_diagnostic() {
    let err: IrError = gen("WHATEVER 3").unwrap_err();
    let diag = err.to_diagnostic();
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.span.start, 0);
    assert_eq!(diag.span.end, 8);
    let text = diag.render_to_string("<mnemonic>", err.source_line());
    assert!(text.contains("WHATEVER"));

    let violation = make_pop(0).unwrap_err();
    assert!(violation.to_string().contains("make_pop"));
}

#[test]
fn test_stack_effect_accessors() {
    let op: StackOp = make_push3(1, 2, 3).unwrap();
    assert_eq!(op.stack_effect(), StackEffect::new(0, 3));
    assert_eq!((op.i(), op.j(), op.k()), (1, 2, 3));
}

#[test]
fn test_trees_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Program>();
    assert_send_sync::<Node>();
    assert_send_sync::<IrError>();

    let program = std::sync::Arc::new(sample_program());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let program = std::sync::Arc::clone(&program);
            std::thread::spawn(move || program.content_hash())
        })
        .collect();
    let hashes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(hashes.windows(2).all(|w| w[0] == w[1]));
}
