use super::*;
use crate::ir::StackEffect;

fn block(ops: &[&str]) -> CodeBlock {
    code_block(
        FrameKind::PushCont,
        ops.iter().map(|op| Node::from(gen(op).unwrap())).collect(),
    )
}

fn assert_violation<T: std::fmt::Debug>(result: Result<T, IrError>) {
    match result {
        Err(err) => assert!(err.is_invariant_violation(), "got {}", err),
        Ok(value) => panic!("expected an invariant violation, got {:?}", value),
    }
}

// ─── Operand Ranges ───────────────────────────────────────────────

#[test]
fn test_push_range() {
    assert!(make_push(0).is_ok());
    assert!(make_push(255).is_ok());
    assert_violation(make_push(256));
}

#[test]
fn test_pop_and_xchg_reject_slot_zero() {
    assert_violation(make_pop(0));
    assert_violation(make_xchg_s(0));
    assert!(make_pop(1).is_ok());
    assert!(make_xchg_s(255).is_ok());
    assert_violation(make_xchg_s(256));
}

#[test]
fn test_drop_range() {
    assert_violation(make_drop(0));
    assert!(make_drop(255).is_ok());
    assert_violation(make_drop(256));
}

#[test]
fn test_short_form_ranges() {
    assert!(make_blkpush(15, 15).is_ok());
    assert_violation(make_blkpush(16, 0));
    assert_violation(make_blkpush(2, 16));
    assert_violation(make_blkpush(0, 0));

    assert!(make_push2(15, 0).is_ok());
    assert_violation(make_push2(0, 16));
    assert!(make_push3(15, 15, 15).is_ok());
    assert_violation(make_push3(0, 0, 16));

    assert!(make_blkdrop2(15, 15).is_ok());
    assert_violation(make_blkdrop2(0, 3));
    assert_violation(make_blkdrop2(16, 0));
    assert_violation(make_blkdrop2(1, 16));
}

#[test]
fn test_long_form_pair_ranges() {
    assert!(make_xchg_s_s(0, 255).is_ok());
    assert_violation(make_xchg_s_s(256, 1));
    assert!(make_reverse(2, 0).is_ok());
    assert_violation(make_reverse(2, 256));
}

#[test]
fn test_global_range() {
    assert_violation(make_get_glob(0));
    assert!(make_get_glob(1).is_ok());
    assert!(make_set_glob(254).is_ok());
    assert_violation(make_set_glob(255));
    assert_violation(make_exchange_glob(0));
}

#[test]
fn test_violation_names_the_factory() {
    let err = make_push(300).unwrap_err();
    match err {
        IrError::InvariantViolation { construct, detail } => {
            assert_eq!(construct, "make_push");
            assert!(detail.contains("300"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

// ─── Normalization ────────────────────────────────────────────────

#[test]
fn test_blkpush_of_one_is_push() {
    for i in 0..=15 {
        assert_eq!(make_blkpush(1, i).unwrap(), make_push(i).unwrap());
    }
    assert_eq!(
        make_blkpush(2, 3).unwrap().opcode(),
        StackOpcode::BlkPush
    );
}

#[test]
fn test_blkdrop2_one_one_is_pop() {
    assert_eq!(make_blkdrop2(1, 1).unwrap(), make_pop(1).unwrap());
    assert_eq!(
        make_blkdrop2(1, 2).unwrap().opcode(),
        StackOpcode::BlkDrop2
    );
}

#[test]
fn test_stack_effects() {
    assert_eq!(make_push(3).unwrap().stack_effect(), StackEffect::new(0, 1));
    assert_eq!(make_drop(4).unwrap().stack_effect(), StackEffect::new(4, 0));
    assert_eq!(
        make_blkdrop2(2, 3).unwrap().stack_effect(),
        StackEffect::new(5, 3)
    );
    assert_eq!(make_xchg_s_s(1, 2).unwrap().stack_effect().delta(), 0);
    assert_eq!(make_exchange_glob(3).unwrap().stack_effect(), StackEffect::new(1, 1));
}

// ─── Generic and Control-flow Opcodes ─────────────────────────────

#[test]
fn test_gen_resolves_arity_and_keeps_comment() {
    let op = gen("STU 64;store uint").unwrap();
    assert_eq!(op.opcode(), "STU");
    assert_eq!(op.arg(), Some("64"));
    assert_eq!(op.comment(), Some("store uint"));
    assert_eq!(op.stack_effect(), StackEffect::new(2, 1));
}

#[test]
fn test_gen_unknown_is_unresolvable() {
    let err = gen("FROBNICATE 3").unwrap_err();
    assert!(err.is_unresolvable());
    assert_eq!(err.source_line(), "FROBNICATE 3");
}

#[test]
fn test_make_throw() {
    let op = make_throw("THROWIFNOT 73").unwrap();
    assert_eq!(op.stack_effect(), StackEffect::new(1, 0));
    assert_eq!(op.arg(), Some("73"));
    assert!(make_throw("THROWARGANYIF").is_ok());
    assert!(make_throw("ADD").unwrap_err().is_unresolvable());
}

#[test]
fn test_return_family() {
    assert_eq!(make_ret().stack_effect(), StackEffect::new(0, 0));
    assert_eq!(make_ifret().stack_effect(), StackEffect::new(1, 0));
    assert_eq!(make_ifnotret().instruction(), "IFNOTRET");
}

#[test]
fn test_hardcode_requires_lines() {
    assert_violation(make_hardcode(vec![], 0, 0, true));
    let code = make_hardcode(vec!["ACCEPT".into()], 0, 0, false).unwrap();
    assert!(!code.is_pure());
}

// ─── Conditionals ─────────────────────────────────────────────────

#[test]
fn test_make_if_arm_count() {
    assert_violation(make_if(ConditionalKind::IfElse, block(&["INC"]), None));
    assert_violation(make_if(
        ConditionalKind::IfElseWithJmp,
        block(&["INC"]),
        None,
    ));
    assert_violation(make_if(
        ConditionalKind::IfJmp,
        block(&["INC"]),
        Some(block(&["DEC"])),
    ));
    assert!(make_if(ConditionalKind::IfNotJmp, block(&["INC"]), None).is_ok());
}

#[test]
fn test_make_if_branching_frame_must_match_kind() {
    let arm = |frame: FrameKind| code_block(frame, vec![gen("INC").unwrap().into()]);
    let pairs = [
        (ConditionalKind::If, FrameKind::IfRef),
        (ConditionalKind::IfNot, FrameKind::IfNotRef),
        (ConditionalKind::IfJmp, FrameKind::IfJmpRef),
        (ConditionalKind::IfNotJmp, FrameKind::IfNotJmpRef),
    ];
    for (kind, frame) in pairs {
        assert!(make_if(kind, arm(frame), None).is_ok());
        for (_, other) in pairs.iter().filter(|(_, f)| *f != frame) {
            assert_violation(make_if(kind, arm(*other), None));
        }
    }
    assert!(make_if(ConditionalKind::If, arm(FrameKind::PushRefCont), None).is_ok());
}

#[test]
fn test_make_if_two_armed_rejects_branching_frames() {
    let arm = |frame: FrameKind| code_block(frame, vec![gen("INC").unwrap().into()]);
    for kind in [ConditionalKind::IfElse, ConditionalKind::IfElseWithJmp] {
        assert_violation(make_if(
            kind,
            arm(FrameKind::IfRef),
            Some(arm(FrameKind::IfRef)),
        ));
        assert_violation(make_if(
            kind,
            arm(FrameKind::PushCont),
            Some(arm(FrameKind::IfNotRef)),
        ));
        assert!(make_if(kind, arm(FrameKind::PushCont), Some(arm(FrameKind::PushRefCont))).is_ok());
    }
}

#[test]
fn test_invert_single_arm_is_involutive() {
    for kind in [
        ConditionalKind::If,
        ConditionalKind::IfNot,
        ConditionalKind::IfJmp,
        ConditionalKind::IfNotJmp,
    ] {
        let node = make_if(kind, block(&["INC"]), None).unwrap();
        let inverted = invert_conditional(node.clone());
        assert_ne!(inverted.kind(), kind);
        assert_eq!(inverted.true_body(), node.true_body());
        assert_eq!(invert_conditional(inverted), node);
    }
}

#[test]
fn test_invert_two_armed_swaps_arms() {
    for kind in [ConditionalKind::IfElse, ConditionalKind::IfElseWithJmp] {
        let node = make_if(kind, block(&["INC"]), Some(block(&["DEC"]))).unwrap();
        let inverted = invert_conditional(node.clone());
        assert_eq!(inverted.kind(), kind);
        assert_eq!(inverted.true_body(), &block(&["DEC"]));
        assert_eq!(inverted.false_body(), Some(&block(&["INC"])));
        assert_eq!(invert_conditional(inverted), node);
    }
}

// ─── Containers ───────────────────────────────────────────────────

#[test]
fn test_data_push_rules() {
    assert_violation(make_data_push(
        DataKind::PushSlice,
        "x{4_}",
        Some(block(&["ACCEPT"])),
    ));
    assert_violation(make_data_push(DataKind::PushRef, "", None));
    assert_violation(make_pushref(""));
    let with_code = make_data_push(DataKind::PushRefSlice, "", Some(block(&["ACCEPT"]))).unwrap();
    assert!(Node::from(with_code).is_structural());
    assert!(!Node::from(make_pushref("x{00}").unwrap()).is_structural());
}

#[test]
fn test_cell_only_through_make_cell() {
    assert_violation(make_data_push(DataKind::Cell, "x{01}", None));
    assert_violation(make_cell("", None));

    let cell = make_cell("x{01}", None).unwrap();
    assert_eq!(cell.kind(), DataKind::Cell);
    assert_eq!(Node::from(cell).stack_effect(), Some(StackEffect::new(0, 0)));
    assert_eq!(
        Node::from(make_pushref("x{01}").unwrap()).stack_effect(),
        Some(StackEffect::new(0, 1))
    );
}

#[test]
fn test_function_requires_name() {
    assert_violation(function("", FunctionKind::Macro, 0, 0, block(&["ACCEPT"])));
    assert_violation(function("  ", FunctionKind::Macro, 0, 0, block(&["ACCEPT"])));
    let f = function("main", FunctionKind::MainInternal, 2, 0, block(&["ACCEPT"])).unwrap();
    assert_eq!(f.name(), "main");
    assert_eq!(f.block().len(), 1);
}

#[test]
fn test_loops_keep_children() {
    let w = make_while(block(&["ISZERO"]), block(&["DEC"]), false);
    assert_eq!(w.mnemonic(), "WHILE");
    let (cond, body, brk) = w.into_parts();
    assert_eq!(cond, block(&["ISZERO"]));
    assert_eq!(body, block(&["DEC"]));
    assert!(!brk);
    assert_eq!(make_until(block(&["ISZERO"])).kind(), RepeatKind::Until);
}
