use cmmc::{
    compile,
    frontend::SourceFile,
    middle::tac::{
        BinaryOp, LabelId, Opd, Procedure, Program, QuadKind, Width,
        lowering::GLOBAL_PROCEDURE,
    },
};
use indoc::indoc;

fn lower(source: &str) -> Program {
    let source = SourceFile::new_in_memory(source);

    compile(&source).expect("program should compile")
}

fn procedure<'p>(program: &'p Program, name: &str) -> &'p Procedure {
    program
        .procedure(name)
        .unwrap_or_else(|| panic!("no procedure named {name}"))
}

fn labels_of(procedure: &Procedure) -> Vec<LabelId> {
    procedure.quads.iter().filter_map(|q| q.label).collect()
}

fn jump_targets_of(procedure: &Procedure) -> Vec<LabelId> {
    procedure
        .quads
        .iter()
        .filter_map(|q| match q.kind {
            QuadKind::Ifz { target, .. } | QuadKind::Goto { target } => Some(target),
            _ => None,
        })
        .collect()
}

#[test]
fn flattens_nested_arithmetic_inner_first() {
    let program = lower("int x; x = 3 + 4 * 2;");
    let global = procedure(&program, GLOBAL_PROCEDURE);

    // The multiplication claims tmp0, the addition tmp1, and the final
    // assignment copies tmp1 into x
    let kinds: Vec<_> = global.quads.iter().map(|q| &q.kind).collect();

    let QuadKind::Binary {
        dst: mult_dst,
        op: BinaryOp::Multiply,
        lhs: Opd::Lit { value: 4, .. },
        rhs: Opd::Lit { value: 2, .. },
    } = kinds[0]
    else {
        panic!("expected the multiplication first, found {:?}", kinds[0]);
    };

    let QuadKind::Binary {
        dst: add_dst,
        op: BinaryOp::Add,
        lhs: Opd::Lit { value: 3, .. },
        rhs,
    } = kinds[1]
    else {
        panic!("expected the addition second, found {:?}", kinds[1]);
    };

    assert_eq!(rhs, mult_dst);

    let QuadKind::Assign { dst, src } = kinds[2] else {
        panic!("expected the assignment last, found {:?}", kinds[2]);
    };

    assert_eq!(src, add_dst);
    assert!(matches!(dst, Opd::Sym { .. }));
    assert!(matches!(kinds[3], QuadKind::Nop));
}

#[test]
fn function_bodies_get_args_then_converge_on_one_leave_label() {
    let program = lower(indoc! {"
        int f(int a, int b) {
            if (a < b) {
                return a;
            }
            return b;
        }
    "});
    let f = procedure(&program, "f");

    assert!(matches!(
        f.quads[0].kind,
        QuadKind::GetArg { index: 1, .. }
    ));
    assert!(matches!(
        f.quads[1].kind,
        QuadKind::GetArg { index: 2, .. }
    ));

    // Both returns jump to the same leave label, carried by the final nop
    let leaves: Vec<_> = f
        .quads
        .iter()
        .filter_map(|q| match q.kind {
            QuadKind::Goto { target } if target == f.leave_label => Some(target),
            _ => None,
        })
        .collect();

    assert_eq!(leaves.len(), 2);

    let last = f.quads.last().unwrap();
    assert_eq!(last.label, Some(f.leave_label));
    assert!(matches!(last.kind, QuadKind::Nop));
}

#[test]
fn an_if_spends_one_label() {
    let program = lower("int x; x = 0; if (x < 1) { x = 2; }");
    let global = procedure(&program, GLOBAL_PROCEDURE);

    // One branch label plus the leave label
    assert_eq!(labels_of(global).len(), 2);
}

#[test]
fn an_if_else_spends_two_labels() {
    let program = lower("int x; x = 0; if (x < 1) { x = 2; } else { x = 3; }");
    let global = procedure(&program, GLOBAL_PROCEDURE);

    assert_eq!(labels_of(global).len(), 3);
}

#[test]
fn a_while_spends_two_labels_and_loops_back() {
    let program = lower("int x; x = 0; while (x < 3) { x++; }");
    let global = procedure(&program, GLOBAL_PROCEDURE);

    assert_eq!(labels_of(global).len(), 3);

    let backward_jumps = global
        .quads
        .iter()
        .filter(|q| matches!(q.kind, QuadKind::Goto { .. }))
        .count();

    assert_eq!(backward_jumps, 1);
}

#[test]
fn every_jump_target_is_carried_by_exactly_one_quad() {
    let program = lower(indoc! {"
        int x;
        x = 0;
        while (x < 5) {
            if (x == 3) {
                x = 10;
            } else {
                x++;
            }
        }
    "});
    let global = procedure(&program, GLOBAL_PROCEDURE);

    let labels = labels_of(global);
    let mut deduped = labels.clone();
    deduped.sort();
    deduped.dedup();

    assert_eq!(labels.len(), deduped.len(), "a label appears on two quads");

    for target in jump_targets_of(global) {
        assert!(
            labels.contains(&target),
            "jump to {target:?} which no quad carries"
        );
    }
}

#[test]
fn calls_flatten_every_argument_before_the_first_setarg() {
    let program = lower(indoc! {"
        int add(int a, int b) {
            return a + b;
        }
        int x;
        x = add(1 + 2, 3);
    "});
    let global = procedure(&program, GLOBAL_PROCEDURE);

    let first_setarg = global
        .quads
        .iter()
        .position(|q| matches!(q.kind, QuadKind::SetArg { .. }))
        .expect("call should pass arguments");
    let last_binary = global
        .quads
        .iter()
        .rposition(|q| matches!(q.kind, QuadKind::Binary { .. }))
        .expect("argument arithmetic should be flattened");

    assert!(last_binary < first_setarg);

    // setarg 1, setarg 2, call, getret, assign
    assert!(matches!(
        global.quads[first_setarg].kind,
        QuadKind::SetArg { index: 1, .. }
    ));
    assert!(matches!(
        global.quads[first_setarg + 1].kind,
        QuadKind::SetArg { index: 2, .. }
    ));
    assert!(matches!(
        global.quads[first_setarg + 2].kind,
        QuadKind::Call { .. }
    ));
    assert!(matches!(
        global.quads[first_setarg + 3].kind,
        QuadKind::GetRet { .. }
    ));
}

#[test]
fn short_operands_widen_through_a_fresh_temporary() {
    let program = lower("int x; short s; s = 2s; x = s + 1;");
    let global = procedure(&program, GLOBAL_PROCEDURE);

    // The promotion is a copy of the byte variable into a word temporary
    // before the addition consumes it
    let widen = global
        .quads
        .iter()
        .position(|q| {
            matches!(
                q.kind,
                QuadKind::Assign {
                    dst: Opd::Tmp {
                        width: Width::Word,
                        ..
                    },
                    src: Opd::Sym {
                        width: Width::Byte,
                        ..
                    },
                }
            )
        })
        .expect("the short operand should be widened");

    let QuadKind::Binary { op, lhs, .. } = &global.quads[widen + 1].kind else {
        panic!("the addition should directly follow the widening copy");
    };

    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        lhs,
        Opd::Tmp {
            width: Width::Word,
            ..
        }
    ));
}

#[test]
fn pointer_writes_go_through_an_address_temporary() {
    let program = lower("int x; int ptr p; p = &x; @p = 7;");
    let global = procedure(&program, GLOBAL_PROCEDURE);
    let kinds: Vec<_> = global.quads.iter().map(|q| &q.kind).collect();

    // p = &x
    assert!(matches!(kinds[0], QuadKind::AddrOf { .. }));
    assert!(matches!(kinds[1], QuadKind::Assign { .. }));

    // @p = 7 loads the pointer into an address temporary, then stores
    let QuadKind::Deref { dst, .. } = kinds[2] else {
        panic!("expected a deref, found {:?}", kinds[2]);
    };

    let QuadKind::Assign {
        dst: store_dst,
        src: Opd::Lit { value: 7, .. },
    } = kinds[3]
    else {
        panic!("expected the store, found {:?}", kinds[3]);
    };

    assert_eq!(dst, store_dst);
    assert!(matches!(dst, Opd::Addr { .. }));
}

#[test]
fn update_statements_read_and_write_in_place() {
    let program = lower("int x; x = 0; x++;");
    let global = procedure(&program, GLOBAL_PROCEDURE);

    let QuadKind::Binary {
        dst,
        op: BinaryOp::Add,
        lhs,
        rhs: Opd::Lit { value: 1, .. },
    } = &global.quads[1].kind
    else {
        panic!("expected an in-place add, found {:?}", global.quads[1].kind);
    };

    assert_eq!(dst, lhs);
    assert!(matches!(dst, Opd::Sym { .. }));
}

#[test]
fn string_literals_are_pooled_once() {
    let program = lower(indoc! {r#"
        output "twice";
        output "twice";
        output "once";
    "#});

    assert_eq!(program.strings.iter().count(), 2);
}

#[test]
fn global_declarations_become_globals_not_locals() {
    let program = lower("int x; short s; x = 1;");

    assert_eq!(program.globals.len(), 2);
    assert_eq!(program.globals[0].width, Width::Word);
    assert_eq!(program.globals[1].width, Width::Byte);

    let global = procedure(&program, GLOBAL_PROCEDURE);
    assert!(global.locals.is_empty());
}

#[test]
fn renders_one_line_per_quad_with_labels_in_the_gutter() {
    let program = lower("int x; x = 3 + 4 * 2;");
    let text = strip_ansi_escapes::strip_str(program.to_string());

    let expected = indoc! {"
        [BEGIN GLOBALS]
        x (8 bytes)
        [END GLOBALS]
        [BEGIN $global PROCEDURE]
                 [tmp0] := 4 MULT64 2
                 [tmp1] := 3 ADD64 [tmp0]
                 [x] := [tmp1]
          lbl_0: nop
        [END $global PROCEDURE]
    "};

    assert_eq!(text, expected);
}
