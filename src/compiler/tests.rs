//! Unit tests for code generation.
//!
//! Cover the instruction selection for each expression kind, stack frame
//! layout, the two-phase declaration emitter, entry-point validation and the
//! diagnostic scenarios the pass must survive.

use std::rc::Rc;

use crate::{
    ast::ast::{Expr, File},
    compiler::compiler::{compile_file, count_vars, round_up_16, Output},
    errors::errors::InternalError,
    lexer::lexer::tokenize,
    parser::parser::parse_file,
};

fn parse(source: &str) -> File {
    let tokens = tokenize(source.to_string(), Some("test.ab".to_string())).unwrap();
    parse_file(tokens, Rc::new("test.ab".to_string())).unwrap()
}

fn compile(source: &str) -> Output {
    compile_file(&parse(source)).unwrap()
}

fn diagnostic_names(output: &Output) -> Vec<&str> {
    output
        .diagnostics
        .errors()
        .iter()
        .map(|error| error.get_error_name())
        .collect()
}

#[test]
fn test_round_up_16() {
    assert_eq!(round_up_16(0), 0);
    assert_eq!(round_up_16(4), 16);
    assert_eq!(round_up_16(16), 16);
    assert_eq!(round_up_16(20), 32);
}

#[test]
fn test_main_sum_of_literals() {
    let output = compile("(decl main int (+ 1 2))");

    assert!(output.diagnostics.is_empty());
    assert_eq!(
        output.code,
        "#include <stdio.h>\n\
         #include <runtime.h>\n\
         void _main(void);\n\
         void _main(void) {\n\
         setl(1, eax);\n\
         setl(2, edx);\n\
         addl(edx, eax);\n\
         }\n\
         int main(void) {\n\
         stack_init();\n\
         _main();\n\
         printf(\"%d\\n\", *(int32_t *)eax);\n\
         stack_end();\n\
         return *(int32_t*) eax;\n\
         }\n"
    );
}

#[test]
fn test_variadic_operator_folds_left_to_right() {
    let output = compile("(decl main int (+ 1 2 3))");

    assert!(output.code.contains(
        "setl(1, eax);\n\
         setl(2, edx);\n\
         addl(edx, eax);\n\
         setl(3, edx);\n\
         addl(edx, eax);\n"
    ));
}

#[test]
fn test_comparison_operand_order() {
    let output = compile("(decl main int (< 1 2))");

    assert!(output.code.contains(
        "setl(1, eax);\n\
         setl(2, edx);\n\
         ltl(eax, edx);\n"
    ));
}

#[test]
fn test_nested_operand_spills_the_accumulator() {
    let output = compile("(decl main int (+ 1 (* 2 3)))");

    assert!(output.code.contains(
        "setl(1, eax);\n\
         pushl(eax);\n\
         setl(2, eax);\n\
         setl(3, edx);\n\
         mull(edx, eax);\n\
         movl(eax, edx);\n\
         popl(eax);\n\
         addl(edx, eax);\n"
    ));
}

#[test]
fn test_zero_slot_function_elides_prologue() {
    let output = compile("(decl main int (+ 1 2))");

    assert!(!output.code.contains("enter("));
    assert!(!output.code.contains("leave();"));
}

#[test]
fn test_parameters_and_locals_claim_slots_in_order() {
    let file = parse("(decl (f a b) int (var c) (= c 9) (+ a c)) (decl main int (f 1 2))");
    let output = compile_file(&file).unwrap();

    assert!(output.diagnostics.is_empty());
    // Three slots, 12 bytes, one 16-byte frame.
    assert!(output.code.contains("enter(16);"));
    assert!(output.code.contains("setl(9, ebp+8);"));
    assert!(output.code.contains("movl(ebp+0, eax);"));
    assert!(output.code.contains("movl(ebp+8, edx);"));

    let Expr::Decl(decl) = &file.body[0] else {
        panic!("expected a declaration");
    };
    let offsets: Vec<Option<i32>> = ["a", "b", "c"]
        .iter()
        .map(|name| decl.scope.borrow().get(name).unwrap().borrow().offset)
        .collect();
    assert_eq!(offsets, vec![Some(0), Some(4), Some(8)]);
}

#[test]
fn test_frame_size_is_cursor_rounded_up() {
    // Five slots need 20 bytes, so the frame is 32.
    let output =
        compile("(decl main int (var a) (var b) (var c) (var d) (var e) (= a 1) a)");

    assert!(output.code.contains("enter(32);"));
}

#[test]
fn test_both_conditional_branches_count_toward_the_frame() {
    let file = parse("(decl main int (if 1 (var a) (var b)) 0)");

    let Expr::Decl(decl) = &file.body[0] else {
        panic!("expected a declaration");
    };
    assert_eq!(count_vars(decl), 2);

    let output = compile_file(&file).unwrap();
    assert!(output.code.contains("enter(16);"));
}

#[test]
fn test_offsets_are_unique_and_inside_the_frame() {
    let file = parse("(decl (f a b) int (var c) (if 1 (var d) (var e)) a)");
    compile_file(&file).unwrap();

    let Expr::Decl(decl) = &file.body[0] else {
        panic!("expected a declaration");
    };

    let frame = round_up_16(count_vars(decl) * 4);
    let mut offsets = vec![];
    for name in ["a", "b", "c"] {
        offsets.push(decl.scope.borrow().get(name).unwrap().borrow().offset.unwrap());
    }

    let Expr::List(list) = decl.body.as_ref() else {
        panic!("expected an expression list body");
    };
    let Expr::If(if_expr) = &list.list[1] else {
        panic!("expected a conditional");
    };
    for name in ["d", "e"] {
        offsets.push(
            if_expr
                .scope
                .borrow()
                .get(name)
                .unwrap()
                .borrow()
                .offset
                .unwrap(),
        );
    }

    for (i, offset) in offsets.iter().enumerate() {
        assert!(*offset < frame);
        assert!(!offsets[i + 1..].contains(offset));
    }
}

#[test]
fn test_forward_declarations_enable_mutual_recursion() {
    let output = compile(
        "(decl (even n) int (if (== n 0) int 1 (odd (- n 1)))) \
         (decl (odd n) int (if (== n 0) int 0 (even (- n 1)))) \
         (decl main int (even 4))",
    );

    assert!(output.diagnostics.is_empty());

    // Every prototype precedes every body.
    let last_proto = output.code.rfind("void _main(void);").unwrap();
    let first_body = output.code.find("void _even(void) {").unwrap();
    assert!(last_proto < first_body);
}

#[test]
fn test_two_runs_produce_identical_output() {
    let file = parse(
        "(decl (f a) int (var x) (= x (+ a 1)) x) \
         (decl main int (f 41))",
    );

    let first = compile_file(&file).unwrap();
    let second = compile_file(&file).unwrap();

    assert_eq!(first.code, second.code);
    assert_eq!(first.diagnostics.len(), second.diagnostics.len());
}

#[test]
fn test_assignment_fast_path_and_register_path() {
    let output = compile("(decl main int (var x) (var y) (= x 5) (= y x) y)");

    // Literal values go straight to the slot; everything else goes through
    // the accumulator.
    assert!(output.code.contains("setl(5, ebp+0);"));
    assert!(output.code.contains(
        "movl(ebp+0, eax);\n\
         movl(eax, ebp+4);\n"
    ));
}

#[test]
fn test_var_with_initializer() {
    let output = compile("(decl main int (var (= x 5)) x)");

    assert!(output.diagnostics.is_empty());
    assert!(output.code.contains("setl(5, ebp+0);"));
}

#[test]
fn test_call_arguments_fill_outgoing_slots() {
    let output = compile(
        "(decl (add a b) int (+ a b)) \
         (decl main int (add 1 (add 2 3)))",
    );

    assert!(output.diagnostics.is_empty());
    assert!(output.code.contains("setl(1, esp+4);"));
    assert!(output.code.contains("movl(eax, esp+8);"));
    assert!(output.code.contains("_add();"));
}

#[test]
fn test_tail_position_conditional_unwinds_in_both_branches() {
    let output = compile("(decl (max a b) int (if (> a b) int a b)) (decl main int (max 1 2))");

    assert!(output.diagnostics.is_empty());
    assert!(output.code.contains(
        "gtl(eax, edx);\n\
         if (*(int32_t *)ecx == 1) {\n\
         movl(ebp+0, eax);\n\
         leave();\n\
         return;\n\
         } else {\n\
         movl(ebp+4, eax);\n\
         leave();\n\
         return;\n\
         }\n"
    ));
}

#[test]
fn test_conditional_without_else_emits_no_else_block() {
    let output = compile("(decl (f a) int (if (== a 0) (= a 1)) a)");

    assert!(!output.code.contains("} else {"));
}

#[test]
fn test_nested_declaration_is_emitted_before_its_parent() {
    let output = compile("(decl main int (decl seven int 7) (seven))");

    assert!(output.diagnostics.is_empty());

    let seven_body = output.code.find("void _seven(void) {").unwrap();
    let main_body = output.code.find("void _main(void) {").unwrap();
    assert!(seven_body < main_body);

    // The node inside the body emits nothing a second time.
    assert_eq!(output.code.matches("void _seven(void) {").count(), 1);
}

#[test]
fn test_missing_entry_point_is_the_only_diagnostic() {
    let output = compile("(decl f int 1)");

    assert_eq!(diagnostic_names(&output), vec!["MissingEntryPoint"]);
}

#[test]
fn test_entry_point_without_type() {
    let output = compile("(decl main (+ 1 2))");

    assert_eq!(diagnostic_names(&output), vec!["EntryPointNoType"]);
}

#[test]
fn test_entry_point_with_wrong_type() {
    let output = compile("(decl main float (+ 1 2))");

    assert_eq!(diagnostic_names(&output), vec!["EntryPointWrongType"]);
}

#[test]
fn test_calling_main_is_illegal() {
    let output = compile("(decl f int (main)) (decl main int 1)");

    assert_eq!(diagnostic_names(&output), vec!["IllegalMainCall"]);
    // The call is still emitted.
    assert!(output.code.contains("_main();"));
}

#[test]
fn test_undeclared_function_call() {
    let output = compile("(decl main int (missing 1))");

    assert_eq!(diagnostic_names(&output), vec!["UndeclaredFunction"]);
}

#[test]
fn test_calling_a_variable_is_not_callable() {
    let output = compile("(decl main int (var x) (= x 1) (x))");

    assert_eq!(diagnostic_names(&output), vec!["NotCallable"]);
}

#[test]
fn test_arg_count_mismatch_still_emits_the_call() {
    let output = compile(
        "(decl (id x) int x) \
         (decl main int (id 1 2))",
    );

    assert_eq!(diagnostic_names(&output), vec!["ArgCountMismatch"]);
    assert!(output.code.contains("setl(1, esp+4);"));
    assert!(output.code.contains("setl(2, esp+8);"));
    assert!(output.code.contains("_id();"));
}

#[test]
fn test_arg_type_mismatch_per_position() {
    let output = compile(
        "(decl (add a b) int (+ a b)) \
         (decl main int (var u) (var v) (add u v))",
    );

    assert_eq!(
        diagnostic_names(&output),
        vec!["ArgTypeMismatch", "ArgTypeMismatch"]
    );
}

#[test]
fn test_type_inference_records_one_mismatch() {
    let output = compile("(decl main int (var x) (var y) (= x 1) (= x y) x)");

    assert_eq!(diagnostic_names(&output), vec!["AssignTypeMismatch"]);
}

#[test]
fn test_assignment_to_undeclared_variable_recovers() {
    let output = compile("(decl main int (= ghost 1) 2)");

    assert_eq!(diagnostic_names(&output), vec!["UndeclaredVariable"]);
    // Analysis continued past the bad assignment.
    assert!(output.code.contains("setl(2, eax);"));
}

#[test]
fn test_unresolved_identifier_is_fatal() {
    let file = parse("(decl main int ghost)");
    let result = compile_file(&file);

    assert!(matches!(
        result,
        Err(InternalError::UnresolvedIdent { .. })
    ));
}
