// Integration tests: exercise the full lexer -> parser -> compiler -> VM
// pipeline on complete source snippets, the same way a CLI invocation or a
// REPL line would.

use ruffle::code::OpCode;
use ruffle::compiler;
use ruffle::lexer::tokenize;
use ruffle::parser;
use ruffle::value::Value;
use ruffle::vm::VM;

fn run(source: &str) -> VM {
    let (tokens, lex_errors) = tokenize(source);
    assert!(!lex_errors.has_errors(), "lex errors: {:?}", lex_errors.errors());
    let (program, symbols, parse_errors) = parser::parse(tokens);
    assert!(!parse_errors.has_errors(), "parse errors: {:?}", parse_errors.errors());
    let (bytecode, compile_errors) = compiler::compile(&program, symbols, false, true);
    assert!(!compile_errors.has_errors(), "compile errors: {:?}", compile_errors.errors());
    let mut vm = VM::new();
    vm.run(bytecode).expect("program should run without a runtime error");
    vm
}

fn global(vm: &VM, slot: usize) -> Value {
    vm.global(slot)
}

// --- Concrete scenarios, verbatim from source text ---

#[test]
fn scenario_loop_accumulates_multiples_of_three_plus_one() {
    let vm = run("var a=1\nvar sum=0\nfor(;a<=10;a=a+1){ if(a%3==1){ sum=sum+a } }\nprint(sum)");
    assert!(matches!(global(&vm, 1), Value::Int(22)));
}

#[test]
fn scenario_recursive_fibonacci() {
    let vm = run("def fib(n){ if(n<=1){ return n }\nreturn fib(n-1)+fib(n-2) }\nvar result=fib(10)\nprint(result)");
    // Global slot 0 is `fib` itself (bound by the `def`); `result` is slot 1.
    assert!(matches!(global(&vm, 1), Value::Int(55)));
}

#[test]
fn scenario_indexed_assignment_writes_through_the_shared_array() {
    let vm = run("var a=[1,2,3]\na[1]=99\nprint(a)");
    let Value::Array(arr) = global(&vm, 0) else { panic!("expected array global") };
    let values: Vec<i64> = arr
        .borrow()
        .iter()
        .map(|v| match v {
            Value::Int(i) => *i,
            other => panic!("expected int, got {other:?}"),
        })
        .collect();
    assert_eq!(values, vec![1, 99, 3]);
}

#[test]
fn scenario_type_tagged_map_keys_keep_int_and_string_distinct() {
    let vm = run("var d={}\nd[1]=10\nd[\"1\"]=\"x\"\nprint(d[1])\nprint(d[\"1\"])");
    let Value::Map(map) = global(&vm, 0) else { panic!("expected map global") };
    assert!(matches!(map.borrow().get(&Value::Int(1)), Some(Value::Int(10))));
    let tagged = map.borrow();
    match tagged.get(&Value::Str("1".into())) {
        Some(Value::Str(s)) => assert_eq!(&**s, "x"),
        other => panic!("expected string value for string key, got {other:?}"),
    }
}

#[test]
fn scenario_string_upper_method() {
    let vm = run("var s=\"hello world\"\nvar upper=s.upper()\nprint(upper)");
    match global(&vm, 1) {
        Value::Str(s) => assert_eq!(&*s, "HELLO WORLD"),
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn scenario_negative_step_slice_reverses_an_array() {
    let vm = run("var xs=[1,2,3,4,5]\nvar rev=xs[::-1]\nprint(rev)");
    let Value::Array(arr) = global(&vm, 1) else { panic!("expected array global") };
    let values: Vec<i64> = arr
        .borrow()
        .iter()
        .map(|v| match v {
            Value::Int(i) => *i,
            other => panic!("expected int, got {other:?}"),
        })
        .collect();
    assert_eq!(values, vec![5, 4, 3, 2, 1]);
}

#[test]
fn scenario_function_body_mutates_global_without_shadowing() {
    let vm = run("var a=1\ndef f(){ a=2 }\nf()\nprint(a)");
    assert!(matches!(global(&vm, 0), Value::Int(2)));
}

// --- Universal properties (spec section 8) ---

#[test]
fn arity_mismatch_is_a_runtime_error_and_does_not_panic() {
    let (tokens, _) = tokenize("def add(a,b){ return a+b }\nadd(1,2,3)");
    let (program, symbols, parse_errors) = parser::parse(tokens);
    assert!(!parse_errors.has_errors());
    let (bytecode, compile_errors) = compiler::compile(&program, symbols, false, true);
    assert!(!compile_errors.has_errors());
    let mut vm = VM::new();
    assert!(vm.run(bytecode).is_err());
}

#[test]
fn arity_mismatch_with_too_few_args_is_also_a_runtime_error() {
    let (tokens, _) = tokenize("def add(a,b){ return a+b }\nadd(1)");
    let (program, symbols, _) = parser::parse(tokens);
    let (bytecode, _) = compiler::compile(&program, symbols, false, true);
    let mut vm = VM::new();
    assert!(vm.run(bytecode).is_err());
}

#[test]
fn determinism_same_bytecode_twice_on_fresh_vms_agrees() {
    let source = "var total=0\nfor(var i=0;i<5;i=i+1){ total=total+i*i }\nprint(total)";
    let (tokens1, _) = tokenize(source);
    let (program1, symbols1, _) = parser::parse(tokens1);
    let (bytecode1, _) = compiler::compile(&program1, symbols1, false, true);
    let mut vm1 = VM::new();
    vm1.run(bytecode1).unwrap();

    let (tokens2, _) = tokenize(source);
    let (program2, symbols2, _) = parser::parse(tokens2);
    let (bytecode2, _) = compiler::compile(&program2, symbols2, false, true);
    let mut vm2 = VM::new();
    vm2.run(bytecode2).unwrap();

    let (Value::Int(a), Value::Int(b)) = (global(&vm1, 0), global(&vm2, 0)) else {
        panic!("expected both runs to leave an int global")
    };
    assert_eq!(a, b);
}

#[test]
fn update_fusion_matches_explicit_set_then_get() {
    let fused = run("var a=1\nvar b=a\nprint(b)");
    let unfused = run("var a=1\nvar unused=0\nvar b=a\nprint(b)");
    assert!(matches!(global(&fused, 1), Value::Int(1)));
    assert!(matches!(global(&unfused, 2), Value::Int(1)));
}

#[test]
fn map_inspect_contains_every_literal_entry() {
    let vm = run("var d={1: \"a\", \"k\": 2, 3: true}");
    let Value::Map(map) = global(&vm, 0) else { panic!("expected map global") };
    let inspected = ruffle::value::inspect(&Value::Map(map.clone()));
    assert!(inspected.starts_with('{') && inspected.ends_with('}'));
    let borrowed = map.borrow();
    assert_eq!(borrowed.len(), 3);
}

#[test]
fn division_always_promotes_to_float_even_for_two_ints() {
    let vm = run("var q=10/4\nprint(q)");
    match global(&vm, 0) {
        Value::Float(f) => assert!((f - 2.5).abs() < 1e-9),
        other => panic!("expected float, got {other:?}"),
    }
}

#[test]
fn power_always_promotes_to_float() {
    let vm = run("var q=2**3\nprint(q)");
    match global(&vm, 0) {
        Value::Float(f) => assert!((f - 8.0).abs() < 1e-9),
        other => panic!("expected float, got {other:?}"),
    }
}

#[test]
fn add_sub_mul_mod_stay_int_when_both_operands_are_int() {
    let vm = run("var a=7+3\nvar b=7-3\nvar c=7*3\nvar d=7%3\nprint(a)");
    assert!(matches!(global(&vm, 0), Value::Int(10)));
    assert!(matches!(global(&vm, 1), Value::Int(4)));
    assert!(matches!(global(&vm, 2), Value::Int(21)));
    assert!(matches!(global(&vm, 3), Value::Int(1)));
}

#[test]
fn division_by_zero_is_a_runtime_error_not_a_float_infinity() {
    let (tokens, _) = tokenize("var x=1/0");
    let (program, symbols, _) = parser::parse(tokens);
    let (bytecode, _) = compiler::compile(&program, symbols, false, true);
    let mut vm = VM::new();
    assert!(vm.run(bytecode).is_err());
}

#[test]
fn modulo_by_zero_is_a_runtime_error() {
    let (tokens, _) = tokenize("var x=1%0");
    let (program, symbols, _) = parser::parse(tokens);
    let (bytecode, _) = compiler::compile(&program, symbols, false, true);
    let mut vm = VM::new();
    assert!(vm.run(bytecode).is_err());
}

#[test]
fn string_concatenation_uses_inspect_form_of_both_sides() {
    let vm = run("var s=\"count: \"+5");
    match global(&vm, 0) {
        Value::Str(s) => assert_eq!(&*s, "count: 5"),
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn negative_index_wraps_the_same_way_for_arrays_and_strings() {
    let vm = run("var xs=[10,20,30]\nvar last=xs[-1]\nvar s=\"abc\"\nvar lastc=s[-1]");
    assert!(matches!(global(&vm, 1), Value::Int(30)));
    match global(&vm, 3) {
        Value::Str(s) => assert_eq!(&*s, "c"),
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn out_of_range_string_index_is_a_runtime_error_not_truncation() {
    let (tokens, _) = tokenize("var s=\"ab\"\nvar c=s[5]");
    let (program, symbols, _) = parser::parse(tokens);
    let (bytecode, _) = compiler::compile(&program, symbols, false, true);
    let mut vm = VM::new();
    assert!(vm.run(bytecode).is_err());
}

#[test]
fn and_or_do_not_short_circuit_and_evaluate_both_operands() {
    // Calling a function for its side effect on both sides of `or` is only
    // observable if both operands actually run.
    let vm = run("var calls=0\ndef bump(){ calls=calls+1\nreturn true }\nvar r=bump() or bump()\nprint(r)");
    assert!(matches!(global(&vm, 0), Value::Int(2)));
}

#[test]
fn byte_disassembly_round_trips_every_emitted_opcode() {
    let (tokens, _) = tokenize("var a=1\nvar b=[1,2][0]\nprint(a+b)");
    let (program, symbols, _) = parser::parse(tokens);
    let (bytecode, errors) = compiler::compile(&program, symbols, false, true);
    assert!(!errors.has_errors());
    let mut offset = 0;
    while offset < bytecode.instructions.len() {
        let byte = bytecode.instructions[offset];
        let op = OpCode::from_byte(byte).unwrap_or_else(|| panic!("invalid opcode byte {byte} at {offset}"));
        let (_, width) = ruffle::code::read_operands(op, &bytecode.instructions, offset + 1);
        offset += 1 + width;
    }
    assert_eq!(offset, bytecode.instructions.len());
}

#[test]
fn dump_bytecode_disassembly_does_not_panic() {
    let (tokens, _) = tokenize("def f(n){ return n*2 }\nprint(f(21))");
    let (program, symbols, _) = parser::parse(tokens);
    let (bytecode, _) = compiler::compile(&program, symbols, false, true);
    let rendered = format!("{}", bytecode);
    assert!(!rendered.is_empty());
}

#[test]
fn no_peephole_flag_still_produces_the_same_observable_result() {
    let source = "var a=1\nvar b=a\nprint(b)";
    let (tokens, _) = tokenize(source);
    let (program, symbols, _) = parser::parse(tokens);
    let (bytecode, _) = compiler::compile(&program, symbols, false, false);
    let mut vm = VM::new();
    vm.run(bytecode).unwrap();
    assert!(matches!(global(&vm, 1), Value::Int(1)));
}
