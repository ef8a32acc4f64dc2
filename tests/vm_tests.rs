// Integration tests for the lex -> parse -> compile -> run pipeline,
// driven entirely through hopelang's public API, mirroring the example
// programs in spec.md §8.

use hopelang::compiler::Compiler;
use hopelang::lexer::tokenize;
use hopelang::parser::parse;
use hopelang::value::Value;
use hopelang::vm::VM;

fn run(dir: &std::path::Path, source: &str) -> VM {
    let program = parse(tokenize(source).unwrap()).unwrap();
    let bytecode = Compiler::new(true, dir).compile(&program).unwrap();
    let mut vm = VM::new(bytecode);
    vm.run().unwrap();
    vm
}

fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("hope-vm-itest-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn simple_arithmetic() {
    let dir = scratch_dir("arith");
    let vm = run(&dir, "1 + 2 * 3");
    assert_eq!(vm.top_of_stack(), Some(&Value::Integer(7)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn string_equality() {
    let dir = scratch_dir("streq");
    let vm = run(&dir, "\"hope\" == \"hope\"");
    assert_eq!(vm.top_of_stack(), Some(&Value::Boolean(true)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn if_else_if_else_chain() {
    let dir = scratch_dir("ifchain");
    let vm = run(
        &dir,
        "n := 2\nif n == 1 {\n10\n} else if n == 2 {\n20\n} else {\n30\n}",
    );
    assert_eq!(vm.top_of_stack(), Some(&Value::Integer(20)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn while_loop_accumulates() {
    let dir = scratch_dir("while");
    let vm = run(&dir, "total := 0\ni := 0\nwhile i < 5 {\ntotal = total + i\ni = i + 1\n}\ntotal");
    assert_eq!(vm.top_of_stack(), Some(&Value::Integer(10)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn recursive_function_call() {
    let dir = scratch_dir("fib");
    let vm = run(
        &dir,
        "fib := func(n){ if n <= 1 { n } else { fib(n-1) + fib(n-2) } }\nfib(10)",
    );
    assert_eq!(vm.top_of_stack(), Some(&Value::Integer(55)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn nested_function_can_read_an_enclosing_global() {
    let dir = scratch_dir("globalread");
    let vm = run(&dir, "limit := 3\nunder := func(n){ n < limit }\nunder(2)");
    assert_eq!(vm.top_of_stack(), Some(&Value::Boolean(true)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn closure_over_enclosing_local_is_rejected() {
    let dir = scratch_dir("badclosure");
    let program =
        parse(tokenize("outer := func(x){ inner := func(){ x } inner() }").unwrap()).unwrap();
    assert!(Compiler::new(true, &dir).compile(&program).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn array_append_is_observable_through_every_handle() {
    let dir = scratch_dir("append");
    let vm = run(&dir, "a := [1,2]\nb := a\nappend(a, 3)\nlen(b)");
    assert_eq!(vm.top_of_stack(), Some(&Value::Integer(3)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn index_out_of_range_aborts_the_run() {
    let dir = scratch_dir("oob");
    let program = parse(tokenize("a := [1,2]\na[9]").unwrap()).unwrap();
    let bytecode = Compiler::new(true, &dir).compile(&program).unwrap();
    assert!(VM::new(bytecode).run().is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
