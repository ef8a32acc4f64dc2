// File: src/compiler.rs
//
// Bytecode compiler (spec.md §4.2). Walks the AST once, resolving
// identifiers through a stack of symbol tables and emitting flat
// `Instructions` into a stack of per-function `CompilationScope`s.
//
// The one piece of compiler state that isn't purely structural is the
// hope-block subsystem (§4.2.3, §4.2.4): right after a function-valued
// `Define`'s own `SetGlobal`/`SetLocal`, the compiler inlines one
// assertion fragment per hope case and, if `fuzzing N` is present, N
// smoke-test fragments with randomly generated arguments — unless the
// function's canonical text still matches its entry in the hash log
// from a previous run, or the compiler was built in productive mode.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::ast::{Block, Expr, FunctionLiteral, Program, Stmt};
use crate::bytecode::{Bytecode, Instructions, OpCode, Tag};
use crate::builtins;
use crate::errors::{HopeError, SourceLocation};
use crate::hope;
use crate::symbol_table::{Scope, Symbol, SymbolTable};
use crate::value::{CompiledFunction, Value};
use std::cell::RefCell;

struct CompilationScope {
    instructions: Instructions,
}

pub struct Compiler {
    scopes: Vec<CompilationScope>,
    symbol_table: Rc<RefCell<SymbolTable>>,
    constants: Vec<Value>,
    /// Name pool `Hope`'s second operand indexes into.
    function_names: Vec<String>,
    /// Builtin values preloaded into the low global slots.
    builtins: Vec<Value>,
    /// When set, hope blocks are not compiled at all (§6 `-p`/`--productive`).
    productive: bool,
    /// Digests of functions already verified in a previous run.
    hash_log: HashMap<String, [u8; 16]>,
    memo_dir: PathBuf,
}

impl Compiler {
    pub fn new(productive: bool, memo_dir: impl Into<PathBuf>) -> Self {
        let memo_dir = memo_dir.into();
        let hash_log = if productive { HashMap::new() } else { hope::load(&memo_dir) };

        let symbol_table = SymbolTable::new();
        let mut builtins = Vec::new();
        for builtin in builtins::table() {
            symbol_table.borrow_mut().define(builtin.name);
            builtins.push(Value::Builtin(Rc::new(builtin)));
        }

        Self {
            scopes: Vec::new(),
            symbol_table,
            constants: Vec::new(),
            function_names: Vec::new(),
            builtins,
            productive,
            hash_log,
            memo_dir,
        }
    }

    pub fn compile(mut self, program: &Program) -> Result<Bytecode, HopeError> {
        self.scopes.push(CompilationScope { instructions: Instructions::new() });

        let n = program.statements.len();
        for (i, stmt) in program.statements.iter().enumerate() {
            self.compile_stmt(stmt, i + 1 == n)?;
        }

        if !self.productive {
            if let Err(err) = hope::save(&self.memo_dir, &self.hash_log) {
                eprintln!("warning: failed to persist {}: {err}", hope::MEMOIZATION_FILE);
            }
        }

        let scope = self.scopes.pop().expect("program scope");
        Ok(Bytecode {
            instructions: scope.instructions,
            constants: self.constants,
            function_names: self.function_names,
            builtins: self.builtins,
        })
    }

    // -- scope / emission plumbing -----------------------------------

    fn instructions_mut(&mut self) -> &mut Instructions {
        &mut self.scopes.last_mut().expect("no active compilation scope").instructions
    }

    fn current_len(&self) -> usize {
        self.scopes.last().expect("no active compilation scope").instructions.len()
    }

    fn emit(&mut self, op: OpCode) -> usize {
        self.instructions_mut().emit(op)
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope { instructions: Instructions::new() });
        let outer = self.symbol_table.clone();
        self.symbol_table = SymbolTable::enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("leave_scope with no active scope");
        let outer = self.symbol_table.borrow().outer().expect("leave_scope at global scope");
        self.symbol_table = outer;
        scope.instructions
    }

    fn add_constant(&mut self, value: Value) -> u16 {
        self.constants.push(value);
        (self.constants.len() - 1) as u16
    }

    fn intern_function_name(&mut self, name: &str) -> u16 {
        if let Some(pos) = self.function_names.iter().position(|n| n == name) {
            return pos as u16;
        }
        self.function_names.push(name.to_string());
        (self.function_names.len() - 1) as u16
    }

    fn resolve(&self, name: &str) -> Result<Symbol, HopeError> {
        match self.symbol_table.borrow().resolve(name) {
            Ok(Some(symbol)) => Ok(symbol),
            Ok(None) => Err(HopeError::undefined_identifier(name, SourceLocation::unknown())),
            Err(()) => Err(HopeError::closure_over_local(name, SourceLocation::unknown())),
        }
    }

    fn emit_get(&mut self, symbol: &Symbol) {
        match symbol.scope {
            Scope::Global => {
                self.emit(OpCode::GetGlobal(symbol.index));
            }
            Scope::Local => {
                self.emit(OpCode::GetLocal(symbol.index as u8));
            }
        }
    }

    fn emit_set(&mut self, symbol: &Symbol) {
        match symbol.scope {
            Scope::Global => {
                self.emit(OpCode::SetGlobal(symbol.index));
            }
            Scope::Local => {
                self.emit(OpCode::SetLocal(symbol.index as u8));
            }
        }
    }

    // -- statements ----------------------------------------------------

    /// `tail` marks the last statement of a block/program: its value (if
    /// it's a bare expression statement) is left on the stack instead of
    /// popped, since it's either the block's implicit result (read by an
    /// enclosing `ReturnValue`) or, at the program's outermost level, the
    /// run's final value.
    fn compile_stmt(&mut self, stmt: &Stmt, tail: bool) -> Result<(), HopeError> {
        match stmt {
            Stmt::Define { name, value } => self.compile_define(name, value),
            Stmt::Assign { name, value } => self.compile_assign(name, value),
            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
                if !tail {
                    self.emit(OpCode::Pop);
                }
                Ok(())
            }
            Stmt::If { arms, else_block } => self.compile_if(arms, else_block, tail),
            Stmt::While { condition, body } => self.compile_while(condition, body),
        }
    }

    fn compile_block(&mut self, block: &Block, tail: bool) -> Result<(), HopeError> {
        let n = block.statements.len();
        for (i, stmt) in block.statements.iter().enumerate() {
            self.compile_stmt(stmt, tail && i + 1 == n)?;
        }
        Ok(())
    }

    fn compile_define(&mut self, name: &str, value: &Expr) -> Result<(), HopeError> {
        // Defined before its value is compiled, so a function literal can
        // call itself by name (recursion).
        let symbol = self.symbol_table.borrow_mut().define(name);

        match value {
            Expr::Function(func) => self.compile_function_literal(func, Some(name))?,
            other => self.compile_expr(other)?,
        }
        self.emit_set(&symbol);

        if let Expr::Function(func) = value {
            self.maybe_emit_hope(name, func)?;
        }
        Ok(())
    }

    fn compile_assign(&mut self, name: &str, value: &Expr) -> Result<(), HopeError> {
        self.compile_expr(value)?;
        let symbol = self.resolve(name)?;
        self.emit_set(&symbol);
        Ok(())
    }

    /// If/else-if/else chain (§4.2.1): for every arm, lower the
    /// condition, reserve a `JumpIfFalse`, lower the arm's block, and
    /// (unless it's the final arm) reserve an unconditional `Jump` to
    /// the join point. Every reserved `Jump` is patched to the current
    /// offset once the whole chain — including a trailing `else` — has
    /// been lowered.
    fn compile_if(
        &mut self,
        arms: &[(Expr, Block)],
        else_block: &Option<Block>,
        tail: bool,
    ) -> Result<(), HopeError> {
        let mut end_jumps = Vec::new();
        let n = arms.len();

        for (i, (condition, block)) in arms.iter().enumerate() {
            self.compile_expr(condition)?;
            let jump_if_false = self.instructions_mut().reserve(Tag::JumpIfFalse);

            self.compile_block(block, tail)?;

            let is_final_arm = i + 1 == n && else_block.is_none();
            if !is_final_arm {
                end_jumps.push(self.instructions_mut().reserve(Tag::Jump));
            }

            let next = self.current_len() as u16;
            self.instructions_mut().patch_u16(jump_if_false, next);
        }

        if let Some(block) = else_block {
            self.compile_block(block, tail)?;
        }

        let end = self.current_len() as u16;
        for jump in end_jumps {
            self.instructions_mut().patch_u16(jump, end);
        }
        Ok(())
    }

    fn compile_while(&mut self, condition: &Expr, body: &Block) -> Result<(), HopeError> {
        let loop_start = self.current_len() as u16;
        self.compile_expr(condition)?;
        let jump_if_false = self.instructions_mut().reserve(Tag::JumpIfFalse);

        // A loop body never occupies tail position: every iteration must
        // leave the stack exactly as it found it.
        self.compile_block(body, false)?;
        self.emit(OpCode::Jump(loop_start));

        let end = self.current_len() as u16;
        self.instructions_mut().patch_u16(jump_if_false, end);
        Ok(())
    }

    // -- expressions -----------------------------------------------------

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), HopeError> {
        match expr {
            Expr::Integer(n) => {
                let idx = self.add_constant(Value::Integer(*n));
                self.emit(OpCode::Constant(idx));
            }
            Expr::Boolean(b) => {
                let idx = self.add_constant(Value::Boolean(*b));
                self.emit(OpCode::Constant(idx));
            }
            Expr::String(s) => {
                let idx = self.add_constant(Value::string(s.clone()));
                self.emit(OpCode::Constant(idx));
            }
            Expr::Identifier(name) => {
                let symbol = self.resolve(name)?;
                self.emit_get(&symbol);
            }
            Expr::Array(elements) => {
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.emit(OpCode::Array(elements.len() as u16));
            }
            Expr::Index { left, index } => {
                self.compile_expr(left)?;
                self.compile_expr(index)?;
                self.emit(OpCode::Index);
            }
            Expr::Unary { op, right } => {
                self.compile_expr(right)?;
                match op.as_str() {
                    "-" => self.emit(OpCode::Minus),
                    "!" => self.emit(OpCode::Bang),
                    other => return Err(HopeError::illegal_operator(other, "unary expression")),
                };
            }
            Expr::Infix { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                let opcode = Self::infix_opcode(op)?;
                self.emit(opcode);
            }
            Expr::Ternary { condition, then_expr, else_expr } => {
                self.compile_expr(condition)?;
                let jump_if_false = self.instructions_mut().reserve(Tag::JumpIfFalse);

                self.compile_expr(then_expr)?;
                let jump_to_end = self.instructions_mut().reserve(Tag::Jump);

                let else_start = self.current_len() as u16;
                self.instructions_mut().patch_u16(jump_if_false, else_start);

                self.compile_expr(else_expr)?;
                let end = self.current_len() as u16;
                self.instructions_mut().patch_u16(jump_to_end, end);
            }
            Expr::Call { callee, args } => {
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.emit(OpCode::Call(args.len() as u8));
            }
            Expr::Function(func) => {
                self.compile_function_literal(func, None)?;
            }
        }
        Ok(())
    }

    fn infix_opcode(op: &str) -> Result<OpCode, HopeError> {
        Ok(match op {
            "+" => OpCode::Add,
            "-" => OpCode::Sub,
            "*" => OpCode::Mul,
            "/" => OpCode::Div,
            "%" => OpCode::Mod,
            "<" => OpCode::Lt,
            ">" => OpCode::Gt,
            "<=" => OpCode::Lte,
            ">=" => OpCode::Gte,
            "==" => OpCode::Eq,
            "!=" => OpCode::Neq,
            other => return Err(HopeError::illegal_operator(other, "infix expression")),
        })
    }

    /// Function literals compile in their own scope (§4.2.2): a fresh
    /// symbol table enclosing the definition site's, parameters defined
    /// as its first locals, the body lowered with its last statement in
    /// tail position, and a trailing `ReturnValue`.
    fn compile_function_literal(
        &mut self,
        func: &FunctionLiteral,
        name: Option<&str>,
    ) -> Result<(), HopeError> {
        self.enter_scope();
        for param in &func.params {
            self.symbol_table.borrow_mut().define(param);
        }

        self.compile_block(&func.body, true)?;
        self.emit(OpCode::ReturnValue);

        let num_locals = self.symbol_table.borrow().size;
        let instructions = self.leave_scope();

        let compiled = CompiledFunction {
            instructions: instructions.0,
            num_locals,
            num_params: func.params.len() as u8,
            name: name.map(str::to_string),
        };
        let idx = self.add_constant(Value::CompiledFunction(Rc::new(compiled)));
        self.emit(OpCode::Constant(idx));
        Ok(())
    }

    /// Hope-block inlining (§4.2.3, §4.2.4). Emitted immediately after
    /// the function's own `SetGlobal`/`SetLocal`, so the assertions run
    /// against the fully bound function the moment its definition is
    /// reached, in source order.
    fn maybe_emit_hope(&mut self, name: &str, func: &FunctionLiteral) -> Result<(), HopeError> {
        if self.productive {
            return Ok(());
        }
        let Some(hope) = &func.hope else { return Ok(()) };

        let digest = hope::digest_text(&func.canonical_text());
        if self.hash_log.get(name) == Some(&digest) {
            return Ok(()); // unchanged since it last passed verification
        }

        let symbol = self.resolve(name)?;
        let name_idx = self.intern_function_name(name);

        for (case_id, case) in hope.cases.iter().enumerate() {
            self.emit_get(&symbol);
            for arg in &case.args {
                self.compile_expr(arg)?;
            }
            self.emit(OpCode::Call(case.args.len() as u8));
            self.compile_expr(&case.expected)?;
            // spec.md §4.2.3: case ids are 1-based (`Hope i+1`).
            self.emit(OpCode::Hope(case_id as u8 + 1, name_idx));
        }

        if let Some(n_fuzz) = hope.n_fuzz {
            for _ in 0..n_fuzz {
                self.emit_get(&symbol);
                for param_type in &func.param_types {
                    let value = hope::random_value(param_type.as_deref());
                    let idx = self.add_constant(value);
                    self.emit(OpCode::Constant(idx));
                }
                self.emit(OpCode::Call(func.params.len() as u8));
                // Fuzzing is a smoke test only (§9): success means the
                // call didn't error, so its result is simply discarded.
                self.emit(OpCode::Pop);
            }
        }

        self.hash_log.insert(name.to_string(), digest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Tag;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn compile_source(src: &str) -> Bytecode {
        let dir = std::env::temp_dir().join(format!("hope-compiler-test-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let program = parse(tokenize(src).unwrap()).unwrap();
        let bytecode = Compiler::new(true, dir.clone()).compile(&program).unwrap();
        let _ = std::fs::remove_dir_all(&dir);
        bytecode
    }

    fn first_tag(bytecode: &Bytecode) -> Tag {
        Tag::from_byte(bytecode.instructions.0[0])
    }

    #[test]
    fn arithmetic_compiles_to_constants_and_add() {
        let bytecode = compile_source("1 + 2");
        assert_eq!(first_tag(&bytecode), Tag::Constant);
        assert!(bytecode.instructions.0.contains(&(Tag::Add as u8)));
        // tail position: no trailing Pop
        assert_ne!(*bytecode.instructions.0.last().unwrap(), Tag::Pop as u8);
    }

    #[test]
    fn non_tail_expression_statement_is_popped() {
        let bytecode = compile_source("1 + 2\n3");
        assert!(bytecode.instructions.0.contains(&(Tag::Pop as u8)));
    }

    #[test]
    fn define_emits_set_global() {
        let bytecode = compile_source("n := 5");
        assert!(bytecode.instructions.0.contains(&(Tag::SetGlobal as u8)));
    }

    #[test]
    fn builtins_occupy_first_global_slots() {
        let bytecode = compile_source("n := 1");
        assert_eq!(bytecode.builtins.len(), 2);
        assert!(matches!(bytecode.builtins[0], Value::Builtin(_)));
    }

    #[test]
    fn recursive_function_resolves_its_own_name() {
        let bytecode =
            compile_source("fib := func(n){ if n <= 1 { n } else { fib(n-1) + fib(n-2) } }");
        assert!(bytecode.instructions.0.contains(&(Tag::SetGlobal as u8)));
        assert!(matches!(bytecode.constants.last(), Some(Value::CompiledFunction(_))));
    }

    #[test]
    fn hope_block_emits_hope_opcode_unless_productive() {
        let src = "add := func(x,y){ x + y } hope {\n1,1 -> 2\n}";
        let dir = std::env::temp_dir().join(format!("hope-compiler-test-hope-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let program = parse(tokenize(src).unwrap()).unwrap();

        let non_productive = Compiler::new(false, dir.clone()).compile(&program).unwrap();
        assert!(non_productive.instructions.0.contains(&(Tag::Hope as u8)));
        assert_eq!(non_productive.function_names, vec!["add".to_string()]);

        let productive = Compiler::new(true, dir.clone()).compile(&program).unwrap();
        assert!(!productive.instructions.0.contains(&(Tag::Hope as u8)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn memoized_function_skips_reverification() {
        let src = "add := func(x,y){ x + y } hope {\n1,1 -> 2\n}";
        let dir =
            std::env::temp_dir().join(format!("hope-compiler-test-memo-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let program = parse(tokenize(src).unwrap()).unwrap();

        let first = Compiler::new(false, dir.clone()).compile(&program).unwrap();
        assert!(first.instructions.0.contains(&(Tag::Hope as u8)));

        // Second compile in the same directory finds the hash log from
        // the first run and should skip the now-redundant verification.
        let second = Compiler::new(false, dir.clone()).compile(&program).unwrap();
        assert!(!second.instructions.0.contains(&(Tag::Hope as u8)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unresolved_identifier_is_a_compile_error() {
        let dir = std::env::temp_dir().join(format!("hope-compiler-test-undef-{}", std::process::id()));
        let program = parse(tokenize("x").unwrap()).unwrap();
        assert!(Compiler::new(true, dir).compile(&program).is_err());
    }

    #[test]
    fn closure_over_local_is_rejected() {
        let dir = std::env::temp_dir().join(format!("hope-compiler-test-closure-{}", std::process::id()));
        let program =
            parse(tokenize("outer := func(x){ inner := func(){ x } inner() }").unwrap()).unwrap();
        assert!(Compiler::new(true, dir).compile(&program).is_err());
    }
}
