// File: src/compiler.rs
//
// Single-pass AST-to-bytecode lowering. The parser has already built the
// symbol table (`parser.rs`), so compiling a function body means finding
// the scope the parser built for it (`SymbolTableNode::find_child`) and
// emitting into a fresh instruction buffer for that scope.
//
// Each `CompilationScope` tracks its last two emitted instructions so the
// Update peephole (a Set immediately followed by a read of the same slot
// collapses into one Update instruction, see `try_fuse_update`) can be
// applied, and so function bodies can rewrite a trailing Pop into a
// ReturnValue.

use crate::ast::{AssignTarget, Expr, InfixOp, PrefixOp, Program, Stmt};
use crate::bytecode::Bytecode;
use crate::code::{make, OpCode};
use crate::errors::{CompileError, ErrorList, SourceLocation, Stage};
use crate::symbol_table::{Symbol, SymbolScope, SymbolTable};
use crate::value::{CompiledFunction, Value};
use std::collections::HashMap;
use std::rc::Rc;

struct EmittedInstruction {
    op: OpCode,
    position: usize,
}

struct CompilationScope {
    instructions: Vec<u8>,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

impl CompilationScope {
    fn new() -> Self {
        CompilationScope { instructions: Vec::new(), last_instruction: None, previous_instruction: None }
    }
}

/// One active loop's start offset (for the back-jump) and the positions
/// of any `break` jumps emitted inside it, patched once the loop's end
/// offset is known.
struct LoopContext {
    break_jumps: Vec<usize>,
}

pub struct Compiler {
    constants: Vec<Value>,
    scopes: Vec<CompilationScope>,
    /// Scope the compiler is currently emitting into; swapped for the
    /// duration of a function body via `find_child`.
    symbol_table: SymbolTable,
    /// Always the program's root scope, used to re-enter a function's
    /// scope by name regardless of how deep the compiler is currently
    /// nested (nested `def`s still have globally unique block names).
    root_symbol_table: SymbolTable,
    /// Function name -> constant-pool index. An identifier naming a
    /// function always pushes its `CompiledFunction` constant directly
    /// (see `compile_identifier`) instead of going through a Get opcode;
    /// functions are never bound into a variable slot.
    functions: HashMap<String, u16>,
    loops: Vec<LoopContext>,
    /// Disabled while compiling a `for` loop's init/step clauses so the
    /// Update peephole can't fuse across them (see §9 REDESIGN FLAGS).
    fusion_enabled: bool,
    /// Global switch, off when the driver passes `--no-peephole`.
    peephole_enabled: bool,
    pub errors: ErrorList,
}

impl Compiler {
    fn new(symbol_table: SymbolTable, peephole_enabled: bool) -> Self {
        Compiler {
            constants: Vec::new(),
            scopes: vec![CompilationScope::new()],
            symbol_table: Rc::clone(&symbol_table),
            root_symbol_table: symbol_table,
            functions: HashMap::new(),
            loops: Vec::new(),
            fusion_enabled: true,
            peephole_enabled,
            errors: ErrorList::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(CompileError::new(Stage::Compile, message, SourceLocation::unknown()));
    }

    /// Like `error`, but attaches a "did you mean?" suggestion when some
    /// known name is within edit-distance 3 of `name`.
    fn error_undefined(&mut self, message: impl Into<String>, name: &str) {
        let known = self.symbol_table.borrow().all_names();
        let candidates: Vec<&str> = known.iter().map(|s| s.as_str()).collect();
        let mut err = CompileError::new(Stage::Compile, message, SourceLocation::unknown());
        if let Some(suggestion) = crate::errors::find_closest_match(name, &candidates) {
            err = err.with_suggestion(suggestion);
        }
        self.errors.push(err);
    }

    // ---- instruction buffer plumbing -----------------------------------

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("compiler always has an active scope")
    }

    fn current_instructions(&self) -> &[u8] {
        &self.scopes.last().expect("compiler always has an active scope").instructions
    }

    fn emit(&mut self, op: OpCode, operands: &[i64]) -> usize {
        let bytes = make(op, operands);
        let position = self.current_instructions().len();
        let scope = self.current_scope_mut();
        scope.instructions.extend_from_slice(&bytes);
        scope.previous_instruction = scope.last_instruction.take();
        scope.last_instruction = Some(EmittedInstruction { op, position });
        position
    }

    fn last_instruction_is(&self, op: OpCode) -> bool {
        self.scopes.last().unwrap().last_instruction.as_ref().map(|i| i.op) == Some(op)
    }

    /// Rewrites the opcode byte of the last-emitted instruction in place,
    /// used both for the `Pop` -> `ReturnValue` function-body fixup and
    /// for the Update peephole. Valid only because every pair this is
    /// used on shares the same operand width.
    fn replace_last_opcode(&mut self, new_op: OpCode) {
        let scope = self.current_scope_mut();
        let pos = scope.last_instruction.as_ref().unwrap().position;
        scope.instructions[pos] = new_op as u8;
        scope.last_instruction.as_mut().unwrap().op = new_op;
    }

    fn change_operand(&mut self, pos: usize, operand: i64) {
        let op = OpCode::from_byte(self.current_instructions()[pos]).expect("patch site is an opcode");
        let new_bytes = make(op, &[operand]);
        let scope = self.current_scope_mut();
        scope.instructions[pos..pos + new_bytes.len()].copy_from_slice(&new_bytes);
    }

    fn add_constant(&mut self, value: Value) -> u16 {
        self.constants.push(value);
        (self.constants.len() - 1) as u16
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::new());
    }

    fn leave_scope(&mut self) -> Vec<u8> {
        self.scopes.pop().expect("leave_scope without matching enter_scope").instructions
    }

    /// The Update peephole: a Set{Global,Local} immediately followed by a
    /// read of the same slot collapses into one Update instruction. The
    /// offset check is the REDESIGN FLAGS guard against misfiring across
    /// intervening instructions that happen to leave a matching byte
    /// pattern in the buffer.
    fn try_fuse_update(&mut self, scope: SymbolScope, index: u16) -> bool {
        if !self.peephole_enabled || !self.fusion_enabled {
            return false;
        }
        let (set_op, update_op, width) = match scope {
            SymbolScope::Global => (OpCode::SetGlobal, OpCode::UpdateGlobal, 2usize),
            SymbolScope::Local => (OpCode::SetLocal, OpCode::UpdateLocal, 1usize),
            _ => return false,
        };
        let last = match self.scopes.last().unwrap().last_instruction.as_ref() {
            Some(i) => i,
            None => return false,
        };
        if last.op != set_op {
            return false;
        }
        let expected_pos = self.current_instructions().len() - width - 1;
        if last.position != expected_pos {
            return false;
        }
        let operand_pos = last.position + 1;
        let existing = if width == 2 {
            crate::code::read_u16(self.current_instructions(), operand_pos) as u16
        } else {
            crate::code::read_u8(self.current_instructions(), operand_pos) as u16
        };
        if existing != index {
            return false;
        }
        self.replace_last_opcode(update_op);
        true
    }

    // ---- identifiers ----------------------------------------------------

    fn compile_identifier(&mut self, name: &str) {
        if let Some(&idx) = self.functions.get(name) {
            self.emit(OpCode::Constant, &[idx as i64]);
            return;
        }
        let symbol = match self.symbol_table.borrow().resolve(name) {
            Some(s) => s,
            None => {
                self.error_undefined(format!("use of undefined name '{}'", name), name);
                return;
            }
        };
        self.emit_get(&symbol);
    }

    fn emit_get(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Builtin => {
                self.emit(OpCode::GetBuiltin, &[symbol.index as i64]);
            }
            SymbolScope::Function => {
                // A function's own recursive self-binding is always
                // resolved through `functions` before we get here; this
                // arm only guards against inconsistent compiler state.
                self.error(format!("internal error: unresolved function symbol '{}'", symbol.name));
            }
            SymbolScope::Global => {
                if !self.try_fuse_update(SymbolScope::Global, symbol.index) {
                    self.emit(OpCode::GetGlobal, &[symbol.index as i64]);
                }
            }
            SymbolScope::Local => {
                if !self.try_fuse_update(SymbolScope::Local, symbol.index) {
                    self.emit(OpCode::GetLocal, &[symbol.index as i64]);
                }
            }
        }
    }

    fn emit_set(&mut self, name: &str) {
        let symbol = match self.symbol_table.borrow().resolve(name) {
            Some(s) => s,
            None => {
                self.error_undefined(format!("assignment to undefined name '{}'", name), name);
                return;
            }
        };
        match symbol.scope {
            SymbolScope::Global => {
                self.emit(OpCode::SetGlobal, &[symbol.index as i64]);
            }
            SymbolScope::Local => {
                self.emit(OpCode::SetLocal, &[symbol.index as i64]);
            }
            _ => self.error(format!("cannot assign to '{}'", name)),
        }
    }

    // ---- expressions ------------------------------------------------------

    fn compile_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Int(v) => {
                let idx = self.add_constant(Value::Int(*v));
                self.emit(OpCode::Constant, &[idx as i64]);
            }
            Expr::Float(v) => {
                let idx = self.add_constant(Value::Float(*v));
                self.emit(OpCode::Constant, &[idx as i64]);
            }
            Expr::Str(s) => {
                let idx = self.add_constant(Value::Str(s.as_str().into()));
                self.emit(OpCode::Constant, &[idx as i64]);
            }
            Expr::Bool(b) => {
                self.emit(if *b { OpCode::True } else { OpCode::False }, &[]);
            }
            Expr::None => {
                self.emit(OpCode::Null, &[]);
            }
            Expr::Ident(name) => self.compile_identifier(name),
            Expr::Array(elements) => {
                for e in elements {
                    self.compile_expr(e);
                }
                self.emit(OpCode::BuildArray, &[elements.len() as i64]);
            }
            Expr::Map(pairs) => {
                for (k, v) in pairs {
                    self.compile_expr(k);
                    self.compile_expr(v);
                }
                self.emit(OpCode::BuildMap, &[(pairs.len() * 2) as i64]);
            }
            Expr::Prefix { op, right, .. } => {
                self.compile_expr(right);
                let opcode = match op {
                    PrefixOp::Neg => OpCode::Minus,
                    PrefixOp::Not => OpCode::Not,
                };
                self.emit(opcode, &[]);
            }
            Expr::Infix { op, left, right, .. } => self.compile_infix(*op, left, right),
            Expr::Index { left, index, .. } => {
                self.compile_expr(left);
                self.compile_expr(index);
                self.emit(OpCode::Index, &[]);
            }
            Expr::Slice { left, start, end, step, .. } => {
                self.compile_expr(left);
                self.compile_slice_component(start);
                self.compile_slice_component(end);
                self.compile_slice_component(step);
                self.emit(OpCode::Slice, &[]);
                self.emit(OpCode::Index, &[]);
            }
            Expr::Call { func, args, .. } => {
                self.compile_expr(func);
                for a in args {
                    self.compile_expr(a);
                }
                self.emit(OpCode::Call, &[args.len() as i64]);
            }
            Expr::MethodCall { receiver, method, args, .. } => {
                self.compile_method_call(receiver, method, args);
            }
            Expr::FuncLiteral { params, body, scope_name, .. } => {
                self.compile_function_value(None, params, body, scope_name);
            }
        }
    }

    fn compile_slice_component(&mut self, component: &Option<Box<Expr>>) {
        match component {
            Some(e) => self.compile_expr(e),
            None => {
                self.emit(OpCode::Null, &[]);
            }
        }
    }

    fn compile_infix(&mut self, op: InfixOp, left: &Expr, right: &Expr) {
        if matches!(op, InfixOp::Lt | InfixOp::LtEq) {
            // `a < b` compiles as `b > a`; `a <= b` as `b >= a`.
            self.compile_expr(right);
            self.compile_expr(left);
            self.emit(if op == InfixOp::Lt { OpCode::GreaterThan } else { OpCode::GreaterEq }, &[]);
            return;
        }
        self.compile_expr(left);
        self.compile_expr(right);
        let opcode = match op {
            InfixOp::Add => OpCode::Add,
            InfixOp::Sub => OpCode::Sub,
            InfixOp::Mul => OpCode::Mul,
            InfixOp::Div => OpCode::Div,
            InfixOp::Mod => OpCode::Mod,
            InfixOp::Pow => OpCode::Pow,
            InfixOp::Eq => OpCode::Equal,
            InfixOp::NotEq => OpCode::NotEqual,
            InfixOp::Gt => OpCode::GreaterThan,
            InfixOp::GtEq => OpCode::GreaterEq,
            InfixOp::And => OpCode::And,
            InfixOp::Or => OpCode::Or,
            InfixOp::Lt | InfixOp::LtEq => unreachable!("handled above"),
        };
        self.emit(opcode, &[]);
    }

    fn compile_method_call(&mut self, receiver: &Expr, method: &str, args: &[Expr]) {
        self.compile_expr(receiver);
        let method_id = self.symbol_table.borrow().intern_method(method);
        self.emit(OpCode::LoadMethod, &[method_id as i64]);
        for a in args {
            self.compile_expr(a);
        }
        self.emit(OpCode::CallMethod, &[args.len() as i64]);
        // `CallMethod` leaves [return_value, new_receiver] on the stack.
        // Write the mutated receiver back if it was a plain name;
        // otherwise there is nowhere to store it, so discard it.
        match receiver {
            Expr::Ident(name) => self.emit_set(name),
            _ => {
                self.emit(OpCode::Pop, &[]);
            }
        }
    }

    /// Shared by `FuncLiteral` (expression position, leaves the function
    /// value as the expression's result) and `FuncDef` (statement
    /// position, where the caller follows up with `emit_set` to bind the
    /// pushed value to the name's slot).
    fn compile_function_value(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &Stmt,
        scope_name: &str,
    ) -> u16 {
        let const_idx = self.add_constant(Value::CompiledFunction(Rc::new(CompiledFunction {
            instructions: Vec::new(),
            num_locals: 0,
            num_parameters: params.len() as u16,
            name: name.unwrap_or("<anonymous>").to_string(),
        })));
        if let Some(name) = name {
            self.functions.insert(name.to_string(), const_idx);
        }

        let inner_table = match self.root_symbol_table.borrow().find_child(scope_name) {
            Some(t) => t,
            None => {
                self.error(format!("internal error: no scope recorded for '{}'", scope_name));
                return const_idx;
            }
        };
        let outer_table = std::mem::replace(&mut self.symbol_table, inner_table);
        self.enter_scope();

        self.compile_stmt(body);
        if self.last_instruction_is(OpCode::Pop) {
            self.replace_last_opcode(OpCode::ReturnValue);
        }
        if !self.last_instruction_is(OpCode::ReturnValue) {
            self.emit(OpCode::Null, &[]);
            self.emit(OpCode::ReturnValue, &[]);
        }

        let num_locals = self.symbol_table.borrow().num_definitions();
        let instructions = self.leave_scope();
        self.symbol_table = outer_table;

        self.constants[const_idx as usize] = Value::CompiledFunction(Rc::new(CompiledFunction {
            instructions,
            num_locals,
            num_parameters: params.len() as u16,
            name: name.unwrap_or("<anonymous>").to_string(),
        }));
        self.emit(OpCode::Constant, &[const_idx as i64]);
        const_idx
    }

    // ---- statements ---------------------------------------------------

    fn compile_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.compile_expr(expr);
                self.emit(OpCode::Pop, &[]);
            }
            Stmt::Var { name, value, .. } => {
                self.compile_expr(value);
                self.emit_set(name);
            }
            Stmt::Assign { target, value, .. } => self.compile_assign(target, value),
            Stmt::Block(statements) => {
                for s in statements {
                    self.compile_stmt(s);
                }
            }
            Stmt::If { condition, consequence, alternative, .. } => {
                self.compile_expr(condition);
                let jump_not_true = self.emit(OpCode::JumpNotTruthy, &[0]);
                self.compile_stmt(consequence);
                let jump_end = self.emit(OpCode::Jump, &[0]);
                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_not_true, after_consequence as i64);
                if let Some(alt) = alternative {
                    self.compile_stmt(alt);
                }
                let after_alternative = self.current_instructions().len();
                self.change_operand(jump_end, after_alternative as i64);
            }
            Stmt::For { init, condition, step, body, .. } => self.compile_for(init, condition, step, body),
            Stmt::Break(_) => {
                let pos = self.emit(OpCode::Jump, &[0]);
                match self.loops.last_mut() {
                    Some(ctx) => ctx.break_jumps.push(pos),
                    None => self.error("'break' used outside of a loop"),
                }
            }
            Stmt::Return { value, .. } => {
                match value {
                    Some(v) => self.compile_expr(v),
                    None => {
                        self.emit(OpCode::Null, &[]);
                    }
                }
                self.emit(OpCode::ReturnValue, &[]);
            }
            Stmt::FuncDef { name, params, body, .. } => {
                if self.functions.contains_key(name) {
                    self.error(format!("duplicate function '{}'", name));
                    return;
                }
                self.compile_function_value(Some(name.as_str()), params, body, name);
                // A function def binds its name to a value like any other
                // binding, so later references resolve through the normal
                // Global/Local slot once `self.functions` (only valid for
                // the rest of this `compile()` call) no longer applies.
                self.emit_set(name);
            }
        }
    }

    fn compile_assign(&mut self, target: &AssignTarget, value: &Expr) {
        match target {
            AssignTarget::Ident(name) => {
                self.compile_expr(value);
                self.emit_set(name);
            }
            AssignTarget::Index { left, index } => {
                self.compile_expr(value);
                self.compile_expr(left);
                self.compile_expr(index);
                self.emit(OpCode::SetIndex, &[]);
                match left {
                    Expr::Ident(name) => self.emit_set(name),
                    _ => {
                        self.emit(OpCode::Pop, &[]);
                    }
                }
            }
        }
    }

    fn compile_for(&mut self, init: &Option<Box<Stmt>>, condition: &Option<Expr>, step: &Option<Box<Stmt>>, body: &Stmt) {
        if let Some(init) = init {
            self.fusion_enabled = false;
            self.compile_stmt(init);
            self.fusion_enabled = true;
        }
        let loop_start = self.current_instructions().len();
        self.loops.push(LoopContext { break_jumps: Vec::new() });

        let jump_not_true = condition.as_ref().map(|cond| {
            self.compile_expr(cond);
            self.emit(OpCode::JumpNotTruthy, &[0])
        });

        self.compile_stmt(body);

        if let Some(step) = step {
            self.fusion_enabled = false;
            self.compile_stmt(step);
            self.fusion_enabled = true;
        }

        self.emit(OpCode::Jump, &[loop_start as i64]);
        let after_loop = self.current_instructions().len();
        if let Some(pos) = jump_not_true {
            self.change_operand(pos, after_loop as i64);
        }
        let ctx = self.loops.pop().expect("loop context pushed above");
        for pos in ctx.break_jumps {
            self.change_operand(pos, after_loop as i64);
        }

        // Keeps a `for` statement's net stack effect identical to an
        // `if` statement's: a dummy push immediately discarded.
        self.emit(OpCode::Null, &[]);
        self.emit(OpCode::Pop, &[]);
    }
}

/// Compiles `program` against the symbol table the parser already built.
/// When `interpreter_mode` is set (the REPL), the very last instruction
/// is rewritten from `Pop` to `PrintTop` if it is a `Pop`, so the driver
/// sees the final expression's value printed. A stage with accumulated
/// errors yields an empty bytecode artifact, per the pipeline's general
/// error-propagation rule.
pub fn compile(
    program: &Program,
    symbol_table: SymbolTable,
    interpreter_mode: bool,
    peephole_enabled: bool,
) -> (Bytecode, ErrorList) {
    let mut compiler = Compiler::new(Rc::clone(&symbol_table), peephole_enabled);
    for stmt in &program.statements {
        compiler.compile_stmt(stmt);
    }
    if interpreter_mode && compiler.last_instruction_is(OpCode::Pop) {
        compiler.replace_last_opcode(OpCode::PrintTop);
    }
    if compiler.errors.has_errors() {
        return (Bytecode { instructions: Vec::new(), constants: Vec::new(), symbol_table }, compiler.errors);
    }
    let instructions = compiler.leave_scope();
    (Bytecode { instructions, constants: compiler.constants, symbol_table }, compiler.errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{make, OpCode};
    use crate::lexer::tokenize;
    use crate::parser;

    fn compile_source(source: &str) -> Bytecode {
        let (tokens, lex_errors) = tokenize(source);
        assert!(!lex_errors.has_errors(), "{:?}", lex_errors.errors());
        let (program, symbols, parse_errors) = parser::parse(tokens);
        assert!(!parse_errors.has_errors(), "{:?}", parse_errors.errors());
        let (bytecode, errors) = compile(&program, symbols, false, true);
        assert!(!errors.has_errors(), "{:?}", errors.errors());
        bytecode
    }

    fn concat(chunks: Vec<Vec<u8>>) -> Vec<u8> {
        chunks.into_iter().flatten().collect()
    }

    #[test]
    fn compiles_integer_arithmetic() {
        let bytecode = compile_source("1 + 2");
        let expected = concat(vec![
            make(OpCode::Constant, &[0]),
            make(OpCode::Constant, &[1]),
            make(OpCode::Add, &[]),
            make(OpCode::Pop, &[]),
        ]);
        assert_eq!(bytecode.instructions, expected);
    }

    #[test]
    fn interpreter_mode_rewrites_trailing_pop_to_print_top() {
        let (tokens, _) = tokenize("1 + 2");
        let (program, symbols, _) = parser::parse(tokens);
        let (bytecode, _) = compile(&program, symbols, true, true);
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(OpCode::Constant, &[0]),
                make(OpCode::Constant, &[1]),
                make(OpCode::Add, &[]),
                make(OpCode::PrintTop, &[]),
            ])
        );
    }

    #[test]
    fn less_than_compiles_as_swapped_greater_than() {
        let bytecode = compile_source("1 < 2");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(OpCode::Constant, &[0]),
                make(OpCode::Constant, &[1]),
                make(OpCode::GreaterThan, &[]),
                make(OpCode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn var_then_immediate_read_fuses_into_update() {
        // The Set(a) from the first statement is the instruction
        // immediately preceding the Get(a) compiled for the second
        // statement's bare identifier expression — nothing else is
        // emitted in between, so the peephole rewrites Set into Update.
        let bytecode = compile_source("var a = 1\na");
        assert!(bytecode.instructions.windows(3).any(|w| w == make(OpCode::UpdateGlobal, &[0])));
        assert!(!bytecode.instructions.windows(3).any(|w| w == make(OpCode::GetGlobal, &[0])));
    }

    #[test]
    fn no_peephole_flag_suppresses_fusion() {
        let (tokens, _) = tokenize("var a = 1\na");
        let (program, symbols, _) = parser::parse(tokens);
        let (bytecode, _) = compile(&program, symbols, false, false);
        assert!(bytecode.instructions.windows(3).any(|w| w == make(OpCode::GetGlobal, &[0])));
    }

    #[test]
    fn unrelated_set_between_does_not_fuse() {
        let bytecode = compile_source("var a = 1\nvar b = 2\na");
        assert!(bytecode.instructions.windows(3).any(|w| w == make(OpCode::GetGlobal, &[0])));
    }

    #[test]
    fn call_argument_does_not_fuse_across_callee_lookup() {
        // Compiling the callee ("print", a GetBuiltin) sits between the
        // Set(a) and the Get(a) compiled for the argument, so fusion must
        // not fire here even though the statements are adjacent.
        let bytecode = compile_source("var a = 1\nprint(a)");
        assert!(bytecode.instructions.windows(3).any(|w| w == make(OpCode::GetGlobal, &[0])));
    }

    #[test]
    fn function_definition_is_both_a_constant_and_a_bound_slot() {
        // A reference within the same compile pass (the `f(1)` call here)
        // still resolves through the `functions` constant-index fast path,
        // but the def also binds its name to a global slot like any other
        // `var`, so a later, separate compile pass can still find it.
        let bytecode = compile_source("def f(n) { return n }\nprint(f(1))");
        assert!(bytecode.constants.iter().any(|c| matches!(c, Value::CompiledFunction(_))));
        assert!(bytecode.instructions.windows(3).any(|w| w == make(OpCode::SetGlobal, &[0])));
    }

    #[test]
    fn break_inside_for_loop_patches_to_loop_end() {
        let bytecode = compile_source("for (var i = 0; i < 10; i = i + 1) { break }");
        assert!(!bytecode.instructions.is_empty());
    }

    #[test]
    fn if_without_else_still_emits_converging_jump() {
        let bytecode = compile_source("if (true) { var x = 1 }");
        assert!(bytecode.instructions.contains(&(OpCode::JumpNotTruthy as u8)));
        assert!(bytecode.instructions.contains(&(OpCode::Jump as u8)));
    }
}
