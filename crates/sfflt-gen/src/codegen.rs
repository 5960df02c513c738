//! AST to [`Instr`] lowering.
//!
//! One [`Generator`] compiles a whole [`Program`]: the top-level items
//! land in `main`, each `func` gets its own [`Stream`] appended after
//! `END`, and every branch target — loop heads, if/else arms, builtin
//! loops — goes through the same reserve/mark/confirm discipline so a
//! forward jump is never written with its target still unknown.

use sfflt_ast::{AssignTarget, BinOp, Expr, Function, Item, Program, Stmt, UnOp, VarKind};

use crate::instr::{Instr, Stream};

/// Bookkeeping for whichever function body is currently being compiled.
/// `None` at the top level.
struct CurrentFunction {
    stream: Stream,
    param_count: u32,
}

pub struct Generator {
    main: Stream,
    functions: Vec<Stream>,
    label_counter: u32,
    /// One `Vec` per enclosing loop, collecting `break`'s unconfirmed
    /// `Jump` indices until the loop's end label is known.
    loop_breaks: Vec<Vec<usize>>,
    current: Option<CurrentFunction>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            main: Stream::new(),
            functions: Vec::new(),
            label_counter: 0,
            loop_breaks: Vec::new(),
            current: None,
        }
    }

    /// Compiles `program` into its final, flat instruction list: heap
    /// init, top-level code, `END`, then every function body in
    /// declaration order.
    pub fn compile(mut self, program: &Program) -> Vec<Instr> {
        self.emit_heap_init();
        for item in &program.items {
            self.compile_item(item);
        }
        self.emit(Instr::End);

        let mut out = self.main.into_instrs();
        for f in self.functions {
            out.extend(f.into_instrs());
        }
        out
    }

    /// `PUSH &watermark; PUSH heap-base; STORE` — the address is pushed
    /// first so the store lands `heap-base` in the watermark cell, not
    /// the other way around (the convention every other `STORE` site in
    /// this generator follows: address deeper on the stack, value on top).
    fn emit_heap_init(&mut self) {
        self.emit(Instr::Push(sfflt_ast::address::WATERMARK_CELL));
        self.emit(Instr::Push(sfflt_ast::HEAP_BASE));
        self.emit(Instr::Store);
    }

    // ---- stream plumbing ------------------------------------------------

    pub(crate) fn stream(&mut self) -> &mut Stream {
        match &mut self.current {
            Some(cur) => &mut cur.stream,
            None => &mut self.main,
        }
    }

    pub(crate) fn emit(&mut self, instr: Instr) {
        self.stream().push(instr);
    }

    pub(crate) fn reserve(&mut self, instr: Instr) -> usize {
        self.stream().reserve(instr)
    }

    pub(crate) fn confirm(&mut self, index: usize, label: u32) {
        self.stream().confirm(index, label);
    }

    pub(crate) fn next_label(&mut self) -> u32 {
        let label = self.label_counter;
        self.label_counter += 1;
        label
    }

    /// Allocates a fresh label and emits it at the current position.
    pub(crate) fn mark(&mut self) -> u32 {
        let label = self.next_label();
        self.emit(Instr::Label(label));
        label
    }

    // ---- items ------------------------------------------------------------

    fn compile_item(&mut self, item: &Item) {
        match item {
            Item::GlobalVar { address, init, .. } => {
                self.emit(Instr::Push(address.raw()));
                self.compile_expr(init);
                self.emit(Instr::Store);
            }
            Item::Function(f) => self.compile_function(f),
            Item::Stmt(s) => self.compile_stmt(s),
        }
    }

    fn compile_function(&mut self, f: &Function) {
        self.current = Some(CurrentFunction { stream: Stream::new(), param_count: f.params.len() as u32 });
        self.emit(Instr::Label(f.label));
        for stmt in &f.body {
            self.compile_stmt(stmt);
        }
        // Falling off the end of a function body behaves like `return 0;`.
        self.emit_return(None);
        let cur = self.current.take().expect("compile_function always sets current");
        self.functions.push(cur.stream);
    }

    fn emit_return(&mut self, value: Option<&Expr>) {
        match value {
            Some(v) => self.compile_expr(v),
            None => self.emit(Instr::Push(0)),
        }
        let param_count = self.current.as_ref().map(|c| c.param_count).unwrap_or(0);
        if param_count > 0 {
            self.emit(Instr::Slide(param_count));
        }
        self.emit(Instr::Endsub);
    }

    // ---- statements ---------------------------------------------------

    fn compile_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { address, init, .. } => {
                self.emit(Instr::Push(address.raw()));
                self.compile_expr(init);
                self.emit(Instr::Store);
            }
            Stmt::Put { is_numeric, expr, .. } => {
                self.compile_expr(expr);
                self.emit(if *is_numeric { Instr::Putn } else { Instr::Putc });
            }
            Stmt::Return { value, .. } => self.emit_return(value.as_ref()),
            Stmt::Break { .. } => {
                let idx = self.reserve(Instr::Jump(None));
                self.loop_breaks
                    .last_mut()
                    .expect("break only ever occurs inside a loop (parser-enforced)")
                    .push(idx);
            }
            Stmt::If { cond, then_branch, else_branch, .. } => {
                self.compile_expr(cond);
                let jz = self.reserve(Instr::JumpWhenZero(None));
                self.compile_stmt(then_branch);
                let jend = self.reserve(Instr::Jump(None));
                let else_label = self.mark();
                self.confirm(jz, else_label);
                if let Some(e) = else_branch {
                    self.compile_stmt(e);
                }
                let end_label = self.mark();
                self.confirm(jend, end_label);
            }
            Stmt::While { cond, body, .. } => {
                self.loop_breaks.push(Vec::new());
                let head = self.mark();
                self.compile_expr(cond);
                let jz = self.reserve(Instr::JumpWhenZero(None));
                self.compile_stmt(body);
                let jback = self.reserve(Instr::Jump(None));
                self.confirm(jback, head);
                let end_label = self.mark();
                self.confirm(jz, end_label);
                let breaks = self.loop_breaks.pop().expect("pushed at loop entry");
                for idx in breaks {
                    self.confirm(idx, end_label);
                }
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.compile_stmt(s);
                }
            }
            Stmt::ExprStmt(e) => {
                self.compile_expr(e);
                self.emit(Instr::Discard);
            }
        }
    }

    // ---- expressions ----------------------------------------------------

    fn compile_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::IntLit(v, _) | Expr::CharLit(v, _) => self.emit(Instr::Push(*v)),
            Expr::BoolLit(b, _) => self.emit(Instr::Push(if *b { 1 } else { 0 })),
            Expr::StringLit(s, _) => self.compile_array_alloc(s.chars().map(|c| c as i64).collect()),
            Expr::ArrayLit(elements, _) => self.compile_array_lit(elements),
            Expr::Variable { kind, .. } => self.compile_variable_read(kind),
            Expr::Assign { target, value, .. } => {
                self.compile_expr(value);
                self.emit(Instr::Dup);
                self.compile_target_address(target);
                self.emit(Instr::Swap);
                self.emit(Instr::Store);
            }
            Expr::Binary { op, left, right, .. } => self.compile_binary(*op, left, right),
            Expr::Unary { op, expr, .. } => self.compile_unary(*op, expr),
            Expr::Index { receiver, index, .. } => {
                self.compile_expr(receiver);
                self.compile_expr(index);
                self.emit(Instr::Push(2));
                self.emit(Instr::Add);
                self.emit(Instr::Add);
                self.emit(Instr::Retrieve);
            }
            Expr::Call { callee, args, .. } => self.compile_call(*callee, args),
        }
    }

    fn compile_variable_read(&mut self, kind: &VarKind) {
        match kind {
            VarKind::Global(addr) | VarKind::Local(addr) => {
                self.emit(Instr::Push(addr.raw()));
                self.emit(Instr::Retrieve);
            }
            VarKind::Argument { .. } => {
                let offset = kind.copy_offset().expect("Argument always has a copy offset");
                self.emit(Instr::Copy(offset));
            }
        }
    }

    fn compile_target_address(&mut self, target: &AssignTarget) {
        match target {
            AssignTarget::Variable { address, .. } => self.emit(Instr::Push(address.raw())),
            AssignTarget::Index { receiver, index } => {
                self.compile_expr(receiver);
                self.compile_expr(index);
                self.emit(Instr::Push(2));
                self.emit(Instr::Add);
                self.emit(Instr::Add);
            }
        }
    }

    fn compile_array_lit(&mut self, elements: &[Expr]) {
        let count = elements.len();
        self.emit(Instr::Push(count as i64 + 2));
        self.emit_builtin_allocate_body();

        self.emit(Instr::Dup);
        self.emit(Instr::Push(count as i64));
        self.emit(Instr::Store);

        self.emit(Instr::Dup);
        self.emit(Instr::Push(1));
        self.emit(Instr::Add);
        self.emit(Instr::Push(count as i64));
        self.emit(Instr::Store);

        for (i, element) in elements.iter().enumerate() {
            self.emit(Instr::Dup);
            self.emit(Instr::Push(2 + i as i64));
            self.emit(Instr::Add);
            self.compile_expr(element);
            self.emit(Instr::Store);
        }
    }

    /// Shared by `StringLit`, whose elements are already-evaluated char
    /// codes rather than `Expr`s.
    fn compile_array_alloc(&mut self, values: Vec<i64>) {
        let count = values.len();
        self.emit(Instr::Push(count as i64 + 2));
        self.emit_builtin_allocate_body();

        self.emit(Instr::Dup);
        self.emit(Instr::Push(count as i64));
        self.emit(Instr::Store);

        self.emit(Instr::Dup);
        self.emit(Instr::Push(1));
        self.emit(Instr::Add);
        self.emit(Instr::Push(count as i64));
        self.emit(Instr::Store);

        for (i, value) in values.into_iter().enumerate() {
            self.emit(Instr::Dup);
            self.emit(Instr::Push(2 + i as i64));
            self.emit(Instr::Add);
            self.emit(Instr::Push(value));
            self.emit(Instr::Store);
        }
    }

    fn compile_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) {
        match op {
            BinOp::Add => self.compile_arith(left, right, Instr::Add),
            BinOp::Sub => self.compile_arith(left, right, Instr::Sub),
            BinOp::Mul => self.compile_arith(left, right, Instr::Mul),
            BinOp::Div => self.compile_arith(left, right, Instr::Div),
            BinOp::Mod => self.compile_arith(left, right, Instr::Mod),
            BinOp::Eq => self.compile_equality(left, right, false),
            BinOp::NotEq => self.compile_equality(left, right, true),
            BinOp::Lt => self.compile_comparison(left, right, false, false),
            BinOp::LtEq => self.compile_comparison(left, right, false, true),
            BinOp::Gt => self.compile_comparison(left, right, true, false),
            BinOp::GtEq => self.compile_comparison(left, right, true, true),
            BinOp::And => self.compile_and(left, right),
            BinOp::Or => self.compile_or(left, right),
        }
    }

    fn compile_arith(&mut self, left: &Expr, right: &Expr, instr: Instr) {
        self.compile_expr(left);
        self.compile_expr(right);
        self.emit(instr);
    }

    /// `==`/`!=`: a single `SUB`, branching on whether it's zero.
    fn compile_equality(&mut self, left: &Expr, right: &Expr, invert: bool) {
        self.compile_expr(left);
        self.compile_expr(right);
        self.emit(Instr::Sub);

        let jz = self.reserve(Instr::JumpWhenZero(None));
        self.emit(Instr::Push(if invert { 1 } else { 0 }));
        let je = self.reserve(Instr::Jump(None));
        let eq_label = self.mark();
        self.confirm(jz, eq_label);
        self.emit(Instr::Push(if invert { 0 } else { 1 }));
        let end_label = self.mark();
        self.confirm(je, end_label);
    }

    /// `<`/`<=`/`>`/`>=`: `>`/`>=` swap operands before the subtract so a
    /// single `JUMP_WHEN_NEGATIVE` always tests the same sense; `<=`/`>=`
    /// additionally branch on zero for the equal case.
    fn compile_comparison(&mut self, left: &Expr, right: &Expr, swap: bool, has_equal: bool) {
        self.compile_expr(left);
        self.compile_expr(right);
        if swap {
            self.emit(Instr::Swap);
        }
        self.emit(Instr::Sub);

        if has_equal {
            self.emit(Instr::Dup);
            let jz = self.reserve(Instr::JumpWhenZero(None));
            let jn = self.reserve(Instr::JumpWhenNegative(None));
            self.emit(Instr::Push(0));
            let je = self.reserve(Instr::Jump(None));
            let lz = self.mark();
            self.confirm(jz, lz);
            self.emit(Instr::Discard);
            let ln = self.mark();
            self.confirm(jn, ln);
            self.emit(Instr::Push(1));
            let end = self.mark();
            self.confirm(je, end);
        } else {
            let jn = self.reserve(Instr::JumpWhenNegative(None));
            self.emit(Instr::Push(0));
            let je = self.reserve(Instr::Jump(None));
            let ln = self.mark();
            self.confirm(jn, ln);
            self.emit(Instr::Push(1));
            let end = self.mark();
            self.confirm(je, end);
        }
    }

    fn compile_and(&mut self, left: &Expr, right: &Expr) {
        self.compile_expr(left);
        let jf1 = self.reserve(Instr::JumpWhenZero(None));
        self.compile_expr(right);
        let jf2 = self.reserve(Instr::JumpWhenZero(None));
        self.emit(Instr::Push(1));
        let je = self.reserve(Instr::Jump(None));
        let false_label = self.mark();
        self.confirm(jf1, false_label);
        self.confirm(jf2, false_label);
        self.emit(Instr::Push(0));
        let end = self.mark();
        self.confirm(je, end);
    }

    fn compile_or(&mut self, left: &Expr, right: &Expr) {
        self.compile_expr(left);
        let jcontinue = self.reserve(Instr::JumpWhenZero(None));
        self.emit(Instr::Push(1));
        let je1 = self.reserve(Instr::Jump(None));
        let continue_label = self.mark();
        self.confirm(jcontinue, continue_label);
        self.compile_expr(right);
        let jfalse = self.reserve(Instr::JumpWhenZero(None));
        self.emit(Instr::Push(1));
        let je2 = self.reserve(Instr::Jump(None));
        let false_label = self.mark();
        self.confirm(jfalse, false_label);
        self.emit(Instr::Push(0));
        let end = self.mark();
        self.confirm(je1, end);
        self.confirm(je2, end);
    }

    fn compile_unary(&mut self, op: UnOp, expr: &Expr) {
        match op {
            UnOp::Neg => {
                self.emit(Instr::Push(-1));
                self.compile_expr(expr);
                self.emit(Instr::Mul);
            }
            UnOp::Not => {
                self.compile_expr(expr);
                let jz = self.reserve(Instr::JumpWhenZero(None));
                self.emit(Instr::Push(0));
                let je = self.reserve(Instr::Jump(None));
                let true_label = self.mark();
                self.confirm(jz, true_label);
                self.emit(Instr::Push(1));
                let end = self.mark();
                self.confirm(je, end);
            }
        }
    }

    fn compile_get(&mut self, is_numeric: bool) {
        self.emit(Instr::Push(sfflt_ast::address::IO_SCRATCH_CELL));
        self.emit(if is_numeric { Instr::Getn } else { Instr::Getc });
        self.emit(Instr::Push(sfflt_ast::address::IO_SCRATCH_CELL));
        self.emit(Instr::Retrieve);
    }

    fn compile_call(&mut self, callee: sfflt_util::Symbol, args: &[Expr]) {
        if callee == sfflt_util::Symbol::KW_GETN {
            self.compile_get(true);
            return;
        }
        if callee == sfflt_util::Symbol::KW_GETC {
            self.compile_get(false);
            return;
        }

        match callee.as_str() {
            "len" => {
                self.compile_expr(&args[0]);
                self.emit(Instr::Retrieve);
            }
            "copy" => {
                for a in args {
                    self.compile_expr(a);
                }
                self.emit_builtin_copy_body();
            }
            "append" => {
                for a in args {
                    self.compile_expr(a);
                }
                self.emit_builtin_append_body();
            }
            "_allocate" => {
                self.compile_expr(&args[0]);
                self.emit_builtin_allocate_body();
            }
            "_reallocate" => {
                for a in args {
                    self.compile_expr(a);
                }
                self.emit_builtin_reallocate_body();
            }
            "_memCopy" => {
                for a in args {
                    self.compile_expr(a);
                }
                self.emit_builtin_memcopy_body();
            }
            _ => {
                for a in args {
                    self.compile_expr(a);
                }
                self.emit(Instr::Callsub(sfflt_ast::function_label(callee.as_str())));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn compile(source: &str) -> Vec<Instr> {
        let handler = sfflt_util::Handler::new();
        let source_map = RefCell::new(sfflt_util::SourceMap::new());
        let resolver = sfflt_par::NullResolver;
        let session = sfflt_par::ParseSession::new(&handler, &source_map, &resolver);
        let program = sfflt_par::parse_program(source, "test.sf", &session);
        assert!(!handler.has_errors(), "unexpected parse errors: {:?}", handler.diagnostics());
        sfflt_sem::resolve_program(&program, &handler);
        assert!(!handler.has_errors(), "unexpected resolve errors: {:?}", handler.diagnostics());
        Generator::new().compile(&program)
    }

    #[test]
    fn heap_init_is_the_first_three_instructions() {
        let instrs = compile("putn 1;");
        assert_eq!(instrs[0], Instr::Push(sfflt_ast::address::WATERMARK_CELL));
        assert_eq!(instrs[1], Instr::Push(sfflt_ast::HEAP_BASE));
        assert_eq!(instrs[2], Instr::Store);
    }

    #[test]
    fn program_ends_main_stream_with_end() {
        let instrs = compile("putn 1;");
        assert!(instrs.contains(&Instr::End));
    }

    #[test]
    fn global_var_decl_pushes_address_then_value_then_stores() {
        let instrs = compile("var a = 1;");
        let store_pos = instrs.iter().position(|i| *i == Instr::Store).unwrap();
        assert_eq!(instrs[store_pos - 1], Instr::Push(1));
        assert!(matches!(instrs[store_pos - 2], Instr::Push(_)));
    }

    #[test]
    fn not_true_matches_scenario_shape() {
        let instrs = compile("!true;");
        // PUSH 1; JUMP_WHEN_ZERO; PUSH 0; JUMP; LABEL; PUSH 1; LABEL; DISCARD
        let tail: Vec<_> = instrs[3..].to_vec();
        assert_eq!(tail[0], Instr::Push(1));
        assert!(matches!(tail[1], Instr::JumpWhenZero(Some(_))));
        assert_eq!(tail[2], Instr::Push(0));
        assert!(matches!(tail[3], Instr::Jump(Some(_))));
        assert!(matches!(tail[4], Instr::Label(_)));
        assert_eq!(tail[5], Instr::Push(1));
        assert!(matches!(tail[6], Instr::Label(_)));
        assert_eq!(tail[7], Instr::Discard);
    }

    #[test]
    fn ge_comparison_matches_scenario_shape() {
        let instrs = compile("1 >= 2;");
        let tail: Vec<_> = instrs[3..].to_vec();
        assert_eq!(tail[0], Instr::Push(1));
        assert_eq!(tail[1], Instr::Push(2));
        assert_eq!(tail[2], Instr::Swap);
        assert_eq!(tail[3], Instr::Sub);
        assert_eq!(tail[4], Instr::Dup);
        assert!(matches!(tail[5], Instr::JumpWhenZero(Some(_))));
        assert!(matches!(tail[6], Instr::JumpWhenNegative(Some(_))));
        assert_eq!(tail[7], Instr::Push(0));
        assert!(matches!(tail[8], Instr::Jump(Some(_))));
        assert!(matches!(tail[9], Instr::Label(_)));
        assert_eq!(tail[10], Instr::Discard);
        assert!(matches!(tail[11], Instr::Label(_)));
        assert_eq!(tail[12], Instr::Push(1));
        assert!(matches!(tail[13], Instr::Label(_)));
        assert_eq!(tail[14], Instr::Discard); // the expr-stmt's own discard
    }

    #[test]
    fn function_body_ends_with_slide_and_endsub() {
        let instrs = compile("func add(a, b) { return a + b; } add(1, 2);");
        let endsub_pos = instrs.iter().position(|i| *i == Instr::Endsub).unwrap();
        assert_eq!(instrs[endsub_pos - 1], Instr::Slide(2));
    }

    #[test]
    fn call_to_user_function_emits_callsub_with_function_label() {
        let instrs = compile("func f() { return 1; } f();");
        let label = sfflt_ast::function_label("f");
        assert!(instrs.contains(&Instr::Callsub(label)));
    }

    #[test]
    fn break_is_patched_to_loop_end() {
        let instrs = compile("while (true) { break; }");
        assert!(instrs.iter().any(|i| matches!(i, Instr::Jump(Some(_)))));
    }

    #[test]
    fn len_degenerates_to_retrieve() {
        let instrs = compile("var a = [1, 2, 3]; len(a);");
        let retrieve_count = instrs.iter().filter(|i| **i == Instr::Retrieve).count();
        assert!(retrieve_count >= 1);
    }

    #[test]
    fn array_literal_allocates_length_capacity_and_elements() {
        let instrs = compile("var a = [7, 8];");
        // PUSH(4) for _allocate(2+2), then two STOREs for length/cap,
        // then two more for the elements = 4 stores total beyond the
        // global-var STORE itself.
        let store_count = instrs.iter().filter(|i| **i == Instr::Store).count();
        assert!(store_count >= 4);
    }

    #[test]
    fn getn_reads_through_the_io_scratch_cell() {
        let instrs = compile("getn;");
        assert!(instrs.contains(&Instr::Getn));
        assert!(instrs.contains(&Instr::Push(sfflt_ast::address::IO_SCRATCH_CELL)));
    }

    /// Codegen's `DUP; PUSH (2+i); ADD` leaves `[ptr, addr]` on the stack
    /// while an array literal's element expression runs, so `a`'s
    /// `relative_index` must be `before + 2`, not `before`: `param_count(1)
    /// - argument_index(1) + relative_index(2) + 1 = 3`.
    #[test]
    fn argument_inside_array_literal_gets_correct_copy_offset() {
        let instrs = compile("func f(a) { var arr = [a]; }");
        assert!(instrs.contains(&Instr::Copy(3)), "{instrs:?}");
    }

    /// `(g = g + 1)` nets +1 on the real stack (`compile_expr(value); DUP;
    /// <addr>; SWAP; STORE`), so `n`, parsed after it, must see
    /// `relative_index = 1`: `param_count(1) - argument_index(1) +
    /// relative_index(1) + 1 = 2`. Before the assignment fold, this
    /// over-counted to `COPY 3`.
    #[test]
    fn argument_after_assignment_subexpression_gets_correct_copy_offset() {
        let instrs = compile("func f(n) { return (g = g + 1) + n; }");
        assert!(instrs.contains(&Instr::Copy(2)), "{instrs:?}");
    }
}
