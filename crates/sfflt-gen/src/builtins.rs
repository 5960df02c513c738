//! Inline code sequences for the fixed-arity builtins: `len`, `copy`,
//! `append`, `_allocate`, `_reallocate`, `_memCopy`.
//!
//! `len` is simple enough to stay inline in [`crate::codegen::Generator`]
//! (a single `RETRIEVE`); everything else needs a handful of stack
//! positions held across several instructions, and the target machine's
//! only stack-rearranging primitives are `DUP`/`SWAP`/`COPY k` — none of
//! which can reach past the top two cells to replace one deeper down.
//! Rather than contort the stack layout to avoid it, each function here
//! stages its arguments into a dedicated VM-scratch cell the moment it's
//! called (the same region `WATERMARK_CELL`/`IO_SCRATCH_CELL` already
//! live in) and works from there — one cell per named value, none shared
//! between *different* builtins. That's safe even under recursion:
//! argument expressions (which may themselves call back into the same
//! builtin) always finish evaluating before the builtin that's waiting
//! on them touches its own scratch cells.

use crate::codegen::Generator;
use crate::instr::Instr;

const SCRATCH_COPY_SRC: i64 = 2;
const SCRATCH_COPY_DST: i64 = 3;
const SCRATCH_COPY_I: i64 = 4;

const SCRATCH_APPEND_E: i64 = 5;
const SCRATCH_APPEND_PTR: i64 = 6;

const SCRATCH_REALLOC_OLD: i64 = 7;
const SCRATCH_REALLOC_NEWCAP: i64 = 8;
const SCRATCH_REALLOC_NEW: i64 = 9;

const SCRATCH_ALLOC_N: i64 = 10;

const SCRATCH_MEMCOPY_SRC: i64 = 11;
const SCRATCH_MEMCOPY_SI: i64 = 12;
const SCRATCH_MEMCOPY_DST: i64 = 13;
const SCRATCH_MEMCOPY_DI: i64 = 14;

impl Generator {
    /// Pops the top of the stack into scratch cell `addr`.
    fn stage(&mut self, addr: i64) {
        self.emit(Instr::Push(addr));
        self.emit(Instr::Swap);
        self.emit(Instr::Store);
    }

    /// Pushes the value currently held in scratch cell `addr`.
    fn load(&mut self, addr: i64) {
        self.emit(Instr::Push(addr));
        self.emit(Instr::Retrieve);
    }

    /// `_allocate(n)`: bumps the watermark by `n`, returning its old value
    /// as the freshly allocated pointer. Assumes `n` is on top of the
    /// stack; leaves the pointer in its place.
    pub(crate) fn emit_builtin_allocate_body(&mut self) {
        self.stage(SCRATCH_ALLOC_N);

        self.emit(Instr::Push(sfflt_ast::address::WATERMARK_CELL));
        self.emit(Instr::Retrieve); // [old_wm]

        self.emit(Instr::Push(sfflt_ast::address::WATERMARK_CELL)); // [old_wm, wm_addr]
        self.load(SCRATCH_ALLOC_N); // [old_wm, wm_addr, n]
        self.emit(Instr::Copy(2)); // [old_wm, wm_addr, n, old_wm]
        self.emit(Instr::Add); // [old_wm, wm_addr, old_wm + n]
        self.emit(Instr::Store); // [old_wm]
    }

    /// `copy(src, dst)`: walks `src`'s declared length, storing each
    /// element into the matching offset of `dst`. Assumes `[src, dst]`
    /// are on the stack (`src` deeper); leaves `dst` as the result.
    pub(crate) fn emit_builtin_copy_body(&mut self) {
        self.stage(SCRATCH_COPY_DST);
        self.stage(SCRATCH_COPY_SRC);
        self.emit(Instr::Push(0));
        self.stage(SCRATCH_COPY_I);

        let head = self.mark();
        self.load(SCRATCH_COPY_I);
        self.load(SCRATCH_COPY_SRC);
        self.emit(Instr::Retrieve); // [i, len_src]
        self.emit(Instr::Sub); // [i - len_src]

        let jn = self.reserve(Instr::JumpWhenNegative(None));
        let jdone = self.reserve(Instr::Jump(None));
        let body = self.mark();
        self.confirm(jn, body);

        self.load(SCRATCH_COPY_SRC);
        self.load(SCRATCH_COPY_I);
        self.emit(Instr::Push(2));
        self.emit(Instr::Add);
        self.emit(Instr::Add); // [src_addr]
        self.emit(Instr::Retrieve); // [val]

        self.load(SCRATCH_COPY_DST);
        self.load(SCRATCH_COPY_I);
        self.emit(Instr::Push(2));
        self.emit(Instr::Add);
        self.emit(Instr::Add); // [val, dst_addr]
        self.emit(Instr::Store);

        self.load(SCRATCH_COPY_I);
        self.emit(Instr::Push(1));
        self.emit(Instr::Add);
        self.stage(SCRATCH_COPY_I);

        let back = self.reserve(Instr::Jump(None));
        self.confirm(back, head);

        let done = self.mark();
        self.confirm(jdone, done);
        self.load(SCRATCH_COPY_DST);
    }

    /// `append(a, e)`: grows `a` (via `_reallocate`) if its length has
    /// reached capacity, stores `e` at the next slot, bumps the stored
    /// length, and returns the (possibly relocated) pointer. Assumes
    /// `[a, e]` are on the stack; leaves the result pointer.
    pub(crate) fn emit_builtin_append_body(&mut self) {
        self.stage(SCRATCH_APPEND_E);
        self.stage(SCRATCH_APPEND_PTR);

        self.load(SCRATCH_APPEND_PTR);
        self.emit(Instr::Retrieve); // [len]
        self.emit(Instr::Push(1));
        self.emit(Instr::Add); // [len + 1]

        self.load(SCRATCH_APPEND_PTR);
        self.emit(Instr::Push(1));
        self.emit(Instr::Add);
        self.emit(Instr::Retrieve); // [len + 1, cap]
        self.emit(Instr::Sub); // [(len + 1) - cap]

        self.emit(Instr::Dup);
        let jz = self.reserve(Instr::JumpWhenZero(None));
        let jn = self.reserve(Instr::JumpWhenNegative(None));

        // (len + 1) > cap: grow before writing.
        self.load(SCRATCH_APPEND_PTR);
        self.load(SCRATCH_APPEND_PTR);
        self.emit(Instr::Push(1));
        self.emit(Instr::Add);
        self.emit(Instr::Retrieve); // [ptr, cap]
        self.emit(Instr::Push(2));
        self.emit(Instr::Mul); // [ptr, 2 * cap]
        self.emit_builtin_reallocate_body(); // [new_ptr]
        self.stage(SCRATCH_APPEND_PTR);

        let after = self.mark();
        self.confirm(jz, after);
        self.confirm(jn, after);

        self.load(SCRATCH_APPEND_E);
        self.load(SCRATCH_APPEND_PTR);
        self.emit(Instr::Dup);
        self.emit(Instr::Retrieve); // [e, ptr, len]
        self.emit(Instr::Push(2));
        self.emit(Instr::Add);
        self.emit(Instr::Add); // [e, ptr + len + 2]
        self.emit(Instr::Swap); // [addr, e]
        self.emit(Instr::Store);

        self.load(SCRATCH_APPEND_PTR);
        self.emit(Instr::Dup);
        self.emit(Instr::Retrieve); // [ptr, len]
        self.emit(Instr::Push(1));
        self.emit(Instr::Add); // [ptr, len + 1]
        self.emit(Instr::Store);

        self.load(SCRATCH_APPEND_PTR);
    }

    /// `_reallocate(ptr, newCap)`: allocates a fresh `newCap + 2`-cell
    /// block, copies `ptr`'s contents over, writes the new capacity, and
    /// returns the new pointer. Assumes `[ptr, newCap]` on the stack;
    /// leaves the new pointer.
    pub(crate) fn emit_builtin_reallocate_body(&mut self) {
        self.stage(SCRATCH_REALLOC_NEWCAP);
        self.stage(SCRATCH_REALLOC_OLD);

        self.load(SCRATCH_REALLOC_NEWCAP);
        self.emit(Instr::Push(2));
        self.emit(Instr::Add);
        self.emit_builtin_allocate_body();
        self.stage(SCRATCH_REALLOC_NEW);

        self.load(SCRATCH_REALLOC_OLD);
        self.load(SCRATCH_REALLOC_NEW);
        self.emit_builtin_copy_body();
        self.emit(Instr::Discard);

        self.load(SCRATCH_REALLOC_NEW);
        self.emit(Instr::Push(1));
        self.emit(Instr::Add);
        self.load(SCRATCH_REALLOC_NEWCAP);
        self.emit(Instr::Store);

        self.load(SCRATCH_REALLOC_NEW);
    }

    /// `_memCopy(src, si, dst, di)`: copies the single element
    /// `src[si]` into `dst[di]`, returning `0`. Assumes
    /// `[src, si, dst, di]` on the stack.
    pub(crate) fn emit_builtin_memcopy_body(&mut self) {
        self.stage(SCRATCH_MEMCOPY_DI);
        self.stage(SCRATCH_MEMCOPY_DST);
        self.stage(SCRATCH_MEMCOPY_SI);
        self.stage(SCRATCH_MEMCOPY_SRC);

        self.load(SCRATCH_MEMCOPY_SRC);
        self.load(SCRATCH_MEMCOPY_SI);
        self.emit(Instr::Push(2));
        self.emit(Instr::Add);
        self.emit(Instr::Add);
        self.emit(Instr::Retrieve); // [val]

        self.load(SCRATCH_MEMCOPY_DST);
        self.load(SCRATCH_MEMCOPY_DI);
        self.emit(Instr::Push(2));
        self.emit(Instr::Add);
        self.emit(Instr::Add); // [val, dst_addr]
        self.emit(Instr::Store);

        self.emit(Instr::Push(0));
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
    fn copy_builtin_emits_a_loop() {
        let instrs = compile("var a = [1, 2]; var b = [0, 0]; copy(a, b);");
        assert!(instrs.iter().any(|i| matches!(i, Instr::JumpWhenNegative(Some(_)))));
    }

    #[test]
    fn append_builtin_emits_a_capacity_guard() {
        let instrs = compile("var a = [1]; append(a, 2);");
        assert!(instrs.iter().any(|i| matches!(i, Instr::JumpWhenZero(Some(_)))));
        assert!(instrs.iter().any(|i| matches!(i, Instr::JumpWhenNegative(Some(_)))));
    }

    #[test]
    fn allocate_builtin_reads_and_rewrites_the_watermark() {
        let instrs = compile("_allocate(4);");
        let reads = instrs
            .iter()
            .filter(|i| matches!(i, Instr::Push(v) if *v == sfflt_ast::address::WATERMARK_CELL))
            .count();
        assert!(reads >= 2); // once in heap init, at least once more inside _allocate
    }

    #[test]
    fn memcopy_builtin_returns_zero() {
        let instrs = compile("var a = [1]; var b = [2]; _memCopy(a, 0, b, 0);");
        assert!(instrs.contains(&Instr::Push(0)));
    }
}
