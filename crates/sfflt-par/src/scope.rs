//! Lexical scope tracking during parsing.
//!
//! Resolution happens inline with parsing rather than as a later pass: each
//! `{`-delimited block pushes a rib, each `var` declaration binds a name in
//! the innermost rib, and each variable reference walks the rib stack
//! outward until it finds a binding (or falls through to the global
//! namespace, resolved by name hash instead of a rib entry). A binding is
//! either a `var`'s addressed local slot or a parameter's 1-based position
//! in the enclosing function's signature — parameters have no address at
//! all, see `sfflt_ast::expr::VarKind`.

use std::collections::HashMap;

use sfflt_ast::Address;
use sfflt_util::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RibKind {
    /// The function's outermost block — holds its parameters.
    FunctionTop,
    Block,
}

/// What a name inside a function resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Local(Address),
    /// 1-based position in the enclosing function's parameter list.
    Argument(u32),
}

#[derive(Debug)]
struct Rib {
    bindings: HashMap<Symbol, Binding>,
    kind: RibKind,
}

/// Per-function resolution state: the rib stack plus the counters that
/// assign fresh [`Address`]es as declarations are seen.
pub struct ScopeTree {
    ribs: Vec<Rib>,
    frame_id: u8,
    next_local_index: u32,
}

impl ScopeTree {
    /// Starts a new function's scope, with an empty function-top rib
    /// ready to receive its parameters.
    pub fn for_function(frame_id: u8) -> Self {
        let mut tree = Self { ribs: Vec::new(), frame_id, next_local_index: 0 };
        tree.ribs.push(Rib { bindings: HashMap::new(), kind: RibKind::FunctionTop });
        tree
    }

    pub fn enter_block(&mut self, kind: RibKind) {
        self.ribs.push(Rib { bindings: HashMap::new(), kind });
    }

    pub fn exit_block(&mut self) {
        self.ribs.pop();
    }

    /// True if `name` is already bound in the *innermost* rib — used to
    /// reject a second `var` of the same name in the same scope.
    pub fn declared_in_current_scope(&self, name: Symbol) -> bool {
        self.ribs.last().map(|r| r.bindings.contains_key(&name)).unwrap_or(false)
    }

    /// Binds `name` to a freshly allocated local address in the innermost
    /// rib and returns it.
    pub fn declare_local(&mut self, name: Symbol) -> Address {
        let address = Address::local(self.frame_id, self.next_local_index);
        self.next_local_index += 1;
        self.ribs
            .last_mut()
            .expect("at least one rib")
            .bindings
            .insert(name, Binding::Local(address));
        address
    }

    /// Binds a parameter at its 1-based position in the signature — no
    /// local slot is consumed, since arguments live on the operand stack.
    pub fn declare_param(&mut self, name: Symbol, argument_index: u32) {
        self.ribs
            .last_mut()
            .expect("at least one rib")
            .bindings
            .insert(name, Binding::Argument(argument_index));
    }

    /// Looks up `name` from the innermost rib outward. `None` means the
    /// caller should fall back to treating it as a global reference.
    pub fn resolve(&self, name: Symbol) -> Option<Binding> {
        self.ribs.iter().rev().find_map(|r| r.bindings.get(&name).copied())
    }

    pub fn local_count(&self) -> u32 {
        self.next_local_index
    }
}
