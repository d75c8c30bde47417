// src/sema/sym.rs
//! The two-level symbol table.
//!
//! Local syms record name references per chunk, keyed by parent sym, name,
//! and (for function references) a local func sig. Resolved syms are the
//! process-wide canonical identities shared across chunks; function
//! overloads hang off a resolved sym through the resolved-func-sym map.

use crate::frontend::Span;
use crate::frontend::ast::NodeId;
use crate::identity::{
    ChunkId, ModuleId, NameId, ObjectTypeId, ResolvedFuncSigId, ResolvedFuncSymId, ResolvedSymId,
    FuncSigId, SymId,
};
use crate::sema::types::Type;
use rustc_hash::FxHashMap;

/// A per-chunk name reference. `sig == None` marks a variable or module
/// reference; otherwise the sym denotes a function with that local sig.
#[derive(Debug)]
pub struct Sym {
    pub parent: Option<SymId>,
    pub name: NameId,
    pub sig: Option<FuncSigId>,
    /// Filled by resolution; may stay empty when the parent is unresolved
    pub r_sym: Option<ResolvedSymId>,
    /// Only used syms are resolved
    pub used: bool,
    /// Span of the first reference, for diagnostics raised during the
    /// deferred resolve pass
    pub span: Span,
}

/// Per-chunk name redirect installed by imports and type aliases
#[derive(Debug, Clone, Copy)]
pub enum SymRef {
    /// The name refers to a whole module
    Module(ModuleId),
    /// The name resolves inside a module (installed by `import *`)
    ModuleMember(ModuleId),
    /// Type alias to another local sym
    Sym(SymId),
}

#[derive(Debug, Default)]
pub struct SymTable {
    syms: Vec<Sym>,
    map: FxHashMap<(Option<SymId>, NameId, Option<FuncSigId>), SymId>,
}

impl SymTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &mut self,
        parent: Option<SymId>,
        name: NameId,
        sig: Option<FuncSigId>,
        span: Span,
    ) -> SymId {
        if let Some(&id) = self.map.get(&(parent, name, sig)) {
            return id;
        }
        let id = SymId::new(self.syms.len() as u32);
        self.map.insert((parent, name, sig), id);
        self.syms.push(Sym {
            parent,
            name,
            sig,
            r_sym: None,
            used: false,
            span,
        });
        id
    }

    pub fn lookup(
        &self,
        parent: Option<SymId>,
        name: NameId,
        sig: Option<FuncSigId>,
    ) -> Option<SymId> {
        self.map.get(&(parent, name, sig)).copied()
    }

    pub fn get(&self, id: SymId) -> &Sym {
        &self.syms[id.index() as usize]
    }

    pub fn get_mut(&mut self, id: SymId) -> &mut Sym {
        &mut self.syms[id.index() as usize]
    }

    pub fn mark_used(&mut self, id: SymId) {
        self.syms[id.index() as usize].used = true;
    }

    pub fn len(&self) -> usize {
        self.syms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }

    /// Sym ids in creation order, the order resolution runs in
    pub fn ids(&self) -> impl Iterator<Item = SymId> + use<> {
        (0..self.syms.len() as u32).map(SymId::new)
    }
}

/// Which overload a resolved func sym names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadRef {
    One(ResolvedFuncSymId),
    /// More than one overload; disambiguate through the func-sym map
    Overloaded,
}

#[derive(Debug, Clone)]
pub enum ResolvedSymKind {
    Func {
        func_sym: OverloadRef,
    },
    Variable {
        chunk: Option<ChunkId>,
        decl: Option<NodeId>,
    },
    Object {
        type_id: ObjectTypeId,
        chunk: Option<ChunkId>,
        decl: Option<NodeId>,
    },
    Module {
        module: ModuleId,
    },
    BuiltinType {
        ty: Type,
    },
}

#[derive(Debug)]
pub struct ResolvedSym {
    pub parent: Option<ResolvedSymId>,
    pub name: NameId,
    pub exported: bool,
    pub kind: ResolvedSymKind,
}

/// Process-wide resolved symbol table, keyed by `(resolved parent, name)`
#[derive(Debug, Default)]
pub struct ResolvedSymTable {
    syms: Vec<ResolvedSym>,
    map: FxHashMap<(Option<ResolvedSymId>, NameId), ResolvedSymId>,
}

impl ResolvedSymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new resolved sym; returns None when the key is taken.
    pub fn insert(
        &mut self,
        parent: Option<ResolvedSymId>,
        name: NameId,
        exported: bool,
        kind: ResolvedSymKind,
    ) -> Option<ResolvedSymId> {
        if self.map.contains_key(&(parent, name)) {
            return None;
        }
        let id = ResolvedSymId::new(self.syms.len() as u32);
        self.map.insert((parent, name), id);
        self.syms.push(ResolvedSym {
            parent,
            name,
            exported,
            kind,
        });
        Some(id)
    }

    pub fn lookup(&self, parent: Option<ResolvedSymId>, name: NameId) -> Option<ResolvedSymId> {
        self.map.get(&(parent, name)).copied()
    }

    pub fn get(&self, id: ResolvedSymId) -> &ResolvedSym {
        &self.syms[id.index() as usize]
    }

    pub fn get_mut(&mut self, id: ResolvedSymId) -> &mut ResolvedSym {
        &mut self.syms[id.index() as usize]
    }

    /// Walk the parent chain to the owning module root, if any.
    pub fn root_module(&self, id: ResolvedSymId) -> Option<ModuleId> {
        let mut cur = Some(id);
        while let Some(rsym) = cur {
            let entry = self.get(rsym);
            if let ResolvedSymKind::Module { module } = entry.kind {
                return Some(module);
            }
            cur = entry.parent;
        }
        None
    }
}

/// One overload of a resolved function symbol
#[derive(Debug)]
pub struct ResolvedFuncSym {
    /// Owning chunk; None for native functions
    pub chunk: Option<ChunkId>,
    /// Declaring AST node; None for native functions
    pub decl: Option<NodeId>,
    pub r_sig: ResolvedFuncSigId,
    /// Declared or inferred return type
    pub ret: Type,
    pub has_static_initializer: bool,
}

/// Overload storage keyed by `(resolved sym, resolved sig)`
#[derive(Debug, Default)]
pub struct ResolvedFuncSymTable {
    funcs: Vec<ResolvedFuncSym>,
    map: FxHashMap<(ResolvedSymId, ResolvedFuncSigId), ResolvedFuncSymId>,
    counts: FxHashMap<ResolvedSymId, u32>,
}

impl ResolvedFuncSymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an overload; returns None when `(rsym, rsig)` already exists.
    pub fn insert(
        &mut self,
        rsym: ResolvedSymId,
        entry: ResolvedFuncSym,
    ) -> Option<ResolvedFuncSymId> {
        let key = (rsym, entry.r_sig);
        if self.map.contains_key(&key) {
            return None;
        }
        let id = ResolvedFuncSymId::new(self.funcs.len() as u32);
        self.map.insert(key, id);
        self.funcs.push(entry);
        *self.counts.entry(rsym).or_insert(0) += 1;
        Some(id)
    }

    pub fn lookup(&self, rsym: ResolvedSymId, rsig: ResolvedFuncSigId) -> Option<ResolvedFuncSymId> {
        self.map.get(&(rsym, rsig)).copied()
    }

    pub fn get(&self, id: ResolvedFuncSymId) -> &ResolvedFuncSym {
        &self.funcs[id.index() as usize]
    }

    pub fn get_mut(&mut self, id: ResolvedFuncSymId) -> &mut ResolvedFuncSym {
        &mut self.funcs[id.index() as usize]
    }

    pub fn overload_count(&self, rsym: ResolvedSymId) -> u32 {
        self.counts.get(&rsym).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sym_keys_distinguish_sig_presence() {
        let mut table = SymTable::new();
        let name = NameId::new(0);
        let span = Span::default();
        let var_ref = table.get_or_create(None, name, None, span);
        let func_ref = table.get_or_create(None, name, Some(FuncSigId::new(0)), span);
        assert_ne!(var_ref, func_ref);
        assert_eq!(table.get_or_create(None, name, None, span), var_ref);
    }

    #[test]
    fn resolved_insert_rejects_duplicates() {
        let mut table = ResolvedSymTable::new();
        let name = NameId::new(3);
        let first = table.insert(None, name, true, ResolvedSymKind::Variable {
            chunk: None,
            decl: None,
        });
        assert!(first.is_some());
        let second = table.insert(None, name, true, ResolvedSymKind::Variable {
            chunk: None,
            decl: None,
        });
        assert!(second.is_none());
    }

    #[test]
    fn overload_counts_track_insertions() {
        let mut table = ResolvedFuncSymTable::new();
        let rsym = ResolvedSymId::new(0);
        let sig_a = ResolvedFuncSigId::new(0);
        let sig_b = ResolvedFuncSigId::new(1);

        let entry = |sig| ResolvedFuncSym {
            chunk: None,
            decl: None,
            r_sig: sig,
            ret: Type::Any,
            has_static_initializer: false,
        };

        assert!(table.insert(rsym, entry(sig_a)).is_some());
        assert_eq!(table.overload_count(rsym), 1);
        assert!(table.insert(rsym, entry(sig_b)).is_some());
        assert_eq!(table.overload_count(rsym), 2);
        // Same sig again is a collision
        assert!(table.insert(rsym, entry(sig_a)).is_none());
        assert_eq!(table.overload_count(rsym), 2);
    }
}
