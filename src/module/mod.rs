// src/module/mod.rs
//! Module registry.
//!
//! Modules are interned by canonical spec string. Each module carries its
//! own sym map keyed by `(name, resolved func sig or none)`; function
//! overloads additionally maintain a `(name, none)` dispatch entry so an
//! unsigned lookup can find the one overload or report ambiguity.

pub mod loader;

pub use loader::{LoadError, ResolvedSpec};

use crate::frontend::ast::NodeId;
use crate::identity::{ChunkId, ModuleId, NameId, ObjectTypeId, ResolvedFuncSigId, ResolvedSymId};
use crate::runtime::{NativeFn, Value};
use crate::sema::types::Type;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub enum ModuleSym {
    /// A runtime-owned value
    Variable { value: Value },
    /// A native function of one concrete signature
    NativeFunc1 { func: NativeFn, sig: ResolvedFuncSigId },
    /// Unsigned dispatch entry: the name maps to exactly one function
    SymToOneFunc { sig: ResolvedFuncSigId },
    /// Unsigned dispatch entry: the name is overloaded
    SymToManyFuncs { sigs: Vec<ResolvedFuncSigId> },
    UserVar { chunk: ChunkId, decl: NodeId },
    UserFunc {
        chunk: ChunkId,
        decl: NodeId,
        sig: ResolvedFuncSigId,
        ret: Type,
    },
    /// A builtin object type
    Object { type_id: ObjectTypeId },
    UserObject { chunk: ChunkId, decl: NodeId },
}

#[derive(Debug)]
pub struct Module {
    pub abs_spec: String,
    /// None for builtin modules
    pub chunk: Option<ChunkId>,
    pub root_rsym: ResolvedSymId,
    pub builtin: bool,
    syms: FxHashMap<(NameId, Option<ResolvedFuncSigId>), ModuleSym>,
}

impl Module {
    pub fn sym(&self, name: NameId, sig: Option<ResolvedFuncSigId>) -> Option<&ModuleSym> {
        self.syms.get(&(name, sig))
    }

    pub fn sym_keys(&self) -> impl Iterator<Item = (NameId, Option<ResolvedFuncSigId>)> + '_ {
        self.syms.keys().copied()
    }

    pub fn set_variable(&mut self, name: NameId, value: Value) {
        self.syms.insert((name, None), ModuleSym::Variable { value });
    }

    pub fn set_object(&mut self, name: NameId, type_id: ObjectTypeId) {
        self.syms.insert((name, None), ModuleSym::Object { type_id });
    }

    pub fn set_user_var(&mut self, name: NameId, chunk: ChunkId, decl: NodeId) {
        self.syms
            .insert((name, None), ModuleSym::UserVar { chunk, decl });
    }

    pub fn set_user_object(&mut self, name: NameId, chunk: ChunkId, decl: NodeId) {
        self.syms
            .insert((name, None), ModuleSym::UserObject { chunk, decl });
    }

    pub fn set_native_func(&mut self, name: NameId, sig: ResolvedFuncSigId, func: NativeFn) {
        self.syms
            .insert((name, Some(sig)), ModuleSym::NativeFunc1 { func, sig });
        self.link_func_overload(name, sig);
    }

    pub fn set_user_func(
        &mut self,
        name: NameId,
        sig: ResolvedFuncSigId,
        chunk: ChunkId,
        decl: NodeId,
        ret: Type,
    ) {
        self.syms.insert(
            (name, Some(sig)),
            ModuleSym::UserFunc {
                chunk,
                decl,
                sig,
                ret,
            },
        );
        self.link_func_overload(name, sig);
    }

    /// Maintain the unsigned `(name, none)` dispatch entry as overloads
    /// arrive.
    fn link_func_overload(&mut self, name: NameId, sig: ResolvedFuncSigId) {
        match self.syms.get_mut(&(name, None)) {
            None => {
                self.syms
                    .insert((name, None), ModuleSym::SymToOneFunc { sig });
            }
            Some(ModuleSym::SymToOneFunc { sig: first }) => {
                let sigs = vec![*first, sig];
                self.syms
                    .insert((name, None), ModuleSym::SymToManyFuncs { sigs });
            }
            Some(ModuleSym::SymToManyFuncs { sigs }) => {
                if !sigs.contains(&sig) {
                    sigs.push(sig);
                }
            }
            // A non-func entry under the bare name wins; leave it alone
            Some(_) => {}
        }
    }
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
    by_spec: FxHashMap<String, ModuleId>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, abs_spec: &str) -> Option<ModuleId> {
        self.by_spec.get(abs_spec).copied()
    }

    /// The id the next `get_or_insert` will allocate
    pub fn next_id(&self) -> ModuleId {
        ModuleId::new(self.modules.len() as u32)
    }

    /// Intern a module by canonical spec. `root_rsym` is only consulted on
    /// first insertion.
    pub fn get_or_insert(
        &mut self,
        abs_spec: &str,
        builtin: bool,
        root_rsym: ResolvedSymId,
    ) -> (ModuleId, bool) {
        if let Some(&id) = self.by_spec.get(abs_spec) {
            return (id, false);
        }
        let id = ModuleId::new(self.modules.len() as u32);
        self.by_spec.insert(abs_spec.to_string(), id);
        self.modules.push(Module {
            abs_spec: abs_spec.to_string(),
            chunk: None,
            root_rsym,
            builtin,
            syms: FxHashMap::default(),
        });
        (id, true)
    }

    pub fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id.index() as usize]
    }

    pub fn get_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_interns_by_spec() {
        let mut reg = ModuleRegistry::new();
        let root = ResolvedSymId::new(0);
        let (a, created_a) = reg.get_or_insert("test://m", false, root);
        let (b, created_b) = reg.get_or_insert("test://m", false, root);
        assert_eq!(a, b);
        assert!(created_a);
        assert!(!created_b);
    }

    #[test]
    fn second_func_overload_switches_dispatch_to_many() {
        let mut reg = ModuleRegistry::new();
        let (id, _) = reg.get_or_insert("test://m", false, ResolvedSymId::new(0));
        let m = reg.get_mut(id);
        let name = NameId::new(0);
        let sig1 = ResolvedFuncSigId::new(1);
        let sig2 = ResolvedFuncSigId::new(2);

        m.set_user_func(name, sig1, ChunkId::new(0), NodeId(1), Type::Any);
        assert!(matches!(
            m.sym(name, None),
            Some(ModuleSym::SymToOneFunc { .. })
        ));

        m.set_user_func(name, sig2, ChunkId::new(0), NodeId(2), Type::Any);
        match m.sym(name, None) {
            Some(ModuleSym::SymToManyFuncs { sigs }) => assert_eq!(sigs, &vec![sig1, sig2]),
            other => panic!("expected overload list, got {other:?}"),
        }
    }
}
