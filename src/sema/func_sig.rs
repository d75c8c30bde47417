// src/sema/func_sig.rs
//! Function-signature interning.
//!
//! Two parallel tables: the per-chunk table interns tuples of local SymIds,
//! the global table interns tuples of ResolvedSymIds. A local sig keeps a
//! back-link to its resolved sig once resolution has computed it. In both
//! tables the last element is the return type.

use crate::identity::{FuncSigId, ResolvedFuncSigId, ResolvedSymId, SymId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

pub type SigElems = SmallVec<[SymId; 8]>;
pub type ResolvedSigElems = SmallVec<[ResolvedSymId; 8]>;

#[derive(Debug)]
pub struct FuncSig {
    /// Param type syms followed by the return type sym
    pub elems: SigElems,
    /// Filled once the resolved sig is known
    pub r_sig: Option<ResolvedFuncSigId>,
}

impl FuncSig {
    pub fn arity(&self) -> usize {
        self.elems.len() - 1
    }
}

/// Per-chunk func-sig interner
#[derive(Debug, Default)]
pub struct FuncSigTable {
    sigs: Vec<FuncSig>,
    map: FxHashMap<SigElems, FuncSigId>,
    untyped_by_arity: FxHashMap<usize, FuncSigId>,
}

impl FuncSigTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, elems: SigElems) -> FuncSigId {
        if let Some(&id) = self.map.get(&elems) {
            return id;
        }
        let id = FuncSigId::new(self.sigs.len() as u32);
        self.map.insert(elems.clone(), id);
        self.sigs.push(FuncSig { elems, r_sig: None });
        id
    }

    /// Intern the `(any, …, any) → any` signature of the given arity.
    /// `any_sym` is the chunk's local sym for the builtin `any` type.
    pub fn intern_untyped(&mut self, arity: usize, any_sym: SymId) -> FuncSigId {
        if let Some(&id) = self.untyped_by_arity.get(&arity) {
            return id;
        }
        let elems: SigElems = std::iter::repeat_n(any_sym, arity + 1).collect();
        let id = self.intern(elems);
        self.untyped_by_arity.insert(arity, id);
        id
    }

    pub fn get(&self, id: FuncSigId) -> &FuncSig {
        &self.sigs[id.index() as usize]
    }

    pub fn set_resolved(&mut self, id: FuncSigId, r_sig: ResolvedFuncSigId) {
        self.sigs[id.index() as usize].r_sig = Some(r_sig);
    }
}

#[derive(Debug)]
pub struct ResolvedFuncSig {
    pub elems: ResolvedSigElems,
    /// False iff every element is the builtin `any` type sym
    pub is_typed: bool,
}

impl ResolvedFuncSig {
    pub fn arity(&self) -> usize {
        self.elems.len() - 1
    }
}

/// Process-wide resolved func-sig interner
#[derive(Debug, Default)]
pub struct ResolvedFuncSigTable {
    sigs: Vec<ResolvedFuncSig>,
    map: FxHashMap<ResolvedSigElems, ResolvedFuncSigId>,
    untyped_by_arity: FxHashMap<usize, ResolvedFuncSigId>,
}

impl ResolvedFuncSigTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `any_rsym` is the singleton resolved sym of the builtin `any` type,
    /// used to decide `is_typed`.
    pub fn intern(&mut self, elems: ResolvedSigElems, any_rsym: ResolvedSymId) -> ResolvedFuncSigId {
        if let Some(&id) = self.map.get(&elems) {
            return id;
        }
        let is_typed = elems.iter().any(|&e| e != any_rsym);
        let id = ResolvedFuncSigId::new(self.sigs.len() as u32);
        self.map.insert(elems.clone(), id);
        self.sigs.push(ResolvedFuncSig { elems, is_typed });
        id
    }

    pub fn intern_untyped(&mut self, arity: usize, any_rsym: ResolvedSymId) -> ResolvedFuncSigId {
        if let Some(&id) = self.untyped_by_arity.get(&arity) {
            return id;
        }
        let elems: ResolvedSigElems = std::iter::repeat_n(any_rsym, arity + 1).collect();
        let id = self.intern(elems, any_rsym);
        self.untyped_by_arity.insert(arity, id);
        id
    }

    pub fn get(&self, id: ResolvedFuncSigId) -> &ResolvedFuncSig {
        &self.sigs[id.index() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_sigs_are_idempotent_by_arity() {
        let mut table = ResolvedFuncSigTable::new();
        let any = ResolvedSymId::new(0);
        let two_a = table.intern_untyped(2, any);
        let two_b = table.intern_untyped(2, any);
        let three = table.intern_untyped(3, any);

        assert_eq!(two_a, two_b);
        assert_ne!(two_a, three);
        assert!(!table.get(two_a).is_typed);
        assert_eq!(table.get(two_a).arity(), 2);
    }

    #[test]
    fn typed_sig_differs_from_untyped_of_same_arity() {
        let mut table = ResolvedFuncSigTable::new();
        let any = ResolvedSymId::new(0);
        let number = ResolvedSymId::new(1);

        let untyped = table.intern_untyped(1, any);
        let typed = table.intern(SmallVec::from_slice(&[number, any]), any);

        assert_ne!(untyped, typed);
        assert!(table.get(typed).is_typed);
    }

    #[test]
    fn local_sig_back_link_starts_empty() {
        let mut table = FuncSigTable::new();
        let any = SymId::new(0);
        let sig = table.intern_untyped(0, any);
        assert!(table.get(sig).r_sig.is_none());

        table.set_resolved(sig, ResolvedFuncSigId::new(9));
        assert_eq!(table.get(sig).r_sig, Some(ResolvedFuncSigId::new(9)));
    }
}
