// src/sema/query.rs
//! Read-only access to a finished analysis, for the code generator and for
//! tests.

use crate::compiler::{Chunk, Globals};
use crate::frontend::ast::NodeId;
use crate::identity::{BlockId, LocalVarId, ResolvedFuncSigId, ResolvedSymId, SymId};
use crate::sema::block::LocalVar;
use crate::sema::sym::ResolvedSym;
use crate::sema::types::Type;
use rustc_hash::{FxHashMap, FxHashSet};

/// What an identifier/access/call node was bound to. Exactly one binding
/// exists per bound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Var(LocalVarId),
    Sym(SymId),
}

/// Per-chunk side tables written during analysis
#[derive(Debug, Default)]
pub struct AnalysisOutput {
    bindings: FxHashMap<NodeId, Binding>,
    /// Compare nodes whose operands may both be requested as integers
    int_request_cmp: FxHashSet<NodeId>,
    /// Func-decl and lambda nodes to their analysis block
    func_blocks: FxHashMap<NodeId, BlockId>,
    /// Lambda nodes to their resolved (untyped) signature
    lambda_sigs: FxHashMap<NodeId, ResolvedFuncSigId>,
}

impl AnalysisOutput {
    pub(crate) fn bind(&mut self, node: NodeId, binding: Binding) {
        let prev = self.bindings.insert(node, binding);
        debug_assert!(
            prev.is_none() || prev == Some(binding),
            "node {:?} bound twice",
            node
        );
    }

    pub(crate) fn set_int_request_cmp(&mut self, node: NodeId) {
        self.int_request_cmp.insert(node);
    }

    pub(crate) fn set_func_block(&mut self, node: NodeId, block: BlockId) {
        self.func_blocks.insert(node, block);
    }

    pub(crate) fn set_lambda_sig(&mut self, node: NodeId, sig: ResolvedFuncSigId) {
        self.lambda_sigs.insert(node, sig);
    }

    pub fn binding(&self, node: NodeId) -> Option<Binding> {
        self.bindings.get(&node).copied()
    }

    pub fn can_request_integer_operands(&self, node: NodeId) -> bool {
        self.int_request_cmp.contains(&node)
    }

    pub fn func_block(&self, node: NodeId) -> Option<BlockId> {
        self.func_blocks.get(&node).copied()
    }

    pub fn lambda_sig(&self, node: NodeId) -> Option<ResolvedFuncSigId> {
        self.lambda_sigs.get(&node).copied()
    }
}

/// Combined view over one chunk's results and the global tables
pub struct ChunkQuery<'a> {
    globals: &'a Globals,
    chunk: &'a Chunk,
}

impl<'a> ChunkQuery<'a> {
    pub(crate) fn new(globals: &'a Globals, chunk: &'a Chunk) -> Self {
        Self { globals, chunk }
    }

    pub fn binding(&self, node: NodeId) -> Option<Binding> {
        self.chunk.output.binding(node)
    }

    pub fn local_var(&self, id: LocalVarId) -> &LocalVar {
        self.chunk.blocks.var(id)
    }

    /// Type of the local a node was bound to
    pub fn var_type(&self, node: NodeId) -> Option<Type> {
        match self.binding(node)? {
            Binding::Var(v) => Some(self.chunk.blocks.var(v).vtype),
            Binding::Sym(_) => None,
        }
    }

    /// Resolved sym behind a node's binding, if resolution filled it
    pub fn resolved_sym_of(&self, node: NodeId) -> Option<ResolvedSymId> {
        match self.binding(node)? {
            Binding::Sym(s) => self.chunk.syms.get(s).r_sym,
            Binding::Var(v) => {
                let sym = self.chunk.blocks.var(v).static_sym()?;
                self.chunk.syms.get(sym).r_sym
            }
        }
    }

    pub fn resolved(&self, id: ResolvedSymId) -> &ResolvedSym {
        self.globals.rsyms.get(id)
    }

    /// Look up a resolved sym under this chunk's module root by name
    pub fn resolved_root(&self, name: &str) -> Option<ResolvedSymId> {
        let name = self.globals.interner.lookup(name)?;
        let root = self.globals.modules.get(self.chunk.mod_id).root_rsym;
        self.globals.rsyms.lookup(Some(root), name)
    }

    pub fn overload_count(&self, rsym: ResolvedSymId) -> u32 {
        self.globals.rfunc_syms.overload_count(rsym)
    }

    /// Dependency slice recorded for a static sym's initializer
    pub fn initializer_deps(&self, sym: SymId) -> &[SymId] {
        match self.chunk.init_dep_slices.get(&sym) {
            Some(&(start, end)) => &self.chunk.init_deps[start as usize..end as usize],
            None => &[],
        }
    }

    /// The local sym recorded for `name` at the chunk root, if any
    pub fn root_sym(&self, name: &str) -> Option<SymId> {
        let name = self.globals.interner.lookup(name)?;
        self.chunk.syms.lookup(None, name, None)
    }
}
