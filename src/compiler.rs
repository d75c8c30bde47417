// src/compiler.rs
//! The compilation driver.
//!
//! A `Compiler` owns every table scoped to one compilation: the name
//! interner, the global resolved-sym and resolved-sig tables, the module
//! registry, and the runtime index. Chunks are registered by the host (which
//! owns parsing), analyzed one at a time, and imports surface as tasks the
//! host services by parsing the imported source and adding it as a chunk.
//! Dropping the `Compiler` tears everything down; nothing is process-static.

use std::collections::{HashSet, VecDeque};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::TypeError;
use crate::frontend::ast::{NodeId, Program};
use crate::frontend::NameInterner;
use crate::identity::{ChunkId, ModuleId, NameId, ResolvedSymId, SymId};
use crate::module::loader::ResolvedSpec;
use crate::module::ModuleRegistry;
use crate::runtime::RuntimeIndex;
use crate::sema::analyzer::Analyzer;
use crate::sema::block::BlockState;
use crate::sema::func_sig::{FuncSigTable, ResolvedFuncSigTable};
use crate::sema::query::{AnalysisOutput, ChunkQuery};
use crate::sema::sym::{
    ResolvedFuncSymTable, ResolvedSymKind, ResolvedSymTable, SymRef, SymTable,
};
use crate::sema::types::Type;

/// Why a function overload could not be registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FuncOverloadError {
    /// Same `(sym, resolved sig)` already registered
    Collision,
    /// The name is taken by a non-function resolved sym
    NotAFunc,
}

/// An import awaiting host service: parse `abs_spec` and add it as a chunk.
#[derive(Debug, Clone)]
pub struct ImportTask {
    pub provider_chunk: ChunkId,
    pub node: NodeId,
    pub abs_spec: String,
    pub module: ModuleId,
    pub builtin: bool,
}

/// Identifier names the analyzer tests against constantly
#[derive(Debug)]
pub struct WellKnownNames {
    pub any: NameId,
    pub self_param: NameId,
}

/// Process-wide (compilation-scoped) mutable state shared by all chunks
#[derive(Debug)]
pub struct Globals {
    pub interner: NameInterner,
    pub rsyms: ResolvedSymTable,
    pub rfunc_syms: ResolvedFuncSymTable,
    pub rsigs: ResolvedFuncSigTable,
    pub modules: ModuleRegistry,
    pub runtime: RuntimeIndex,
    /// Host-supplied builtin module loader names; membership only
    pub module_loaders: HashSet<String>,
    pub names: WellKnownNames,
    builtin_types: FxHashMap<NameId, (Type, ResolvedSymId)>,
    any_rsym: ResolvedSymId,
    import_queue: VecDeque<ImportTask>,
}

const BUILTIN_TYPE_NAMES: &[(&str, Type)] = &[
    ("any", Type::Any),
    ("boolean", Type::Boolean),
    (
        "number",
        Type::Number {
            can_request_integer: false,
        },
    ),
    ("int", Type::Int),
    ("string", Type::String),
    ("List", Type::List),
    ("Map", Type::Map),
    ("fiber", Type::Fiber),
];

impl Globals {
    fn new(module_loaders: HashSet<String>) -> Self {
        let mut interner = NameInterner::new();
        let mut rsyms = ResolvedSymTable::new();
        let mut builtin_types = FxHashMap::default();
        let mut any_rsym = None;

        for &(name, ty) in BUILTIN_TYPE_NAMES {
            let name_id = interner.intern(name);
            let rsym = rsyms
                .insert(None, name_id, true, ResolvedSymKind::BuiltinType { ty })
                .expect("builtin type names are distinct");
            builtin_types.insert(name_id, (ty, rsym));
            if name == "any" {
                any_rsym = Some(rsym);
            }
        }

        let names = WellKnownNames {
            any: interner.intern("any"),
            self_param: interner.intern("self"),
        };

        Self {
            interner,
            rsyms,
            rfunc_syms: ResolvedFuncSymTable::new(),
            rsigs: ResolvedFuncSigTable::new(),
            modules: ModuleRegistry::new(),
            runtime: RuntimeIndex::new(),
            module_loaders,
            names,
            builtin_types,
            any_rsym: any_rsym.expect("`any` is a builtin type"),
            import_queue: VecDeque::new(),
        }
    }

    /// The singleton resolved sym of the builtin `any` type
    pub fn any_rsym(&self) -> ResolvedSymId {
        self.any_rsym
    }

    pub fn builtin_type(&self, name: NameId) -> Option<Type> {
        self.builtin_types.get(&name).map(|&(ty, _)| ty)
    }

    pub fn builtin_type_rsym(&self, name: NameId) -> Option<ResolvedSymId> {
        self.builtin_types.get(&name).map(|&(_, rsym)| rsym)
    }

    /// Intern a module by canonical spec, creating its resolved root sym on
    /// first sight.
    pub(crate) fn create_module(&mut self, abs_spec: &str, builtin: bool) -> ModuleId {
        if let Some(id) = self.modules.lookup(abs_spec) {
            return id;
        }
        let name = self.interner.intern(abs_spec);
        let next = self.modules.next_id();
        let root_rsym = self
            .rsyms
            .insert(None, name, true, ResolvedSymKind::Module { module: next })
            .or_else(|| self.rsyms.lookup(None, name))
            .expect("module root sym");
        let (id, _) = self.modules.get_or_insert(abs_spec, builtin, root_rsym);
        id
    }

    /// Register a function overload under `(parent, name)`, creating or
    /// extending the func resolved sym and keeping its overload ref in sync.
    pub(crate) fn add_func_overload(
        &mut self,
        parent: Option<ResolvedSymId>,
        name: NameId,
        exported: bool,
        entry: crate::sema::sym::ResolvedFuncSym,
    ) -> Result<(ResolvedSymId, crate::identity::ResolvedFuncSymId), FuncOverloadError> {
        let rsym = match self.rsyms.lookup(parent, name) {
            Some(existing) => {
                if !matches!(
                    self.rsyms.get(existing).kind,
                    ResolvedSymKind::Func { .. }
                ) {
                    return Err(FuncOverloadError::NotAFunc);
                }
                existing
            }
            None => self
                .rsyms
                .insert(
                    parent,
                    name,
                    exported,
                    ResolvedSymKind::Func {
                        func_sym: crate::sema::sym::OverloadRef::Overloaded,
                    },
                )
                .expect("lookup missed"),
        };

        let rfunc = match self.rfunc_syms.insert(rsym, entry) {
            Some(id) => id,
            None => return Err(FuncOverloadError::Collision),
        };

        let func_sym = if self.rfunc_syms.overload_count(rsym) == 1 {
            crate::sema::sym::OverloadRef::One(rfunc)
        } else {
            crate::sema::sym::OverloadRef::Overloaded
        };
        let sym = self.rsyms.get_mut(rsym);
        sym.kind = ResolvedSymKind::Func { func_sym };
        sym.exported |= exported;
        Ok((rsym, rfunc))
    }

    /// Intern a resolved spec; on first sight create a placeholder module
    /// and enqueue an import task. The placeholder makes cyclic imports
    /// terminate.
    pub(crate) fn get_or_load_module(
        &mut self,
        resolved: &ResolvedSpec,
        provider_chunk: ChunkId,
        node: NodeId,
    ) -> ModuleId {
        if let Some(id) = self.modules.lookup(&resolved.abs_spec) {
            return id;
        }
        let id = self.create_module(&resolved.abs_spec, resolved.builtin);
        tracing::debug!(spec = %resolved.abs_spec, ?id, "queueing module import");
        self.import_queue.push_back(ImportTask {
            provider_chunk,
            node,
            abs_spec: resolved.abs_spec.clone(),
            module: id,
            builtin: resolved.builtin,
        });
        id
    }
}

/// Per-chunk analysis state, kept after analysis for the code generator
#[derive(Debug)]
pub struct Chunk {
    pub id: ChunkId,
    /// Source URI; filesystem imports resolve relative to its parent
    pub uri: String,
    pub mod_id: ModuleId,
    pub syms: SymTable,
    pub sigs: FuncSigTable,
    pub sym_refs: FxHashMap<NameId, SymRef>,
    pub blocks: BlockState,
    pub output: AnalysisOutput,
    /// Local sym of the builtin `any` type, interned at analysis start
    pub(crate) any_sym: Option<SymId>,
    /// Set while analyzing a static initializer expression
    pub(crate) cur_sema_sym_var: Option<SymId>,
    /// Flat dependency buffer for static initializers
    pub init_deps: Vec<SymId>,
    /// Per static sym: `(start, end)` slice into `init_deps`
    pub init_dep_slices: FxHashMap<SymId, (u32, u32)>,
    /// Dedup set for the initializer currently being analyzed
    pub(crate) cur_dep_set: FxHashSet<SymId>,
}

impl Chunk {
    fn new(id: ChunkId, uri: String, mod_id: ModuleId) -> Self {
        Self {
            id,
            uri,
            mod_id,
            syms: SymTable::new(),
            sigs: FuncSigTable::new(),
            sym_refs: FxHashMap::default(),
            blocks: BlockState::new(),
            output: AnalysisOutput::default(),
            any_sym: None,
            cur_sema_sym_var: None,
            init_deps: Vec::new(),
            init_dep_slices: FxHashMap::default(),
            cur_dep_set: FxHashSet::default(),
        }
    }
}

pub struct Compiler {
    pub globals: Globals,
    chunks: Vec<Chunk>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_module_loaders(HashSet::new())
    }

    pub fn with_module_loaders(module_loaders: HashSet<String>) -> Self {
        Self {
            globals: Globals::new(module_loaders),
            chunks: Vec::new(),
        }
    }

    pub fn intern(&mut self, name: &str) -> NameId {
        self.globals.interner.intern(name)
    }

    /// Register a parsed chunk. The chunk's module is interned by `uri`;
    /// when a placeholder module already exists (an import got here first),
    /// the chunk attaches to it.
    pub fn add_chunk(&mut self, uri: &str) -> ChunkId {
        let id = ChunkId::new(self.chunks.len() as u32);
        let mod_id = self.globals.create_module(uri, false);
        self.globals.modules.get_mut(mod_id).chunk = Some(id);
        self.chunks.push(Chunk::new(id, uri.to_string(), mod_id));
        id
    }

    /// Run the traversal pass over one chunk: build blocks, vars, and syms,
    /// queueing imports for the host. The first error aborts the chunk;
    /// other chunks stay analyzable.
    pub fn analyze_chunk(&mut self, chunk: ChunkId, program: &Program) -> Result<(), TypeError> {
        let chunk = &mut self.chunks[chunk.index() as usize];
        let mut analyzer = Analyzer::new(&mut self.globals, chunk);
        analyzer.traverse(program)
    }

    /// Run the resolution pass over one chunk. Call after every chunk it
    /// imports (directly or transitively) has been through `analyze_chunk`.
    pub fn resolve_chunk(&mut self, chunk: ChunkId) -> Result<(), TypeError> {
        let chunk = &mut self.chunks[chunk.index() as usize];
        let mut analyzer = Analyzer::new(&mut self.globals, chunk);
        analyzer.resolve()
    }

    /// Drain pending import tasks, FIFO
    pub fn take_import_tasks(&mut self) -> Vec<ImportTask> {
        self.globals.import_queue.drain(..).collect()
    }

    pub fn chunk(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id.index() as usize]
    }

    pub fn query(&self, id: ChunkId) -> ChunkQuery<'_> {
        ChunkQuery::new(&self.globals, self.chunk(id))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
