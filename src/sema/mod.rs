// src/sema/mod.rs
pub mod analyzer;
pub mod block;
pub mod func_sig;
pub mod query;
pub mod sym;
pub mod types;

pub use analyzer::Analyzer;
pub use block::{Block, BlockState, LocalVar, LocalVarKind, SubBlock};
pub use func_sig::{FuncSig, FuncSigTable, ResolvedFuncSig, ResolvedFuncSigTable};
pub use query::{AnalysisOutput, Binding, ChunkQuery};
pub use sym::{
    OverloadRef, ResolvedFuncSym, ResolvedFuncSymTable, ResolvedSym, ResolvedSymKind,
    ResolvedSymTable, Sym, SymRef, SymTable,
};
pub use types::{Type, TypeTag};
