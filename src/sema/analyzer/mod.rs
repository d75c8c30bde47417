// src/sema/analyzer/mod.rs

mod decl;
mod expr;
mod lookup;
mod resolve;
mod stmt;

use crate::compiler::{Chunk, Globals};
use crate::errors::{SemanticError, TypeError};
use crate::frontend::Span;
use crate::frontend::ast::{NodeId, Program};
use crate::identity::{LocalVarId, NameId, ResolvedSymId, SymId};
use crate::sema::query::Binding;
use crate::sema::types::Type;

pub(crate) use lookup::LookupStrategy;

/// Why a statement's analysis stopped.
///
/// `CanNotUseLocal` threads the static-initializer scope violation to the
/// var-decl / func-init handler that knows the enclosing sym's name; every
/// other error aborts the chunk.
#[derive(Debug)]
pub(crate) enum Halt {
    CanNotUseLocal { var: LocalVarId, span: Span },
    Err(TypeError),
}

impl From<TypeError> for Halt {
    fn from(err: TypeError) -> Self {
        Halt::Err(err)
    }
}

pub(crate) type AResult<T> = Result<T, Halt>;

/// The statement/expression traversal over one chunk.
pub struct Analyzer<'a> {
    pub(crate) g: &'a mut Globals,
    pub(crate) chunk: &'a mut Chunk,
}

impl<'a> Analyzer<'a> {
    pub fn new(g: &'a mut Globals, chunk: &'a mut Chunk) -> Self {
        Self { g, chunk }
    }

    /// Traverse the chunk's statements, building blocks, vars, and syms and
    /// queueing imports. Resolution runs separately once every imported
    /// chunk has been traversed.
    pub fn traverse(&mut self, program: &Program) -> Result<(), TypeError> {
        let any_sym = self
            .chunk
            .syms
            .get_or_create(None, self.g.names.any, None, Span::default());
        self.chunk.syms.mark_used(any_sym);
        self.chunk.syms.get_mut(any_sym).r_sym = Some(self.g.any_rsym());
        self.chunk.any_sym = Some(any_sym);

        self.chunk.blocks.push_block(None, false);
        for stmt in &program.stmts {
            self.analyze_stmt(stmt).map_err(|halt| self.halt_to_error(halt))?;
        }
        self.chunk.blocks.end_block();
        Ok(())
    }

    /// The second pass: resolve every used sym created by `traverse`.
    pub fn resolve(&mut self) -> Result<(), TypeError> {
        self.resolve_used_syms()
    }

    /// A `CanNotUseLocal` that escaped its catcher still becomes a readable
    /// diagnostic.
    pub(crate) fn halt_to_error(&self, halt: Halt) -> TypeError {
        match halt {
            Halt::Err(err) => err,
            Halt::CanNotUseLocal { var, span } => TypeError::new(
                SemanticError::LocalInStaticInitializer {
                    sym: self.static_ctx_name(),
                    local: self.var_name(var).to_string(),
                    span: span.into(),
                },
                span,
            ),
        }
    }

    pub(crate) fn static_ctx_name(&self) -> String {
        match self.chunk.cur_sema_sym_var {
            Some(sym) => self.sym_name(sym).to_string(),
            None => String::new(),
        }
    }

    pub(crate) fn name(&self, id: NameId) -> &str {
        self.g.interner.resolve(id)
    }

    pub(crate) fn var_name(&self, var: LocalVarId) -> &str {
        self.name(self.chunk.blocks.var(var).name)
    }

    pub(crate) fn sym_name(&self, sym: SymId) -> &str {
        self.name(self.chunk.syms.get(sym).name)
    }

    pub(crate) fn any_sym(&self) -> SymId {
        self.chunk.any_sym.expect("analysis started")
    }

    /// The resolved root sym of this chunk's module
    pub(crate) fn root_rsym(&self) -> ResolvedSymId {
        self.g.modules.get(self.chunk.mod_id).root_rsym
    }

    pub(crate) fn err<T>(&self, error: SemanticError, span: Span) -> AResult<T> {
        Err(Halt::Err(TypeError::new(error, span)))
    }

    pub(crate) fn bind_var(&mut self, node: NodeId, var: LocalVarId) {
        self.chunk.output.bind(node, Binding::Var(var));
    }

    pub(crate) fn bind_sym(&mut self, node: NodeId, sym: SymId) {
        self.chunk.output.bind(node, Binding::Sym(sym));
    }

    /// Mark a root sym referenced; inside a static initializer the sym also
    /// joins the initializer's dependency slice (deduplicated).
    pub(crate) fn touch_root_sym(&mut self, sym: SymId) {
        self.chunk.syms.mark_used(sym);
        if self.chunk.cur_sema_sym_var.is_some() && self.chunk.cur_dep_set.insert(sym) {
            self.chunk.init_deps.push(sym);
        }
    }

    /// True while analyzing a static-var or static-func initializer
    pub(crate) fn in_static_initializer(&self) -> bool {
        self.chunk.cur_sema_sym_var.is_some()
    }

    /// Run `f` with `sym` as the current static-initializer context,
    /// recording the dependency slice and converting `CanNotUseLocal` into
    /// the localized diagnostic.
    pub(crate) fn with_initializer_ctx<T>(
        &mut self,
        sym: SymId,
        f: impl FnOnce(&mut Self) -> AResult<T>,
    ) -> AResult<T> {
        let dep_start = self.chunk.init_deps.len() as u32;
        self.chunk.cur_sema_sym_var = Some(sym);
        self.chunk.cur_dep_set.clear();

        let result = f(self);

        let outcome = match result {
            Err(Halt::CanNotUseLocal { var, span }) => self.err(
                SemanticError::LocalInStaticInitializer {
                    sym: self.sym_name(sym).to_string(),
                    local: self.var_name(var).to_string(),
                    span: span.into(),
                },
                span,
            ),
            other => other,
        };
        self.chunk.cur_sema_sym_var = None;
        if outcome.is_ok() {
            let dep_end = self.chunk.init_deps.len() as u32;
            self.chunk.init_dep_slices.insert(sym, (dep_start, dep_end));
        }
        outcome
    }

    /// Map a declared type name to a Type; unrecognized names fall back to
    /// `any`.
    pub(crate) fn type_from_spec(&self, spec: Option<NameId>) -> Type {
        spec.and_then(|name| self.g.builtin_type(name))
            .unwrap_or(Type::Any)
    }
}

#[cfg(test)]
mod tests;
