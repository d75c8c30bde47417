// src/sema/analyzer/lookup.rs
//! Name lookup strategies for identifier reads and the assignment family.
//!
//! The outcome is either a local variable slot or a chunk-level sym (through
//! a static-alias local). Lookup consults the current block's transient name
//! map first, then exactly one enclosing block for capture, then falls back
//! to chunk-level syms.

use super::*;
use crate::errors::SemanticError;
use crate::sema::block::LocalVarKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookupStrategy {
    Read,
    Assign,
    /// `capture x [= rhs]`
    CaptureAssign,
    /// `static x [= rhs]`
    StaticAssign,
}

/// Where a name landed
#[derive(Debug, Clone, Copy)]
pub(crate) enum VarTarget {
    Local(LocalVarId),
    /// The name refers to a chunk-level sym (via a static alias)
    Static(SymId),
}

impl Analyzer<'_> {
    pub(crate) fn get_or_lookup_var(
        &mut self,
        name: NameId,
        span: Span,
        strat: LookupStrategy,
    ) -> AResult<VarTarget> {
        if let Some(var) = self.chunk.blocks.lookup_var(name) {
            return self.lookup_present(name, var, span, strat);
        }
        self.lookup_absent(name, span, strat)
    }

    fn lookup_present(
        &mut self,
        name: NameId,
        var: LocalVarId,
        span: Span,
        strat: LookupStrategy,
    ) -> AResult<VarTarget> {
        let kind = self.chunk.blocks.var(var).kind;
        match (kind, strat) {
            (LocalVarKind::Local, LookupStrategy::Read) => {
                if self.in_static_initializer() && self.chunk.blocks.block_depth() == 1 {
                    return Err(Halt::CanNotUseLocal { var, span });
                }
                Ok(VarTarget::Local(var))
            }
            (LocalVarKind::Local, LookupStrategy::Assign) => Ok(VarTarget::Local(var)),
            (LocalVarKind::Local, _) => self.err(
                SemanticError::LocalAlreadyDeclared {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            ),

            (LocalVarKind::Captured { .. }, LookupStrategy::Read) => Ok(VarTarget::Local(var)),
            (LocalVarKind::Captured { .. }, LookupStrategy::Assign) => {
                if self.chunk.blocks.var(var).has_capture_or_static_modifier {
                    Ok(VarTarget::Local(var))
                } else {
                    self.err(
                        SemanticError::CaptureAssignWithoutModifier {
                            name: self.name(name).to_string(),
                            span: span.into(),
                        },
                        span,
                    )
                }
            }
            (LocalVarKind::Captured { .. }, LookupStrategy::CaptureAssign) => {
                self.chunk.blocks.var_mut(var).has_capture_or_static_modifier = true;
                Ok(VarTarget::Local(var))
            }
            (LocalVarKind::Captured { .. }, LookupStrategy::StaticAssign) => self.err(
                SemanticError::LocalAlreadyDeclared {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            ),

            (LocalVarKind::StaticAlias { sym }, LookupStrategy::Read) => {
                self.touch_root_sym(sym);
                Ok(VarTarget::Static(sym))
            }
            (LocalVarKind::StaticAlias { sym }, LookupStrategy::Assign) => {
                let v = self.chunk.blocks.var(var);
                if v.has_capture_or_static_modifier || self.chunk.blocks.block_depth() == 1 {
                    self.touch_root_sym(sym);
                    Ok(VarTarget::Static(sym))
                } else {
                    self.err(
                        SemanticError::StaticAssignWithoutModifier {
                            name: self.name(name).to_string(),
                            span: span.into(),
                        },
                        span,
                    )
                }
            }
            (LocalVarKind::StaticAlias { sym }, LookupStrategy::StaticAssign) => {
                self.chunk.blocks.var_mut(var).has_capture_or_static_modifier = true;
                self.touch_root_sym(sym);
                Ok(VarTarget::Static(sym))
            }
            (LocalVarKind::StaticAlias { .. }, LookupStrategy::CaptureAssign) => self.err(
                SemanticError::LocalAlreadyDeclared {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            ),
        }
    }

    fn lookup_absent(
        &mut self,
        name: NameId,
        span: Span,
        strat: LookupStrategy,
    ) -> AResult<VarTarget> {
        match strat {
            LookupStrategy::Read => {
                if let Some(parent) = self.parent_local(name) {
                    return self.capture_parent_local(name, parent, span, false);
                }
                Ok(VarTarget::Static(self.install_static_alias(name, span, false)))
            }
            LookupStrategy::Assign => {
                if self.chunk.blocks.block_depth() == 1 && self.root_name_taken(name) {
                    return Ok(VarTarget::Static(self.install_static_alias(
                        name, span, false,
                    )));
                }
                let var = self
                    .chunk
                    .blocks
                    .add_var(name, Type::Undefined, LocalVarKind::Local, false);
                if self.chunk.blocks.cur_block().sub_block_depth > 1 {
                    self.chunk.blocks.var_mut(var).gen_initializer = true;
                }
                Ok(VarTarget::Local(var))
            }
            LookupStrategy::CaptureAssign => {
                if let Some(parent) = self.parent_local(name) {
                    return self.capture_parent_local(name, parent, span, true);
                }
                self.err(
                    SemanticError::CaptureWithoutParentLocal {
                        name: self.name(name).to_string(),
                        span: span.into(),
                    },
                    span,
                )
            }
            LookupStrategy::StaticAssign => {
                Ok(VarTarget::Static(self.install_static_alias(name, span, true)))
            }
        }
    }

    /// Capture a parent-block local for a function-value call, if one
    /// exists. Misses fall through to the sym path without erroring.
    pub(crate) fn capture_callee(
        &mut self,
        name: NameId,
        span: Span,
    ) -> AResult<Option<LocalVarId>> {
        let Some(parent) = self.parent_local(name) else {
            return Ok(None);
        };
        match self.capture_parent_local(name, parent, span, false)? {
            VarTarget::Local(var) => Ok(Some(var)),
            VarTarget::Static(_) => Ok(None),
        }
    }

    /// A capturable local in the directly enclosing block (depth − 1 only)
    fn parent_local(&self, name: NameId) -> Option<LocalVarId> {
        let parent = self.chunk.blocks.parent_block_id()?;
        let var = self.chunk.blocks.lookup_var_in(parent, name)?;
        match self.chunk.blocks.var(var).kind {
            LocalVarKind::StaticAlias { .. } => None,
            _ => Some(var),
        }
    }

    fn capture_parent_local(
        &mut self,
        name: NameId,
        parent: LocalVarId,
        span: Span,
        with_modifier: bool,
    ) -> AResult<VarTarget> {
        // Capturing a top-level local from inside a static initializer's
        // lambda body reaches a local that does not exist yet.
        if self.in_static_initializer() && self.chunk.blocks.block_depth() == 2 {
            return Err(Halt::CanNotUseLocal { var: parent, span });
        }
        if self.chunk.blocks.cur_block().is_static_func_block {
            return self.err(
                SemanticError::CaptureInStaticFunction {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            );
        }

        let ptype = self.chunk.blocks.var(parent).vtype;
        self.chunk.blocks.var_mut(parent).is_boxed = true;
        let var = self.chunk.blocks.add_var(
            name,
            ptype,
            LocalVarKind::Captured { parent },
            true,
        );
        if with_modifier {
            self.chunk.blocks.var_mut(var).has_capture_or_static_modifier = true;
        }
        Ok(VarTarget::Local(var))
    }

    fn install_static_alias(&mut self, name: NameId, span: Span, with_modifier: bool) -> SymId {
        let sym = self.chunk.syms.get_or_create(None, name, None, span);
        self.touch_root_sym(sym);
        let var = self.chunk.blocks.add_var(
            name,
            Type::Any,
            LocalVarKind::StaticAlias { sym },
            false,
        );
        if with_modifier {
            self.chunk.blocks.var_mut(var).has_capture_or_static_modifier = true;
        }
        sym
    }

    /// Is the name already taken at the chunk root (sym, resolved sym, or
    /// alias redirect)?
    fn root_name_taken(&self, name: NameId) -> bool {
        self.chunk.syms.lookup(None, name, None).is_some()
            || self.chunk.sym_refs.contains_key(&name)
            || self
                .g
                .rsyms
                .lookup(Some(self.root_rsym()), name)
                .is_some()
    }
}
