// src/sema/analyzer/resolve.rs
//! Lazy sym resolution: the second pass binding every used local sym to its
//! process-wide resolved identity, pulling module members into the global
//! table on first use.

use super::*;
use crate::errors::{SemanticError, TypeError};
use crate::identity::{FuncSigId, ModuleId, ResolvedFuncSigId};
use crate::module::ModuleSym;
use crate::runtime::FuncSymEntry;
use crate::sema::func_sig::ResolvedSigElems;
use crate::sema::sym::{ResolvedFuncSym, ResolvedSymKind, SymRef};

impl Analyzer<'_> {
    pub(crate) fn resolve_used_syms(&mut self) -> Result<(), TypeError> {
        for id in self.chunk.syms.ids() {
            let sym = self.chunk.syms.get(id);
            if sym.used && sym.r_sym.is_none() {
                self.resolve_sym(id)
                    .map_err(|halt| self.halt_to_error(halt))?;
            }
        }
        Ok(())
    }

    /// DFS with memoization through `r_sym`. Returns None when the sym must
    /// stay unresolved (unresolved parent), which is not an error.
    fn resolve_sym(&mut self, id: SymId) -> AResult<Option<ResolvedSymId>> {
        if let Some(resolved) = self.chunk.syms.get(id).r_sym {
            return Ok(Some(resolved));
        }
        let (parent, name, sig, span) = {
            let sym = self.chunk.syms.get(id);
            (sym.parent, sym.name, sym.sig, sym.span)
        };

        let r_sig = match sig {
            None => None,
            Some(sig_id) => Some(self.resolve_local_sig(sig_id, span)?),
        };

        let resolved = match parent {
            None => Some(self.resolve_root_sym(name, r_sig, span)?),
            Some(parent_id) => match self.resolve_sym(parent_id)? {
                None => None,
                Some(parent_rsym) => Some(self.resolve_child_sym(name, r_sig, parent_rsym, span)?),
            },
        };

        if let Some(rsym) = resolved {
            self.chunk.syms.get_mut(id).r_sym = Some(rsym);
            tracing::debug!(
                sym = %self.name(name),
                rsym = rsym.index(),
                "resolved sym"
            );
        }
        Ok(resolved)
    }

    /// Resolve a local func sig by resolving each element sym first.
    fn resolve_local_sig(&mut self, sig: FuncSigId, span: Span) -> AResult<ResolvedFuncSigId> {
        if let Some(resolved) = self.chunk.sigs.get(sig).r_sig {
            return Ok(resolved);
        }
        let elems: Vec<SymId> = self.chunk.sigs.get(sig).elems.to_vec();
        let mut resolved_elems = ResolvedSigElems::new();
        for elem in elems {
            match self.resolve_sym(elem)? {
                Some(rsym) => resolved_elems.push(rsym),
                None => {
                    return self.err(
                        SemanticError::UnresolvedParamType {
                            name: self.sym_name(elem).to_string(),
                            span: span.into(),
                        },
                        span,
                    );
                }
            }
        }
        let r_sig = self.g.rsigs.intern(resolved_elems, self.g.any_rsym());
        self.chunk.sigs.set_resolved(sig, r_sig);
        Ok(r_sig)
    }

    fn resolve_root_sym(
        &mut self,
        name: NameId,
        r_sig: Option<ResolvedFuncSigId>,
        span: Span,
    ) -> AResult<ResolvedSymId> {
        let root = self.root_rsym();
        if let Some(hit) = self.g.rsyms.lookup(Some(root), name) {
            return self.match_resolved(name, hit, r_sig, span);
        }

        if let Some(&sym_ref) = self.chunk.sym_refs.get(&name) {
            return match sym_ref {
                SymRef::Module(module) => Ok(self.g.modules.get(module).root_rsym),
                SymRef::ModuleMember(module) => {
                    self.resolve_module_member(module, name, r_sig, span)
                }
                SymRef::Sym(target) => match self.chunk.syms.get(target).r_sym {
                    Some(rsym) => Ok(rsym),
                    None => self.err(
                        SemanticError::UnresolvedAliasTarget {
                            name: self.sym_name(target).to_string(),
                            span: span.into(),
                        },
                        span,
                    ),
                },
            };
        }

        if let Some(rsym) = self.g.builtin_type_rsym(name) {
            return Ok(rsym);
        }

        self.err(
            SemanticError::UndefinedSymbol {
                name: self.name(name).to_string(),
                span: span.into(),
            },
            span,
        )
    }

    fn resolve_child_sym(
        &mut self,
        name: NameId,
        r_sig: Option<ResolvedFuncSigId>,
        parent: ResolvedSymId,
        span: Span,
    ) -> AResult<ResolvedSymId> {
        if let ResolvedSymKind::Module { module } = self.g.rsyms.get(parent).kind {
            return self.resolve_module_member(module, name, r_sig, span);
        }

        if let Some(hit) = self.g.rsyms.lookup(Some(parent), name) {
            self.check_visibility(name, hit, span)?;
            return self.match_resolved(name, hit, r_sig, span);
        }

        self.err(
            SemanticError::UndefinedSymbol {
                name: self.name(name).to_string(),
                span: span.into(),
            },
            span,
        )
    }

    fn check_visibility(&self, name: NameId, hit: ResolvedSymId, span: Span) -> AResult<()> {
        let entry = self.g.rsyms.get(hit);
        let visible =
            entry.exported || self.g.rsyms.root_module(hit) == Some(self.chunk.mod_id);
        if visible {
            Ok(())
        } else {
            self.err(
                SemanticError::NotExported {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            )
        }
    }

    /// Accept or reject a resolved-table hit against the request shape.
    fn match_resolved(
        &mut self,
        name: NameId,
        hit: ResolvedSymId,
        r_sig: Option<ResolvedFuncSigId>,
        span: Span,
    ) -> AResult<ResolvedSymId> {
        let kind = self.g.rsyms.get(hit).kind.clone();
        match (r_sig, kind) {
            // A non-func reference to a function group is only unambiguous
            // with a single overload
            (None, ResolvedSymKind::Func { .. }) => {
                if self.g.rfunc_syms.overload_count(hit) == 1 {
                    Ok(hit)
                } else {
                    self.err(
                        SemanticError::AmbiguousSymbol {
                            name: self.name(name).to_string(),
                            span: span.into(),
                        },
                        span,
                    )
                }
            }
            (None, _) => Ok(hit),
            // Calling a variable is a value call
            (Some(_), ResolvedSymKind::Variable { .. }) => Ok(hit),
            (Some(sig), ResolvedSymKind::Func { .. }) => {
                if self.g.rfunc_syms.lookup(hit, sig).is_some() {
                    Ok(hit)
                } else {
                    self.err(
                        SemanticError::UndefinedSymbol {
                            name: self.name(name).to_string(),
                            span: span.into(),
                        },
                        span,
                    )
                }
            }
            // Constructor-style call on an object type
            (Some(_), ResolvedSymKind::Object { .. }) => Ok(hit),
            (Some(_), ResolvedSymKind::Module { .. } | ResolvedSymKind::BuiltinType { .. }) => {
                self.err(
                    SemanticError::NotAFunctionRef {
                        name: self.name(name).to_string(),
                        span: span.into(),
                    },
                    span,
                )
            }
        }
    }

    /// Resolve `name` inside a module: a previously-converted resolved sym
    /// first, then the module's own sym map.
    fn resolve_module_member(
        &mut self,
        module: ModuleId,
        name: NameId,
        r_sig: Option<ResolvedFuncSigId>,
        span: Span,
    ) -> AResult<ResolvedSymId> {
        let root = self.g.modules.get(module).root_rsym;
        if let Some(hit) = self.g.rsyms.lookup(Some(root), name) {
            self.check_visibility(name, hit, span)?;
            // A func hit may still be missing the requested overload when
            // that overload sits unconverted in the module map
            let hit_is_func =
                matches!(self.g.rsyms.get(hit).kind, ResolvedSymKind::Func { .. });
            if let Some(sig) = r_sig
                && hit_is_func
                && self.g.rfunc_syms.lookup(hit, sig).is_none()
                && self.g.modules.get(module).sym(name, Some(sig)).is_some()
            {
                return self.convert_module_sym(module, name, Some(sig), span);
            }
            return self.match_resolved(name, hit, r_sig, span);
        }

        if let Some(sig) = r_sig
            && self.g.modules.get(module).sym(name, Some(sig)).is_some()
        {
            return self.convert_module_sym(module, name, Some(sig), span);
        }
        if self.g.modules.get(module).sym(name, None).is_some() {
            return self.convert_module_sym(module, name, None, span);
        }

        self.err(
            SemanticError::UndefinedSymbol {
                name: self.name(name).to_string(),
                span: span.into(),
            },
            span,
        )
    }

    /// Pull one module sym into the global resolved table.
    fn convert_module_sym(
        &mut self,
        module: ModuleId,
        name: NameId,
        key_sig: Option<ResolvedFuncSigId>,
        span: Span,
    ) -> AResult<ResolvedSymId> {
        let root = self.g.modules.get(module).root_rsym;
        let module_sym = self
            .g
            .modules
            .get(module)
            .sym(name, key_sig)
            .cloned()
            .expect("caller checked presence");
        tracing::debug!(member = %self.name(name), module = module.index(), "converting module sym");

        match module_sym {
            ModuleSym::NativeFunc1 { func, sig } => {
                let slot = self.g.runtime.ensure_func_sym(Some(root), name, sig);
                let resolved_sig = self.g.rsigs.get(sig);
                let entry = FuncSymEntry {
                    native: func,
                    is_typed: resolved_sig.is_typed,
                    arity: resolved_sig.arity() as u32,
                    r_sig: sig,
                };
                self.g.runtime.set_func_sym(slot, entry);
                let func_entry = ResolvedFuncSym {
                    chunk: None,
                    decl: None,
                    r_sig: sig,
                    ret: Type::Any,
                    has_static_initializer: false,
                };
                self.register_func_overload(Some(root), name, true, func_entry, span)
                    .map(|(rsym, _)| rsym)
            }
            ModuleSym::Variable { value } => {
                let slot = self.g.runtime.ensure_var_sym(Some(root), name);
                self.g.runtime.set_var_sym(slot, value);
                self.g.runtime.retain(value);
                Ok(self
                    .g
                    .rsyms
                    .insert(
                        Some(root),
                        name,
                        true,
                        ResolvedSymKind::Variable {
                            chunk: None,
                            decl: None,
                        },
                    )
                    .expect("member not yet converted"))
            }
            ModuleSym::UserVar { chunk, decl } => Ok(self
                .g
                .rsyms
                .insert(
                    Some(root),
                    name,
                    true,
                    ResolvedSymKind::Variable {
                        chunk: Some(chunk),
                        decl: Some(decl),
                    },
                )
                .expect("member not yet converted")),
            ModuleSym::UserFunc {
                chunk,
                decl,
                sig,
                ret,
            } => {
                let entry = ResolvedFuncSym {
                    chunk: Some(chunk),
                    decl: Some(decl),
                    r_sig: sig,
                    ret,
                    has_static_initializer: false,
                };
                self.register_func_overload(Some(root), name, true, entry, span)
                    .map(|(rsym, _)| rsym)
            }
            ModuleSym::Object { type_id } => Ok(self
                .g
                .rsyms
                .insert(
                    Some(root),
                    name,
                    true,
                    ResolvedSymKind::Object {
                        type_id,
                        chunk: None,
                        decl: None,
                    },
                )
                .expect("member not yet converted")),
            ModuleSym::SymToOneFunc { sig } => {
                self.convert_module_sym(module, name, Some(sig), span)
            }
            ModuleSym::SymToManyFuncs { .. } => self.err(
                SemanticError::AmbiguousSymbol {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            ),
            ModuleSym::UserObject { .. } => self.err(
                SemanticError::UnsupportedModuleSym {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            ),
        }
    }
}
