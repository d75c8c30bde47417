// src/sema/analyzer/stmt.rs

use super::lookup::VarTarget;
use super::*;
use crate::errors::SemanticError;
use crate::frontend::ast::{ElseIf, Expr, ExprKind, Stmt, StmtKind};
use crate::module::loader;
use crate::sema::sym::SymRef;

impl Analyzer<'_> {
    pub(crate) fn analyze_stmts(&mut self, stmts: &[Stmt]) -> AResult<()> {
        for stmt in stmts {
            self.analyze_stmt(stmt)?;
        }
        Ok(())
    }

    pub(crate) fn analyze_stmt(&mut self, stmt: &Stmt) -> AResult<()> {
        match &stmt.kind {
            // Break/continue placement is validated by codegen, not here
            StmtKind::Pass | StmtKind::Break | StmtKind::Continue | StmtKind::At => Ok(()),
            StmtKind::Return(None) => Ok(()),
            StmtKind::Return(Some(expr)) => {
                let rtype = self.analyze_expr(expr)?;
                self.note_return_type(rtype);
                Ok(())
            }
            StmtKind::Expr(expr) => {
                self.analyze_expr(expr)?;
                Ok(())
            }
            StmtKind::Assign { lhs, rhs } => self.analyze_assign(stmt, lhs, rhs),
            StmtKind::OpAssign { lhs, rhs, .. } => self.analyze_op_assign(stmt, lhs, rhs),
            StmtKind::VarDecl { lhs, rhs } => {
                self.analyze_var_decl(stmt, lhs, rhs, false)?;
                Ok(())
            }
            StmtKind::CaptureDecl { name, rhs } => {
                self.analyze_modifier_decl(name, rhs.as_ref(), LookupStrategy::CaptureAssign)
            }
            StmtKind::StaticDecl { name, rhs } => {
                self.analyze_modifier_decl(name, rhs.as_ref(), LookupStrategy::StaticAssign)
            }
            StmtKind::TypeAliasDecl { name, target } => {
                self.analyze_type_alias(stmt, *name, target)
            }
            StmtKind::TagDecl { name, members } => {
                let tag_type = self.g.runtime.ensure_tag_type(*name);
                for (ordinal, member) in members.iter().enumerate() {
                    let lit = self.g.runtime.ensure_tag_lit_sym(*member);
                    self.g.runtime.set_tag_lit_sym(tag_type, lit, ordinal as u32);
                }
                Ok(())
            }
            StmtKind::ObjectDecl(decl) => self.analyze_object_decl(stmt, decl, false),
            StmtKind::FuncDecl(decl) => self.analyze_func_decl(decl, false).map(|_| ()),
            StmtKind::If {
                cond,
                then_body,
                else_ifs,
                else_body,
            } => self.analyze_if(cond, then_body, else_ifs, else_body.as_deref()),
            StmtKind::WhileCond { cond, body } => {
                self.analyze_expr(cond)?;
                self.with_sub_block(true, |a| a.analyze_stmts(body))
            }
            StmtKind::WhileInf { body } => {
                self.with_sub_block(true, |a| a.analyze_stmts(body))
            }
            StmtKind::ForOpt { opt, as_name, body } => {
                self.analyze_expr(opt)?;
                self.with_sub_block(true, |a| {
                    if let Some(name) = as_name {
                        // The `as` binding carries the optional's unwrapped
                        // value
                        a.declare_loop_var(*name, Type::Any, false, stmt.span)?;
                    }
                    a.analyze_stmts(body)
                })
            }
            StmtKind::ForIter {
                iterable,
                value,
                key,
                body,
            } => {
                self.analyze_expr(iterable)?;
                self.with_sub_block(true, |a| {
                    if let Some(name) = key {
                        a.declare_loop_var(*name, Type::Any, true, stmt.span)?;
                    }
                    if let Some(name) = value {
                        a.declare_loop_var(*name, Type::Any, true, stmt.span)?;
                    }
                    a.analyze_stmts(body)
                })
            }
            StmtKind::ForRange {
                start,
                end,
                each,
                body,
            } => {
                self.analyze_expr(start)?;
                self.analyze_expr(end)?;
                self.with_sub_block(true, |a| {
                    if let Some(name) = each {
                        a.declare_loop_var(*name, Type::number(), false, stmt.span)?;
                    }
                    a.analyze_stmts(body)
                })
            }
            StmtKind::Match(data) => {
                self.analyze_match(data)?;
                Ok(())
            }
            StmtKind::Import { name, spec } => {
                let module = self.load_import(stmt, spec)?;
                self.chunk.sym_refs.insert(*name, SymRef::Module(module));
                Ok(())
            }
            StmtKind::ImportAll { spec } => {
                let module = self.load_import(stmt, spec)?;
                let member_names: Vec<NameId> = self
                    .g
                    .modules
                    .get(module)
                    .sym_keys()
                    .map(|(name, _)| name)
                    .collect();
                for name in member_names {
                    self.chunk
                        .sym_refs
                        .insert(name, SymRef::ModuleMember(module));
                }
                Ok(())
            }
            StmtKind::Export(inner) => self.analyze_export(inner),
        }
    }

    /// Record a `return expr` against the enclosing block's inferred return
    /// type: the first return fixes it, later returns of a different tag
    /// widen to `any`.
    fn note_return_type(&mut self, rtype: Type) {
        let block = self.chunk.blocks.cur_block_mut();
        if !block.infer_ret_type {
            return;
        }
        if !block.has_ret_type {
            block.ret_type = rtype.to_local_type();
            block.has_ret_type = true;
        } else if block.ret_type.tag() != rtype.tag() {
            block.ret_type = Type::Any;
        }
    }

    fn analyze_assign(&mut self, stmt: &Stmt, lhs: &Expr, rhs: &Expr) -> AResult<()> {
        match &lhs.kind {
            ExprKind::Ident(_) => {
                let rtype = self.analyze_expr(rhs)?;
                self.assign_ident(lhs, rtype, LookupStrategy::Assign)
            }
            ExprKind::Index { left, index } => {
                self.analyze_expr(left)?;
                self.analyze_expr(index)?;
                self.analyze_expr(rhs)?;
                Ok(())
            }
            ExprKind::Access { .. } => {
                self.analyze_access_chain(lhs)?;
                self.analyze_expr(rhs)?;
                Ok(())
            }
            _ => self.err(
                SemanticError::InvalidAssignTarget {
                    span: lhs.span.into(),
                },
                stmt.span,
            ),
        }
    }

    fn analyze_op_assign(&mut self, stmt: &Stmt, lhs: &Expr, rhs: &Expr) -> AResult<()> {
        match &lhs.kind {
            ExprKind::Ident(_) => {
                let rtype = self.analyze_expr(rhs)?;
                self.assign_ident(lhs, rtype, LookupStrategy::Assign)
            }
            ExprKind::Access { .. } => {
                self.analyze_access_chain(lhs)?;
                self.analyze_expr(rhs)?;
                Ok(())
            }
            _ => self.err(
                SemanticError::InvalidAssignTarget {
                    span: lhs.span.into(),
                },
                stmt.span,
            ),
        }
    }

    /// Route an identifier assignment through the lookup strategy table and
    /// record the result.
    pub(crate) fn assign_ident(
        &mut self,
        lhs: &Expr,
        rtype: Type,
        strat: LookupStrategy,
    ) -> AResult<()> {
        let ExprKind::Ident(name) = lhs.kind else {
            return self.err(
                SemanticError::InvalidAssignTarget {
                    span: lhs.span.into(),
                },
                lhs.span,
            );
        };
        match self.get_or_lookup_var(name, lhs.span, strat)? {
            VarTarget::Local(var) => {
                self.chunk.blocks.assign_var(var, rtype);
                self.bind_var(lhs.id, var);
            }
            VarTarget::Static(sym) => {
                self.bind_sym(lhs.id, sym);
            }
        }
        Ok(())
    }

    /// `capture x [= rhs]` / `static x [= rhs]`
    fn analyze_modifier_decl(
        &mut self,
        name: &Expr,
        rhs: Option<&Expr>,
        strat: LookupStrategy,
    ) -> AResult<()> {
        let rtype = match rhs {
            Some(expr) => self.analyze_expr(expr)?,
            None => Type::Undefined,
        };
        self.assign_ident(name, rtype, strat)
    }

    /// `var name: rhs` — a chunk-level static variable. Returns the name and
    /// its local sym for export publication.
    pub(crate) fn analyze_var_decl(
        &mut self,
        stmt: &Stmt,
        lhs: &Expr,
        rhs: &Expr,
        exported: bool,
    ) -> AResult<(NameId, SymId)> {
        let ExprKind::Ident(name) = lhs.kind else {
            return self.err(
                SemanticError::VarDeclNotIdent {
                    span: lhs.span.into(),
                },
                stmt.span,
            );
        };

        let root = self.root_rsym();
        if self.g.rsyms.lookup(Some(root), name).is_some()
            || self.chunk.sym_refs.contains_key(&name)
        {
            return self.err(
                SemanticError::DuplicateSymbol {
                    name: self.name(name).to_string(),
                    span: lhs.span.into(),
                },
                stmt.span,
            );
        }

        let sym = self.chunk.syms.get_or_create(None, name, None, lhs.span);
        self.chunk.syms.mark_used(sym);
        self.bind_sym(lhs.id, sym);

        self.with_initializer_ctx(sym, |a| a.analyze_expr(rhs))?;

        let rsym = self
            .g
            .rsyms
            .insert(
                Some(root),
                name,
                exported,
                crate::sema::sym::ResolvedSymKind::Variable {
                    chunk: Some(self.chunk.id),
                    decl: Some(stmt.id),
                },
            )
            .expect("root name checked above");
        self.chunk.syms.get_mut(sym).r_sym = Some(rsym);
        Ok((name, sym))
    }

    fn analyze_type_alias(&mut self, stmt: &Stmt, name: NameId, target: &Expr) -> AResult<()> {
        if self.chunk.sym_refs.contains_key(&name) {
            return self.err(
                SemanticError::DuplicateSymbol {
                    name: self.name(name).to_string(),
                    span: stmt.span.into(),
                },
                stmt.span,
            );
        }
        let target_sym = match &target.kind {
            ExprKind::Ident(n) => {
                let sym = self.chunk.syms.get_or_create(None, *n, None, target.span);
                self.touch_root_sym(sym);
                self.bind_sym(target.id, sym);
                sym
            }
            ExprKind::Access { .. } => match self.analyze_access_chain(target)? {
                Some(sym) => sym,
                None => {
                    return self.err(
                        SemanticError::UnsupportedAliasTarget {
                            span: target.span.into(),
                        },
                        stmt.span,
                    );
                }
            },
            _ => {
                return self.err(
                    SemanticError::UnsupportedAliasTarget {
                        span: target.span.into(),
                    },
                    stmt.span,
                );
            }
        };
        self.chunk.sym_refs.insert(name, SymRef::Sym(target_sym));
        Ok(())
    }

    fn analyze_if(
        &mut self,
        cond: &Expr,
        then_body: &[Stmt],
        else_ifs: &[ElseIf],
        else_body: Option<&[Stmt]>,
    ) -> AResult<()> {
        self.analyze_expr(cond)?;
        self.with_sub_block(false, |a| a.analyze_stmts(then_body))?;
        for else_if in else_ifs {
            // The condition evaluates at the parent level, outside the
            // branch's sub-block
            self.analyze_expr(&else_if.cond)?;
            self.with_sub_block(false, |a| a.analyze_stmts(&else_if.body))?;
        }
        if let Some(body) = else_body {
            self.with_sub_block(false, |a| a.analyze_stmts(body))?;
        }
        Ok(())
    }

    pub(crate) fn with_sub_block<T>(
        &mut self,
        iter: bool,
        f: impl FnOnce(&mut Self) -> AResult<T>,
    ) -> AResult<T> {
        self.chunk.blocks.push_sub_block(iter);
        let result = f(self);
        self.chunk.blocks.end_sub_block();
        result
    }

    /// Create (or re-bind) a loop-scoped variable through the assign
    /// strategy.
    fn declare_loop_var(
        &mut self,
        name: NameId,
        vtype: Type,
        gen_initializer: bool,
        span: Span,
    ) -> AResult<()> {
        match self.get_or_lookup_var(name, span, LookupStrategy::Assign)? {
            VarTarget::Local(var) => {
                self.chunk.blocks.assign_var(var, vtype);
                if gen_initializer {
                    self.chunk.blocks.var_mut(var).gen_initializer = true;
                }
            }
            VarTarget::Static(_) => {}
        }
        Ok(())
    }

    fn load_import(&mut self, stmt: &Stmt, spec: &str) -> AResult<crate::identity::ModuleId> {
        let resolved = loader::resolve_spec(spec, &self.chunk.uri, &self.g.module_loaders)
            .map_err(|err| {
                let spec = match &err {
                    loader::LoadError::PathNotFound(_) => spec.to_string(),
                    other => format!("{} ({})", spec, other),
                };
                Halt::Err(crate::errors::TypeError::new(
                    SemanticError::ImportPathNotFound {
                        spec,
                        span: stmt.span.into(),
                    },
                    stmt.span,
                ))
            })?;
        Ok(self.g.get_or_load_module(&resolved, self.chunk.id, stmt.id))
    }

    fn analyze_export(&mut self, inner: &Stmt) -> AResult<()> {
        match &inner.kind {
            StmtKind::VarDecl { lhs, rhs } => {
                let (name, _) = self.analyze_var_decl(inner, lhs, rhs, true)?;
                let chunk = self.chunk.id;
                self.g
                    .modules
                    .get_mut(self.chunk.mod_id)
                    .set_user_var(name, chunk, inner.id);
                Ok(())
            }
            StmtKind::FuncDecl(decl) => {
                let func = self.analyze_func_decl(decl, true)?;
                let chunk = self.chunk.id;
                self.g.modules.get_mut(self.chunk.mod_id).set_user_func(
                    decl.name,
                    func.r_sig,
                    chunk,
                    decl.id,
                    func.ret,
                );
                Ok(())
            }
            StmtKind::ObjectDecl(decl) => {
                self.analyze_object_decl(inner, decl, true)?;
                let chunk = self.chunk.id;
                self.g
                    .modules
                    .get_mut(self.chunk.mod_id)
                    .set_user_object(decl.name, chunk, inner.id);
                Ok(())
            }
            _ => self.err(
                SemanticError::UnsupportedExport {
                    span: inner.span.into(),
                },
                inner.span,
            ),
        }
    }
}
