// src/sema/analyzer/decl.rs
//! Function, object, and lambda declarations.

use super::*;
use crate::compiler::FuncOverloadError;
use crate::errors::SemanticError;
use crate::frontend::ast::{FuncBody, FuncDecl, LambdaBody, LambdaExpr, ObjectDecl, Param, Stmt};
use crate::identity::{ResolvedFuncSigId, ResolvedFuncSymId};
use crate::sema::block::LocalVarKind;
use crate::sema::sym::{ResolvedFuncSym, ResolvedSymKind};

/// What a func decl resolved to, for export publication
pub(crate) struct FuncInfo {
    pub sym: SymId,
    pub rsym: ResolvedSymId,
    pub rfunc: ResolvedFuncSymId,
    pub r_sig: ResolvedFuncSigId,
    pub ret: Type,
}

impl Analyzer<'_> {
    pub(crate) fn analyze_func_decl(
        &mut self,
        decl: &FuncDecl,
        exported: bool,
    ) -> AResult<FuncInfo> {
        match &decl.body {
            FuncBody::Stmts(body) => {
                let block = self.chunk.blocks.push_block(Some(decl.id), true);
                let declared_ret = decl.ret_spec.map(|spec| self.type_from_spec(Some(spec)));
                {
                    let b = self.chunk.blocks.cur_block_mut();
                    match declared_ret {
                        Some(ret) => {
                            b.ret_type = ret;
                            b.has_ret_type = true;
                        }
                        None => b.infer_ret_type = true,
                    }
                }
                let result = self
                    .push_params(decl)
                    .and_then(|()| self.analyze_stmts(body));
                let b = self.chunk.blocks.cur_block();
                let ret = if b.has_ret_type { b.ret_type } else { Type::Any };
                debug_assert!(
                    self.chunk.blocks.captured_params(block).next().is_none(),
                    "static function blocks never capture"
                );
                self.chunk.blocks.end_block();
                result?;

                self.chunk.output.set_func_block(decl.id, block);
                self.finish_func_sym(decl, ret, exported, false)
            }
            FuncBody::Init(expr) => {
                // The func sym resolves before its initializer runs so the
                // initializer may reference it
                let declared_ret = self.type_from_spec(decl.ret_spec);
                let info = self.finish_func_sym(decl, declared_ret, exported, true)?;
                self.with_initializer_ctx(info.sym, |a| a.analyze_expr(expr))?;
                Ok(info)
            }
        }
    }

    fn push_params(&mut self, decl: &FuncDecl) -> AResult<()> {
        for param in &decl.params {
            self.push_param(param)?;
        }
        Ok(())
    }

    /// Declare one function parameter; a repeated name is an error, not a
    /// shadow.
    fn push_param(&mut self, param: &Param) -> AResult<()> {
        if self.chunk.blocks.lookup_var(param.name).is_some() {
            return self.err(
                SemanticError::DuplicateVariable {
                    name: self.name(param.name).to_string(),
                    span: param.span.into(),
                },
                param.span,
            );
        }
        let ptype = self.type_from_spec(param.type_spec);
        self.chunk
            .blocks
            .add_var(param.name, ptype, LocalVarKind::Local, true);
        Ok(())
    }

    /// Intern the func's (untyped) sigs, create/touch its local sym, and
    /// resolve it as a func symbol under the chunk's root.
    fn finish_func_sym(
        &mut self,
        decl: &FuncDecl,
        ret: Type,
        exported: bool,
        has_static_initializer: bool,
    ) -> AResult<FuncInfo> {
        let arity = decl.params.len();
        let sig = self.chunk.sigs.intern_untyped(arity, self.any_sym());
        let sym = self
            .chunk
            .syms
            .get_or_create(None, decl.name, Some(sig), decl.span);
        self.chunk.syms.mark_used(sym);

        let r_sig = self.g.rsigs.intern_untyped(arity, self.g.any_rsym());
        self.chunk.sigs.set_resolved(sig, r_sig);

        let root = self.root_rsym();
        let entry = ResolvedFuncSym {
            chunk: Some(self.chunk.id),
            decl: Some(decl.id),
            r_sig,
            ret,
            has_static_initializer,
        };
        let (rsym, rfunc) = self
            .register_func_overload(Some(root), decl.name, exported, entry, decl.span)?;
        self.chunk.syms.get_mut(sym).r_sym = Some(rsym);
        Ok(FuncInfo {
            sym,
            rsym,
            rfunc,
            r_sig,
            ret,
        })
    }

    pub(crate) fn register_func_overload(
        &mut self,
        parent: Option<ResolvedSymId>,
        name: NameId,
        exported: bool,
        entry: ResolvedFuncSym,
        span: Span,
    ) -> AResult<(ResolvedSymId, ResolvedFuncSymId)> {
        match self.g.add_func_overload(parent, name, exported, entry) {
            Ok(ids) => Ok(ids),
            Err(FuncOverloadError::Collision) => self.err(
                SemanticError::DuplicateOverload {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            ),
            Err(FuncOverloadError::NotAFunc) => self.err(
                SemanticError::DuplicateSymbol {
                    name: self.name(name).to_string(),
                    span: span.into(),
                },
                span,
            ),
        }
    }

    pub(crate) fn analyze_object_decl(
        &mut self,
        stmt: &Stmt,
        decl: &ObjectDecl,
        exported: bool,
    ) -> AResult<()> {
        let root = self.root_rsym();
        if self.g.rsyms.lookup(Some(root), decl.name).is_some() {
            return self.err(
                SemanticError::DuplicateObject {
                    name: self.name(decl.name).to_string(),
                    span: stmt.span.into(),
                },
                stmt.span,
            );
        }

        let sym = self
            .chunk
            .syms
            .get_or_create(None, decl.name, None, stmt.span);
        self.chunk.syms.mark_used(sym);

        // Object types resolve immediately so initializers can reference
        // them
        let type_id = self.g.runtime.ensure_object_type(Some(root), decl.name);
        let rsym = self
            .g
            .rsyms
            .insert(
                Some(root),
                decl.name,
                exported,
                ResolvedSymKind::Object {
                    type_id,
                    chunk: Some(self.chunk.id),
                    decl: Some(stmt.id),
                },
            )
            .expect("root name checked above");
        self.chunk.syms.get_mut(sym).r_sym = Some(rsym);
        self.bind_sym(stmt.id, sym);

        for (index, field) in decl.fields.iter().enumerate() {
            let field_sym = self.g.runtime.ensure_field_sym(field.name);
            self.g.runtime.add_field_sym(type_id, field_sym, index as u32);
        }

        for func in &decl.funcs {
            let is_method = func
                .params
                .first()
                .is_some_and(|p| p.name == self.g.names.self_param);
            if is_method {
                self.analyze_method(func)?;
            } else {
                self.analyze_object_static_func(sym, rsym, func)?;
            }
        }
        Ok(())
    }

    /// A member function whose first param is literally `self`
    fn analyze_method(&mut self, func: &FuncDecl) -> AResult<()> {
        let block = self.chunk.blocks.push_block(Some(func.id), true);
        self.chunk.blocks.add_var(
            self.g.names.self_param,
            Type::Any,
            LocalVarKind::Local,
            true,
        );
        let result = func.params[1..]
            .iter()
            .try_for_each(|param| self.push_param(param))
            .and_then(|()| match &func.body {
                FuncBody::Stmts(body) => self.analyze_stmts(body),
                FuncBody::Init(expr) => self.analyze_expr(expr).map(|_| ()),
            });
        self.chunk.blocks.end_block();
        result?;
        self.chunk.output.set_func_block(func.id, block);
        Ok(())
    }

    /// A member function without `self`: an ordinary function resolved
    /// under the object's sym, always exported.
    fn analyze_object_static_func(
        &mut self,
        object_sym: SymId,
        object_rsym: ResolvedSymId,
        func: &FuncDecl,
    ) -> AResult<()> {
        let block = self.chunk.blocks.push_block(Some(func.id), true);
        let params_result = func
            .params
            .iter()
            .try_for_each(|param| self.push_param(param));
        let declared_ret = func.ret_spec.map(|spec| self.type_from_spec(Some(spec)));
        {
            let b = self.chunk.blocks.cur_block_mut();
            match declared_ret {
                Some(ret) => {
                    b.ret_type = ret;
                    b.has_ret_type = true;
                }
                None => b.infer_ret_type = true,
            }
        }
        let result = params_result.and_then(|()| match &func.body {
            FuncBody::Stmts(body) => self.analyze_stmts(body),
            FuncBody::Init(expr) => self.analyze_expr(expr).map(|_| ()),
        });
        let b = self.chunk.blocks.cur_block();
        let ret = if b.has_ret_type { b.ret_type } else { Type::Any };
        self.chunk.blocks.end_block();
        result?;
        self.chunk.output.set_func_block(func.id, block);

        let arity = func.params.len();
        let sig = self.chunk.sigs.intern_untyped(arity, self.any_sym());
        let child = self
            .chunk
            .syms
            .get_or_create(Some(object_sym), func.name, Some(sig), func.span);
        self.chunk.syms.mark_used(child);

        let r_sig = self.g.rsigs.intern_untyped(arity, self.g.any_rsym());
        self.chunk.sigs.set_resolved(sig, r_sig);
        let entry = ResolvedFuncSym {
            chunk: Some(self.chunk.id),
            decl: Some(func.id),
            r_sig,
            ret,
            has_static_initializer: false,
        };
        let (rsym, _) =
            self.register_func_overload(Some(object_rsym), func.name, true, entry, func.span)?;
        self.chunk.syms.get_mut(child).r_sym = Some(rsym);
        Ok(())
    }

    /// Lambdas push an ordinary (non-static) block, so reads of enclosing
    /// locals become boxed captures appended to the params.
    pub(crate) fn analyze_lambda(&mut self, node: NodeId, lambda: &LambdaExpr) -> AResult<Type> {
        let block = self.chunk.blocks.push_block(Some(node), false);
        let result = lambda
            .params
            .iter()
            .try_for_each(|param| self.push_param(param))
            .and_then(|()| match &lambda.body {
                LambdaBody::Expr(expr) => self.analyze_expr(expr).map(|_| ()),
                LambdaBody::Stmts(body) => self.analyze_stmts(body),
            });
        self.chunk.blocks.end_block();
        result?;

        let r_sig = self
            .g
            .rsigs
            .intern_untyped(lambda.params.len(), self.g.any_rsym());
        self.chunk.output.set_lambda_sig(node, r_sig);
        self.chunk.output.set_func_block(node, block);
        Ok(Type::Any)
    }
}
