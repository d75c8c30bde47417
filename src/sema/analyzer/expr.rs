// src/sema/analyzer/expr.rs

use super::lookup::VarTarget;
use super::*;
use crate::errors::SemanticError;
use crate::frontend::ast::{BinaryOp, Expr, ExprKind, MatchCond, MatchData, UnaryOp};
use crate::sema::block::LocalVarKind;

impl Analyzer<'_> {
    pub(crate) fn analyze_expr(&mut self, e: &Expr) -> AResult<Type> {
        match &e.kind {
            ExprKind::Ident(name) => self.analyze_ident(e.id, *name, e.span),
            ExprKind::NumberLit(v) => Ok(number_literal_type(*v)),
            ExprKind::RadixLit(v) => {
                // Wider-than-32-bit radix literals stay plain numbers; the
                // integer request only exists when the value fits i32.
                if *v <= i32::MAX as u64 {
                    Ok(Type::number_or_request_integer())
                } else {
                    Ok(Type::number())
                }
            }
            ExprKind::StringLit(_) => Ok(Type::StaticString),
            ExprKind::StringTemplate { parts } => {
                for part in parts {
                    self.analyze_expr(part)?;
                }
                Ok(Type::String)
            }
            ExprKind::BoolLit(_) => Ok(Type::Boolean),
            ExprKind::NoneLit => Ok(Type::Any),
            ExprKind::TagInit { tag, member: _ } => {
                let tag_type = self.g.runtime.ensure_tag_type(*tag);
                Ok(Type::Tag { tag_id: tag_type.0 })
            }
            ExprKind::TagLit(name) => {
                self.g.runtime.ensure_tag_lit_sym(*name);
                Ok(Type::TagLiteral)
            }
            ExprKind::ListLit(elems) => {
                for elem in elems {
                    self.analyze_expr(elem)?;
                }
                Ok(Type::List)
            }
            ExprKind::MapLit(entries) => {
                for (key, value) in entries {
                    self.analyze_expr(key)?;
                    self.analyze_expr(value)?;
                }
                Ok(Type::Map)
            }
            ExprKind::Binary { op, left, right } => self.analyze_binary(e.id, *op, left, right),
            ExprKind::Unary { op, operand } => {
                self.analyze_expr(operand)?;
                match op {
                    UnaryOp::Neg | UnaryOp::BitNot => Ok(Type::number()),
                    UnaryOp::Not => Ok(Type::Boolean),
                }
            }
            ExprKind::Access { .. } => {
                self.analyze_access_chain(e)?;
                Ok(Type::Any)
            }
            ExprKind::Index { left, index } => {
                self.analyze_expr(left)?;
                self.analyze_expr(index)?;
                Ok(Type::Any)
            }
            ExprKind::Call {
                callee,
                args,
                named_args,
            } => self.analyze_call(e.span, callee, args, named_args),
            ExprKind::Lambda(lambda) => self.analyze_lambda(e.id, lambda),
            ExprKind::ObjectInit { name, fields } => {
                let sym = self.chunk.syms.get_or_create(None, *name, None, e.span);
                self.touch_root_sym(sym);
                self.bind_sym(e.id, sym);
                for (_, value) in fields {
                    self.analyze_expr(value)?;
                }
                Ok(Type::Any)
            }
            ExprKind::Match(data) => self.analyze_match(data),
            ExprKind::IfExpr { cond, then, else_ } => {
                self.analyze_expr(cond)?;
                self.analyze_expr(then)?;
                self.analyze_expr(else_)?;
                Ok(Type::Any)
            }
            ExprKind::Coyield => Ok(Type::Any),
            ExprKind::Coresume(inner) | ExprKind::Try(inner) | ExprKind::Compt(inner) => {
                self.analyze_expr(inner)?;
                Ok(Type::Any)
            }
        }
    }

    fn analyze_ident(&mut self, node: NodeId, name: NameId, span: Span) -> AResult<Type> {
        match self.get_or_lookup_var(name, span, LookupStrategy::Read)? {
            VarTarget::Local(var) => {
                self.bind_var(node, var);
                Ok(self.chunk.blocks.var(var).vtype)
            }
            VarTarget::Static(sym) => {
                self.bind_sym(node, sym);
                Ok(Type::Any)
            }
        }
    }

    fn analyze_binary(
        &mut self,
        node: NodeId,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> AResult<Type> {
        let ltype = self.analyze_expr(left)?;
        let rtype = self.analyze_expr(right)?;

        if op.is_comparison() {
            if op == BinaryOp::Less
                && ltype.can_request_integer()
                && rtype.can_request_integer()
            {
                self.chunk.output.set_int_request_cmp(node);
            }
            return Ok(Type::Boolean);
        }
        if op.is_logical() {
            if ltype.tag() == rtype.tag() {
                return Ok(ltype);
            }
            return Ok(Type::Any);
        }
        if op == BinaryOp::Add && ltype.is_string() {
            return Ok(Type::String);
        }
        Ok(Type::number())
    }

    /// Walk an ident/access chain, binding nodes along the way. Returns the
    /// chain's sym while every prefix stays sym-resolved; a local-rooted or
    /// computed prefix drops the chain to a value access.
    pub(crate) fn analyze_access_chain(&mut self, e: &Expr) -> AResult<Option<SymId>> {
        match &e.kind {
            ExprKind::Ident(name) => {
                match self.get_or_lookup_var(*name, e.span, LookupStrategy::Read)? {
                    VarTarget::Local(var) => {
                        self.bind_var(e.id, var);
                        Ok(None)
                    }
                    VarTarget::Static(sym) => {
                        self.bind_sym(e.id, sym);
                        Ok(Some(sym))
                    }
                }
            }
            ExprKind::Access { left, name } => {
                match self.analyze_access_chain(left)? {
                    Some(parent) => {
                        let child =
                            self.chunk
                                .syms
                                .get_or_create(Some(parent), *name, None, e.span);
                        self.chunk.syms.mark_used(child);
                        self.bind_sym(e.id, child);
                        Ok(Some(child))
                    }
                    // A non-sym prefix: later members are plain value
                    // accesses and stay unbound
                    None => Ok(None),
                }
            }
            _ => {
                self.analyze_expr(e)?;
                Ok(None)
            }
        }
    }

    fn analyze_call(
        &mut self,
        span: Span,
        callee: &Expr,
        args: &[Expr],
        named_args: &[(NameId, Expr)],
    ) -> AResult<Type> {
        if !named_args.is_empty() {
            return self.err(
                SemanticError::UnsupportedNamedArgs { span: span.into() },
                span,
            );
        }

        match &callee.kind {
            ExprKind::Ident(name) => {
                if let Some(var) = self.local_callee(*name, callee.span)? {
                    // Function-value call through a local
                    if self.in_static_initializer() && self.chunk.blocks.block_depth() == 1 {
                        return Err(Halt::CanNotUseLocal {
                            var,
                            span: callee.span,
                        });
                    }
                    self.bind_var(callee.id, var);
                } else {
                    let sig = self.chunk.sigs.intern_untyped(args.len(), self.any_sym());
                    let sym =
                        self.chunk
                            .syms
                            .get_or_create(None, *name, Some(sig), callee.span);
                    self.touch_root_sym(sym);
                    self.bind_sym(callee.id, sym);
                }
            }
            ExprKind::Access { left, name } => {
                match self.analyze_access_chain(left)? {
                    Some(parent) => {
                        let sig = self.chunk.sigs.intern_untyped(args.len(), self.any_sym());
                        let child =
                            self.chunk
                                .syms
                                .get_or_create(Some(parent), *name, Some(sig), callee.span);
                        self.chunk.syms.mark_used(child);
                        self.bind_sym(callee.id, child);
                    }
                    // Value call on a computed receiver
                    None => {}
                }
            }
            _ => {
                self.analyze_expr(callee)?;
            }
        }

        for arg in args {
            self.analyze_expr(arg)?;
        }
        Ok(Type::Any)
    }

    /// A plain or captured local under `name` making this a function-value
    /// call. Static aliases do not; an enclosing block's local does, by
    /// capturing it the way a read would (never from a static function,
    /// which falls through to the sym path instead).
    fn local_callee(&mut self, name: NameId, span: Span) -> AResult<Option<LocalVarId>> {
        if let Some(var) = self.chunk.blocks.lookup_var(name) {
            return Ok(match self.chunk.blocks.var(var).kind {
                LocalVarKind::StaticAlias { .. } => None,
                _ => Some(var),
            });
        }
        if !self.chunk.blocks.cur_block().is_static_func_block {
            return self.capture_callee(name, span);
        }
        Ok(None)
    }

    /// Match analysis shared by the statement and expression forms; the
    /// expression form yields `any`.
    pub(crate) fn analyze_match(&mut self, data: &MatchData) -> AResult<Type> {
        self.analyze_expr(&data.scrutinee)?;
        for case in &data.cases {
            for cond in &case.conds {
                if let MatchCond::Cond(expr) = cond {
                    self.analyze_expr(expr)?;
                }
            }
        }
        for case in &data.cases {
            self.chunk.blocks.push_sub_block(false);
            let result = self.analyze_stmts(&case.body);
            self.chunk.blocks.end_sub_block();
            result?;
        }
        Ok(Type::Any)
    }
}

/// Decimal literals that are integer-valued and fit in signed 32-bit may be
/// requested as integers by operator consumers.
fn number_literal_type(v: f64) -> Type {
    if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 {
        Type::number_or_request_integer()
    } else {
        Type::number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integer_literals_request_integers() {
        assert_eq!(number_literal_type(1.0), Type::number_or_request_integer());
        assert_eq!(
            number_literal_type(-2147483648.0),
            Type::number_or_request_integer()
        );
    }

    #[test]
    fn fractional_and_wide_literals_stay_numbers() {
        assert_eq!(number_literal_type(0.5), Type::number());
        assert_eq!(number_literal_type(3e12), Type::number());
    }
}
