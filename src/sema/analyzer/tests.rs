use super::*;
use crate::compiler::Compiler;
use crate::frontend::ast::*;
use crate::identity::ChunkId;
use crate::sema::block::LocalVarKind;
use crate::sema::query::Binding;
use crate::sema::sym::{OverloadRef, ResolvedSymKind, SymRef};
use crate::sema::types::{Type, TypeTag};
use std::collections::HashSet;

/// Stands in for the external parser: allocates NodeIds and spans.
struct AstBuilder {
    next: u32,
}

impl AstBuilder {
    fn new() -> Self {
        Self { next: 0 }
    }

    fn id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            id: self.id(),
            span: Span::default(),
            kind,
        }
    }

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.id(),
            span: Span::default(),
            kind,
        }
    }

    fn ident(&mut self, name: NameId) -> Expr {
        self.expr(ExprKind::Ident(name))
    }

    fn num(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::NumberLit(value))
    }

    fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::StringLit(value.to_string()))
    }

    fn boolean(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::BoolLit(value))
    }

    fn assign(&mut self, lhs: Expr, rhs: Expr) -> Stmt {
        self.stmt(StmtKind::Assign { lhs, rhs })
    }

    fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    fn access(&mut self, left: Expr, name: NameId) -> Expr {
        self.expr(ExprKind::Access {
            left: Box::new(left),
            name,
        })
    }

    fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            callee: Box::new(callee),
            args,
            named_args: Vec::new(),
        })
    }

    fn func(&mut self, name: NameId, params: Vec<NameId>, body: Vec<Stmt>) -> FuncDecl {
        let params = params
            .into_iter()
            .map(|name| Param {
                name,
                type_spec: None,
                span: Span::default(),
            })
            .collect();
        FuncDecl {
            id: self.id(),
            span: Span::default(),
            name,
            params,
            ret_spec: None,
            body: FuncBody::Stmts(body),
            exported: false,
        }
    }
}

fn analyze(compiler: &mut Compiler, program: &Program) -> ChunkId {
    let chunk = compiler.add_chunk("main.tern");
    compiler
        .analyze_chunk(chunk, program)
        .expect("traversal succeeds");
    chunk
}

fn analyze_and_resolve(compiler: &mut Compiler, program: &Program) -> ChunkId {
    let chunk = analyze(compiler, program);
    compiler.resolve_chunk(chunk).expect("resolution succeeds");
    chunk
}

#[test]
fn static_var_initializer_can_not_reference_local() {
    // a = 0
    // var b: a
    let mut compiler = Compiler::new();
    let a = compiler.intern("a");
    let b = compiler.intern("b");
    let mut ast = AstBuilder::new();

    let a_lhs = ast.ident(a);
    let zero = ast.num(0.0);
    let assign_a = ast.assign(a_lhs, zero);
    let b_lhs = ast.ident(b);
    let a_ref = ast.ident(a);
    let var_b = ast.stmt(StmtKind::VarDecl {
        lhs: b_lhs,
        rhs: a_ref,
    });
    let program = Program {
        stmts: vec![assign_a, var_b],
    };

    let chunk = compiler.add_chunk("main.tern");
    let err = compiler.analyze_chunk(chunk, &program).unwrap_err();
    assert!(matches!(
        err.error,
        SemanticError::LocalInStaticInitializer { .. }
    ));
    let message = err.error.to_string();
    assert!(message.contains("`b`"), "names the static: {message}");
    assert!(message.contains("`a`"), "names the local: {message}");

    // The failed declaration must not leave a resolved sym behind
    assert!(compiler.query(chunk).resolved_root("b").is_none());
}

#[test]
fn branch_merge_with_new_type_widens_to_any() {
    // cond = true
    // x = 1
    // if cond: x = 'hi'
    let mut compiler = Compiler::new();
    let cond = compiler.intern("cond");
    let x = compiler.intern("x");
    let mut ast = AstBuilder::new();

    let cond_lhs = ast.ident(cond);
    let true_lit = ast.boolean(true);
    let assign_cond = ast.assign(cond_lhs, true_lit);
    let x_lhs = ast.ident(x);
    let one = ast.num(1.0);
    let assign_x = ast.assign(x_lhs, one);
    let x_node = match &assign_x.kind {
        StmtKind::Assign { lhs, .. } => lhs.id,
        _ => unreachable!(),
    };

    let cond_ref = ast.ident(cond);
    let x_branch_lhs = ast.ident(x);
    let hi = ast.string("hi");
    let branch_assign = ast.assign(x_branch_lhs, hi);
    let if_stmt = ast.stmt(StmtKind::If {
        cond: cond_ref,
        then_body: vec![branch_assign],
        else_ifs: Vec::new(),
        else_body: None,
    });
    let program = Program {
        stmts: vec![assign_cond, assign_x, if_stmt],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let query = compiler.query(chunk);
    let Some(Binding::Var(var)) = query.binding(x_node) else {
        panic!("x should bind to a local");
    };
    let local = query.local_var(var);
    assert_eq!(local.vtype.tag(), TypeTag::Any);
    assert!(local.lifetime_rc_candidate);
}

#[test]
fn integer_comparison_requests_integer_operands() {
    // 1 < 2
    let mut compiler = Compiler::new();
    let mut ast = AstBuilder::new();

    let one = ast.num(1.0);
    let two = ast.num(2.0);
    let cmp = ast.expr(ExprKind::Binary {
        op: BinaryOp::Less,
        left: Box::new(one),
        right: Box::new(two),
    });
    let cmp_node = cmp.id;
    let stmt = ast.expr_stmt(cmp);
    let program = Program { stmts: vec![stmt] };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    assert!(
        compiler
            .chunk(chunk)
            .output
            .can_request_integer_operands(cmp_node)
    );
}

#[test]
fn float_comparison_does_not_request_integers() {
    let mut compiler = Compiler::new();
    let mut ast = AstBuilder::new();

    let half = ast.num(0.5);
    let two = ast.num(2.0);
    let cmp = ast.expr(ExprKind::Binary {
        op: BinaryOp::Less,
        left: Box::new(half),
        right: Box::new(two),
    });
    let cmp_node = cmp.id;
    let stmt = ast.expr_stmt(cmp);
    let program = Program { stmts: vec![stmt] };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    assert!(
        !compiler
            .chunk(chunk)
            .output
            .can_request_integer_operands(cmp_node)
    );
}

#[test]
fn overloads_resolve_by_arity_across_modules() {
    // provider (module "mathx"):
    //   export func foo(a): pass
    //   export func foo(a, b): pass
    // main:
    //   import m 'mathx'
    //   m.foo(1)
    //   m.foo(1, 2)
    let mut compiler =
        Compiler::with_module_loaders(HashSet::from(["mathx".to_string()]));
    let foo = compiler.intern("foo");
    let a = compiler.intern("a");
    let b = compiler.intern("b");
    let m = compiler.intern("m");

    let mut ast = AstBuilder::new();
    let pass_one = ast.stmt(StmtKind::Pass);
    let foo1 = ast.func(foo, vec![a], vec![pass_one]);
    let foo1 = ast.stmt(StmtKind::FuncDecl(foo1));
    let export1 = ast.stmt(StmtKind::Export(Box::new(foo1)));
    let pass_two = ast.stmt(StmtKind::Pass);
    let foo2 = ast.func(foo, vec![a, b], vec![pass_two]);
    let foo2 = ast.stmt(StmtKind::FuncDecl(foo2));
    let export2 = ast.stmt(StmtKind::Export(Box::new(foo2)));
    let provider_program = Program {
        stmts: vec![export1, export2],
    };

    let provider = compiler.add_chunk("mathx");
    compiler
        .analyze_chunk(provider, &provider_program)
        .expect("provider analyzes");

    let import = ast.stmt(StmtKind::Import {
        name: m,
        spec: "mathx".to_string(),
    });
    let m_ref1 = ast.ident(m);
    let callee1 = ast.access(m_ref1, foo);
    let callee1_node = callee1.id;
    let arg1 = ast.num(1.0);
    let call1 = ast.call(callee1, vec![arg1]);
    let call1 = ast.expr_stmt(call1);
    let m_ref2 = ast.ident(m);
    let callee2 = ast.access(m_ref2, foo);
    let callee2_node = callee2.id;
    let arg2a = ast.num(1.0);
    let arg2b = ast.num(2.0);
    let call2 = ast.call(callee2, vec![arg2a, arg2b]);
    let call2 = ast.expr_stmt(call2);
    let main_program = Program {
        stmts: vec![import, call1, call2],
    };

    let main = compiler.add_chunk("main.tern");
    compiler
        .analyze_chunk(main, &main_program)
        .expect("main analyzes");
    compiler.resolve_chunk(provider).expect("provider resolves");
    compiler.resolve_chunk(main).expect("main resolves");

    let query = compiler.query(main);
    let rsym1 = query.resolved_sym_of(callee1_node).expect("1-arg resolves");
    let rsym2 = query.resolved_sym_of(callee2_node).expect("2-arg resolves");
    assert_eq!(rsym1, rsym2, "overloads share the resolved sym");
    assert_eq!(query.overload_count(rsym1), 2);
    assert!(matches!(
        query.resolved(rsym1).kind,
        ResolvedSymKind::Func {
            func_sym: OverloadRef::Overloaded
        }
    ));

    // The two callee syms carry different resolved sigs
    let chunk = compiler.chunk(main);
    let sig_of = |node| {
        let Some(Binding::Sym(sym)) = chunk.output.binding(node) else {
            panic!("callee binds to a sym");
        };
        let sig = chunk.syms.get(sym).sig.expect("call sym keyed by sig");
        chunk.sigs.get(sig).r_sig.expect("sig resolved")
    };
    assert_ne!(sig_of(callee1_node), sig_of(callee2_node));
}

#[test]
fn static_function_can_not_capture() {
    // x = 1
    // func f(): x
    let mut compiler = Compiler::new();
    let x = compiler.intern("x");
    let f = compiler.intern("f");
    let mut ast = AstBuilder::new();

    let x_lhs = ast.ident(x);
    let one = ast.num(1.0);
    let assign_x = ast.assign(x_lhs, one);
    let x_ref = ast.ident(x);
    let body_stmt = ast.expr_stmt(x_ref);
    let func = ast.func(f, vec![], vec![body_stmt]);
    let func_stmt = ast.stmt(StmtKind::FuncDecl(func));
    let program = Program {
        stmts: vec![assign_x, func_stmt],
    };

    let chunk = compiler.add_chunk("main.tern");
    let err = compiler.analyze_chunk(chunk, &program).unwrap_err();
    assert!(matches!(
        err.error,
        SemanticError::CaptureInStaticFunction { .. }
    ));
}

#[test]
fn lambda_captures_enclosing_local_as_boxed_param() {
    // x = 1
    // y = => x + 1
    let mut compiler = Compiler::new();
    let x = compiler.intern("x");
    let y = compiler.intern("y");
    let mut ast = AstBuilder::new();

    let x_lhs = ast.ident(x);
    let one = ast.num(1.0);
    let assign_x = ast.assign(x_lhs, one);
    let x_node = match &assign_x.kind {
        StmtKind::Assign { lhs, .. } => lhs.id,
        _ => unreachable!(),
    };

    let x_ref = ast.ident(x);
    let one_b = ast.num(1.0);
    let body = ast.expr(ExprKind::Binary {
        op: BinaryOp::Add,
        left: Box::new(x_ref),
        right: Box::new(one_b),
    });
    let lambda = ast.expr(ExprKind::Lambda(Box::new(LambdaExpr {
        params: Vec::new(),
        body: LambdaBody::Expr(body),
    })));
    let lambda_node = lambda.id;
    let y_lhs = ast.ident(y);
    let assign_y = ast.assign(y_lhs, lambda);
    let program = Program {
        stmts: vec![assign_x, assign_y],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let state = &compiler.chunk(chunk).blocks;
    let block = compiler
        .chunk(chunk)
        .output
        .func_block(lambda_node)
        .expect("lambda block recorded");
    let captured: Vec<_> = state.captured_params(block).collect();
    assert_eq!(captured.len(), 1);
    let cap = state.var(captured[0]);
    assert!(cap.is_boxed);

    let query = compiler.query(chunk);
    let Some(Binding::Var(outer)) = query.binding(x_node) else {
        panic!("x binds to a local");
    };
    assert_eq!(cap.kind, LocalVarKind::Captured { parent: outer });
    assert!(query.local_var(outer).is_boxed, "shared box marks the outer var");

    // The lambda's untyped zero-arity sig is recorded for codegen
    assert!(compiler.chunk(chunk).output.lambda_sig(lambda_node).is_some());
}

#[test]
fn github_imports_canonicalize_to_one_module() {
    let mut compiler = Compiler::new();
    let m = compiler.intern("m");
    let spec = "https://github.com/u/r";

    let mut ast = AstBuilder::new();
    let import_a = ast.stmt(StmtKind::Import {
        name: m,
        spec: spec.to_string(),
    });
    let program_a = Program {
        stmts: vec![import_a],
    };
    let import_b = ast.stmt(StmtKind::Import {
        name: m,
        spec: spec.to_string(),
    });
    let program_b = Program {
        stmts: vec![import_b],
    };

    let chunk_a = compiler.add_chunk("a.tern");
    compiler.analyze_chunk(chunk_a, &program_a).unwrap();
    let chunk_b = compiler.add_chunk("b.tern");
    compiler.analyze_chunk(chunk_b, &program_b).unwrap();

    let module_of = |chunk: ChunkId| {
        match compiler.chunk(chunk).sym_refs.get(&m) {
            Some(SymRef::Module(id)) => *id,
            other => panic!("expected module ref, got {other:?}"),
        }
    };
    assert_eq!(module_of(chunk_a), module_of(chunk_b));

    // One task, already rewritten to the raw module entry point
    let tasks = compiler.take_import_tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(
        tasks[0].abs_spec,
        "https://raw.githubusercontent.com/u/r/master/mod.tern"
    );
    assert!(!tasks[0].builtin);
}

#[test]
fn cyclic_imports_terminate_through_placeholders() {
    let mut compiler = Compiler::with_module_loaders(HashSet::from([
        "alpha".to_string(),
        "beta".to_string(),
    ]));
    let other = compiler.intern("other");
    let mut ast = AstBuilder::new();

    let import_beta = ast.stmt(StmtKind::Import {
        name: other,
        spec: "beta".to_string(),
    });
    let alpha_program = Program {
        stmts: vec![import_beta],
    };
    let alpha = compiler.add_chunk("alpha");
    compiler.analyze_chunk(alpha, &alpha_program).unwrap();

    let tasks = compiler.take_import_tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].abs_spec, "beta");

    let import_alpha = ast.stmt(StmtKind::Import {
        name: other,
        spec: "alpha".to_string(),
    });
    let beta_program = Program {
        stmts: vec![import_alpha],
    };
    let beta = compiler.add_chunk("beta");
    compiler.analyze_chunk(beta, &beta_program).unwrap();

    // beta's import of alpha hits the existing module: no new task
    assert!(compiler.take_import_tasks().is_empty());
    compiler.resolve_chunk(alpha).unwrap();
    compiler.resolve_chunk(beta).unwrap();
}

#[test]
fn exported_var_resolves_across_chunks() {
    // provider: export var answer: 42
    // main: import m 'conf' / y = m.answer
    let mut compiler = Compiler::with_module_loaders(HashSet::from(["conf".to_string()]));
    let answer = compiler.intern("answer");
    let m = compiler.intern("m");
    let y = compiler.intern("y");
    let mut ast = AstBuilder::new();

    let answer_lhs = ast.ident(answer);
    let value = ast.num(42.0);
    let var_decl = ast.stmt(StmtKind::VarDecl {
        lhs: answer_lhs,
        rhs: value,
    });
    let export = ast.stmt(StmtKind::Export(Box::new(var_decl)));
    let provider_program = Program {
        stmts: vec![export],
    };
    let provider = compiler.add_chunk("conf");
    compiler.analyze_chunk(provider, &provider_program).unwrap();

    let import = ast.stmt(StmtKind::Import {
        name: m,
        spec: "conf".to_string(),
    });
    let m_ref = ast.ident(m);
    let member = ast.access(m_ref, answer);
    let member_node = member.id;
    let y_lhs = ast.ident(y);
    let assign = ast.assign(y_lhs, member);
    let main_program = Program {
        stmts: vec![import, assign],
    };
    let main = compiler.add_chunk("main.tern");
    compiler.analyze_chunk(main, &main_program).unwrap();
    compiler.resolve_chunk(provider).unwrap();
    compiler.resolve_chunk(main).unwrap();

    let query = compiler.query(main);
    let rsym = query.resolved_sym_of(member_node).expect("member resolves");
    assert!(matches!(
        query.resolved(rsym).kind,
        ResolvedSymKind::Variable { chunk: Some(_), .. }
    ));
}

#[test]
fn private_member_is_not_exported() {
    let mut compiler = Compiler::with_module_loaders(HashSet::from(["priv".to_string()]));
    let bar = compiler.intern("bar");
    let a = compiler.intern("a");
    let m = compiler.intern("m");
    let mut ast = AstBuilder::new();

    let pass = ast.stmt(StmtKind::Pass);
    let func = ast.func(bar, vec![a], vec![pass]);
    let func_stmt = ast.stmt(StmtKind::FuncDecl(func));
    let provider_program = Program {
        stmts: vec![func_stmt],
    };
    let provider = compiler.add_chunk("priv");
    compiler.analyze_chunk(provider, &provider_program).unwrap();

    let import = ast.stmt(StmtKind::Import {
        name: m,
        spec: "priv".to_string(),
    });
    let m_ref = ast.ident(m);
    let callee = ast.access(m_ref, bar);
    let arg = ast.num(1.0);
    let call = ast.call(callee, vec![arg]);
    let call = ast.expr_stmt(call);
    let main_program = Program {
        stmts: vec![import, call],
    };
    let main = compiler.add_chunk("main.tern");
    compiler.analyze_chunk(main, &main_program).unwrap();
    compiler.resolve_chunk(provider).unwrap();

    let err = compiler.resolve_chunk(main).unwrap_err();
    assert!(matches!(err.error, SemanticError::NotExported { .. }));
}

#[test]
fn undefined_reference_reports_missing_symbol() {
    let mut compiler = Compiler::new();
    let ghost = compiler.intern("ghost");
    let mut ast = AstBuilder::new();

    let ghost_ref = ast.ident(ghost);
    let stmt = ast.expr_stmt(ghost_ref);
    let program = Program { stmts: vec![stmt] };

    let chunk = analyze(&mut compiler, &program);
    let err = compiler.resolve_chunk(chunk).unwrap_err();
    assert!(matches!(err.error, SemanticError::UndefinedSymbol { .. }));
}

#[test]
fn assigning_static_name_in_function_requires_modifier() {
    // var g: 0
    // func f(): g / g = 1
    let mut compiler = Compiler::new();
    let g = compiler.intern("g");
    let f = compiler.intern("f");
    let mut ast = AstBuilder::new();

    let g_lhs = ast.ident(g);
    let zero = ast.num(0.0);
    let var_g = ast.stmt(StmtKind::VarDecl {
        lhs: g_lhs,
        rhs: zero,
    });
    let g_read = ast.ident(g);
    let read_stmt = ast.expr_stmt(g_read);
    let g_assign_lhs = ast.ident(g);
    let one = ast.num(1.0);
    let assign_stmt = ast.assign(g_assign_lhs, one);
    let func = ast.func(f, vec![], vec![read_stmt, assign_stmt]);
    let func_stmt = ast.stmt(StmtKind::FuncDecl(func));
    let program = Program {
        stmts: vec![var_g, func_stmt],
    };

    let chunk = compiler.add_chunk("main.tern");
    let err = compiler.analyze_chunk(chunk, &program).unwrap_err();
    assert!(matches!(
        err.error,
        SemanticError::StaticAssignWithoutModifier { .. }
    ));
}

#[test]
fn static_decl_allows_assigning_the_static() {
    // var g: 0
    // func f(): static g = 1
    let mut compiler = Compiler::new();
    let g = compiler.intern("g");
    let f = compiler.intern("f");
    let mut ast = AstBuilder::new();

    let g_lhs = ast.ident(g);
    let zero = ast.num(0.0);
    let var_g = ast.stmt(StmtKind::VarDecl {
        lhs: g_lhs,
        rhs: zero,
    });
    let g_static = ast.ident(g);
    let one = ast.num(1.0);
    let static_decl = ast.stmt(StmtKind::StaticDecl {
        name: g_static,
        rhs: Some(one),
    });
    let func = ast.func(f, vec![], vec![static_decl]);
    let func_stmt = ast.stmt(StmtKind::FuncDecl(func));
    let program = Program {
        stmts: vec![var_g, func_stmt],
    };

    analyze_and_resolve(&mut compiler, &program);
}

#[test]
fn capture_decl_without_parent_local_is_an_error() {
    // func body: capture zz
    let mut compiler = Compiler::new();
    let zz = compiler.intern("zz");
    let f = compiler.intern("f");
    let mut ast = AstBuilder::new();

    let zz_ref = ast.ident(zz);
    let capture = ast.stmt(StmtKind::CaptureDecl {
        name: zz_ref,
        rhs: None,
    });
    let func = ast.func(f, vec![], vec![capture]);
    let func_stmt = ast.stmt(StmtKind::FuncDecl(func));
    let program = Program {
        stmts: vec![func_stmt],
    };

    let chunk = compiler.add_chunk("main.tern");
    let err = compiler.analyze_chunk(chunk, &program).unwrap_err();
    assert!(matches!(
        err.error,
        SemanticError::CaptureWithoutParentLocal { .. }
    ));
}

#[test]
fn duplicate_static_var_is_rejected() {
    let mut compiler = Compiler::new();
    let v = compiler.intern("v");
    let mut ast = AstBuilder::new();

    let lhs_a = ast.ident(v);
    let zero = ast.num(0.0);
    let decl_a = ast.stmt(StmtKind::VarDecl { lhs: lhs_a, rhs: zero });
    let lhs_b = ast.ident(v);
    let one = ast.num(1.0);
    let decl_b = ast.stmt(StmtKind::VarDecl { lhs: lhs_b, rhs: one });
    let program = Program {
        stmts: vec![decl_a, decl_b],
    };

    let chunk = compiler.add_chunk("main.tern");
    let err = compiler.analyze_chunk(chunk, &program).unwrap_err();
    assert!(matches!(err.error, SemanticError::DuplicateSymbol { .. }));
}

#[test]
fn duplicate_function_params_are_rejected() {
    // func f(a, a): pass
    let mut compiler = Compiler::new();
    let f = compiler.intern("f");
    let a = compiler.intern("a");
    let mut ast = AstBuilder::new();

    let pass = ast.stmt(StmtKind::Pass);
    let func = ast.func(f, vec![a, a], vec![pass]);
    let func_stmt = ast.stmt(StmtKind::FuncDecl(func));
    let program = Program {
        stmts: vec![func_stmt],
    };

    let chunk = compiler.add_chunk("main.tern");
    let err = compiler.analyze_chunk(chunk, &program).unwrap_err();
    assert!(matches!(err.error, SemanticError::DuplicateVariable { .. }));
}

#[test]
fn named_call_arguments_are_rejected() {
    let mut compiler = Compiler::new();
    let f = compiler.intern("f");
    let key = compiler.intern("key");
    let mut ast = AstBuilder::new();

    let callee = ast.ident(f);
    let value = ast.num(1.0);
    let call = ast.expr(ExprKind::Call {
        callee: Box::new(callee),
        args: Vec::new(),
        named_args: vec![(key, value)],
    });
    let stmt = ast.expr_stmt(call);
    let program = Program { stmts: vec![stmt] };

    let chunk = compiler.add_chunk("main.tern");
    let err = compiler.analyze_chunk(chunk, &program).unwrap_err();
    assert!(matches!(
        err.error,
        SemanticError::UnsupportedNamedArgs { .. }
    ));
}

#[test]
fn while_loop_records_iter_begin_types() {
    // cond = true
    // x = 1
    // while cond: x = 'hi'
    let mut compiler = Compiler::new();
    let cond = compiler.intern("cond");
    let x = compiler.intern("x");
    let mut ast = AstBuilder::new();

    let cond_lhs = ast.ident(cond);
    let t = ast.boolean(true);
    let assign_cond = ast.assign(cond_lhs, t);
    let x_lhs = ast.ident(x);
    let one = ast.num(1.0);
    let assign_x = ast.assign(x_lhs, one);
    let cond_ref = ast.ident(cond);
    let x_loop_lhs = ast.ident(x);
    let hi = ast.string("hi");
    let loop_assign = ast.assign(x_loop_lhs, hi);
    let while_stmt = ast.stmt(StmtKind::WhileCond {
        cond: cond_ref,
        body: vec![loop_assign],
    });
    let program = Program {
        stmts: vec![assign_cond, assign_x, while_stmt],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let state = &compiler.chunk(chunk).blocks;
    let iter_blocks: Vec<_> = state
        .sub_blocks
        .iter()
        .filter(|sb| sb.is_iter)
        .collect();
    assert_eq!(iter_blocks.len(), 1);
    // The loop body rewrote x's type, so the loop head must pre-initialize
    assert_eq!(iter_blocks[0].iter_var_begin_types.len(), 1);
    assert_eq!(iter_blocks[0].iter_var_begin_types[0].1.tag(), TypeTag::Any);
}

#[test]
fn for_iter_vars_are_marked_for_implicit_init() {
    // for items each k, v: pass
    let mut compiler = Compiler::new();
    let items = compiler.intern("items");
    let k = compiler.intern("k");
    let v = compiler.intern("v");
    let mut ast = AstBuilder::new();

    let items_lhs = ast.ident(items);
    let list = ast.expr(ExprKind::ListLit(Vec::new()));
    let assign_items = ast.assign(items_lhs, list);
    let items_ref = ast.ident(items);
    let pass = ast.stmt(StmtKind::Pass);
    let for_stmt = ast.stmt(StmtKind::ForIter {
        iterable: items_ref,
        value: Some(v),
        key: Some(k),
        body: vec![pass],
    });
    let program = Program {
        stmts: vec![assign_items, for_stmt],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let state = &compiler.chunk(chunk).blocks;
    let loop_vars: Vec<_> = state
        .vars
        .iter()
        .filter(|var| var.name == k || var.name == v)
        .collect();
    assert_eq!(loop_vars.len(), 2);
    for var in loop_vars {
        assert!(var.gen_initializer);
    }
}

#[test]
fn tag_decl_registers_members_with_ordinals() {
    // tagtype Color: red, green, blue
    // c = Color#red
    let mut compiler = Compiler::new();
    let color = compiler.intern("Color");
    let red = compiler.intern("red");
    let green = compiler.intern("green");
    let blue = compiler.intern("blue");
    let c = compiler.intern("c");
    let mut ast = AstBuilder::new();

    let tag_decl = ast.stmt(StmtKind::TagDecl {
        name: color,
        members: vec![red, green, blue],
    });
    let init = ast.expr(ExprKind::TagInit {
        tag: color,
        member: red,
    });
    let c_lhs = ast.ident(c);
    let assign = ast.assign(c_lhs, init);
    let c_node = match &assign.kind {
        StmtKind::Assign { lhs, .. } => lhs.id,
        _ => unreachable!(),
    };
    let program = Program {
        stmts: vec![tag_decl, assign],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let tag_type = compiler.globals.runtime.ensure_tag_type(color);
    assert_eq!(compiler.globals.runtime.tag_type(tag_type).members.len(), 3);

    let query = compiler.query(chunk);
    let Some(Binding::Var(var)) = query.binding(c_node) else {
        panic!("c binds to a local");
    };
    assert_eq!(
        query.local_var(var).vtype,
        Type::Tag {
            tag_id: tag_type.0
        }
    );
}

#[test]
fn object_decl_registers_type_fields_and_static_funcs() {
    // object Point:
    //   x
    //   y
    //   func dist(self): pass      (method)
    //   func origin(): pass        (static func)
    let mut compiler = Compiler::new();
    let point = compiler.intern("Point");
    let x = compiler.intern("x");
    let y = compiler.intern("y");
    let dist = compiler.intern("dist");
    let origin = compiler.intern("origin");
    let self_name = compiler.intern("self");
    let mut ast = AstBuilder::new();

    let pass_a = ast.stmt(StmtKind::Pass);
    let method = ast.func(dist, vec![self_name], vec![pass_a]);
    let pass_b = ast.stmt(StmtKind::Pass);
    let static_func = ast.func(origin, vec![], vec![pass_b]);
    let decl = ObjectDecl {
        name: point,
        fields: vec![
            FieldDecl {
                name: x,
                span: Span::default(),
            },
            FieldDecl {
                name: y,
                span: Span::default(),
            },
        ],
        funcs: vec![method, static_func],
    };
    let object_stmt = ast.stmt(StmtKind::ObjectDecl(decl));
    let program = Program {
        stmts: vec![object_stmt],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let query = compiler.query(chunk);
    let point_rsym = query.resolved_root("Point").expect("object resolved");
    let ResolvedSymKind::Object { type_id, .. } = query.resolved(point_rsym).kind else {
        panic!("expected object sym");
    };
    assert_eq!(
        compiler.globals.runtime.object_type(type_id).fields.len(),
        2
    );

    // The static func resolved under the object, always exported
    let origin_rsym = compiler
        .globals
        .rsyms
        .lookup(Some(point_rsym), origin)
        .expect("static func under object");
    assert!(compiler.globals.rsyms.get(origin_rsym).exported);
    assert_eq!(compiler.globals.rfunc_syms.overload_count(origin_rsym), 1);

    // Methods do not create func syms
    assert!(compiler.globals.rsyms.lookup(Some(point_rsym), dist).is_none());
}

#[test]
fn duplicate_object_is_rejected() {
    let mut compiler = Compiler::new();
    let point = compiler.intern("Point");
    let mut ast = AstBuilder::new();

    let decl_a = ObjectDecl {
        name: point,
        fields: Vec::new(),
        funcs: Vec::new(),
    };
    let stmt_a = ast.stmt(StmtKind::ObjectDecl(decl_a));
    let decl_b = ObjectDecl {
        name: point,
        fields: Vec::new(),
        funcs: Vec::new(),
    };
    let stmt_b = ast.stmt(StmtKind::ObjectDecl(decl_b));
    let program = Program {
        stmts: vec![stmt_a, stmt_b],
    };

    let chunk = compiler.add_chunk("main.tern");
    let err = compiler.analyze_chunk(chunk, &program).unwrap_err();
    assert!(matches!(err.error, SemanticError::DuplicateObject { .. }));
}

#[test]
fn func_initializer_records_dependencies() {
    // func helper(): pass
    // var setting: helper()
    let mut compiler = Compiler::new();
    let helper = compiler.intern("helper");
    let setting = compiler.intern("setting");
    let mut ast = AstBuilder::new();

    let pass = ast.stmt(StmtKind::Pass);
    let helper_decl = ast.func(helper, vec![], vec![pass]);
    let helper_stmt = ast.stmt(StmtKind::FuncDecl(helper_decl));
    let callee = ast.ident(helper);
    let call = ast.call(callee, vec![]);
    let setting_lhs = ast.ident(setting);
    let var_decl = ast.stmt(StmtKind::VarDecl {
        lhs: setting_lhs,
        rhs: call,
    });
    let program = Program {
        stmts: vec![helper_stmt, var_decl],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let query = compiler.query(chunk);
    let setting_sym = query.root_sym("setting").expect("setting sym exists");
    let deps = query.initializer_deps(setting_sym);
    assert_eq!(deps.len(), 1);
    assert_eq!(
        compiler
            .globals
            .interner
            .resolve(compiler.chunk(chunk).syms.get(deps[0]).name),
        "helper"
    );
}

#[test]
fn func_with_initializer_sets_the_static_flag() {
    // func make(): pass
    // func handler() = make()
    let mut compiler = Compiler::new();
    let make = compiler.intern("make");
    let handler = compiler.intern("handler");
    let mut ast = AstBuilder::new();

    let pass = ast.stmt(StmtKind::Pass);
    let make_decl = ast.func(make, vec![], vec![pass]);
    let make_stmt = ast.stmt(StmtKind::FuncDecl(make_decl));
    let callee = ast.ident(make);
    let init = ast.call(callee, vec![]);
    let handler_decl = FuncDecl {
        id: ast.id(),
        span: Span::default(),
        name: handler,
        params: Vec::new(),
        ret_spec: None,
        body: FuncBody::Init(init),
        exported: false,
    };
    let handler_stmt = ast.stmt(StmtKind::FuncDecl(handler_decl));
    let program = Program {
        stmts: vec![make_stmt, handler_stmt],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let query = compiler.query(chunk);
    let rsym = query.resolved_root("handler").expect("handler resolved");
    let ResolvedSymKind::Func {
        func_sym: OverloadRef::One(rfunc),
    } = query.resolved(rsym).kind
    else {
        panic!("expected single overload");
    };
    assert!(compiler.globals.rfunc_syms.get(rfunc).has_static_initializer);
}

#[test]
fn type_alias_redirects_to_target_sym() {
    // var target: 1
    // type T target
    // T
    let mut compiler = Compiler::new();
    let target = compiler.intern("target");
    let t = compiler.intern("T");
    let mut ast = AstBuilder::new();

    let target_lhs = ast.ident(target);
    let one = ast.num(1.0);
    let var_decl = ast.stmt(StmtKind::VarDecl {
        lhs: target_lhs,
        rhs: one,
    });
    let target_ref = ast.ident(target);
    let alias = ast.stmt(StmtKind::TypeAliasDecl {
        name: t,
        target: target_ref,
    });
    let t_ref = ast.ident(t);
    let t_node = t_ref.id;
    let use_stmt = ast.expr_stmt(t_ref);
    let program = Program {
        stmts: vec![var_decl, alias, use_stmt],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let query = compiler.query(chunk);
    let via_alias = query.resolved_sym_of(t_node).expect("alias use resolves");
    let direct = query.resolved_root("target").expect("target resolved");
    assert_eq!(via_alias, direct);
}

#[test]
fn return_type_inference_widens_across_branches() {
    // func f(c):
    //   if c: return 1
    //   return 'nope'
    let mut compiler = Compiler::new();
    let f = compiler.intern("f");
    let c = compiler.intern("c");
    let mut ast = AstBuilder::new();

    let one = ast.num(1.0);
    let ret_num = ast.stmt(StmtKind::Return(Some(one)));
    let c_ref = ast.ident(c);
    let if_stmt = ast.stmt(StmtKind::If {
        cond: c_ref,
        then_body: vec![ret_num],
        else_ifs: Vec::new(),
        else_body: None,
    });
    let nope = ast.string("nope");
    let ret_str = ast.stmt(StmtKind::Return(Some(nope)));
    let func = ast.func(f, vec![c], vec![if_stmt, ret_str]);
    let func_id = func.id;
    let func_stmt = ast.stmt(StmtKind::FuncDecl(func));
    let program = Program {
        stmts: vec![func_stmt],
    };

    let chunk = analyze_and_resolve(&mut compiler, &program);
    let query = compiler.query(chunk);
    let rsym = query.resolved_root("f").expect("f resolved");
    let ResolvedSymKind::Func {
        func_sym: OverloadRef::One(rfunc),
    } = query.resolved(rsym).kind
    else {
        panic!("expected single overload");
    };
    assert_eq!(compiler.globals.rfunc_syms.get(rfunc).ret.tag(), TypeTag::Any);

    let block = compiler
        .chunk(chunk)
        .output
        .func_block(func_id)
        .expect("func block recorded");
    assert!(compiler.chunk(chunk).blocks.block(block).infer_ret_type);
}

#[test]
fn ident_bindings_are_exclusive() {
    // x = 1
    // x
    // ghost_call(1)
    let mut compiler = Compiler::new();
    let x = compiler.intern("x");
    let ghost_call = compiler.intern("ghost_call");
    let mut ast = AstBuilder::new();

    let x_lhs = ast.ident(x);
    let one = ast.num(1.0);
    let assign = ast.assign(x_lhs, one);
    let x_ref = ast.ident(x);
    let x_node = x_ref.id;
    let read = ast.expr_stmt(x_ref);
    let callee = ast.ident(ghost_call);
    let callee_node = callee.id;
    let arg = ast.num(1.0);
    let call = ast.call(callee, vec![arg]);
    let call_stmt = ast.expr_stmt(call);
    let program = Program {
        stmts: vec![assign, read, call_stmt],
    };

    let chunk = analyze(&mut compiler, &program);
    let output = &compiler.chunk(chunk).output;
    assert!(matches!(output.binding(x_node), Some(Binding::Var(_))));
    assert!(matches!(output.binding(callee_node), Some(Binding::Sym(_))));
}
