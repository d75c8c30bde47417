// src/frontend/ast.rs
//
// The AST consumed by semantic analysis. The parser is an external
// collaborator: it interns identifiers into the compiler's NameInterner,
// allocates a unique NodeId for every statement and expression in a chunk,
// and hands the finished Program over. Sema never mutates these nodes;
// its annotations live in per-chunk side tables keyed by NodeId.

use crate::frontend::Span;
use crate::identity::NameId;

/// Unique identifier for AST nodes (statements and expressions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);

/// A complete chunk: one source file's statements in source order
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Pass,
    Break,
    Continue,
    /// Attribute marker statement, e.g. `@host`; inert during analysis
    At,
    Return(Option<Expr>),
    Expr(Expr),
    /// `lhs = rhs`
    Assign { lhs: Expr, rhs: Expr },
    /// `lhs OP= rhs`
    OpAssign {
        lhs: Expr,
        op: BinaryOp,
        rhs: Expr,
    },
    /// `var name: rhs` — a chunk-level static variable declaration
    VarDecl { lhs: Expr, rhs: Expr },
    /// `capture name [= rhs]`
    CaptureDecl { name: Expr, rhs: Option<Expr> },
    /// `static name [= rhs]`
    StaticDecl { name: Expr, rhs: Option<Expr> },
    /// `type Alias Target` — rhs must be an identifier or access expr
    TypeAliasDecl { name: NameId, target: Expr },
    /// `tagtype Color: red, green, blue`
    TagDecl { name: NameId, members: Vec<NameId> },
    ObjectDecl(ObjectDecl),
    FuncDecl(FuncDecl),
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_ifs: Vec<ElseIf>,
        else_body: Option<Vec<Stmt>>,
    },
    WhileCond { cond: Expr, body: Vec<Stmt> },
    WhileInf { body: Vec<Stmt> },
    /// `for opt some name: body` — bind the unwrapped optional
    ForOpt {
        opt: Expr,
        as_name: Option<NameId>,
        body: Vec<Stmt>,
    },
    /// `for iterable each key, value: body`
    ForIter {
        iterable: Expr,
        value: Option<NameId>,
        key: Option<NameId>,
        body: Vec<Stmt>,
    },
    /// `for start..end each i: body`
    ForRange {
        start: Expr,
        end: Expr,
        each: Option<NameId>,
        body: Vec<Stmt>,
    },
    Match(MatchData),
    Import { name: NameId, spec: String },
    ImportAll { spec: String },
    Export(Box<Stmt>),
}

#[derive(Debug, Clone)]
pub struct ElseIf {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct MatchData {
    pub scrutinee: Box<Expr>,
    pub cases: Vec<MatchCase>,
}

#[derive(Debug, Clone)]
pub struct MatchCase {
    pub conds: Vec<MatchCond>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum MatchCond {
    /// The `else` arm marker
    Else,
    Cond(Expr),
}

#[derive(Debug, Clone)]
pub struct ObjectDecl {
    pub name: NameId,
    pub fields: Vec<FieldDecl>,
    pub funcs: Vec<FuncDecl>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: NameId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: NameId,
    pub params: Vec<Param>,
    /// Declared return type name, if spelled
    pub ret_spec: Option<NameId>,
    pub body: FuncBody,
    pub exported: bool,
}

#[derive(Debug, Clone)]
pub enum FuncBody {
    Stmts(Vec<Stmt>),
    /// A static function whose body is a separately-declared expression
    /// initializer, e.g. `func f() = makeHandler()`
    Init(Expr),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: NameId,
    /// Declared type name, if spelled
    pub type_spec: Option<NameId>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(NameId),
    /// Decimal numeric literal
    NumberLit(f64),
    /// Non-decimal (hex/octal/binary) literal, parsed into u64
    RadixLit(u64),
    StringLit(String),
    /// Interpolated string; parts alternate literal and expression
    StringTemplate { parts: Vec<Expr> },
    BoolLit(bool),
    NoneLit,
    /// `Color#red`
    TagInit { tag: NameId, member: NameId },
    /// `#ok`
    TagLit(NameId),
    ListLit(Vec<Expr>),
    MapLit(Vec<(Expr, Expr)>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `left.name`
    Access { left: Box<Expr>, name: NameId },
    /// `left[index]`
    Index { left: Box<Expr>, index: Box<Expr> },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        named_args: Vec<(NameId, Expr)>,
    },
    Lambda(Box<LambdaExpr>),
    /// `T{field: value, ...}`
    ObjectInit {
        name: NameId,
        fields: Vec<(NameId, Expr)>,
    },
    Match(MatchData),
    IfExpr {
        cond: Box<Expr>,
        then: Box<Expr>,
        else_: Box<Expr>,
    },
    Coyield,
    Coresume(Box<Expr>),
    Try(Box<Expr>),
    Compt(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub body: LambdaBody,
}

#[derive(Debug, Clone)]
pub enum LambdaBody {
    Expr(Expr),
    Stmts(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    And,
    Or,
}

impl BinaryOp {
    /// Comparison operators produce boolean results
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::LessEq
                | BinaryOp::Greater
                | BinaryOp::GreaterEq
                | BinaryOp::Eq
                | BinaryOp::NotEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    BitNot,
    Not,
}
