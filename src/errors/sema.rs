// src/errors/sema.rs
//! Semantic analysis errors (E2xxx).

use crate::frontend::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("Cannot resolve param type `{name}`")]
    #[diagnostic(code(E2101))]
    UnresolvedParamType {
        name: String,
        #[label("param type does not resolve")]
        span: SourceSpan,
    },

    #[error("`{name}` is ambiguous, multiple overloads match")]
    #[diagnostic(code(E2102))]
    AmbiguousSymbol {
        name: String,
        #[label("ambiguous reference")]
        span: SourceSpan,
    },

    #[error("Could not find symbol `{name}`")]
    #[diagnostic(code(E2103))]
    UndefinedSymbol {
        name: String,
        #[label("not found")]
        span: SourceSpan,
    },

    #[error("Symbol `{name}` is not exported")]
    #[diagnostic(code(E2104))]
    NotExported {
        name: String,
        #[label("private to its module")]
        span: SourceSpan,
    },

    #[error("Can not use `{name}` as a function reference")]
    #[diagnostic(code(E2105))]
    NotAFunctionRef {
        name: String,
        #[label("not a function")]
        span: SourceSpan,
    },

    #[error("Duplicate variable `{name}`")]
    #[diagnostic(code(E2110))]
    DuplicateVariable {
        name: String,
        #[label("already declared")]
        span: SourceSpan,
    },

    #[error("Object type `{name}` already exists")]
    #[diagnostic(code(E2111))]
    DuplicateObject {
        name: String,
        #[label("already declared")]
        span: SourceSpan,
    },

    #[error("Symbol `{name}` already exists at the chunk root")]
    #[diagnostic(code(E2112))]
    DuplicateSymbol {
        name: String,
        #[label("name taken")]
        span: SourceSpan,
    },

    #[error("Function `{name}` with the same signature already exists")]
    #[diagnostic(code(E2113))]
    DuplicateOverload {
        name: String,
        #[label("colliding overload")]
        span: SourceSpan,
    },

    #[error("The initializer of static `{sym}` can not reference the local variable `{local}`")]
    #[diagnostic(
        code(E2120),
        help("initializers run before any local exists; reference statics instead")
    )]
    LocalInStaticInitializer {
        sym: String,
        local: String,
        #[label("local referenced here")]
        span: SourceSpan,
    },

    #[error("Can not capture `{name}` from a static function")]
    #[diagnostic(code(E2121), help("use a lambda to capture enclosing locals"))]
    CaptureInStaticFunction {
        name: String,
        #[label("capture attempted here")]
        span: SourceSpan,
    },

    #[error("`{name}` must be declared with `static` before assigning")]
    #[diagnostic(code(E2122))]
    StaticAssignWithoutModifier {
        name: String,
        #[label("assignment to static name")]
        span: SourceSpan,
    },

    #[error("`{name}` must be declared with `capture` before assigning")]
    #[diagnostic(code(E2123))]
    CaptureAssignWithoutModifier {
        name: String,
        #[label("assignment to captured name")]
        span: SourceSpan,
    },

    #[error("`capture {name}` has no matching local in the parent block")]
    #[diagnostic(code(E2124))]
    CaptureWithoutParentLocal {
        name: String,
        #[label("nothing to capture")]
        span: SourceSpan,
    },

    #[error("`{name}` is already a local; declare it `capture` or `static` first")]
    #[diagnostic(code(E2125))]
    LocalAlreadyDeclared {
        // TODO: upgrade a plain local in place once declaration-order
        // rules for capture/static annotations are settled
        name: String,
        #[label("conflicting declaration")]
        span: SourceSpan,
    },

    #[error("Type alias target `{name}` is not resolved")]
    #[diagnostic(code(E2126))]
    UnresolvedAliasTarget {
        name: String,
        #[label("unresolved target")]
        span: SourceSpan,
    },

    #[error("Assignment to the left expression is not allowed")]
    #[diagnostic(code(E2130))]
    InvalidAssignTarget {
        #[label("unsupported assignment target")]
        span: SourceSpan,
    },

    #[error("Unsupported export declaration")]
    #[diagnostic(code(E2131))]
    UnsupportedExport {
        #[label("can not be exported")]
        span: SourceSpan,
    },

    #[error("Unsupported named args")]
    #[diagnostic(code(E2132))]
    UnsupportedNamedArgs {
        #[label("named arguments here")]
        span: SourceSpan,
    },

    #[error("Unsupported type alias target")]
    #[diagnostic(code(E2133), help("alias targets must be an identifier or access path"))]
    UnsupportedAliasTarget {
        #[label("unsupported target expression")]
        span: SourceSpan,
    },

    #[error("Static variable declaration requires an identifier")]
    #[diagnostic(code(E2134))]
    VarDeclNotIdent {
        #[label("expected an identifier")]
        span: SourceSpan,
    },

    #[error("Import path does not exist: {spec}")]
    #[diagnostic(code(E2140))]
    ImportPathNotFound {
        spec: String,
        #[label("unresolved import")]
        span: SourceSpan,
    },

    #[error("Unsupported module symbol kind for `{name}`")]
    #[diagnostic(code(E2141))]
    UnsupportedModuleSym {
        name: String,
        #[label("can not import this symbol")]
        span: SourceSpan,
    },
}

/// A semantic error paired with the span it was raised at
#[derive(Debug, Clone)]
pub struct TypeError {
    pub error: SemanticError,
    pub span: Span,
}

impl TypeError {
    pub fn new(error: SemanticError, span: Span) -> Self {
        Self { error, span }
    }
}
