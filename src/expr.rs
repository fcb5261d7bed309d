use serde::Serialize;

/// Stable identity for the reference-like nodes (`Variable`, `Assign`,
/// `This`, `Super`). The resolver keys its scope-distance map on these,
/// so they must stay unique for the lifetime of an interpreter session.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Copy, Clone, Serialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize)]
pub struct Symbol {
    pub name: String,
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    Literal(Literal),
    Grouping(Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Logical(Box<Expr>, LogicalOp, Box<Expr>),
    Variable(NodeId, Symbol),
    Assign(NodeId, Symbol, Box<Expr>),
    Call(Box<Expr>, SourceLocation, Vec<Expr>),
    Get(Box<Expr>, Symbol),
    Set(Box<Expr>, Symbol, Box<Expr>),
    This(NodeId, SourceLocation),
    Super(NodeId, SourceLocation, Symbol),
}

#[derive(Debug, Clone, Serialize)]
pub enum Literal {
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum UnaryOpTy {
    Minus,
    Bang,
}

#[derive(Debug, Copy, Clone, Serialize)]
pub struct UnaryOp {
    pub ty: UnaryOpTy,
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum BinaryOpTy {
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
}

#[derive(Debug, Copy, Clone, Serialize)]
pub struct BinaryOp {
    pub ty: BinaryOpTy,
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum LogicalOpTy {
    And,
    Or,
}

#[derive(Debug, Copy, Clone, Serialize)]
pub struct LogicalOp {
    pub ty: LogicalOpTy,
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunDecl {
    pub name: Symbol,
    pub params: Vec<Symbol>,
    pub body: Vec<Stmt>,
}

/// The superclass, when present, is an ordinary variable reference and
/// carries a `NodeId` so the resolver can record its lookup distance.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    pub name: Symbol,
    pub superclass: Option<(NodeId, Symbol)>,
    pub methods: Vec<FunDecl>,
}

#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    Expr(Expr),
    Print(Expr),
    VarDecl(Symbol, Option<Expr>),
    Block(Vec<Stmt>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    FunDecl(FunDecl),
    Return(SourceLocation, Option<Expr>),
    ClassDecl(ClassDecl),
}
