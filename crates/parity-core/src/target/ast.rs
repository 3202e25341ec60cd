use std::rc::Rc;

use kit::helpers::location::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `import * as alias from "package"`
    Import { alias: String, package: String, position: Position },
    /// `const|let|var PATTERN = EXPR`, optionally exported
    Decl { pattern: Pattern, init: Expr, exported: bool, position: Position },
    /// `function name(params) { ... }`
    Function { name: String, function: Rc<ArrowFn>, exported: bool, position: Position },
    Expr(Expr),
    If { cond: Expr, then: Box<Stmt>, otherwise: Option<Box<Stmt>> },
    ForOf { pattern: Pattern, iterable: Expr, body: Box<Stmt> },
    Block(Vec<Stmt>),
    Return { value: Option<Expr>, position: Position },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    /// `[a, , b]`; holes are `None`
    Array(Vec<Option<PatternElement>>),
    /// `{ a, b: renamed, c = 1 }`
    Object(Vec<(String, PatternElement)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternElement {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFn {
    pub params: Vec<Param>,
    pub body: ArrowBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Item(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Named(String),
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    KeyValue(PropKey, Expr),
    Shorthand(String),
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    Str(String),
    /// Template literal, optionally tagged (`pulumi.interpolate`)
    Template { tag: Option<Box<Expr>>, quasis: Vec<String>, exprs: Vec<Expr> },
    Array(Vec<ListItem>),
    Object(Vec<Prop>),
    Ident(String),
    Member { object: Box<Expr>, property: String, optional: bool },
    Index { object: Box<Expr>, index: Box<Expr>, optional: bool },
    Call { callee: Box<Expr>, args: Vec<ListItem>, optional: bool },
    New { callee: Box<Expr>, args: Vec<ListItem> },
    Arrow(Rc<ArrowFn>),
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Logical { op: LogicalOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Conditional { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
}

impl Expr {
    pub fn new(kind: ExprKind, position: Position) -> Self {
        Expr { kind, position }
    }

    /// Dotted path of a member chain made only of identifiers, e.g.
    /// `aws.ec2.Instance`.
    pub fn dotted_path(&self) -> Option<Vec<String>> {
        match &self.kind {
            ExprKind::Ident(name) => Some(vec![name.clone()]),
            ExprKind::Member { object, property, optional: false } => {
                let mut path = object.dotted_path()?;
                path.push(property.clone());
                Some(path)
            }
            _ => None,
        }
    }
}
