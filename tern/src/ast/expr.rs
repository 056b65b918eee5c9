//! Expression AST nodes

use super::{FnDecl, Spanned};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// `nil`
    Nil,
    /// Boolean literal
    Bool(bool),
    /// Number literal
    Number(f64),
    /// String literal
    Str(String),

    /// Variable reference
    Var(String),

    /// The receiver of the current method
    SelfRef,

    /// `super.method`, looked up above the defining class of the running method
    Super { method: Spanned<String> },

    /// Variable assignment: name = value
    Assign {
        name: Spanned<String>,
        value: Box<Spanned<Expr>>,
    },

    /// Property read: object.field
    Get {
        object: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },

    /// Property write: object.field = value
    Set {
        object: Box<Spanned<Expr>>,
        field: Spanned<String>,
        value: Box<Spanned<Expr>>,
    },

    /// Call: callee(args)
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Short-circuit `and` / `or`
    Logical {
        left: Box<Spanned<Expr>>,
        op: LogicOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Function expression: fn (params) { body }
    Lambda(Rc<FnDecl>),

    /// Vec literal: [a, b, c]
    VecLit(Vec<Spanned<Expr>>),

    /// Half-open range literal: begin..end
    Range {
        begin: Box<Spanned<Expr>>,
        end: Box<Spanned<Expr>>,
    },
}

impl Expr {
    /// Render the callee of a call the way diagnostics print it: `recv.method()`
    pub fn call_label(&self) -> String {
        format!("{}()", self.label())
    }

    fn label(&self) -> String {
        match self {
            Expr::Nil => "nil".to_string(),
            Expr::Bool(b) => b.to_string(),
            Expr::Number(n) => n.to_string(),
            Expr::Str(s) => format!("\"{s}\""),
            Expr::Var(name) => name.clone(),
            Expr::SelfRef => "self".to_string(),
            Expr::Super { method } => format!("super.{}", method.node),
            Expr::Get { object, field } => format!("{}.{}", object.node.label(), field.node),
            Expr::Call { callee, .. } => callee.node.call_label(),
            Expr::Lambda(_) => "fn".to_string(),
            Expr::VecLit(_) => "[...]".to_string(),
            _ => "(...)".to_string(),
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
        }
    }
}

/// Short-circuit operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}

impl std::fmt::Display for LogicOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicOp::And => write!(f, "and"),
            LogicOp::Or => write!(f, "or"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not (!)
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
        }
    }
}
