//! Abstract Syntax Tree definitions

mod expr;
mod span;

pub use expr::*;
pub use span::*;

use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A program is a sequence of top-level statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression statement: `expr;`
    Expr(Spanned<Expr>),

    /// Variable declaration: `var name = init;`
    Var {
        name: Spanned<String>,
        init: Option<Spanned<Expr>>,
    },

    /// Function declaration: `fn name(params) { ... }`
    Fn(Rc<FnDecl>),

    /// Class declaration: `class Name < Parent { methods }`
    Class(ClassDecl),

    /// Block: `{ stmt* }`
    Block(Vec<Spanned<Stmt>>),

    /// Conditional; the else branch is either a block or another `if`
    If {
        cond: Spanned<Expr>,
        then_branch: Vec<Spanned<Stmt>>,
        else_branch: Option<Box<Spanned<Stmt>>>,
    },

    /// `while (cond) { ... }`
    While {
        cond: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    },

    /// `for name in iterable { ... }`
    For {
        var: Spanned<String>,
        iterable: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    },

    /// `return expr;`
    Return(Option<Spanned<Expr>>),
}

/// Function or method declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDecl {
    /// `None` for function expressions
    pub name: Option<Spanned<String>>,
    /// Positional parameters, excluding a method's `self`
    pub params: Vec<Spanned<String>>,
    /// True for methods declared with a leading `self` parameter
    pub is_method: bool,
    pub body: Vec<Spanned<Stmt>>,
    pub span: Span,
}

impl FnDecl {
    /// Number of arguments a call must supply
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Name used in stack frames and diagnostics
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map(|n| n.node.as_str()).unwrap_or("<fn>")
    }
}

/// Class declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Spanned<String>,
    /// Single parent class, if any
    pub parent: Option<Spanned<String>>,
    pub methods: Vec<Rc<FnDecl>>,
}
