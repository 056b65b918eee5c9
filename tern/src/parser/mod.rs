//! Parser implementation using lalrpop

use crate::ast::{BinOp, Expr, LineIndex, LogicOp, Program, Span, Spanned, UnOp};
use crate::error::{CompileError, Result};
use crate::lexer::Token;
use lalrpop_util::ParseError;
use std::fmt;


lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar
);

/// Error raised from grammar actions
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidSyntax {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for InvalidSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

type GrammarError = ParseError<usize, Token, InvalidSyntax>;

/// Parse tokens into AST
pub fn parse(_filename: &str, source: &str, tokens: Vec<(Token, Span)>) -> Result<Program> {
    let lines = LineIndex::new(source);
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (span.start, tok, span.end));

    grammar::ProgramParser::new()
        .parse(&lines, token_iter)
        .map_err(|e| match e {
            ParseError::InvalidToken { location } => {
                CompileError::parser("invalid token", lines.span(location, location + 1))
            }
            ParseError::UnrecognizedEof { location, expected } => CompileError::parser(
                format!("unexpected end of input{}", expected_suffix(&expected)),
                lines.span(location, location),
            ),
            ParseError::UnrecognizedToken {
                token: (start, tok, end),
                expected,
            } => CompileError::parser(
                format!("unexpected token `{tok}`{}", expected_suffix(&expected)),
                lines.span(start, end),
            ),
            ParseError::ExtraToken {
                token: (start, tok, end),
            } => CompileError::parser(format!("extra token `{tok}`"), lines.span(start, end)),
            ParseError::User { error } => CompileError::parser(error.message, error.span),
        })
}

fn expected_suffix(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!("; expected one of {}", expected.join(", "))
    }
}

/// Turn `target = value` into a variable or property write
fn assignment(
    target: Spanned<Expr>,
    value: Spanned<Expr>,
    span: Span,
) -> std::result::Result<Spanned<Expr>, GrammarError> {
    let node = match target.node {
        Expr::Var(name) => Expr::Assign {
            name: Spanned::new(name, target.span),
            value: Box::new(value),
        },
        Expr::Get { object, field } => Expr::Set {
            object,
            field,
            value: Box::new(value),
        },
        _ => {
            return Err(ParseError::User {
                error: InvalidSyntax {
                    message: "Invalid assignment target.".to_string(),
                    span: target.span,
                },
            });
        }
    };
    Ok(Spanned::new(node, span))
}

fn binary(left: Spanned<Expr>, op: BinOp, right: Spanned<Expr>, span: Span) -> Spanned<Expr> {
    Spanned::new(
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn logical(left: Spanned<Expr>, op: LogicOp, right: Spanned<Expr>, span: Span) -> Spanned<Expr> {
    Spanned::new(
        Expr::Logical {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn unary(op: UnOp, expr: Spanned<Expr>, span: Span) -> Spanned<Expr> {
    Spanned::new(
        Expr::Unary {
            op,
            expr: Box::new(expr),
        },
        span,
    )
}
