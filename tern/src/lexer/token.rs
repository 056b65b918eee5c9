//! Token definitions

use logos::{Lexer, Logos};
use std::fmt;

/// tern token
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Keywords
    #[token("class")]
    Class,
    #[token("fn")]
    Fn,
    #[token("var")]
    Var,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,
    #[token("self")]
    SelfKw,
    #[token("super")]
    Super,
    #[token("and")]
    And,
    #[token("or")]
    Or,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Punctuation
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    // Literals
    #[regex(r"[0-9]+", lex_number)]
    Number(f64),
    #[regex(r#""([^"\\]|\\.)*""#, lex_string)]
    Str(String),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Integer part is matched by the regex; a fractional part is taken only when
/// a digit follows the dot, so `0..10` stays a range.
fn lex_number(lex: &mut Lexer<Token>) -> Option<f64> {
    let rest = lex.remainder().as_bytes();
    if rest.first() == Some(&b'.') {
        let frac = rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if frac > 0 {
            lex.bump(1 + frac);
        }
    }
    lex.slice().parse().ok()
}

fn lex_string(lex: &mut Lexer<Token>) -> Option<String> {
    let raw = lex.slice();
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            _ => return None,
        }
    }
    Some(out)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Class => "class",
            Token::Fn => "fn",
            Token::Var => "var",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::In => "in",
            Token::Return => "return",
            Token::True => "true",
            Token::False => "false",
            Token::Nil => "nil",
            Token::SelfKw => "self",
            Token::Super => "super",
            Token::And => "and",
            Token::Or => "or",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Semi => ";",
            Token::DotDot => "..",
            Token::Dot => ".",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
            Token::Eq => "=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::Number(n) => return write!(f, "{n}"),
            Token::Str(s) => return write!(f, "\"{s}\""),
            Token::Ident(name) => return write!(f, "{name}"),
        };
        f.write_str(text)
    }
}
