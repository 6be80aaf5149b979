//! Recursive descent parser for condition expressions.
//!
//! ```text
//! expr           := [ "[" integer "]" ] ( combinatorExpr | predicateExpr )
//! combinatorExpr := ("&" | "|") "(" expr ("," expr)* ")"
//! predicateExpr  := op "(" fieldName "," literal ")"
//! op             := "=" | "!=" | "<" | ">" | "<=" | ">="
//! ```
//!
//! A scope applies to its whole subtree until a nested scope replaces it.
//! Only predicates need a scope; a combinator without one is fine as long
//! as every predicate beneath it is scoped.

use super::ast::*;
use super::lexer::{Span, Token, TokenKind};
use crate::model::{CombinatorKind, CompareOp, SensorId};
use crate::{Error, Result};

/// Nesting limit, keeps hostile input from exhausting the stack.
const MAX_DEPTH: usize = 256;

/// Parser state — wraps a token slice with cursor.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    fn peek(&self) -> &'t Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> &'t Token {
        let tok = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<&'t Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(self.error(format!("Expected {what}, got {}", describe(tok))))
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn error(&self, message: String) -> Error {
        Error::MalformedExpression {
            position: self.peek().span.start,
            message,
        }
    }
}

fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Eof => "end of input".into(),
        _ => format!("'{}'", tok.text),
    }
}

/// Parse a complete expression from tokens.
///
/// `tokens` must end with an `Eof` token, as produced by
/// [`tokenize`](super::lexer::tokenize).
pub fn parse_expression(tokens: &[Token]) -> Result<Expr> {
    if tokens.is_empty() {
        return Err(Error::MalformedExpression {
            position: 0,
            message: "Empty token stream".into(),
        });
    }

    let mut p = Parser::new(tokens);
    let expr = parse_expr(&mut p, None)?;

    if !p.at(TokenKind::Eof) {
        return Err(p.error(format!("Unexpected {} after expression", describe(p.peek()))));
    }
    Ok(expr)
}

fn parse_expr(p: &mut Parser, inherited: Option<SensorId>) -> Result<Expr> {
    if p.depth >= MAX_DEPTH {
        return Err(p.error("Expression nested too deeply".into()));
    }
    p.depth += 1;

    let scope = if p.at(TokenKind::LBracket) {
        Some(parse_scope(p)?)
    } else {
        inherited
    };

    let expr = match p.peek_kind() {
        TokenKind::Amp => parse_combinator(p, CombinatorKind::And, scope)?,
        TokenKind::Pipe => parse_combinator(p, CombinatorKind::Or, scope)?,
        TokenKind::Eq => parse_predicate(p, CompareOp::Eq, scope)?,
        TokenKind::Neq => parse_predicate(p, CompareOp::Ne, scope)?,
        TokenKind::Lt => parse_predicate(p, CompareOp::Lt, scope)?,
        TokenKind::Gt => parse_predicate(p, CompareOp::Gt, scope)?,
        TokenKind::Lte => parse_predicate(p, CompareOp::Le, scope)?,
        TokenKind::Gte => parse_predicate(p, CompareOp::Ge, scope)?,
        _ => {
            return Err(p.error(format!(
                "Expected combinator or comparison operator, got {}",
                describe(p.peek())
            )));
        }
    };

    p.depth -= 1;
    Ok(expr)
}

/// `[n]`
fn parse_scope(p: &mut Parser) -> Result<SensorId> {
    p.expect(TokenKind::LBracket, "'['")?;
    let tok = p.peek();
    if tok.kind != TokenKind::Word {
        return Err(p.error(format!("Expected sensor id, got {}", describe(tok))));
    }
    let id = tok.text.parse::<u32>().map_err(|_| Error::MalformedExpression {
        position: tok.span.start,
        message: format!("Sensor scope must be a non-negative integer, got '{}'", tok.text),
    })?;
    p.advance();
    p.expect(TokenKind::RBracket, "']'")?;
    Ok(SensorId(id))
}

fn parse_combinator(p: &mut Parser, kind: CombinatorKind, scope: Option<SensorId>) -> Result<Expr> {
    let start = p.advance().span.start;
    p.expect(TokenKind::LParen, "'(' after combinator")?;

    let mut children = vec![parse_expr(p, scope)?];
    while p.at(TokenKind::Comma) {
        p.advance();
        children.push(parse_expr(p, scope)?);
    }

    let end = p.expect(TokenKind::RParen, "',' or ')'")?.span.end;
    Ok(Expr::Combinator(CombinatorExpr {
        kind,
        children,
        span: Span { start, end },
    }))
}

fn parse_predicate(p: &mut Parser, op: CompareOp, scope: Option<SensorId>) -> Result<Expr> {
    let start = p.advance().span.start;
    let sensor = scope.ok_or(Error::UnscopedPredicate { position: start })?;

    p.expect(TokenKind::LParen, "'(' after operator")?;
    let field_tok = p.expect(TokenKind::Word, "field name")?;
    p.expect(TokenKind::Comma, "','")?;

    let literal = match p.peek_kind() {
        TokenKind::Word | TokenKind::StringLiteral => {
            let tok = p.advance();
            Literal {
                text: tok.text.clone(),
                quoted: tok.kind == TokenKind::StringLiteral,
                span: tok.span,
            }
        }
        _ => return Err(p.error(format!("Expected literal, got {}", describe(p.peek())))),
    };

    let end = p.expect(TokenKind::RParen, "')'")?.span.end;
    Ok(Expr::Predicate(PredicateExpr {
        sensor,
        op,
        field: field_tok.text.clone(),
        field_span: field_tok.span,
        literal,
        span: Span { start, end },
    }))
}
