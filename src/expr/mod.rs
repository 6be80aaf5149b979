//! # Condition Expression Language
//!
//! Prefix-notation trigger expressions, e.g.
//!
//! ```text
//! &([2]&(>(Pressure,20),=(Temperature,600)),[8]!=(Msg,abc))
//! ```
//!
//! Parsing is a pure function: text in, scope-resolved AST out. Field
//! lookup and literal coercion happen later, when the AST is built into
//! the condition graph.

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::Result;
use ast::Expr;

/// Parse an expression string into a scope-resolved AST.
pub fn parse(text: &str) -> Result<Expr> {
    let tokens = lexer::tokenize(text)?;
    parser::parse_expression(&tokens)
}
