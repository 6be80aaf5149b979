//! Expression lexer — tokenizes a condition string.

use crate::{Error, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Byte span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Combinators
    Amp, Pipe,

    // Comparison operators
    Eq, Neq, Lt, Lte, Gt, Gte,

    // Punctuation
    LParen, RParen, LBracket, RBracket, Comma,

    /// Bare run of non-punctuation characters: field names, numbers, text.
    Word,
    /// Quoted text; `text` holds the unescaped contents.
    StringLiteral,

    Eof,
}

/// Characters that end a bare word.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || "()[],&|=!<>'\"".contains(c)
}

/// Tokenize an expression string.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => { chars.next(); }

            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let start = pos;
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => {
                            if let Some((_, escaped)) = chars.next() {
                                match escaped {
                                    'n' => s.push('\n'),
                                    't' => s.push('\t'),
                                    '\\' => s.push('\\'),
                                    c if c == quote => s.push(c),
                                    c => { s.push('\\'); s.push(c); }
                                }
                            }
                        }
                        Some((end, c)) if c == quote => {
                            tokens.push(Token {
                                kind: TokenKind::StringLiteral,
                                span: Span { start, end: end + 1 },
                                text: s,
                            });
                            break;
                        }
                        Some((_, c)) => s.push(c),
                        None => return Err(Error::MalformedExpression {
                            position: start,
                            message: "Unterminated string literal".into(),
                        }),
                    }
                }
            }

            '(' => { chars.next(); tokens.push(punct(TokenKind::LParen, pos, "(")); }
            ')' => { chars.next(); tokens.push(punct(TokenKind::RParen, pos, ")")); }
            '[' => { chars.next(); tokens.push(punct(TokenKind::LBracket, pos, "[")); }
            ']' => { chars.next(); tokens.push(punct(TokenKind::RBracket, pos, "]")); }
            ',' => { chars.next(); tokens.push(punct(TokenKind::Comma, pos, ",")); }
            '&' => { chars.next(); tokens.push(punct(TokenKind::Amp, pos, "&")); }
            '|' => { chars.next(); tokens.push(punct(TokenKind::Pipe, pos, "|")); }
            '=' => { chars.next(); tokens.push(punct(TokenKind::Eq, pos, "=")); }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Neq, pos, "!="));
                } else {
                    return Err(Error::MalformedExpression {
                        position: pos,
                        message: "Unknown operator '!'".into(),
                    });
                }
            }
            '<' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Lte, pos, "<="));
                } else {
                    tokens.push(punct(TokenKind::Lt, pos, "<"));
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Gte, pos, ">="));
                } else {
                    tokens.push(punct(TokenKind::Gt, pos, ">"));
                }
            }

            _ => {
                let start = pos;
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Word,
                    span: Span { start, end: start + word.len() },
                    text: word,
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });

    Ok(tokens)
}

fn punct(kind: TokenKind, pos: usize, text: &str) -> Token {
    Token {
        kind,
        span: Span { start: pos, end: pos + text.len() },
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_scoped_predicate() {
        assert_eq!(kinds("[3]=(Status,50)"), vec![
            TokenKind::LBracket,
            TokenKind::Word,   // 3
            TokenKind::RBracket,
            TokenKind::Eq,
            TokenKind::LParen,
            TokenKind::Word,   // Status
            TokenKind::Comma,
            TokenKind::Word,   // 50
            TokenKind::RParen,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(kinds("!= <= >= < >"), vec![
            TokenKind::Neq,
            TokenKind::Lte,
            TokenKind::Gte,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_whitespace_is_insignificant() {
        assert_eq!(kinds("| ( [4] != ( Level , 40 ) )"), kinds("|([4]!=(Level,40))"));
    }

    #[test]
    fn test_negative_and_float_words() {
        let tokens = tokenize("-3.5").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Word);
        assert_eq!(tokens[0].text, "-3.5");
    }

    #[test]
    fn test_quoted_literal_with_escape() {
        let tokens = tokenize(r"'it\'s, ok'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "it's, ok");
    }

    #[test]
    fn test_bare_bang_is_rejected() {
        let err = tokenize("&(!(a,1))").unwrap_err();
        assert!(matches!(err, Error::MalformedExpression { position: 2, .. }));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("=(Msg,'abc").is_err());
    }

    #[test]
    fn test_word_span() {
        let tokens = tokenize("  Pressure").unwrap();
        assert_eq!(tokens[0].span, Span { start: 2, end: 10 });
    }
}
