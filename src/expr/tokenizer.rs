//! Hand-rolled tokenizer for the expression language
//!
//! Zero-copy where possible: identifiers stay as slices of the input; only
//! string literals (which may contain escapes) are owned.

use crate::error::EvaluationError;

/// Expression token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// Integer literal
    Integer(i64),
    /// Floating-point literal
    Decimal(f64),
    /// Quoted string literal, escapes resolved
    Str(String),
    /// Identifier
    Identifier(&'input str),
    /// `null`
    Null,
    /// `true`
    True,
    /// `false`
    False,
    /// `and` / `&&`
    And,
    /// `or` / `||`
    Or,
    /// `not` / `!`
    Not,
    /// `==` / `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `.`
    Dot,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
}

/// Tokenize an expression string
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, EvaluationError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'(' => {
                tokens.push(Token::LeftParen);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::RightParen);
                pos += 1;
            }
            b'[' => {
                tokens.push(Token::LeftBracket);
                pos += 1;
            }
            b']' => {
                tokens.push(Token::RightBracket);
                pos += 1;
            }
            b'.' => {
                tokens.push(Token::Dot);
                pos += 1;
            }
            b'+' => {
                tokens.push(Token::Plus);
                pos += 1;
            }
            b'-' => {
                tokens.push(Token::Minus);
                pos += 1;
            }
            b'*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            b'/' => {
                tokens.push(Token::Slash);
                pos += 1;
            }
            b'%' => {
                tokens.push(Token::Percent);
                pos += 1;
            }
            b'=' => {
                // both `==` and bare `=` mean equality
                pos += if bytes.get(pos + 1) == Some(&b'=') { 2 } else { 1 };
                tokens.push(Token::Eq);
            }
            b'!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Token::NotEq);
                    pos += 2;
                } else {
                    tokens.push(Token::Not);
                    pos += 1;
                }
            }
            b'<' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Token::LtEq);
                    pos += 2;
                } else {
                    tokens.push(Token::Lt);
                    pos += 1;
                }
            }
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Token::GtEq);
                    pos += 2;
                } else {
                    tokens.push(Token::Gt);
                    pos += 1;
                }
            }
            b'&' => {
                if bytes.get(pos + 1) == Some(&b'&') {
                    tokens.push(Token::And);
                    pos += 2;
                } else {
                    return Err(unexpected_char(input, pos));
                }
            }
            b'|' => {
                if bytes.get(pos + 1) == Some(&b'|') {
                    tokens.push(Token::Or);
                    pos += 2;
                } else {
                    return Err(unexpected_char(input, pos));
                }
            }
            b'\'' | b'"' => {
                let (literal, next) = scan_string(input, pos)?;
                tokens.push(Token::Str(literal));
                pos = next;
            }
            b'0'..=b'9' => {
                let (token, next) = scan_number(input, pos)?;
                tokens.push(token);
                pos = next;
            }
            _ if b.is_ascii_alphabetic() || b == b'_' => {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                tokens.push(keyword_or_identifier(&input[start..pos]));
            }
            _ => return Err(unexpected_char(input, pos)),
        }
    }

    Ok(tokens)
}

fn keyword_or_identifier(word: &str) -> Token<'_> {
    match word {
        "null" => Token::Null,
        "true" => Token::True,
        "false" => Token::False,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        _ => Token::Identifier(word),
    }
}

fn scan_string(input: &str, start: usize) -> Result<(String, usize), EvaluationError> {
    let bytes = input.as_bytes();
    let quote = bytes[start];
    let mut literal = String::new();
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if pos + 1 < bytes.len() => {
                literal.push(bytes[pos + 1] as char);
                pos += 2;
            }
            b if b == quote => return Ok((literal, pos + 1)),
            _ => {
                // keep multi-byte characters intact
                let ch = input[pos..].chars().next().unwrap_or('\u{fffd}');
                literal.push(ch);
                pos += ch.len_utf8();
            }
        }
    }
    Err(EvaluationError::expression(format!(
        "unterminated string literal starting at position {start}"
    )))
}

fn scan_number(input: &str, start: usize) -> Result<(Token<'static>, usize), EvaluationError> {
    let bytes = input.as_bytes();
    let mut pos = start;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut is_decimal = false;
    if pos < bytes.len()
        && bytes[pos] == b'.'
        && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)
    {
        is_decimal = true;
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    let text = &input[start..pos];
    let token = if is_decimal {
        Token::Decimal(text.parse().map_err(|_| {
            EvaluationError::expression(format!("invalid number literal '{text}'"))
        })?)
    } else {
        Token::Integer(text.parse().map_err(|_| {
            EvaluationError::expression(format!("invalid number literal '{text}'"))
        })?)
    };
    Ok((token, pos))
}

fn unexpected_char(input: &str, pos: usize) -> EvaluationError {
    let ch = input[pos..].chars().next().unwrap_or('\u{fffd}');
    EvaluationError::expression(format!("unexpected character '{ch}' at position {pos}"))
}
