//! Pratt parser for the expression language
//!
//! Precedence climbing over the token stream; all binary operators are
//! left-associative.

use super::ast::{BinaryExprData, BinaryOperator, ExprNode, LiteralValue, UnaryOperator};
use super::tokenizer::{Token, tokenize};
use crate::error::EvaluationError;

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Logical OR
    Or = 1,
    /// Logical AND
    And = 2,
    /// Equality operators (`==`, `!=`)
    Equality = 3,
    /// Ordering operators (`<`, `<=`, `>`, `>=`)
    Comparison = 4,
    /// Additive operators (`+`, `-`)
    Additive = 5,
    /// Multiplicative operators (`*`, `/`, `%`)
    Multiplicative = 6,
}

fn binary_operator(token: &Token<'_>) -> Option<(Precedence, BinaryOperator)> {
    match token {
        Token::Or => Some((Precedence::Or, BinaryOperator::Or)),
        Token::And => Some((Precedence::And, BinaryOperator::And)),
        Token::Eq => Some((Precedence::Equality, BinaryOperator::Eq)),
        Token::NotEq => Some((Precedence::Equality, BinaryOperator::NotEq)),
        Token::Lt => Some((Precedence::Comparison, BinaryOperator::Lt)),
        Token::LtEq => Some((Precedence::Comparison, BinaryOperator::LtEq)),
        Token::Gt => Some((Precedence::Comparison, BinaryOperator::Gt)),
        Token::GtEq => Some((Precedence::Comparison, BinaryOperator::GtEq)),
        Token::Plus => Some((Precedence::Additive, BinaryOperator::Add)),
        Token::Minus => Some((Precedence::Additive, BinaryOperator::Sub)),
        Token::Star => Some((Precedence::Multiplicative, BinaryOperator::Mul)),
        Token::Slash => Some((Precedence::Multiplicative, BinaryOperator::Div)),
        Token::Percent => Some((Precedence::Multiplicative, BinaryOperator::Mod)),
        _ => None,
    }
}

/// Parse an expression string into its AST
pub fn parse_expression(input: &str) -> Result<ExprNode, EvaluationError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_binary(0)?;
    if parser.pos < parser.tokens.len() {
        return Err(EvaluationError::expression(format!(
            "unexpected trailing input after position {}",
            parser.pos
        )));
    }
    Ok(expr)
}

struct Parser<'input> {
    tokens: Vec<Token<'input>>,
    pos: usize,
}

impl<'input> Parser<'input> {
    fn peek(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token<'input>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<ExprNode, EvaluationError> {
        let mut left = self.parse_unary()?;
        while let Some((precedence, op)) = self.peek().and_then(binary_operator) {
            if (precedence as u8) < min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.parse_binary(precedence as u8 + 1)?;
            left = ExprNode::Binary(Box::new(BinaryExprData { op, left, right }));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprNode, EvaluationError> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                Ok(ExprNode::Unary {
                    op: UnaryOperator::Not,
                    operand: Box::new(self.parse_unary()?),
                })
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(ExprNode::Unary {
                    op: UnaryOperator::Neg,
                    operand: Box::new(self.parse_unary()?),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<ExprNode, EvaluationError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.advance() {
                        Some(Token::Identifier(name)) => {
                            expr = ExprNode::Property {
                                base: Box::new(expr),
                                name: name.to_string(),
                            };
                        }
                        _ => {
                            return Err(EvaluationError::expression(
                                "expected property name after '.'",
                            ));
                        }
                    }
                }
                Some(Token::LeftBracket) => {
                    self.pos += 1;
                    let index = self.parse_binary(0)?;
                    match self.advance() {
                        Some(Token::RightBracket) => {
                            expr = ExprNode::Index {
                                base: Box::new(expr),
                                index: Box::new(index),
                            };
                        }
                        _ => return Err(EvaluationError::expression("expected closing ']'")),
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<ExprNode, EvaluationError> {
        match self.advance() {
            Some(Token::Integer(value)) => Ok(ExprNode::Literal(LiteralValue::Integer(value))),
            Some(Token::Decimal(value)) => Ok(ExprNode::Literal(LiteralValue::Decimal(value))),
            Some(Token::Str(value)) => Ok(ExprNode::Literal(LiteralValue::String(value))),
            Some(Token::True) => Ok(ExprNode::Literal(LiteralValue::Boolean(true))),
            Some(Token::False) => Ok(ExprNode::Literal(LiteralValue::Boolean(false))),
            Some(Token::Null) => Ok(ExprNode::Literal(LiteralValue::Null)),
            Some(Token::Identifier(name)) => Ok(ExprNode::Variable(name.to_string())),
            Some(Token::LeftParen) => {
                let expr = self.parse_binary(0)?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(expr),
                    _ => Err(EvaluationError::expression("expected closing ')'")),
                }
            }
            Some(other) => Err(EvaluationError::expression(format!(
                "unexpected token {other:?}"
            ))),
            None => Err(EvaluationError::expression("unexpected end of expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> ExprNode {
        ExprNode::Variable(name.to_string())
    }

    #[test]
    fn test_parse_comparison() {
        let expr = parse_expression("age >= 18").unwrap();
        assert_eq!(
            expr,
            ExprNode::Binary(Box::new(BinaryExprData {
                op: BinaryOperator::GtEq,
                left: var("age"),
                right: ExprNode::Literal(LiteralValue::Integer(18)),
            }))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // a or b and c  ==  a or (b and c)
        let expr = parse_expression("a or b and c").unwrap();
        match expr {
            ExprNode::Binary(data) => {
                assert_eq!(data.op, BinaryOperator::Or);
                assert_eq!(data.left, var("a"));
                assert!(matches!(
                    data.right,
                    ExprNode::Binary(ref inner) if inner.op == BinaryOperator::And
                ));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        // 1 + 2 * 3  ==  1 + (2 * 3)
        let expr = parse_expression("1 + 2 * 3").unwrap();
        match expr {
            ExprNode::Binary(data) => {
                assert_eq!(data.op, BinaryOperator::Add);
                assert!(matches!(
                    data.right,
                    ExprNode::Binary(ref inner) if inner.op == BinaryOperator::Mul
                ));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_property_path() {
        let expr = parse_expression("user.address.city").unwrap();
        assert_eq!(
            expr,
            ExprNode::Property {
                base: Box::new(ExprNode::Property {
                    base: Box::new(var("user")),
                    name: "address".to_string(),
                }),
                name: "city".to_string(),
            }
        );
    }

    #[test]
    fn test_parenthesized_grouping() {
        let grouped = parse_expression("(a or b) and c").unwrap();
        match grouped {
            ExprNode::Binary(data) => assert_eq!(data.op, BinaryOperator::And),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_unary_not() {
        let expr = parse_expression("not deleted").unwrap();
        assert_eq!(
            expr,
            ExprNode::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(var("deleted")),
            }
        );
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(parse_expression("a +").is_err());
        assert!(parse_expression("(a").is_err());
        assert!(parse_expression("a b").is_err());
        assert!(parse_expression("user.").is_err());
        assert!(parse_expression("items[0").is_err());
    }
}
