//! Recursive-descent parser for where-expressions

use super::lexer::{tokenize, SpannedToken, Token};
use super::{CompareOp, Expr};
use crate::entity::Value;
use crate::error::{Error, Result};
use crate::limits::MAX_EXPRESSION_DEPTH;

/// Parse a where-expression into an [`Expr`]
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(extra) = parser.peek() {
        return Err(Error::expression(
            format!("Unexpected {:?} after expression", extra.token),
            extra.offset,
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|t| &t.token)
    }

    fn offset(&self) -> usize {
        self.peek().map(|t| t.offset).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek_token() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(Error::expression(format!("Expected {}", what), self.offset()))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        while self.eat(&Token::And) {
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let offset = self.offset();
        if self.eat(&Token::Not) {
            self.enter(offset)?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        if self.eat(&Token::LParen) {
            self.enter(offset)?;
            let inner = self.parse_or()?;
            self.expect(&Token::RParen, "')'")?;
            self.depth -= 1;
            return Ok(inner);
        }
        self.parse_condition()
    }

    fn enter(&mut self, offset: usize) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err(Error::expression(
                format!("Expression nested deeper than {} levels", MAX_EXPRESSION_DEPTH),
                offset,
            ));
        }
        Ok(())
    }

    fn parse_condition(&mut self) -> Result<Expr> {
        let offset = self.offset();
        let attribute = match self.advance() {
            Some(SpannedToken {
                token: Token::Ident(name),
                ..
            }) => name,
            _ => return Err(Error::expression("Expected attribute name", offset)),
        };

        let offset = self.offset();
        match self.advance().map(|t| t.token) {
            Some(Token::Eq) => self.parse_compare(attribute, CompareOp::Eq),
            Some(Token::Ne) => self.parse_compare(attribute, CompareOp::Ne),
            Some(Token::Lt) => self.parse_compare(attribute, CompareOp::Lt),
            Some(Token::Le) => self.parse_compare(attribute, CompareOp::Le),
            Some(Token::Gt) => self.parse_compare(attribute, CompareOp::Gt),
            Some(Token::Ge) => self.parse_compare(attribute, CompareOp::Ge),
            Some(Token::Is) => {
                let negated = self.eat(&Token::Not);
                self.expect(&Token::Null, "'null'")?;
                Ok(Expr::IsNull { attribute, negated })
            }
            Some(Token::In) => self.parse_in(attribute, false),
            Some(Token::Like) => self.parse_like(attribute, false),
            Some(Token::Not) => {
                let offset = self.offset();
                match self.advance().map(|t| t.token) {
                    Some(Token::In) => self.parse_in(attribute, true),
                    Some(Token::Like) => self.parse_like(attribute, true),
                    _ => Err(Error::expression("Expected 'in' or 'like' after 'not'", offset)),
                }
            }
            _ => Err(Error::expression(
                format!("Expected an operator after '{}'", attribute),
                offset,
            )),
        }
    }

    fn parse_compare(&mut self, attribute: String, op: CompareOp) -> Result<Expr> {
        let value = self.parse_literal()?;
        Ok(Expr::Compare {
            attribute,
            op,
            value,
        })
    }

    fn parse_in(&mut self, attribute: String, negated: bool) -> Result<Expr> {
        self.expect(&Token::LParen, "'(' after 'in'")?;
        let mut values = vec![self.parse_literal()?];
        while self.eat(&Token::Comma) {
            values.push(self.parse_literal()?);
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(Expr::In {
            attribute,
            values,
            negated,
        })
    }

    fn parse_like(&mut self, attribute: String, negated: bool) -> Result<Expr> {
        let offset = self.offset();
        match self.advance().map(|t| t.token) {
            Some(Token::String(pattern)) => Ok(Expr::Like {
                attribute,
                pattern,
                negated,
            }),
            _ => Err(Error::expression("Expected a string pattern after 'like'", offset)),
        }
    }

    fn parse_literal(&mut self) -> Result<Value> {
        let offset = self.offset();
        match self.advance().map(|t| t.token) {
            Some(Token::Int(i)) => Ok(Value::from(i)),
            Some(Token::Float(f)) => Ok(Value::from(f)),
            Some(Token::String(s)) => Ok(Value::String(s)),
            Some(Token::True) => Ok(Value::Bool(true)),
            Some(Token::False) => Ok(Value::Bool(false)),
            Some(Token::Null) => Ok(Value::Null),
            _ => Err(Error::expression("Expected a literal value", offset)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compare(attribute: &str, op: CompareOp, value: Value) -> Expr {
        Expr::Compare {
            attribute: attribute.to_string(),
            op,
            value,
        }
    }

    #[test]
    fn test_nesting_is_capped() {
        let nested = |depth: usize| format!("{}a = 1{}", "(".repeat(depth), ")".repeat(depth));

        assert!(parse(&nested(MAX_EXPRESSION_DEPTH)).is_ok());

        let err = parse(&nested(10_000)).unwrap_err();
        assert!(matches!(
            err,
            Error::Expression { position, .. } if position == MAX_EXPRESSION_DEPTH
        ));

        let negations = format!("{}a = 1", "not ".repeat(MAX_EXPRESSION_DEPTH + 1));
        assert!(parse(&negations).is_err());
        assert!(parse(&format!("{}a = 1", "not ".repeat(MAX_EXPRESSION_DEPTH))).is_ok());
    }

    #[test]
    fn test_parse_comparison() {
        assert_eq!(parse("age >= 18").unwrap(), compare("age", CompareOp::Ge, json!(18)));
        assert_eq!(
            parse("name = 'a'").unwrap(),
            compare("name", CompareOp::Eq, json!("a"))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a = 1 or b = 2 and c = 3").unwrap();
        let expected = Expr::Or(
            Box::new(compare("a", CompareOp::Eq, json!(1))),
            Box::new(Expr::And(
                Box::new(compare("b", CompareOp::Eq, json!(2))),
                Box::new(compare("c", CompareOp::Eq, json!(3))),
            )),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parentheses_and_not() {
        let expr = parse("not (a = 1 or a = 2)").unwrap();
        assert!(matches!(expr, Expr::Not(inner) if matches!(*inner, Expr::Or(..))));
    }

    #[test]
    fn test_null_in_and_like() {
        assert_eq!(
            parse("email is not null").unwrap(),
            Expr::IsNull {
                attribute: "email".to_string(),
                negated: true
            }
        );
        assert_eq!(
            parse("id not in (1, 2)").unwrap(),
            Expr::In {
                attribute: "id".to_string(),
                values: vec![json!(1), json!(2)],
                negated: true
            }
        );
        assert_eq!(
            parse("name like 'a%'").unwrap(),
            Expr::Like {
                attribute: "name".to_string(),
                pattern: "a%".to_string(),
                negated: false
            }
        );
    }

    #[test]
    fn test_parse_errors_carry_offsets() {
        let err = parse("age >").unwrap_err();
        assert!(matches!(err, Error::Expression { position: 5, .. }));

        let err = parse("age > 1 2").unwrap_err();
        assert!(matches!(err, Error::Expression { position: 8, .. }));

        let err = parse("(age > 1").unwrap_err();
        assert!(matches!(err, Error::Expression { position: 8, .. }));

        assert!(parse("").is_err());
        assert!(parse("age in 1").is_err());
    }
}
