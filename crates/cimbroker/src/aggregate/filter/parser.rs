// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Where-clause parser.
//!
//! Precedence, loosest first: `OR`, `AND`, `NOT`, comparison. Keywords are
//! case-insensitive; property names keep their spelling and are matched
//! case-insensitively at evaluation time.

use super::FilterError;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Lt,
    Ge,
    Le,
    /// `=` or `==`
    Eq,
    /// `<>` or `!=`
    Ne,
    /// `%` any run, `_` one character
    Like,
}

impl Operator {
    /// Operator with its operands swapped (`a < b` is `b > a`).
    pub fn mirrored(self) -> Operator {
        match self {
            Operator::Gt => Operator::Lt,
            Operator::Lt => Operator::Gt,
            Operator::Ge => Operator::Le,
            Operator::Le => Operator::Ge,
            other => other,
        }
    }
}

/// Comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Integer(i64),
    Real(f64),
    String(String),
    Boolean(bool),
    /// `%n`, bound at evaluation time.
    Parameter(usize),
    /// Property of the instance under test.
    Property(String),
}

/// Parsed where-clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Comparison {
        left: Operand,
        op: Operator,
        right: Operand,
    },
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
}

impl Expression {
    /// Names of all properties the expression reads.
    pub fn properties(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_properties(&mut names);
        names
    }

    fn collect_properties<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Comparison { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Property(name) = operand {
                        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                            names.push(name);
                        }
                    }
                }
            }
            Expression::And(l, r) | Expression::Or(l, r) => {
                l.collect_properties(names);
                r.collect_properties(names);
            }
            Expression::Not(inner) => inner.collect_properties(names),
        }
    }

    /// Highest `%n` index referenced, if any.
    pub fn max_parameter(&self) -> Option<usize> {
        match self {
            Expression::Comparison { left, right, .. } => [left, right]
                .into_iter()
                .filter_map(|o| match o {
                    Operand::Parameter(idx) => Some(*idx),
                    _ => None,
                })
                .max(),
            Expression::And(l, r) | Expression::Or(l, r) => {
                l.max_parameter().max(r.max_parameter())
            }
            Expression::Not(inner) => inner.max_parameter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Integer(i64),
    Real(f64),
    String(String),
    Boolean(bool),
    Parameter(usize),
    Operator(Operator),
    And,
    Or,
    Not,
    LParen,
    RParen,
    Eof,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek_char().is_some_and(&mut pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn read_number(&mut self) -> Result<Token, FilterError> {
        let start = self.pos;
        self.eat('-');
        let mut seen_dot = false;
        self.take_while(|c| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                true
            } else {
                c.is_ascii_digit()
            }
        });
        let text = &self.input[start..self.pos];
        let invalid = || FilterError::ParseError(format!("Invalid number '{}'", text));
        if seen_dot {
            text.parse().map(Token::Real).map_err(|_| invalid())
        } else {
            text.parse().map(Token::Integer).map_err(|_| invalid())
        }
    }

    /// Quoted literal; a doubled quote character stands for itself.
    fn read_string(&mut self, quote: char) -> Result<Token, FilterError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if !self.eat(quote) {
                        return Ok(Token::String(text));
                    }
                    text.push(quote);
                }
                Some(c) => text.push(c),
                None => return Err(FilterError::ParseError("Unterminated string".to_string())),
            }
        }
    }

    fn read_parameter(&mut self) -> Result<Token, FilterError> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(FilterError::ParseError("Expected digit after '%'".to_string()));
        }
        digits
            .parse()
            .map(Token::Parameter)
            .map_err(|_| FilterError::ParseError(format!("Invalid parameter index '%{}'", digits)))
    }

    fn next_token(&mut self) -> Result<Token, FilterError> {
        self.take_while(char::is_whitespace);

        let ch = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        if ch.is_ascii_digit() || (ch == '-' && self.peek_second().is_some_and(|c| c.is_ascii_digit())) {
            return self.read_number();
        }
        if ch.is_alphabetic() || ch == '_' {
            let ident = self.take_while(|c| c.is_alphanumeric() || c == '_');
            return Ok(keyword(ident).unwrap_or_else(|| Token::Identifier(ident.to_string())));
        }

        self.bump();
        let token = match ch {
            '>' if self.eat('=') => Token::Operator(Operator::Ge),
            '>' => Token::Operator(Operator::Gt),
            '<' if self.eat('=') => Token::Operator(Operator::Le),
            '<' if self.eat('>') => Token::Operator(Operator::Ne),
            '<' => Token::Operator(Operator::Lt),
            '=' => {
                self.eat('=');
                Token::Operator(Operator::Eq)
            }
            '!' if self.eat('=') => Token::Operator(Operator::Ne),
            '!' => return Err(FilterError::ParseError("Expected '=' after '!'".to_string())),
            '(' => Token::LParen,
            ')' => Token::RParen,
            '%' => return self.read_parameter(),
            '\'' | '"' => return self.read_string(ch),
            other => {
                return Err(FilterError::ParseError(format!(
                    "Unexpected character '{}'",
                    other
                )))
            }
        };
        Ok(token)
    }
}

fn keyword(ident: &str) -> Option<Token> {
    let token = match ident.to_ascii_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "TRUE" => Token::Boolean(true),
        "FALSE" => Token::Boolean(false),
        "LIKE" => Token::Operator(Operator::Like),
        _ => return None,
    };
    Some(token)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, FilterError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<Token, FilterError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn parse_or(&mut self) -> Result<Expression, FilterError> {
        let mut left = self.parse_and()?;
        while self.current == Token::Or {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, FilterError> {
        let mut left = self.parse_not()?;
        while self.current == Token::And {
            self.advance()?;
            let right = self.parse_not()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, FilterError> {
        if self.current == Token::Not {
            self.advance()?;
            let inner = self.parse_not()?;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, FilterError> {
        if self.current == Token::LParen {
            self.advance()?;
            let expr = self.parse_or()?;
            if self.advance()? != Token::RParen {
                return Err(FilterError::ParseError("Expected closing parenthesis".to_string()));
            }
            return Ok(expr);
        }
        self.parse_comparison()
    }

    /// `operand op operand`, or a bare boolean property (`Enabled` is
    /// `Enabled = TRUE`).
    fn parse_comparison(&mut self) -> Result<Expression, FilterError> {
        let left = self.parse_operand()?;
        let op = match self.current {
            Token::Operator(op) => op,
            _ if matches!(left, Operand::Property(_)) => {
                return Ok(Expression::Comparison {
                    left,
                    op: Operator::Eq,
                    right: Operand::Boolean(true),
                })
            }
            ref other => {
                return Err(FilterError::ParseError(format!(
                    "Expected operator, got {:?}",
                    other
                )))
            }
        };
        self.advance()?;
        let right = self.parse_operand()?;
        Ok(Expression::Comparison { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, FilterError> {
        let operand = match self.advance()? {
            Token::Identifier(name) => Operand::Property(name),
            Token::Integer(n) => Operand::Integer(n),
            Token::Real(f) => Operand::Real(f),
            Token::String(s) => Operand::String(s),
            Token::Boolean(b) => Operand::Boolean(b),
            Token::Parameter(idx) => Operand::Parameter(idx),
            other => {
                return Err(FilterError::ParseError(format!(
                    "Expected operand, got {:?}",
                    other
                )))
            }
        };
        Ok(operand)
    }
}

/// Parse a where-clause.
///
/// ```ignore
/// let expr = parse_expression("Status = 'OK' AND Capacity > %0")?;
/// ```
pub fn parse_expression(expression: &str) -> Result<Expression, FilterError> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(FilterError::EmptyExpression);
    }
    let mut parser = Parser::new(trimmed)?;
    let expr = parser.parse_or()?;
    if parser.current != Token::Eof {
        return Err(FilterError::ParseError(format!(
            "Unexpected trailing input at {:?}",
            parser.current
        )));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(expr: Expression) -> (Operand, Operator, Operand) {
        match expr {
            Expression::Comparison { left, op, right } => (left, op, right),
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_comparison() {
        let (left, op, right) = comparison(parse_expression("Capacity > 25").unwrap());
        assert_eq!(left, Operand::Property("Capacity".to_string()));
        assert_eq!(op, Operator::Gt);
        assert_eq!(right, Operand::Integer(25));
    }

    #[test]
    fn test_parse_literals() {
        let (_, _, right) = comparison(parse_expression("Load >= -2.5").unwrap());
        assert_eq!(right, Operand::Real(-2.5));
        let (_, _, right) = comparison(parse_expression("Name = 'it''s'").unwrap());
        assert_eq!(right, Operand::String("it's".to_string()));
        let (_, _, right) = comparison(parse_expression("Enabled <> false").unwrap());
        assert_eq!(right, Operand::Boolean(false));
        let (_, _, right) = comparison(parse_expression("x < %12").unwrap());
        assert_eq!(right, Operand::Parameter(12));
    }

    #[test]
    fn test_bare_property_is_boolean_test() {
        let (left, op, right) = comparison(parse_expression("Enabled").unwrap());
        assert_eq!(left, Operand::Property("Enabled".to_string()));
        assert_eq!(op, Operator::Eq);
        assert_eq!(right, Operand::Boolean(true));
        assert!(matches!(parse_expression("NOT Enabled").unwrap(), Expression::Not(_)));
    }

    #[test]
    fn test_precedence() {
        // (a AND b) OR c
        let expr = parse_expression("a > %0 and b < %1 OR c = 1").unwrap();
        match expr {
            Expression::Or(left, _) => assert!(matches!(*left, Expression::And(_, _))),
            other => panic!("Expected OR, got {:?}", other),
        }
        let expr = parse_expression("(a > 1 OR b < 2) AND c = 3").unwrap();
        assert!(matches!(expr, Expression::And(_, _)));
    }

    #[test]
    fn test_operators() {
        for (text, op) in [
            ("x > 1", Operator::Gt),
            ("x < 1", Operator::Lt),
            ("x >= 1", Operator::Ge),
            ("x <= 1", Operator::Le),
            ("x = 1", Operator::Eq),
            ("x == 1", Operator::Eq),
            ("x <> 1", Operator::Ne),
            ("x != 1", Operator::Ne),
            ("x LIKE 'a%'", Operator::Like),
        ] {
            assert_eq!(comparison(parse_expression(text).unwrap()).1, op, "{}", text);
        }
    }

    #[test]
    fn test_properties_and_parameters() {
        let expr = parse_expression("Name = %1 AND (name LIKE 'x%' OR Size > %0)").unwrap();
        assert_eq!(expr.properties(), vec!["Name", "Size"]);
        assert_eq!(expr.max_parameter(), Some(1));
        assert_eq!(parse_expression("a = 1").unwrap().max_parameter(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_expression("  "), Err(FilterError::EmptyExpression)));
        assert!(parse_expression("@@invalid").is_err());
        assert!(parse_expression("a = 'open").is_err());
        assert!(parse_expression("(a = 1").is_err());
        assert!(parse_expression("a = 1 b").is_err());
        assert!(parse_expression("a = %").is_err());
        assert!(parse_expression("1 2").is_err());
    }
}
