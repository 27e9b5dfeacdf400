//! Residual expression parser
//!
//! A recursive descent parser over the four arithmetic operators, grouping
//! parentheses and bracketed list literals. Nothing else is accepted, so text
//! that is not arithmetic (names, dates, free text) fails to tokenize and can
//! be passed through untouched.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
}

/// Split text into tokens
///
/// Fails on the first character that cannot start a token.
pub fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let mut scanner = Scanner { input, pos: 0 };
    let mut tokens = Vec::new();

    loop {
        scanner.skip_whitespace();
        let Some(c) = scanner.peek_char() else {
            return Ok(tokens);
        };

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            ',' => Token::Comma,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            _ if c.is_ascii_digit()
                || (c == '.' && scanner.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())) =>
            {
                tokens.push(scanner.scan_number()?);
                continue;
            }
            _ => {
                return Err(FormulaError::Arithmetic(format!(
                    "Unexpected character '{}' at position {}",
                    c, scanner.pos
                )))
            }
        };
        scanner.advance();
        tokens.push(token);
    }
}

/// Check whether text consists only of arithmetic tokens
pub fn is_arithmetic(input: &str) -> bool {
    tokenize(input).is_ok()
}

/// Parse a complete arithmetic expression
///
/// # Example
/// ```rust
/// use report_sheets_formula::parse_expression;
///
/// let ast = parse_expression("1 + 2 * 3").unwrap();
/// let ast = parse_expression("[10, 20, 30]").unwrap();
/// assert!(parse_expression("1 +").is_err());
/// ```
pub fn parse_expression(input: &str) -> FormulaResult<FormulaExpr> {
    let mut parser = FormulaParser::new(tokenize(input)?);
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a comma-separated argument list (the text between a call's parentheses)
///
/// Commas inside list literals do not split arguments. Blank text yields no
/// arguments.
pub fn parse_arguments(input: &str) -> FormulaResult<Vec<FormulaExpr>> {
    let mut parser = FormulaParser::new(tokenize(input)?);
    let mut args = Vec::new();
    if parser.is_at_end() {
        return Ok(args);
    }

    loop {
        args.push(parser.parse_expression()?);
        if parser.current_token() == Some(&Token::Comma) {
            parser.consume();
        } else {
            break;
        }
    }
    parser.expect_end()?;
    Ok(args)
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let next = self.peek_char_at(1);
            let has_digits = match next {
                Some('+') | Some('-') => self.peek_char_at(2).map_or(false, |c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if has_digits {
                self.advance();
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Arithmetic(format!("Invalid number '{}'", text)))
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}

/// Expression parser over a token stream
struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl FormulaParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        match self.consume() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(malformed(format!("expected {:?}, got {:?}", expected, token))),
            None => Err(malformed(format!("expected {:?} at end of input", expected))),
        }
    }

    fn expect_end(&self) -> FormulaResult<()> {
        match self.current_token() {
            None => Ok(()),
            Some(token) => Err(malformed(format!("unexpected {:?} after expression", token))),
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Addition/Subtraction: +, -
    // 2. Multiplication/Division: *, /
    // 3. Unary: -, +
    // 4. Primary: numbers, lists, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Some(Token::Plus) => BinaryOperator::Add,
                Some(Token::Minus) => BinaryOperator::Subtract,
                _ => break,
            };
            self.consume();
            let right = self.parse_multiplicative()?;
            left = FormulaExpr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Some(Token::Star) => BinaryOperator::Multiply,
                Some(Token::Slash) => BinaryOperator::Divide,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = FormulaExpr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token() {
            Some(Token::Minus) => {
                self.consume();
                Ok(FormulaExpr::unary(UnaryOperator::Negate, self.parse_unary()?))
            }
            Some(Token::Plus) => {
                self.consume();
                Ok(FormulaExpr::unary(UnaryOperator::Plus, self.parse_unary()?))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(FormulaExpr::Number(n)),
            Some(Token::LeftParen) => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Some(Token::LeftBracket) => self.parse_list(),
            Some(token) => Err(malformed(format!("unexpected {:?}", token))),
            None => Err(malformed("unexpected end of input".to_string())),
        }
    }

    fn parse_list(&mut self) -> FormulaResult<FormulaExpr> {
        let mut items = Vec::new();
        if self.current_token() == Some(&Token::RightBracket) {
            self.consume();
            return Ok(FormulaExpr::List(items));
        }

        loop {
            items.push(self.parse_expression()?);
            match self.consume() {
                Some(Token::Comma) => continue,
                Some(Token::RightBracket) => break,
                Some(token) => {
                    return Err(malformed(format!("unexpected {:?} in list", token)))
                }
                None => return Err(malformed("unterminated list".to_string())),
            }
        }

        Ok(FormulaExpr::List(items))
    }
}

fn malformed(detail: String) -> FormulaError {
    FormulaError::Arithmetic(format!("Malformed expression: {}", detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_expression("42").unwrap(), FormulaExpr::Number(42.0));
        assert_eq!(parse_expression(".5").unwrap(), FormulaExpr::Number(0.5));
        assert_eq!(parse_expression("1.5e3").unwrap(), FormulaExpr::Number(1500.0));
    }

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 should parse as 1 + (2 * 3)
        let expr = parse_expression("1+2*3").unwrap();
        assert_eq!(
            expr,
            FormulaExpr::binary(
                BinaryOperator::Add,
                FormulaExpr::Number(1.0),
                FormulaExpr::binary(
                    BinaryOperator::Multiply,
                    FormulaExpr::Number(2.0),
                    FormulaExpr::Number(3.0)
                )
            )
        );
    }

    #[test]
    fn test_left_associative() {
        // 8 - 3 - 1 should parse as (8 - 3) - 1
        let expr = parse_expression("8 - 3 - 1").unwrap();
        assert_eq!(
            expr,
            FormulaExpr::binary(
                BinaryOperator::Subtract,
                FormulaExpr::binary(
                    BinaryOperator::Subtract,
                    FormulaExpr::Number(8.0),
                    FormulaExpr::Number(3.0)
                ),
                FormulaExpr::Number(1.0)
            )
        );
    }

    #[test]
    fn test_parse_lists() {
        assert_eq!(parse_expression("[]").unwrap(), FormulaExpr::List(vec![]));
        assert_eq!(
            parse_expression("[10, -2]").unwrap(),
            FormulaExpr::List(vec![
                FormulaExpr::Number(10.0),
                FormulaExpr::unary(UnaryOperator::Negate, FormulaExpr::Number(2.0)),
            ])
        );
    }

    #[test]
    fn test_non_arithmetic_text_does_not_tokenize() {
        assert!(!is_arithmetic("Sulfuric acid"));
        assert!(!is_arithmetic("2024-03-01 06:00:00"));
        assert!(is_arithmetic("2024-03-01"));
        assert!(is_arithmetic("(1 + 2) / [3]"));
    }

    #[test]
    fn test_malformed_expressions() {
        for input in ["1 +", "(1 + 2", "[1, 2", "1 2", "*3", ""] {
            assert!(
                matches!(parse_expression(input), Err(FormulaError::Arithmetic(_))),
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments("  ").unwrap(), vec![]);
        assert_eq!(
            parse_arguments("[1, 2, 3], 5").unwrap(),
            vec![
                FormulaExpr::List(vec![
                    FormulaExpr::Number(1.0),
                    FormulaExpr::Number(2.0),
                    FormulaExpr::Number(3.0),
                ]),
                FormulaExpr::Number(5.0),
            ]
        );
        assert!(parse_arguments("1,").is_err());
    }
}
