// File: src/lexer.rs
//
// Hand-written scanner. Produces a flat token stream; illegal characters
// and unterminated strings are recorded on an `ErrorList` rather than
// aborting the scan, so the parser still sees an `Illegal` token in their
// place and can keep going.

use crate::errors::{ErrorList, SourceLocation, Stage};
use crate::token::{lookup_keyword, Token, TokenKind};
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    /// Nesting depth of `(`/`[`/`{`; newlines are suppressed while this is
    /// above zero so multi-line literals and argument lists don't need
    /// explicit continuation markers.
    bracket_depth: usize,
    pub errors: ErrorList,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            bracket_depth: 0,
            errors: ErrorList::new(),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
            } else if c == '\n' && self.bracket_depth > 0 {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_number(&mut self) -> TokenKind {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        if self.peek() == Some('.') {
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
            TokenKind::Float(text.parse().unwrap_or(0.0))
        } else {
            TokenKind::Int(text.parse().unwrap_or(0))
        }
    }

    fn read_leading_dot_float(&mut self) -> TokenKind {
        let mut text = String::from("0.");
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        TokenKind::Float(text.parse().unwrap_or(0.0))
    }

    fn read_ident(&mut self) -> TokenKind {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            text.push(self.advance().unwrap());
        }
        lookup_keyword(&text).unwrap_or(TokenKind::Ident(text))
    }

    fn read_string(&mut self, quote: char, line: usize, column: usize) -> TokenKind {
        self.advance(); // opening quote
        let mut text = String::new();
        let mut terminated = false;
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                terminated = true;
                break;
            }
            text.push(self.advance().unwrap());
        }
        if !terminated {
            self.errors.push_at(
                Stage::Lexical,
                format!("unterminated string literal starting with {:?}", quote),
                SourceLocation::new(line, column),
            );
        }
        TokenKind::String(text)
    }

    fn read_illegal(&mut self, line: usize, column: usize) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            text.push(self.advance().unwrap());
        }
        self.errors.push_at(
            Stage::Lexical,
            format!("illegal character sequence {:?}", text),
            SourceLocation::new(line, column),
        );
        TokenKind::Illegal(text)
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let (line, column) = (self.line, self.column);

            let c = match self.peek() {
                Some(c) => c,
                None => return Token::new(TokenKind::Eof, line, column),
            };

            match c {
                '#' => {
                    self.skip_comment();
                    continue;
                }
                '\n' => {
                    self.advance();
                    return Token::new(TokenKind::LF, line, column);
                }
                c if c.is_alphabetic() || c == '_' => {
                    return Token::new(self.read_ident(), line, column);
                }
                c if c.is_ascii_digit() => {
                    return Token::new(self.read_number(), line, column);
                }
                '"' | '\'' => {
                    return Token::new(self.read_string(c, line, column), line, column);
                }
                '.' => {
                    self.advance();
                    if matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                        return Token::new(self.read_leading_dot_float(), line, column);
                    }
                    return Token::new(TokenKind::Dot, line, column);
                }
                '=' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::Equal, line, column);
                    }
                    return Token::new(TokenKind::Assign, line, column);
                }
                '!' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::NotEq, line, column);
                    }
                    return Token::new(self.read_illegal(line, column), line, column);
                }
                '<' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::LTEq, line, column);
                    }
                    return Token::new(TokenKind::LT, line, column);
                }
                '>' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::GTEq, line, column);
                    }
                    return Token::new(TokenKind::GT, line, column);
                }
                '+' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::PlusEq, line, column);
                    }
                    return Token::new(TokenKind::Plus, line, column);
                }
                '-' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::MinusEq, line, column);
                    }
                    return Token::new(TokenKind::Minus, line, column);
                }
                '*' => {
                    self.advance();
                    if self.peek() == Some('*') {
                        self.advance();
                        if self.peek() == Some('=') {
                            self.advance();
                            return Token::new(TokenKind::PowEq, line, column);
                        }
                        return Token::new(TokenKind::Pow, line, column);
                    }
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::MulEq, line, column);
                    }
                    return Token::new(TokenKind::Mul, line, column);
                }
                '/' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::DivEq, line, column);
                    }
                    return Token::new(TokenKind::Div, line, column);
                }
                '%' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        return Token::new(TokenKind::ModEq, line, column);
                    }
                    return Token::new(TokenKind::Mod, line, column);
                }
                ':' => {
                    self.advance();
                    return Token::new(TokenKind::Colon, line, column);
                }
                ',' => {
                    self.advance();
                    return Token::new(TokenKind::Comma, line, column);
                }
                ';' => {
                    self.advance();
                    return Token::new(TokenKind::Semi, line, column);
                }
                '(' => {
                    self.advance();
                    self.bracket_depth += 1;
                    return Token::new(TokenKind::LParen, line, column);
                }
                ')' => {
                    self.advance();
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    return Token::new(TokenKind::RParen, line, column);
                }
                '[' => {
                    self.advance();
                    self.bracket_depth += 1;
                    return Token::new(TokenKind::LBracket, line, column);
                }
                ']' => {
                    self.advance();
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    return Token::new(TokenKind::RBracket, line, column);
                }
                '{' => {
                    self.advance();
                    self.bracket_depth += 1;
                    return Token::new(TokenKind::LBrace, line, column);
                }
                '}' => {
                    self.advance();
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    return Token::new(TokenKind::RBrace, line, column);
                }
                _ => {
                    return Token::new(self.read_illegal(line, column), line, column);
                }
            }
        }
    }

    pub fn tokenize_all(mut self) -> (Vec<Token>, ErrorList) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let eof = tok.is_eof();
            tokens.push(tok);
            if eof {
                break;
            }
        }
        (tokens, self.errors)
    }
}

/// Tokenizes `source` into a flat token stream plus any lexical errors.
pub fn tokenize(source: &str) -> (Vec<Token>, ErrorList) {
    Lexer::new(source).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(source);
        assert!(!errors.has_errors(), "unexpected lexical errors: {:?}", errors.errors());
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("1 2.5 .75"), vec![
            TokenKind::Int(1),
            TokenKind::Float(2.5),
            TokenKind::Float(0.75),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(kinds("var x"), vec![
            TokenKind::Var,
            TokenKind::Ident("x".into()),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn strings_single_and_double_quoted() {
        assert_eq!(kinds(r#""a" 'b'"#), vec![
            TokenKind::String("a".into()),
            TokenKind::String("b".into()),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn unterminated_string_is_recorded() {
        let (_, errors) = tokenize("\"abc");
        assert!(errors.has_errors());
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("1 # comment\n2"), vec![
            TokenKind::Int(1),
            TokenKind::LF,
            TokenKind::Int(2),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn newline_suppressed_inside_brackets() {
        assert_eq!(kinds("[1,\n2]"), vec![
            TokenKind::LBracket,
            TokenKind::Int(1),
            TokenKind::Comma,
            TokenKind::Int(2),
            TokenKind::RBracket,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn augmented_assign_operators() {
        assert_eq!(kinds("+= -= *= /= %= **="), vec![
            TokenKind::PlusEq,
            TokenKind::MinusEq,
            TokenKind::MulEq,
            TokenKind::DivEq,
            TokenKind::ModEq,
            TokenKind::PowEq,
            TokenKind::Eof,
        ]);
    }
}
