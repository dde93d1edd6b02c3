//! Guest script lexer - tokenizes source code into tokens

use core_types::SourcePosition;

/// Keywords of the guest language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// let keyword
    Let,
    /// throw keyword
    Throw,
    /// return keyword
    Return,
    /// new keyword
    New,
    /// this keyword
    This,
    /// true keyword
    True,
    /// false keyword
    False,
    /// null keyword
    Null,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Keyword> {
        Some(match ident {
            "let" => Keyword::Let,
            "throw" => Keyword::Throw,
            "return" => Keyword::Return,
            "new" => Keyword::New,
            "this" => Keyword::This,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            _ => return None,
        })
    }
}

/// Punctuators of the guest language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// Opening parenthesis
    LParen,
    /// Closing parenthesis
    RParen,
    /// Comma
    Comma,
    /// Dot
    Dot,
    /// Semicolon
    Semicolon,
    /// Assignment
    Assign,
}

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier
    Identifier(String),
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Keyword
    Keyword(Keyword),
    /// Punctuator
    Punctuator(Punctuator),
    /// End of input
    EOF,
}

impl Token {
    /// Source-like rendering used in syntax error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => name.clone(),
            Token::Number(n) => n.to_string(),
            Token::String(_) => "string".to_string(),
            Token::Keyword(k) => format!("{:?}", k).to_lowercase(),
            Token::Punctuator(p) => match p {
                Punctuator::LParen => "(",
                Punctuator::RParen => ")",
                Punctuator::Comma => ",",
                Punctuator::Dot => ".",
                Punctuator::Semicolon => ";",
                Punctuator::Assign => "=",
            }
            .to_string(),
            Token::EOF => "end of input".to_string(),
        }
    }
}

/// A lexing or parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Message shown to guest code
    pub message: String,
    /// Where the failure was detected
    pub position: SourcePosition,
}

/// Lexer for guest source code
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scan the next token, returning it with its start position
    pub fn next_token(&mut self) -> Result<(Token, SourcePosition), SyntaxError> {
        self.skip_whitespace_and_comments();
        let start = self.current_position();
        if self.is_at_end() {
            return Ok((Token::EOF, start));
        }
        let c = self.advance();
        let token = match c {
            '(' => Token::Punctuator(Punctuator::LParen),
            ')' => Token::Punctuator(Punctuator::RParen),
            ',' => Token::Punctuator(Punctuator::Comma),
            '.' => Token::Punctuator(Punctuator::Dot),
            ';' => Token::Punctuator(Punctuator::Semicolon),
            '=' => Token::Punctuator(Punctuator::Assign),
            '"' | '\'' => self.scan_string(c, start)?,
            c if c.is_ascii_digit() => self.scan_number(c),
            c if is_id_start(c) => self.scan_identifier(c),
            _ => {
                return Err(SyntaxError {
                    message: "Invalid or unexpected token".to_string(),
                    position: start,
                })
            }
        };
        Ok((token, start))
    }

    fn scan_string(&mut self, quote: char, start: SourcePosition) -> Result<Token, SyntaxError> {
        let mut value = String::new();
        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(SyntaxError {
                    message: "Invalid or unexpected token".to_string(),
                    position: start,
                });
            }
            let c = self.advance();
            if c == quote {
                return Ok(Token::String(value));
            }
            if c == '\\' {
                if self.is_at_end() {
                    continue;
                }
                let escaped = self.advance();
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
            } else {
                value.push(c);
            }
        }
    }

    fn scan_number(&mut self, first: char) -> Token {
        let mut text = String::from(first);
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            text.push(self.advance());
        }
        if !self.is_at_end()
            && self.peek() == '.'
            && self.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            text.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                text.push(self.advance());
            }
        }
        Token::Number(text.parse().unwrap_or(f64::NAN))
    }

    fn scan_identifier(&mut self, first: char) -> Token {
        let mut name = String::from(first);
        while !self.is_at_end() && is_id_continue(self.peek()) {
            name.push(self.advance());
        }
        match Keyword::from_ident(&name) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(name),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            let c = self.peek();
            if c == '\n' {
                self.position += 1;
                self.line += 1;
                self.column = 1;
            } else if c.is_whitespace() {
                self.advance();
            } else if c == '/' && self.peek_next() == Some('/') {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.position]
        }
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.position];
        self.position += 1;
        self.column += 1;
        ch
    }

    fn current_position(&self) -> SourcePosition {
        SourcePosition {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }
}

fn is_id_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '$' || ch == '_'
}

fn is_id_continue(ch: char) -> bool {
    is_id_start(ch) || ch.is_ascii_digit()
}
