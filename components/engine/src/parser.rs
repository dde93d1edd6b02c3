//! Recursive descent parser for the guest script language.
//!
//! ```text
//! program    := statement* (statements separated by optional ';')
//! statement  := 'let' ident '=' expr | 'throw' expr | 'return' expr | expr
//! expr       := postfix ('=' expr)?
//! postfix    := ('new' member args?) | primary ('.' ident | args)*
//! primary    := number | string | true | false | null | undefined | this
//!             | ident | '(' expr ')'
//! ```

use crate::lexer::{Keyword, Lexer, Punctuator, SyntaxError, Token};
use core_types::SourcePosition;

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// undefined
    Undefined,
    /// null
    Null,
    /// true / false
    Boolean(bool),
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
}

/// Expression nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// `this`
    This,
    /// Variable reference
    Identifier(String),
    /// `object.property`
    Member {
        /// Base expression
        object: Box<Expression>,
        /// Property name
        property: String,
    },
    /// `callee(args)`
    Call {
        /// Function expression
        callee: Box<Expression>,
        /// Arguments
        arguments: Vec<Expression>,
    },
    /// `new callee(args)`
    New {
        /// Constructor expression
        callee: Box<Expression>,
        /// Arguments
        arguments: Vec<Expression>,
    },
    /// `target = value`
    Assign {
        /// Identifier or member expression
        target: Box<Expression>,
        /// Assigned value
        value: Box<Expression>,
    },
}

impl Expression {
    /// Source-like rendering used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Expression::Literal(Literal::String(s)) => format!("\"{}\"", s),
            Expression::Literal(Literal::Number(n)) => n.to_string(),
            Expression::Literal(Literal::Boolean(b)) => b.to_string(),
            Expression::Literal(Literal::Null) => "null".to_string(),
            Expression::Literal(Literal::Undefined) => "undefined".to_string(),
            Expression::This => "this".to_string(),
            Expression::Identifier(name) => name.clone(),
            Expression::Member { object, property } => {
                format!("{}.{}", object.describe(), property)
            }
            Expression::Call { callee, .. } => format!("{}(...)", callee.describe()),
            Expression::New { callee, .. } => format!("(intermediate value)({})", callee.describe()),
            Expression::Assign { target, .. } => target.describe(),
        }
    }
}

/// Statement nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let name = init`
    Let {
        /// Binding name
        name: String,
        /// Initializer
        init: Expression,
    },
    /// `throw argument`
    Throw(Expression),
    /// `return argument`
    Return(Expression),
    /// Expression statement
    Expression(Expression),
}

/// A parsed script or function body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// Statements in source order
    pub body: Vec<Statement>,
}

/// Parser over a token stream with one token of lookahead
pub struct Parser {
    lexer: Lexer,
    current: Token,
    position: SourcePosition,
    previous: SourcePosition,
}

impl Parser {
    /// Create a parser and scan the first token.
    pub fn new(source: &str) -> Result<Self, SyntaxError> {
        let mut lexer = Lexer::new(source);
        let (current, position) = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            position,
            previous: position,
        })
    }

    /// Parse source text into a program.
    pub fn parse(source: &str) -> Result<Program, SyntaxError> {
        Parser::new(source)?.parse_program()
    }

    /// Parse the whole input.
    pub fn parse_program(&mut self) -> Result<Program, SyntaxError> {
        let mut body = Vec::new();
        loop {
            while self.eat(Punctuator::Semicolon)? {}
            if self.current == Token::EOF {
                return Ok(Program { body });
            }
            body.push(self.parse_statement()?);
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.current {
            Token::Keyword(Keyword::Let) => {
                self.bump()?;
                let name = match self.bump()? {
                    Token::Identifier(name) => name,
                    other => return Err(self.unexpected(&other, self.previous)),
                };
                self.expect(Punctuator::Assign)?;
                let init = self.parse_expression()?;
                Ok(Statement::Let { name, init })
            }
            Token::Keyword(Keyword::Throw) => {
                self.bump()?;
                Ok(Statement::Throw(self.parse_expression()?))
            }
            Token::Keyword(Keyword::Return) => {
                self.bump()?;
                if matches!(self.current, Token::EOF | Token::Punctuator(Punctuator::Semicolon)) {
                    return Ok(Statement::Return(Expression::Literal(Literal::Undefined)));
                }
                Ok(Statement::Return(self.parse_expression()?))
            }
            _ => Ok(Statement::Expression(self.parse_expression()?)),
        }
    }

    fn parse_expression(&mut self) -> Result<Expression, SyntaxError> {
        let position = self.position;
        let target = self.parse_postfix()?;
        if !self.eat(Punctuator::Assign)? {
            return Ok(target);
        }
        if !matches!(target, Expression::Identifier(_) | Expression::Member { .. }) {
            return Err(SyntaxError {
                message: "Invalid left-hand side in assignment".to_string(),
                position,
            });
        }
        let value = self.parse_expression()?;
        Ok(Expression::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = if self.current == Token::Keyword(Keyword::New) {
            self.bump()?;
            let mut callee = self.parse_primary()?;
            while self.eat(Punctuator::Dot)? {
                callee = self.parse_member(callee)?;
            }
            let arguments = if self.current == Token::Punctuator(Punctuator::LParen) {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            Expression::New {
                callee: Box::new(callee),
                arguments,
            }
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat(Punctuator::Dot)? {
                expr = self.parse_member(expr)?;
            } else if self.current == Token::Punctuator(Punctuator::LParen) {
                let arguments = self.parse_arguments()?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_member(&mut self, object: Expression) -> Result<Expression, SyntaxError> {
        let property = match self.bump()? {
            Token::Identifier(name) => name,
            // keywords are valid property names
            Token::Keyword(keyword) => format!("{:?}", keyword).to_lowercase(),
            other => return Err(self.unexpected(&other, self.previous)),
        };
        Ok(Expression::Member {
            object: Box::new(object),
            property,
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, SyntaxError> {
        self.expect(Punctuator::LParen)?;
        let mut arguments = Vec::new();
        if self.eat(Punctuator::RParen)? {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if self.eat(Punctuator::RParen)? {
                return Ok(arguments);
            }
            self.expect(Punctuator::Comma)?;
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.bump()?;
        Ok(match token {
            Token::Number(n) => Expression::Literal(Literal::Number(n)),
            Token::String(s) => Expression::Literal(Literal::String(s)),
            Token::Keyword(Keyword::True) => Expression::Literal(Literal::Boolean(true)),
            Token::Keyword(Keyword::False) => Expression::Literal(Literal::Boolean(false)),
            Token::Keyword(Keyword::Null) => Expression::Literal(Literal::Null),
            Token::Keyword(Keyword::This) => Expression::This,
            Token::Identifier(name) if name == "undefined" => {
                Expression::Literal(Literal::Undefined)
            }
            Token::Identifier(name) => Expression::Identifier(name),
            Token::Punctuator(Punctuator::LParen) => {
                let inner = self.parse_expression()?;
                self.expect(Punctuator::RParen)?;
                inner
            }
            other => return Err(self.unexpected(&other, self.previous)),
        })
    }

    fn bump(&mut self) -> Result<Token, SyntaxError> {
        let (next, position) = self.lexer.next_token()?;
        self.previous = std::mem::replace(&mut self.position, position);
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn eat(&mut self, punctuator: Punctuator) -> Result<bool, SyntaxError> {
        if self.current == Token::Punctuator(punctuator) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, punctuator: Punctuator) -> Result<(), SyntaxError> {
        if self.eat(punctuator)? {
            Ok(())
        } else {
            Err(self.unexpected(&self.current, self.position))
        }
    }

    fn unexpected(&self, token: &Token, position: SourcePosition) -> SyntaxError {
        let message = match token {
            Token::EOF => "Unexpected end of input".to_string(),
            Token::String(_) => "Unexpected string".to_string(),
            Token::Number(_) => "Unexpected number".to_string(),
            other => format!("Unexpected token '{}'", other.describe()),
        };
        SyntaxError { message, position }
    }
}
