//! Text front end for Calc and Tac functions.
//!
//! Accepts the same text the pretty printers produce, plus whitespace and
//! `//` line comments anywhere between tokens.

use std::ops::Range;

use logos::Logos;

use super::ir::Operator;
use super::{calc, tac};
use crate::error::CompileError;
use crate::validation::MAX_EXPRESSION_DEPTH;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("return")]
    Return,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semi,

    #[token("=")]
    Assign,

    // any operator character; unsupported ones are rejected by the parser
    #[regex(r"[-+*/%^&|<>!]", |lex| lex.slice().to_string())]
    Op(String),
}

pub fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, CompileError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(_) => {
                let span = lexer.span();
                return Err(CompileError::Parse {
                    offset: span.start,
                    message: format!("unexpected character `{}`", &source[span]),
                });
            }
        }
    }

    Ok(tokens)
}

/// Parses `name(params){x=E; ... return E;}`.
pub fn parse_calc(source: &str) -> Result<calc::Function, CompileError> {
    parse_calc_with_depth(source, MAX_EXPRESSION_DEPTH)
}

/// Like [`parse_calc`], failing with `Malformed` as soon as an expression
/// nests deeper than `max_depth`.
pub fn parse_calc_with_depth(source: &str, max_depth: usize) -> Result<calc::Function, CompileError> {
    let mut parser = Parser::new(source)?;
    parser.max_depth = max_depth;
    let (name, params) = parser.header()?;
    parser.function = name.clone();

    let mut body = Vec::new();
    while parser.peek() != Some(&Token::Return) {
        let target = parser.ident()?;
        parser.expect(Token::Assign, "`=`")?;
        let (value, _) = parser.calc_exp()?;
        parser.expect(Token::Semi, "`;`")?;
        body.push(calc::Stm::Assign { target, value });
    }

    parser.expect(Token::Return, "`return`")?;
    let (ret, _) = parser.calc_exp()?;
    parser.expect(Token::Semi, "`;`")?;
    parser.expect(Token::RBrace, "`}`")?;
    parser.finish()?;

    Ok(calc::Function {
        name,
        params,
        body,
        ret,
    })
}

/// Parses `name(params){x = y op z; ... return x;}`.
pub fn parse_tac(source: &str) -> Result<tac::Function, CompileError> {
    let mut parser = Parser::new(source)?;
    let (name, params) = parser.header()?;

    let mut body = Vec::new();
    while parser.peek() != Some(&Token::Return) {
        let target = parser.ident()?;
        parser.expect(Token::Assign, "`=`")?;
        let left = parser.ident()?;
        let value = match parser.peek() {
            Some(Token::Op(_)) => {
                let op = parser.operator()?;
                let right = parser.ident()?;
                tac::Exp::BinOp { left, right, op }
            }
            _ => tac::Exp::Var(left),
        };
        parser.expect(Token::Semi, "`;`")?;
        body.push(tac::Stm::Assign { target, value });
    }

    parser.expect(Token::Return, "`return`")?;
    let ret = parser.ident()?;
    parser.expect(Token::Semi, "`;`")?;
    parser.expect(Token::RBrace, "`}`")?;
    parser.finish()?;

    Ok(tac::Function {
        name,
        params,
        body,
        ret,
    })
}

// a Calc expression paired with its operator depth
type Measured = (calc::Exp, usize);

struct Parser {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    end: usize,
    function: String,
    max_depth: usize,
    // open parentheses around the cursor
    nesting: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, CompileError> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            end: source.len(),
            function: String::new(),
            max_depth: MAX_EXPRESSION_DEPTH,
            nesting: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end, |(_, span)| span.start)
    }

    fn error(&self, message: String) -> CompileError {
        CompileError::Parse {
            offset: self.offset(),
            message,
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => format!("{:?}", token),
            None => "end of input".to_string(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), CompileError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {}", what, self.found())))
        }
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(format!("expected identifier, found {}", self.found()))),
        }
    }

    fn operator(&mut self) -> Result<Operator, CompileError> {
        match self.peek() {
            Some(Token::Op(symbol)) => {
                let op = symbol.parse::<Operator>()?;
                self.pos += 1;
                Ok(op)
            }
            _ => Err(self.error(format!("expected operator, found {}", self.found()))),
        }
    }

    // operator at the cursor, if any, without consuming it
    fn peek_operator(&self) -> Result<Option<Operator>, CompileError> {
        match self.peek() {
            Some(Token::Op(symbol)) => symbol.parse::<Operator>().map(Some),
            _ => Ok(None),
        }
    }

    fn header(&mut self) -> Result<(String, Vec<String>), CompileError> {
        let name = self.ident()?;
        self.expect(Token::LParen, "`(`")?;

        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            params.push(self.ident()?);
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                params.push(self.ident()?);
            }
        }

        self.expect(Token::RParen, "`)`")?;
        self.expect(Token::LBrace, "`{`")?;
        Ok((name, params))
    }

    fn finish(&self) -> Result<(), CompileError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected trailing {:?}", token))),
        }
    }

    fn too_deep(&self, depth: usize) -> CompileError {
        CompileError::malformed(
            &self.function,
            format!(
                "expression depth {} at offset {} exceeds limit of {}",
                depth,
                self.offset(),
                self.max_depth
            ),
        )
    }

    fn join(&self, left: Measured, right: Measured, op: Operator) -> Result<Measured, CompileError> {
        let depth = left.1.max(right.1) + 1;
        if depth > self.max_depth {
            return Err(self.too_deep(depth));
        }
        Ok((calc::Exp::binop(left.0, right.0, op), depth))
    }

    // E ::= T {('+'|'-') T}
    fn calc_exp(&mut self) -> Result<Measured, CompileError> {
        let mut exp = self.calc_term()?;
        while let Some(op) = self.peek_operator()? {
            if op.precedence() != 1 {
                break;
            }
            self.pos += 1;
            let right = self.calc_term()?;
            exp = self.join(exp, right, op)?;
        }
        Ok(exp)
    }

    // T ::= A {('*'|'/') A}
    fn calc_term(&mut self) -> Result<Measured, CompileError> {
        let mut exp = self.calc_atom()?;
        while let Some(op) = self.peek_operator()? {
            if op.precedence() != 2 {
                break;
            }
            self.pos += 1;
            let right = self.calc_atom()?;
            exp = self.join(exp, right, op)?;
        }
        Ok(exp)
    }

    // A ::= ident | '(' E ')'
    fn calc_atom(&mut self) -> Result<Measured, CompileError> {
        match self.peek() {
            Some(Token::LParen) => {
                // redundant parentheses add no depth but still recurse
                if self.nesting >= self.max_depth {
                    return Err(self.too_deep(self.nesting + 1));
                }
                self.pos += 1;
                self.nesting += 1;
                let exp = self.calc_exp()?;
                self.nesting -= 1;
                self.expect(Token::RParen, "`)`")?;
                Ok(exp)
            }
            Some(Token::Ident(_)) => Ok((calc::Exp::Var(self.ident()?), 0)),
            _ => Err(self.error(format!("expected expression, found {}", self.found()))),
        }
    }
}
