//! Lexical analysis for .fir files.
//!
//! Entity references (`v3`, `block1`, `fn0`) are decoded while scanning, so the parser only ever
//! sees typed handles. Every other word (opcodes, `ptr`, `inbounds`, ...) is a [`Token::Keyword`].

use fir::{Block, FuncRef, Value};

use crate::error::Location;


#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token<'a> {
    /// `; ...` up to the end of the line, including the `;`.
    Comment(&'a str),
    LPar,
    RPar,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Equal,
    Arrow,
    /// A signed decimal or hex immediate. The parser validates the digits.
    Integer(&'a str),
    Value(Value),
    Block(Block),
    FuncRef(FuncRef),
    /// `%log`, without the `%`.
    Name(&'a str),
    /// A quoted string without escapes, for example the tag of an `lfence`.
    String(&'a str),
    Keyword(&'a str),
}

#[derive(Debug, PartialEq, Eq)]
pub struct LocatedToken<'a> {
    pub token: Token<'a>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    InvalidChar,
    UnterminatedString,
    /// `v01`, or a number that does not fit an entity index.
    MalformedReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedError {
    pub error: LexError,
    pub location: Location,
}

fn punctuation(ch: char) -> Option<Token<'static>> {
    let token = match ch {
        '(' => Token::LPar,
        ')' => Token::RPar,
        '{' => Token::LBrace,
        '}' => Token::RBrace,
        '[' => Token::LBracket,
        ']' => Token::RBracket,
        ',' => Token::Comma,
        ':' => Token::Colon,
        '=' => Token::Equal,
        _ => return None,
    };
    Some(token)
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    is_word_char(ch) || matches!(ch, '.' | '$')
}

/// Decodes `word` as an entity reference if it has the shape `v«n»`, `block«n»` or `fn«n»`.
fn reference(word: &str) -> Option<Result<Token<'static>, LexError>> {
    let (prefix, digits) = word.split_at(word.trim_end_matches(|ch: char| ch.is_ascii_digit()).len());
    if digits.is_empty() || !matches!(prefix, "v" | "block" | "fn") {
        return None;
    }
    let number = match digits.parse::<u32>() {
        Ok(number) if digits == "0" || !digits.starts_with('0') => number,
        _ => return Some(Err(LexError::MalformedReference)),
    };
    let token = match prefix {
        "v" => Value::with_number(number).map(Token::Value),
        "block" => Block::with_number(number).map(Token::Block),
        _ => FuncRef::with_number(number).map(Token::FuncRef),
    };
    Some(token.ok_or(LexError::MalformedReference))
}

/// Splits a .fir source into tokens and tracks the current line for diagnostics.
pub struct Lexer<'a> {
    source: &'a str,
    /// Byte offset of the next unread character.
    pos: usize,
    line_number: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source, pos: 0, line_number: 1 }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line_number += 1;
        }
        Some(ch)
    }

    /// Consumes characters as long as `pred` holds and returns them.
    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if pred(ch)) {
            self.bump();
        }
        &self.source[start..self.pos]
    }

    fn integer(&mut self) -> Token<'a> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        self.eat_while(is_word_char);
        Token::Integer(&self.source[start..self.pos])
    }

    fn word(&mut self) -> Result<Token<'a>, LexError> {
        let word = self.eat_while(is_word_char);
        reference(word).unwrap_or(Ok(Token::Keyword(word)))
    }

    fn string(&mut self) -> Result<Token<'a>, LexError> {
        self.bump();
        let text = self.eat_while(|ch| ch != '"');
        match self.bump() {
            Some(_) => Ok(Token::String(text)),
            None => Err(LexError::UnterminatedString),
        }
    }

    /// Get the next token or a lexical error, or None when the end of input is reached.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Result<LocatedToken<'a>, LocatedError>> {
        self.eat_while(char::is_whitespace);
        let location = Location { line_number: self.line_number };
        let ch = self.peek()?;

        let res = if let Some(token) = punctuation(ch) {
            self.bump();
            Ok(token)
        } else {
            match ch {
                ';' => Ok(Token::Comment(self.eat_while(|ch| ch != '\n'))),
                '-' if self.rest().starts_with("->") => {
                    self.pos += 2;
                    Ok(Token::Arrow)
                }
                '-' | '+' | '0'..='9' => Ok(self.integer()),
                '%' => {
                    self.bump();
                    Ok(Token::Name(self.eat_while(is_name_char)))
                }
                '"' => self.string(),
                'a'..='z' | 'A'..='Z' | '_' => self.word(),
                _ => {
                    self.bump();
                    Err(LexError::InvalidChar)
                }
            }
        };

        Some(match res {
            Ok(token) => Ok(LocatedToken { token, location }),
            Err(error) => Err(LocatedError { error, location }),
        })
    }
}
