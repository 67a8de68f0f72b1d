// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{Error, Result, SourceError};

use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::rc::Rc;

/// Text of a condition or query. Cheap to clone; spans share it.
#[derive(Clone)]
pub struct Source {
    contents: Rc<str>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.contents.fmt(f)
    }
}

impl Source {
    pub fn new(contents: &str) -> Source {
        Self {
            contents: contents.into(),
        }
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> SourceError {
        SourceError {
            line,
            col,
            message: msg.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn error(&self, msg: &str) -> SourceError {
        self.source.error(self.line, self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = match t.char_indices().nth(max) {
            Some((cut, _)) => (&t[..cut], "..."),
            None => (t.as_str(), ""),
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    String,
    RawString,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    // `peek` yields '\x00' past the end; a NUL in the text is not the end.
    fn at_end(&self, offset: usize) -> bool {
        offset >= self.source.contents().len()
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn error(&self, line: u32, col: u32, msg: &str) -> Error {
        Error::Parse(self.source.error(line, col, msg))
    }

    fn span(&self, line: u32, col: u32, start: usize, end: usize) -> Span {
        Span {
            source: self.source.clone(),
            line,
            col,
            start: start as u32,
            end: end as u32,
        }
    }

    fn read_ident(&mut self) -> Result<Token> {
        let start = self.peek().0;
        let col = self.col;
        loop {
            let ch = self.peek().1;
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.col += (end - start) as u32;
        Ok(Token(TokenKind::Ident, self.span(self.line, col, start, end)))
    }

    // Unsigned integers only: decimal, 0-prefixed octal or 0x-prefixed hex.
    // The radix is resolved by the parser.
    fn read_number(&mut self) -> Result<Token> {
        let (start, chr) = self.peek();
        let col = self.col;
        self.iter.next();

        if chr == '0' && matches!(self.peek().1, 'x' | 'X') {
            self.iter.next();
            while self.peek().1.is_ascii_hexdigit() {
                self.iter.next();
            }
        } else {
            while self.peek().1.is_ascii_digit() {
                self.iter.next();
            }
        }

        let end = self.peek().0;
        self.col += (end - start) as u32;

        // A valid number cannot be followed by these characters.
        let ch = self.peek().1;
        if ch == '_' || ch == '.' || ch.is_ascii_alphanumeric() {
            return Err(self.error(self.line, self.col, "invalid number"));
        }

        Ok(Token(
            TokenKind::Number,
            self.span(self.line, col, start, end),
        ))
    }

    fn read_raw_string(&mut self) -> Result<Token> {
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        let (line, col) = (self.line, self.col);
        loop {
            let (offset, ch) = self.peek();
            self.iter.next();
            match ch {
                '`' => {
                    self.col += 1;
                    break;
                }
                '\x00' if self.at_end(offset) => {
                    return Err(self.error(line, col, "unmatched `"));
                }
                '\x00' => {
                    return Err(self.error(
                        self.line,
                        self.col,
                        "invalid character in string",
                    ));
                }
                '\t' => self.col += 4,
                '\n' => {
                    self.line += 1;
                    self.col = 1;
                }
                _ => self.col += 1,
            }
        }
        let end = self.peek().0;
        Ok(Token(
            TokenKind::RawString,
            self.span(line, col, start, end - 1),
        ))
    }

    fn read_string(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (offset, ch) = self.peek();
            let col = self.col + (offset - start) as u32;
            match ch {
                '"' => break,
                '\x00' if self.at_end(offset) => break,
                '\\' => {
                    self.iter.next();
                    let (_, ch) = self.peek();
                    self.iter.next();
                    match ch {
                        // json escape sequence
                        '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => (),
                        'u' => {
                            for _i in 0..4 {
                                let (offset, ch) = self.peek();
                                let col = self.col + (offset - start) as u32;
                                if !ch.is_ascii_hexdigit() {
                                    return Err(self.error(
                                        line,
                                        col,
                                        "invalid hex escape sequence",
                                    ));
                                }
                                self.iter.next();
                            }
                        }
                        _ => return Err(self.error(line, col, "invalid escape sequence")),
                    }
                }
                _ => {
                    if !('\u{0020}'..='\u{10FFFF}').contains(&ch) {
                        return Err(self.error(line, col, "invalid character in string"));
                    }
                    self.iter.next();
                }
            }
        }

        if self.peek().1 != '"' {
            return Err(self.error(line, col, "unmatched \""));
        }

        self.iter.next();
        let end = self.peek().0;
        self.col += (end - start) as u32;

        Ok(Token(
            TokenKind::String,
            self.span(line, col + 1, start, end - 1),
        ))
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek().1 {
                ' ' | '\r' => self.col += 1,
                '\t' => self.col += 4,
                '\n' => {
                    self.col = 1;
                    self.line += 1;
                }
                _ => break,
            }
            self.iter.next();
        }
    }

    fn symbol(&mut self, start: usize, len: usize) -> Result<Token> {
        let col = self.col;
        for _ in 0..len {
            self.iter.next();
        }
        self.col += len as u32;
        Ok(Token(
            TokenKind::Symbol,
            self.span(self.line, col, start, start + len),
        ))
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws();

        let (start, chr) = self.peek();
        let next = self.peekahead(1).1;

        match chr {
            // grouping characters and separators
            '(' | ')' | '[' | ']' | ',' | '.' => self.symbol(start, 1),
            // == != <= >=
            '=' | '!' | '<' | '>' if next == '=' => self.symbol(start, 2),
            '!' | '<' | '>' => self.symbol(start, 1),
            '&' if next == '&' => self.symbol(start, 2),
            '|' if next == '|' => self.symbol(start, 2),
            '"' => self.read_string(),
            '`' => self.read_raw_string(),
            '\x00' if self.at_end(start) => Ok(Token(
                TokenKind::Eof,
                self.span(self.line, self.col, start, start),
            )),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' => self.read_ident(),
            _ => Err(self.error(self.line, self.col, "invalid character")),
        }
    }
}
