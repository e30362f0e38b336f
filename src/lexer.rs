//! Scanner for the specification language.
//!
//! The surface syntax is small: `%`-keywords before `%%`, rules after.
//!
//! %term addr
//! %head {: use crate::ir::*; :}
//! %%
//! e : ADD(x:e, y:e) [1] {: x + y :}     -- comments run to end of line
//!
//! Code fragments `{: ... :}` are captured verbatim (they may span lines)
//! and never inspected. Identifiers start with an ASCII letter; the leading
//! underscore namespace is reserved for auxiliary nonterminals minted
//! during normalisation, so user ids can never collide with them.

use smol_str::SmolStr;

use crate::error::BurgError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(SmolStr),
    Int(i64),
    Str(String),
    Char(char),
    /// the verbatim interior of a `{: ... :}` block
    Code(String),
    KwTerm,
    KwHead,
    KwTail,
    KwType,
    /// `%%`
    Separator,
    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: u32,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, BurgError> {
    Lexer::new(src).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn err(&self, msg: impl Into<String>) -> BurgError {
        BurgError::Syntax {
            line: self.line,
            msg: msg.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, BurgError> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            let Some(ch) = self.peek() else { break };
            let tok = match ch {
                '%' => self.lex_keyword()?,
                '{' if self.peek2() == Some(':') => self.lex_code()?,
                '"' => self.lex_string()?,
                '\'' => self.lex_char()?,
                ':' => {
                    self.bump();
                    Tok::Colon
                }
                ',' => {
                    self.bump();
                    Tok::Comma
                }
                '(' => {
                    self.bump();
                    Tok::LParen
                }
                ')' => {
                    self.bump();
                    Tok::RParen
                }
                '[' => {
                    self.bump();
                    Tok::LBracket
                }
                ']' => {
                    self.bump();
                    Tok::RBracket
                }
                _ if ch.is_ascii_digit() => self.lex_int()?,
                _ if ch.is_ascii_alphabetic() => self.lex_ident(),
                _ => return Err(self.err(format!("unexpected character '{ch}'"))),
            };
            out.push(Token { tok, line });
        }
        Ok(out)
    }

    /// whitespace and `--` comments
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') if self.peek2() == Some('-') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_keyword(&mut self) -> Result<Tok, BurgError> {
        self.bump(); // '%'
        if self.peek() == Some('%') {
            self.bump();
            return Ok(Tok::Separator);
        }
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match word.as_str() {
            "term" => Ok(Tok::KwTerm),
            "head" => Ok(Tok::KwHead),
            "tail" => Ok(Tok::KwTail),
            "type" => Ok(Tok::KwType),
            _ => Err(self.err(format!("unknown declaration '%{word}'"))),
        }
    }

    fn lex_code(&mut self) -> Result<Tok, BurgError> {
        let start_line = self.line;
        self.bump(); // '{'
        self.bump(); // ':'
        let mut body = String::new();
        loop {
            match self.peek() {
                Some(':') if self.peek2() == Some('}') => {
                    self.bump();
                    self.bump();
                    return Ok(Tok::Code(body.trim().to_string()));
                }
                Some(_) => body.push(self.bump().unwrap()),
                None => {
                    return Err(BurgError::Syntax {
                        line: start_line,
                        msg: "unterminated {: ... :} block".into(),
                    })
                }
            }
        }
    }

    fn lex_escape(&mut self) -> Result<char, BurgError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('\\') => Ok('\\'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some(c) => Err(self.err(format!("unknown escape '\\{c}'"))),
            None => Err(self.err("unterminated escape")),
        }
    }

    fn lex_string(&mut self) -> Result<Tok, BurgError> {
        let start_line = self.line;
        self.bump(); // '"'
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Tok::Str(s)),
                Some('\\') => s.push(self.lex_escape()?),
                Some('\n') | None => {
                    return Err(BurgError::Syntax {
                        line: start_line,
                        msg: "unterminated string literal".into(),
                    })
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn lex_char(&mut self) -> Result<Tok, BurgError> {
        self.bump(); // '\''
        let ch = match self.bump() {
            Some('\\') => self.lex_escape()?,
            Some('\'') | None => return Err(self.err("empty character literal")),
            Some(c) => c,
        };
        match self.bump() {
            Some('\'') => Ok(Tok::Char(ch)),
            _ => Err(self.err("unterminated character literal")),
        }
    }

    fn lex_int(&mut self) -> Result<Tok, BurgError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        digits
            .parse::<i64>()
            .map(Tok::Int)
            .map_err(|_| self.err(format!("integer literal '{digits}' out of range")))
    }

    fn lex_ident(&mut self) -> Tok {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '\'' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Tok::Ident(SmolStr::new(name))
    }
}
