use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Copy)]
pub struct Loc {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Word(String),
    LBrace,
    RBrace,
    Semicolon,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word(s) => write!(f, "'{s}'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Semicolon => write!(f, "';'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.input.next();
        if let Some(c) = c {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        c
    }

    fn peek(&mut self) -> Option<&char> {
        self.input.peek()
    }

    fn loc(&self) -> Loc {
        Loc {
            line: self.line,
            col: self.col,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.peek() {
            match c {
                '#' => self.skip_comment(),
                w if w.is_whitespace() => {
                    self.advance();
                }
                '{' => {
                    tokens.push(Token {
                        kind: TokenKind::LBrace,
                        loc: self.loc(),
                    });
                    self.advance();
                }
                '}' => {
                    tokens.push(Token {
                        kind: TokenKind::RBrace,
                        loc: self.loc(),
                    });
                    self.advance();
                }
                ';' => {
                    tokens.push(Token {
                        kind: TokenKind::Semicolon,
                        loc: self.loc(),
                    });
                    self.advance();
                }
                '"' | '\'' => tokens.push(self.read_quoted(c)),
                _ => tokens.push(self.read_word()?),
            }
        }

        Ok(tokens)
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_quoted(&mut self, quote: char) -> Token {
        let loc = self.loc();
        self.advance(); // opening quote
        let mut val = String::new();
        while let Some(&c) = self.peek() {
            if c == quote {
                self.advance();
                break;
            }
            val.push(c);
            self.advance();
        }
        Token {
            kind: TokenKind::Word(val),
            loc,
        }
    }

    fn read_word(&mut self) -> Result<Token, String> {
        let loc = self.loc();
        let mut val = String::new();
        while let Some(&c) = self.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | ';' | '#') {
                break;
            }
            val.push(c);
            self.advance();
        }
        if val.is_empty() {
            let c = *self.peek().unwrap();
            return Err(format!("unexpected character '{}' at {}", c, loc));
        }
        Ok(Token {
            kind: TokenKind::Word(val),
            loc,
        })
    }
}
