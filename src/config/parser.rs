use std::fmt;

use crate::config::lexer::{Lexer, Loc, Token, TokenKind};
use crate::config::types::{RouteConfig, ServerConfig, default_methods};

#[derive(Debug)]
pub enum ConfigError {
    Lex(String),
    UnexpectedEof { expected: &'static str },
    Unexpected { expected: &'static str, found: Token },
    BadNumber { value: String, loc: Loc },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Lex(msg) => write!(f, "config: {msg}"),
            ConfigError::UnexpectedEof { expected } => {
                write!(f, "config: expected {expected}, found end of file")
            }
            ConfigError::Unexpected { expected, found } => write!(
                f,
                "config: expected {expected}, found {} at {}",
                found.kind, found.loc
            ),
            ConfigError::BadNumber { value, loc } => {
                write!(f, "config: invalid number '{value}' at {loc}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_word(&mut self, expected: &'static str) -> Result<String, ConfigError> {
        match self.bump() {
            Some(Token {
                kind: TokenKind::Word(w),
                ..
            }) => Ok(w),
            Some(tok) => Err(ConfigError::Unexpected { expected, found: tok }),
            None => Err(ConfigError::UnexpectedEof { expected }),
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), ConfigError> {
        match self.bump() {
            Some(tok) if tok.kind == kind => Ok(()),
            Some(tok) => Err(ConfigError::Unexpected { expected, found: tok }),
            None => Err(ConfigError::UnexpectedEof { expected }),
        }
    }

    fn at_kind(&self, kind: &TokenKind) -> bool {
        matches!(self.peek(), Some(t) if &t.kind == kind)
    }

    fn word_list_until_semicolon(&mut self) -> Result<Vec<String>, ConfigError> {
        let mut out = Vec::new();
        while !self.at_kind(&TokenKind::Semicolon) {
            out.push(self.expect_word("directive argument")?);
        }
        Ok(out)
    }

    fn skip_to_semicolon(&mut self) {
        while let Some(tok) = self.peek() {
            if tok.kind == TokenKind::Semicolon {
                break;
            }
            self.pos += 1;
        }
    }
}

fn parse_u16(value: &str, loc: Loc) -> Result<u16, ConfigError> {
    value.parse().map_err(|_| ConfigError::BadNumber {
        value: value.to_string(),
        loc,
    })
}

fn parse_usize(value: &str, loc: Loc) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::BadNumber {
        value: value.to_string(),
        loc,
    })
}

fn parse_location_block(p: &mut Parser) -> Result<RouteConfig, ConfigError> {
    let path = p.expect_word("location path")?;
    p.expect_kind(TokenKind::LBrace, "'{' after location path")?;

    let mut route = RouteConfig::new(path);

    while !p.at_kind(&TokenKind::RBrace) {
        let loc = p.peek().map(|t| t.loc).unwrap_or(Loc { line: 0, col: 0 });
        let key = p.expect_word("directive name")?;
        match key.as_str() {
            "root" => route.root = Some(p.expect_word("root path")?),
            "index" => route.index = Some(p.expect_word("index filename")?),
            "autoindex" => {
                let v = p.expect_word("'on' or 'off'")?;
                route.autoindex = Some(v == "on");
            }
            "upload_dir" => route.upload_dir = Some(p.expect_word("upload directory")?),
            "methods" => route.methods = Some(p.word_list_until_semicolon()?),
            "cgi_ext" => route.cgi_ext = Some(p.word_list_until_semicolon()?),
            "client_max_body_size" => {
                let v = p.expect_word("byte count")?;
                route.max_body_size = Some(parse_usize(&v, loc)?);
            }
            "return" => {
                let code = p.expect_word("redirect status code")?;
                let target = p.expect_word("redirect target")?;
                route.redirect = Some((parse_u16(&code, loc)?, target));
            }
            _ => p.skip_to_semicolon(),
        }
        if p.at_kind(&TokenKind::Semicolon) {
            p.bump();
        }
    }
    p.expect_kind(TokenKind::RBrace, "'}' closing location block")?;
    Ok(route)
}

fn parse_server_block(p: &mut Parser) -> Result<ServerConfig, ConfigError> {
    p.expect_kind(TokenKind::LBrace, "'{' after server")?;

    let mut config = ServerConfig::default();

    while !p.at_kind(&TokenKind::RBrace) {
        let loc = p.peek().map(|t| t.loc).unwrap_or(Loc { line: 0, col: 0 });
        let key = p.expect_word("directive name")?;
        match key.as_str() {
            "listen" => {
                let v = p.expect_word("port number")?;
                config.listen = parse_u16(&v, loc)?;
            }
            "server_name" => config.server_name = p.expect_word("server name")?,
            "root" => config.root = p.expect_word("root path")?,
            "index" => config.index = p.expect_word("index filename")?,
            "autoindex" => {
                let v = p.expect_word("'on' or 'off'")?;
                config.autoindex = v == "on";
            }
            "upload_dir" => config.upload_dir = p.expect_word("upload directory")?,
            "methods" => config.methods = p.word_list_until_semicolon()?,
            "cgi_ext" => config.cgi_ext = p.word_list_until_semicolon()?,
            "client_max_body_size" => {
                let v = p.expect_word("byte count")?;
                config.max_body_size = parse_usize(&v, loc)?;
            }
            "error_page" => {
                let code = p.expect_word("status code")?;
                let path = p.expect_word("error page path")?;
                config.error_pages.insert(parse_u16(&code, loc)?, path);
            }
            "location" => {
                let route = parse_location_block(p)?;
                config.routes.push(route);
                continue;
            }
            _ => p.skip_to_semicolon(),
        }
        if p.at_kind(&TokenKind::Semicolon) {
            p.bump();
        }
    }
    p.expect_kind(TokenKind::RBrace, "'}' closing server block")?;

    if config.methods.is_empty() {
        config.methods = default_methods();
    }
    Ok(config)
}

/// Parses the brace-delimited configuration grammar into zero or more
/// server blocks. An empty or all-comment input yields a single default
/// server block, matching the reference implementation's fallback.
pub fn parse_config(source: &str) -> Result<Vec<ServerConfig>, ConfigError> {
    let tokens = Lexer::new(source)
        .tokenize()
        .map_err(ConfigError::Lex)?;
    let mut p = Parser { tokens, pos: 0 };

    let mut servers = Vec::new();
    while p.peek().is_some() {
        match p.bump() {
            Some(Token {
                kind: TokenKind::Word(w),
                ..
            }) if w == "server" => {
                servers.push(parse_server_block(&mut p)?);
            }
            _ => continue,
        }
    }

    if servers.is_empty() {
        servers.push(ServerConfig::default());
    }
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_server() {
        let cfg = parse_config("server { listen 9100; server_name x; }").unwrap();
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg[0].listen, 9100);
        assert_eq!(cfg[0].server_name, "x");
        assert_eq!(cfg[0].root, "./www");
    }

    #[test]
    fn parses_location_block_with_overrides() {
        let src = r#"
            server {
                listen 8080;
                location /cgi {
                    cgi_ext .sh .py;
                    autoindex off;
                }
            }
        "#;
        let cfg = parse_config(src).unwrap();
        let route = &cfg[0].routes[0];
        assert_eq!(route.path, "/cgi");
        assert_eq!(route.cgi_ext.as_ref().unwrap(), &vec![".sh".to_string(), ".py".to_string()]);
        assert_eq!(route.autoindex, Some(false));
    }

    #[test]
    fn empty_input_yields_default_server() {
        let cfg = parse_config("# just a comment\n").unwrap();
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg[0].listen, DEFAULT_PORT_FOR_TEST);
    }

    const DEFAULT_PORT_FOR_TEST: u16 = 8080;

    #[test]
    fn unknown_directive_is_skipped_leniently() {
        let cfg = parse_config("server { fake_directive 1; listen 7000; }").unwrap();
        assert_eq!(cfg[0].listen, 7000);
    }

    #[test]
    fn rejects_missing_brace() {
        let err = parse_config("server listen 8080; }").unwrap_err();
        assert!(matches!(err, ConfigError::Unexpected { .. }));
    }

    #[test]
    fn parses_multiple_servers() {
        let src = "server { listen 8080; } server { listen 9090; }";
        let cfg = parse_config(src).unwrap();
        assert_eq!(cfg.len(), 2);
        assert_eq!(cfg[1].listen, 9090);
    }
}
