use std::collections::HashMap;
use std::fmt;

use regex::Regex;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Identifier(String),
    Str(String),
    Number(f64),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub ty: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub what: String,
    pub line: usize,
    pub col: i64,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at line={},col={}", self.what, self.line, self.col)
    }
}

pub fn scan_tokens(input: String) -> Result<Vec<Token>, Error> {
    let mut scanner = Scanner {
        source: input,
        position: 0,
        line: 1,
        col: 1,
    };
    scanner.scan()
}

struct Scanner {
    source: String,
    position: usize,
    line: usize,
    col: i64,
}

type Handler = Box<dyn Fn(&str) -> Option<(TokenType, Option<Literal>)>>;

impl Scanner {
    fn scan(&mut self) -> Result<Vec<Token>, Error> {
        let keywords: HashMap<&str, TokenType> = vec![
            ("and", TokenType::And),
            ("class", TokenType::Class),
            ("else", TokenType::Else),
            ("false", TokenType::False),
            ("fun", TokenType::Fun),
            ("for", TokenType::For),
            ("if", TokenType::If),
            ("nil", TokenType::Nil),
            ("or", TokenType::Or),
            ("print", TokenType::Print),
            ("return", TokenType::Return),
            ("super", TokenType::Super),
            ("this", TokenType::This),
            ("true", TokenType::True),
            ("var", TokenType::Var),
            ("while", TokenType::While),
        ]
        .into_iter()
        .collect();

        // Tried in order: earlier patterns win, which keeps `<=` from
        // scanning as `<` `=` and comments from scanning as two slashes.
        let patterns: Vec<(Regex, Handler)> = vec![
            (Regex::new(r"^[ \t\r\n]+").unwrap(), Box::new(|_| None)),
            (Regex::new(r"^//[^\n]*").unwrap(), Box::new(|_| None)),
            (
                Regex::new(r#"^"[^"]*""#).unwrap(),
                Box::new(|s: &str| {
                    Some((
                        TokenType::String,
                        Some(Literal::Str(s[1..s.len() - 1].to_string())),
                    ))
                }),
            ),
            (
                Regex::new(r"^[0-9]+(\.[0-9]+)?").unwrap(),
                Box::new(|s: &str| {
                    Some((TokenType::Number, Some(Literal::Number(s.parse().unwrap()))))
                }),
            ),
            (
                Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap(),
                Box::new(move |s: &str| match keywords.get(s) {
                    Some(ty) => Some((*ty, None)),
                    None => Some((
                        TokenType::Identifier,
                        Some(Literal::Identifier(s.to_string())),
                    )),
                }),
            ),
            (
                Regex::new(r"^(!=|==|<=|>=)").unwrap(),
                Box::new(|s: &str| {
                    let ty = match s {
                        "!=" => TokenType::BangEqual,
                        "==" => TokenType::EqualEqual,
                        "<=" => TokenType::LessEqual,
                        ">=" => TokenType::GreaterEqual,
                        _ => panic!("internal error in scanner: unexpected two-char operator {:?}", s),
                    };
                    Some((ty, None))
                }),
            ),
            (
                Regex::new(r"^[(){},.\-+;*/<>=!]").unwrap(),
                Box::new(|s: &str| Some((Scanner::single_char_type(s), None))),
            ),
        ];

        let mut tokens = Vec::new();

        while self.position < self.source.len() {
            let remaining = &self.source[self.position..];
            let mut matched = false;

            for (regex, handler) in &patterns {
                if let Some(mat) = regex.find(remaining) {
                    matched = true;
                    let match_str = mat.as_str();
                    let token_line = self.line;
                    let token_col = self.col;

                    self.position += mat.end();
                    for ch in match_str.chars() {
                        if ch == '\n' {
                            self.line += 1;
                            self.col = 1;
                        } else {
                            self.col += 1;
                        }
                    }

                    if let Some((ty, literal)) = handler(match_str) {
                        tokens.push(Token {
                            ty,
                            lexeme: match_str.to_string(),
                            literal,
                            line: token_line,
                            col: token_col,
                        });
                    }
                    break;
                }
            }

            if !matched {
                let remaining = &self.source[self.position..];
                let what = if remaining.starts_with('"') {
                    "Unterminated string.".to_string()
                } else {
                    format!(
                        "Unexpected character '{}'.",
                        remaining.chars().next().unwrap()
                    )
                };
                return Err(Error {
                    what,
                    line: self.line,
                    col: self.col,
                });
            }
        }

        tokens.push(Token {
            ty: TokenType::Eof,
            lexeme: String::new(),
            literal: None,
            line: self.line,
            col: self.col,
        });
        Ok(tokens)
    }

    fn single_char_type(s: &str) -> TokenType {
        match s {
            "(" => TokenType::LeftParen,
            ")" => TokenType::RightParen,
            "{" => TokenType::LeftBrace,
            "}" => TokenType::RightBrace,
            "," => TokenType::Comma,
            "." => TokenType::Dot,
            "-" => TokenType::Minus,
            "+" => TokenType::Plus,
            ";" => TokenType::Semicolon,
            "*" => TokenType::Star,
            "/" => TokenType::Slash,
            "<" => TokenType::Less,
            ">" => TokenType::Greater,
            "=" => TokenType::Equal,
            "!" => TokenType::Bang,
            _ => panic!("internal error in scanner: unexpected single-char token {:?}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::scanner::*;

    fn token_types(input: &str) -> Vec<TokenType> {
        scan_tokens(input.to_string())
            .unwrap()
            .iter()
            .map(|tok| tok.ty)
            .collect()
    }

    #[test]
    fn test_scans_declaration() {
        assert_eq!(
            token_types("var x = 1.5;"),
            vec![
                TokenType::Var,
                TokenType::Identifier,
                TokenType::Equal,
                TokenType::Number,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_scans_two_char_operators() {
        assert_eq!(
            token_types("a <= b != c;"),
            vec![
                TokenType::Identifier,
                TokenType::LessEqual,
                TokenType::Identifier,
                TokenType::BangEqual,
                TokenType::Identifier,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_not_identifier_prefixes() {
        let tokens = scan_tokens("orchid or android".to_string()).unwrap();
        assert_eq!(
            tokens.iter().map(|tok| tok.ty).collect::<Vec<_>>(),
            vec![
                TokenType::Identifier,
                TokenType::Or,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            token_types("// nothing to see\nprint 1;"),
            vec![
                TokenType::Print,
                TokenType::Number,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal_and_line_tracking() {
        let tokens = scan_tokens("\"one\ntwo\"\nx".to_string()).unwrap();
        match &tokens[0].literal {
            Some(Literal::Str(s)) => assert_eq!(s, "one\ntwo"),
            _ => panic!("expected string literal"),
        }
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = scan_tokens("\"no closing quote".to_string()).unwrap_err();
        assert!(err.what.starts_with("Unterminated string"));
    }

    #[test]
    fn test_unexpected_character_is_error() {
        let err = scan_tokens("var x = @;".to_string()).unwrap_err();
        assert!(err.what.starts_with("Unexpected character"));
        assert_eq!(err.line, 1);
        assert_eq!(err.col, 9);
    }
}
