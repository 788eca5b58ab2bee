use std::rc::Rc;

use regex::Regex;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, RESERVED_LOOKUP};

pub type RegexHandler = fn(&mut Lexer, Regex);

#[derive(Clone)]
pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

#[derive(Clone)]
pub struct Lexer {
    patterns: Vec<RegexPattern>,
    tokens: Vec<Token>,
    source: String,
    pos: i32,
    file: Rc<String>,
}

impl Lexer {
    pub fn new(source: String, file: Option<String>) -> Lexer {
        let file_name = if let Some(file) = file {
            Rc::new(file)
        } else {
            Rc::new(String::from("shell"))
        };

        // Order matters: two-character operators must be tried before their
        // one-character prefixes.
        Lexer {
            pos: 0,
            tokens: vec![],
            patterns: vec![
                RegexPattern { regex: Regex::new("[a-zA-Z_][a-zA-Z0-9_]*").unwrap(), handler: symbol_handler },
                RegexPattern { regex: Regex::new("[0-9]+").unwrap(), handler: number_handler },
                RegexPattern { regex: Regex::new("\\s+").unwrap(), handler: skip_handler },
                RegexPattern { regex: Regex::new(";.*").unwrap(), handler: skip_handler },
                RegexPattern { regex: Regex::new("\\(").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(") },
                RegexPattern { regex: Regex::new("\\)").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")") },
                RegexPattern { regex: Regex::new("==").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Equals, "==") },
                RegexPattern { regex: Regex::new("!=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=") },
                RegexPattern { regex: Regex::new("=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=") },
                RegexPattern { regex: Regex::new("<=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=") },
                RegexPattern { regex: Regex::new("<").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Less, "<") },
                RegexPattern { regex: Regex::new(">=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=") },
                RegexPattern { regex: Regex::new(">").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Greater, ">") },
                RegexPattern { regex: Regex::new("&").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::And, "&") },
                RegexPattern { regex: Regex::new("\\|").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Or, "|") },
                RegexPattern { regex: Regex::new("\\+").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Plus, "+") },
                RegexPattern { regex: Regex::new("-").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Dash, "-") },
                RegexPattern { regex: Regex::new("\\*").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Star, "*") },
                RegexPattern { regex: Regex::new("/").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Slash, "/") },
                RegexPattern { regex: Regex::new("%").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Percent, "%") },
            ],
            source,
            file: file_name,
        }
    }

    pub fn advance_n(&mut self, n: i32) {
        self.pos += n;
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn at(&self) -> char {
        self.source.as_bytes()[self.pos as usize] as char
    }

    pub fn remainder(&self) -> &str {
        &self.source[(self.pos as usize)..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos as usize >= self.source.len()
    }
}

fn number_handler(lexer: &mut Lexer, regex: Regex) {
    let matched = regex.find(lexer.remainder()).unwrap().as_str().to_string();

    lexer.push(MK_TOKEN!(
        TokenKind::Number,
        matched.clone(),
        Span {
            start: Position(lexer.pos as u32, Rc::clone(&lexer.file)),
            end: Position(
                (lexer.pos + matched.len() as i32) as u32,
                Rc::clone(&lexer.file)
            ),
        }
    ));
    lexer.advance_n(matched.len() as i32);
}

fn skip_handler(lexer: &mut Lexer, regex: Regex) {
    let matched = regex.find(lexer.remainder()).unwrap().end();
    lexer.advance_n(matched as i32);
}

fn symbol_handler(lexer: &mut Lexer, regex: Regex) {
    let value = regex.find(lexer.remainder()).unwrap().as_str().to_string();

    let span = Span {
        start: Position(lexer.pos as u32, Rc::clone(&lexer.file)),
        end: Position(
            (lexer.pos + value.len() as i32) as u32,
            Rc::clone(&lexer.file),
        ),
    };

    if let Some(kind) = RESERVED_LOOKUP.get(value.as_str()) {
        lexer.push(MK_TOKEN!(*kind, value.clone(), span));
    } else {
        lexer.push(MK_TOKEN!(TokenKind::Identifier, value.clone(), span));
    }

    lexer.advance_n(value.len() as i32);
}

pub fn tokenize(source: String, file: Option<String>) -> Result<Vec<Token>, Error> {
    let mut lex = Lexer::new(source, file);
    let patterns = lex.patterns.clone();

    while !lex.at_eof() {
        let mut matched = false;

        for pattern in patterns.iter() {
            let match_here = pattern.regex.find(lex.remainder());

            if match_here.is_some() && match_here.unwrap().start() == 0 {
                (pattern.handler)(&mut lex, pattern.regex.clone());
                matched = true;
                break;
            }
        }

        if !matched {
            return Err(Error::new(
                ErrorImpl::UnrecognisedToken {
                    token: lex.at().to_string(),
                },
                Position(lex.pos as u32, Rc::clone(&lex.file)),
            ));
        }
    }

    lex.push(MK_TOKEN!(
        TokenKind::EOF,
        String::from("EOF"),
        Span {
            start: Position(lex.pos as u32, Rc::clone(&lex.file)),
            end: Position(lex.pos as u32, Rc::clone(&lex.file)),
        }
    ));
    Ok(lex.tokens)
}
