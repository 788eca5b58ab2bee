//! Unit tests for the lexer module.
//!
//! This module contains tests for tokenization including:
//! - Keywords and identifiers
//! - Integer literals
//! - Operators and parentheses
//! - Comments
//! - Error cases

use super::{lexer::tokenize, tokens::TokenKind};

#[test]
fn test_tokenize_keywords() {
    let source = "decl var if int".to_string();
    let tokens = tokenize(source, Some("test.ab".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Decl);
    assert_eq!(tokens[1].kind, TokenKind::Var);
    assert_eq!(tokens[2].kind, TokenKind::If);
    assert_eq!(tokens[3].kind, TokenKind::Int);
    assert_eq!(tokens[4].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_identifiers() {
    let source = "foo bar baz_123 _underscore ifx".to_string();
    let tokens = tokenize(source, Some("test.ab".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].value, "foo");
    assert_eq!(tokens[1].kind, TokenKind::Identifier);
    assert_eq!(tokens[1].value, "bar");
    assert_eq!(tokens[2].kind, TokenKind::Identifier);
    assert_eq!(tokens[2].value, "baz_123");
    assert_eq!(tokens[3].kind, TokenKind::Identifier);
    assert_eq!(tokens[3].value, "_underscore");
    // A keyword prefix does not make an identifier a keyword.
    assert_eq!(tokens[4].kind, TokenKind::Identifier);
    assert_eq!(tokens[4].value, "ifx");
    assert_eq!(tokens[5].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_numbers() {
    let source = "42 0 100".to_string();
    let tokens = tokenize(source, Some("test.ab".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[1].kind, TokenKind::Number);
    assert_eq!(tokens[1].value, "0");
    assert_eq!(tokens[2].kind, TokenKind::Number);
    assert_eq!(tokens[2].value, "100");
    assert_eq!(tokens[3].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_operators() {
    let source = "+ - * / % & | == != < <= > >= =".to_string();
    let tokens = tokenize(source, Some("test.ab".to_string())).unwrap();

    let expected = [
        TokenKind::Plus,
        TokenKind::Dash,
        TokenKind::Star,
        TokenKind::Slash,
        TokenKind::Percent,
        TokenKind::And,
        TokenKind::Or,
        TokenKind::Equals,
        TokenKind::NotEquals,
        TokenKind::Less,
        TokenKind::LessEquals,
        TokenKind::Greater,
        TokenKind::GreaterEquals,
        TokenKind::Assignment,
    ];

    for (i, kind) in expected.iter().enumerate() {
        assert_eq!(tokens[i].kind, *kind);
    }
    assert_eq!(tokens[expected.len()].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_parens() {
    let source = "(+ 1 2)".to_string();
    let tokens = tokenize(source, Some("test.ab".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::OpenParen);
    assert_eq!(tokens[1].kind, TokenKind::Plus);
    assert_eq!(tokens[2].kind, TokenKind::Number);
    assert_eq!(tokens[3].kind, TokenKind::Number);
    assert_eq!(tokens[4].kind, TokenKind::CloseParen);
    assert_eq!(tokens[5].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_comments() {
    let source = "; a whole line comment\n42 ; trailing comment\n".to_string();
    let tokens = tokenize(source, Some("test.ab".to_string())).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[1].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_positions() {
    let source = "(decl main".to_string();
    let tokens = tokenize(source, Some("test.ab".to_string())).unwrap();

    assert_eq!(tokens[0].span.start.0, 0);
    assert_eq!(tokens[1].span.start.0, 1);
    assert_eq!(tokens[2].span.start.0, 6);
    assert_eq!(*tokens[2].span.start.1, "test.ab");
}

#[test]
fn test_tokenize_unrecognised_token() {
    let source = "(+ 1 #)".to_string();
    let result = tokenize(source, Some("test.ab".to_string()));

    assert!(result.is_err());
    assert_eq!(result.err().unwrap().get_error_name(), "UnrecognisedToken");
}
