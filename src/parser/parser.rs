use std::rc::Rc;

use crate::{
    ast::{
        ast::{File, Package},
        scope::{Scope, ScopeRef},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    Position,
};

use super::expr::parse_top_declaration;

/// The main parser structure that maintains parsing state.
///
/// This struct holds the token stream, tracks the current position in it,
/// and carries the two scope cursors used while building the symbol table:
/// the current lexical scope, and the nearest enclosing declaration scope
/// (file or function) that new `decl` symbols are hoisted into.
pub struct Parser {
    tokens: Vec<Token>,
    pos: i32,
    file: Rc<String>,
    scope: ScopeRef,
    decl_scope: ScopeRef,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: Rc<String>, scope: ScopeRef) -> Self {
        Parser {
            tokens,
            pos: 0,
            file,
            decl_scope: Rc::clone(&scope),
            scope,
        }
    }

    /// Returns the current token without advancing.
    pub fn current_token(&self) -> &Token {
        self.tokens.get(self.pos as usize).unwrap()
    }

    /// Returns the kind of the current token.
    pub fn current_token_kind(&self) -> TokenKind {
        self.tokens.get(self.pos as usize).unwrap().kind
    }

    /// Advances to the next token and returns the previous token.
    pub fn advance(&mut self) -> &Token {
        self.pos += 1;
        self.tokens.get((self.pos - 1) as usize).unwrap()
    }

    /// Expects a token of the specified kind, with optional custom error.
    pub fn expect_error(
        &mut self,
        expected_kind: TokenKind,
        error: Option<Error>,
    ) -> Result<Token, Error> {
        let token = self.current_token();
        let kind = token.kind;
        if kind != expected_kind {
            match error {
                Some(error) => Err(error),
                None => Err(Error::new(
                    ErrorImpl::UnexpectedToken {
                        token: token.value.clone(),
                    },
                    token.span.start.clone(),
                )),
            }
        } else {
            Ok(self.advance().clone())
        }
    }

    /// Expects a token of the specified kind with the default error message.
    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, Error> {
        self.expect_error(expected_kind, None)
    }

    /// Checks if there are more tokens to parse.
    pub fn has_tokens(&self) -> bool {
        self.pos + 1 < self.tokens.len() as i32 && self.current_token_kind() != TokenKind::EOF
    }

    /// Returns the source position of the current token.
    pub fn get_position(&self) -> Position {
        self.current_token().span.start.clone()
    }

    pub fn file(&self) -> Rc<String> {
        Rc::clone(&self.file)
    }

    pub fn scope(&self) -> ScopeRef {
        Rc::clone(&self.scope)
    }

    pub fn set_scope(&mut self, scope: ScopeRef) {
        self.scope = scope;
    }

    pub fn decl_scope(&self) -> ScopeRef {
        Rc::clone(&self.decl_scope)
    }

    pub fn set_decl_scope(&mut self, scope: ScopeRef) {
        self.decl_scope = scope;
    }
}

/// Parses one source file into a [`File`] with a fresh top-level scope.
pub fn parse_file(tokens: Vec<Token>, file: Rc<String>) -> Result<File, Error> {
    let scope = Scope::root();
    parse_file_in_scope(tokens, file, &scope)
}

/// Parses one source file into an existing top-level scope.
///
/// Used for packages, where several files share one scope.
pub fn parse_file_in_scope(
    tokens: Vec<Token>,
    file: Rc<String>,
    scope: &ScopeRef,
) -> Result<File, Error> {
    let mut parser = Parser::new(tokens, file, Rc::clone(scope));

    let mut body = vec![];
    while parser.has_tokens() {
        body.push(parse_top_declaration(&mut parser)?);
    }

    Ok(File {
        body,
        scope: Rc::clone(scope),
    })
}

/// Parses several files as one package sharing a single top-level scope.
pub fn parse_package(files: Vec<(Rc<String>, Vec<Token>)>) -> Result<Package, Error> {
    let scope = Scope::root();

    let mut parsed = vec![];
    for (file, tokens) in files {
        parsed.push(parse_file_in_scope(tokens, file, &scope)?);
    }

    Ok(Package {
        files: parsed,
        scope,
    })
}
