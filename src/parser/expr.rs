use std::rc::Rc;

use crate::{
    ast::{
        ast::{
            AssignExpr, BinOp, BinaryExpr, CallExpr, DeclExpr, Expr, ExprList, Ident, IfExpr,
            Literal, VarExpr,
        },
        scope::{Scope, Symbol},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    Span,
};

use super::parser::Parser;

/// Parses one top-level form, which must be a declaration.
pub fn parse_top_declaration(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.current_token().clone();
    let expr = parse_expr(parser)?;

    match expr {
        Expr::Decl(_) => Ok(expr),
        _ => Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: start.value.clone(),
                message: String::from("expected a declaration at top level"),
            },
            start.span.start,
        )),
    }
}

pub fn parse_expr(parser: &mut Parser) -> Result<Expr, Error> {
    match parser.current_token_kind() {
        TokenKind::Number => {
            let token = parser.advance().clone();
            let value = token.value.parse();

            match value {
                Ok(value) => Ok(Expr::Literal(Literal {
                    value,
                    span: token.span,
                })),
                Err(_) => Err(Error::new(
                    ErrorImpl::NumberParseError {
                        token: token.value.clone(),
                    },
                    token.span.start,
                )),
            }
        }
        TokenKind::Identifier => {
            let token = parser.advance().clone();
            Ok(Expr::Ident(ident_from(&token)))
        }
        TokenKind::OpenParen => parse_form(parser),
        _ => {
            let token = parser.current_token();
            Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: token.value.clone(),
                },
                token.span.start.clone(),
            ))
        }
    }
}

/// Parses a parenthesized form, dispatching on the token after `(`.
fn parse_form(parser: &mut Parser) -> Result<Expr, Error> {
    let open = parser.expect(TokenKind::OpenParen)?;

    match parser.current_token_kind() {
        TokenKind::Decl => parse_decl(parser, open),
        TokenKind::Var => parse_var(parser, open),
        TokenKind::If => parse_if(parser, open),
        TokenKind::Assignment => Ok(Expr::Assign(parse_assign(parser, open)?)),
        TokenKind::Identifier => parse_call(parser, open),
        kind if binop_for(kind).is_some() => parse_binary(parser, open),
        _ => {
            let token = parser.current_token();
            Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: token.value.clone(),
                },
                token.span.start.clone(),
            ))
        }
    }
}

fn parse_decl(parser: &mut Parser, open: Token) -> Result<Expr, Error> {
    parser.advance(); // decl

    // Prototype: a bare name, or a parenthesized name-plus-parameters list.
    let (name, params) = match parser.current_token_kind() {
        TokenKind::Identifier => (ident_from(&parser.advance().clone()), vec![]),
        TokenKind::OpenParen => {
            parser.advance();
            let name = ident_from(&parser.expect(TokenKind::Identifier)?);

            let mut params = vec![];
            while parser.current_token_kind() == TokenKind::Identifier {
                params.push(ident_from(&parser.advance().clone()));
            }
            parser.expect(TokenKind::CloseParen)?;

            (name, params)
        }
        _ => {
            let token = parser.current_token();
            return Err(Error::new(
                ErrorImpl::UnexpectedTokenDetailed {
                    token: token.value.clone(),
                    message: String::from("expected a function name or prototype"),
                },
                token.span.start.clone(),
            ));
        }
    };

    // An identifier directly after the prototype is always the return type
    // annotation; the body proper starts with the first non-identifier form.
    let ret = parse_type_annotation(parser);

    let scope = Scope::nested(&parser.scope());
    for param in &params {
        // Parameters are implicitly int, the language's only value type.
        scope.borrow_mut().declare(Symbol::variable(
            param.name.clone(),
            Some(Type::Int),
            param.span.start.clone(),
        ))?;
    }

    let outer_scope = parser.scope();
    let outer_decl_scope = parser.decl_scope();
    parser.set_scope(Rc::clone(&scope));
    parser.set_decl_scope(Rc::clone(&scope));

    let mut body = vec![];
    while parser.has_tokens() && parser.current_token_kind() != TokenKind::CloseParen {
        let expr = parse_expr(parser);
        match expr {
            Ok(expr) => body.push(expr),
            Err(error) => {
                parser.set_scope(outer_scope);
                parser.set_decl_scope(outer_decl_scope);
                return Err(error);
            }
        }
    }

    parser.set_scope(outer_scope);
    parser.set_decl_scope(outer_decl_scope);

    let close = parser.expect(TokenKind::CloseParen)?;

    if body.is_empty() {
        return Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: close.value.clone(),
                message: String::from("declaration requires a body"),
            },
            close.span.start,
        ));
    }

    let span = span_between(&open, &close);
    let body = collapse_body(body, &span);

    let decl = Rc::new(DeclExpr {
        name: name.clone(),
        params,
        ret: ret.clone(),
        body: Box::new(body),
        scope,
        span,
    });

    parser.decl_scope().borrow_mut().declare(Symbol::function(
        name.name.clone(),
        ret,
        Rc::clone(&decl),
        name.span.start.clone(),
    ))?;

    Ok(Expr::Decl(decl))
}

fn parse_var(parser: &mut Parser, open: Token) -> Result<Expr, Error> {
    parser.advance(); // var

    let (name, init) = match parser.current_token_kind() {
        TokenKind::Identifier => (ident_from(&parser.advance().clone()), None),
        TokenKind::OpenParen => {
            let inner_open = parser.advance().clone();
            if parser.current_token_kind() != TokenKind::Assignment {
                let token = parser.current_token();
                return Err(Error::new(
                    ErrorImpl::UnexpectedTokenDetailed {
                        token: token.value.clone(),
                        message: String::from("a variable initializer must be an assignment"),
                    },
                    token.span.start.clone(),
                ));
            }
            let assign = parse_assign(parser, inner_open)?;
            (assign.name.clone(), Some(assign))
        }
        _ => {
            let token = parser.current_token();
            return Err(Error::new(
                ErrorImpl::UnexpectedTokenDetailed {
                    token: token.value.clone(),
                    message: String::from("expected a variable name or initializer"),
                },
                token.span.start.clone(),
            ));
        }
    };

    let ty = parse_type_annotation(parser);
    let close = parser.expect(TokenKind::CloseParen)?;

    parser.scope().borrow_mut().declare(Symbol::variable(
        name.name.clone(),
        ty.clone(),
        name.span.start.clone(),
    ))?;

    Ok(Expr::Var(VarExpr {
        name,
        ty,
        init,
        span: span_between(&open, &close),
    }))
}

fn parse_if(parser: &mut Parser, open: Token) -> Result<Expr, Error> {
    parser.advance(); // if

    let cond = parse_expr(parser)?;

    // Only the `int` keyword may mark a conditional as value-producing; a
    // bare identifier here would be ambiguous with the then-branch.
    let ty = match parser.current_token_kind() {
        TokenKind::Int => {
            parser.advance();
            Some(Type::Int)
        }
        _ => None,
    };

    let scope = Scope::nested(&parser.scope());
    let outer_scope = parser.scope();
    parser.set_scope(Rc::clone(&scope));

    let then = match parse_expr(parser) {
        Ok(expr) => expr,
        Err(error) => {
            parser.set_scope(outer_scope);
            return Err(error);
        }
    };

    let els = if parser.current_token_kind() != TokenKind::CloseParen {
        match parse_expr(parser) {
            Ok(expr) => Some(Box::new(expr)),
            Err(error) => {
                parser.set_scope(outer_scope);
                return Err(error);
            }
        }
    } else {
        None
    };

    parser.set_scope(outer_scope);

    let close = parser.expect(TokenKind::CloseParen)?;

    Ok(Expr::If(IfExpr {
        cond: Box::new(cond),
        then: Box::new(then),
        els,
        ty,
        scope,
        span: span_between(&open, &close),
    }))
}

fn parse_assign(parser: &mut Parser, open: Token) -> Result<AssignExpr, Error> {
    parser.advance(); // =

    let name = ident_from(&parser.expect(TokenKind::Identifier)?);
    let value = parse_expr(parser)?;
    let close = parser.expect(TokenKind::CloseParen)?;

    Ok(AssignExpr {
        name,
        value: Rc::new(value),
        span: span_between(&open, &close),
    })
}

fn parse_binary(parser: &mut Parser, open: Token) -> Result<Expr, Error> {
    let op_token = parser.advance().clone();
    let op = binop_for(op_token.kind).unwrap();

    let mut operands = vec![];
    while parser.has_tokens() && parser.current_token_kind() != TokenKind::CloseParen {
        operands.push(parse_expr(parser)?);
    }

    if operands.len() < 2 {
        return Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: op_token.value.clone(),
                message: String::from("an operator requires at least two operands"),
            },
            op_token.span.start,
        ));
    }

    let close = parser.expect(TokenKind::CloseParen)?;

    Ok(Expr::Binary(BinaryExpr {
        op,
        operands,
        span: span_between(&open, &close),
    }))
}

fn parse_call(parser: &mut Parser, open: Token) -> Result<Expr, Error> {
    let name = ident_from(&parser.advance().clone());

    let mut args = vec![];
    while parser.has_tokens() && parser.current_token_kind() != TokenKind::CloseParen {
        args.push(parse_expr(parser)?);
    }

    let close = parser.expect(TokenKind::CloseParen)?;

    Ok(Expr::Call(CallExpr {
        name,
        args,
        span: span_between(&open, &close),
    }))
}

/// Parses an optional type annotation: the `int` keyword or a bare
/// identifier naming a (possibly unrecognised) type.
fn parse_type_annotation(parser: &mut Parser) -> Option<Type> {
    match parser.current_token_kind() {
        TokenKind::Int => {
            parser.advance();
            Some(Type::Int)
        }
        TokenKind::Identifier => {
            let token = parser.advance();
            Some(Type::Named(token.value.clone()))
        }
        _ => None,
    }
}

fn binop_for(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::Plus => Some(BinOp::Add),
        TokenKind::Dash => Some(BinOp::Sub),
        TokenKind::Star => Some(BinOp::Mul),
        TokenKind::Slash => Some(BinOp::Div),
        TokenKind::Percent => Some(BinOp::Rem),
        TokenKind::And => Some(BinOp::And),
        TokenKind::Or => Some(BinOp::Or),
        TokenKind::Equals => Some(BinOp::Eq),
        TokenKind::NotEquals => Some(BinOp::Ne),
        TokenKind::Less => Some(BinOp::Lt),
        TokenKind::LessEquals => Some(BinOp::Le),
        TokenKind::Greater => Some(BinOp::Gt),
        TokenKind::GreaterEquals => Some(BinOp::Ge),
        _ => None,
    }
}

fn ident_from(token: &Token) -> Ident {
    Ident {
        name: token.value.clone(),
        span: token.span.clone(),
    }
}

fn span_between(open: &Token, close: &Token) -> Span {
    Span {
        start: open.span.start.clone(),
        end: close.span.end.clone(),
    }
}

fn collapse_body(mut body: Vec<Expr>, span: &Span) -> Expr {
    if body.len() == 1 {
        body.remove(0)
    } else {
        Expr::List(ExprList {
            list: body,
            span: span.clone(),
        })
    }
}
