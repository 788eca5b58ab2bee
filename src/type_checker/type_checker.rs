use std::rc::Rc;

use crate::{
    ast::{
        ast::{AssignExpr, Expr},
        scope::{ScopeRef, SymbolRef},
        types::{type_name, Type},
    },
    errors::errors::{Diagnostics, Error, ErrorImpl},
};

/// Resolves the semantic type of an expression against a scope.
///
/// `Ok(None)` means the type is not known yet (an unassigned, unannotated
/// variable, or a function declared without a return type). Unbound names
/// are the only error case.
pub fn type_of(expr: &Expr, scope: &ScopeRef) -> Result<Option<Type>, Error> {
    match expr {
        Expr::Literal(_) => Ok(Some(Type::Int)),
        Expr::Ident(ident) => {
            let symbol = scope.borrow().lookup(&ident.name);
            match symbol {
                Some(symbol) => Ok(symbol.borrow().ty.clone()),
                None => Err(Error::new(
                    ErrorImpl::UndeclaredVariable {
                        name: ident.name.clone(),
                    },
                    ident.span.start.clone(),
                )),
            }
        }
        Expr::Binary(binary) => {
            // Operator expressions are homogeneous-int; typing the operands
            // surfaces unbound names early.
            for operand in &binary.operands {
                type_of(operand, scope)?;
            }
            Ok(Some(Type::Int))
        }
        Expr::Call(call) => {
            let symbol = scope.borrow().lookup(&call.name.name);
            match symbol {
                Some(symbol) => Ok(symbol.borrow().ty.clone()),
                None => Err(Error::new(
                    ErrorImpl::UndeclaredFunction {
                        name: call.name.name.clone(),
                    },
                    call.name.span.start.clone(),
                )),
            }
        }
        Expr::Assign(assign) => type_of(&assign.value, scope),
        Expr::If(if_expr) => Ok(if_expr.ty.clone()),
        Expr::Var(_) | Expr::List(_) | Expr::Decl(_) => Ok(None),
    }
}

/// Applies the assignment rule and resolves the target symbol.
///
/// A target whose type is still unknown takes the assigned expression's type
/// permanently. A known type must match exactly; a mismatch is recorded but
/// the declared type stays authoritative so later analysis is not derailed.
///
/// Returns the target symbol when code generation may proceed, or None when
/// the assignment could not be resolved (the diagnostic has been recorded).
pub fn check_assign(
    assign: &AssignExpr,
    scope: &ScopeRef,
    diagnostics: &mut Diagnostics,
) -> Option<SymbolRef> {
    let symbol = scope.borrow().lookup(&assign.name.name);
    let Some(symbol) = symbol else {
        diagnostics.add(Error::new(
            ErrorImpl::UndeclaredVariable {
                name: assign.name.name.clone(),
            },
            assign.name.span.start.clone(),
        ));
        return None;
    };

    let assigned = match type_of(&assign.value, scope) {
        Ok(assigned) => assigned,
        Err(error) => {
            diagnostics.add(error);
            return None;
        }
    };

    {
        let mut symbol = symbol.borrow_mut();

        if symbol.ty.is_none() {
            symbol.ty = assigned.clone();
        }

        if assigned != symbol.ty {
            diagnostics.add(Error::new(
                ErrorImpl::AssignTypeMismatch {
                    name: symbol.name.clone(),
                    expected: type_name(&symbol.ty),
                    got: type_name(&assigned),
                },
                assign.name.span.start.clone(),
            ));
        }

        symbol.def = Some(Rc::clone(&assign.value));
    }

    Some(symbol)
}
