use std::rc::Rc;

use crate::{
    ast::{
        ast::{AssignExpr, BinOp, BinaryExpr, CallExpr, Expr, Ident, IfExpr, Literal, VarExpr},
        scope::SymbolKind,
        types::type_name,
    },
    errors::errors::{Error, ErrorImpl, InternalError},
    type_checker::type_checker::{check_assign, type_of},
};

use super::compiler::{Codegen, ENTRY_POINT};

/// Generates instructions for one expression node.
///
/// Value-producing nodes leave their result in `eax`. Declarations emit
/// nothing here; their scope's two-phase pass owns them.
pub fn gen_node(cg: &mut Codegen, expr: &Expr) -> Result<(), InternalError> {
    match expr {
        Expr::Literal(literal) => {
            gen_int(cg, literal, "eax");
            Ok(())
        }
        Expr::Ident(ident) => gen_ident(cg, ident, "eax"),
        Expr::Binary(binary) => gen_binary(cg, binary),
        Expr::Assign(assign) => gen_assign(cg, assign),
        Expr::Call(call) => gen_call(cg, call),
        Expr::If(if_expr) => gen_if(cg, if_expr),
        Expr::Var(var) => gen_var(cg, var),
        Expr::List(list) => {
            for expr in &list.list {
                gen_node(cg, expr)?;
            }
            Ok(())
        }
        Expr::Decl(_) => Ok(()),
    }
}

/// Loads an immediate into a register or stack slot.
fn gen_int(cg: &mut Codegen, literal: &Literal, dst: &str) {
    cg.emit(&format!("setl({}, {});", literal.value, dst));
}

/// Loads an identifier's stack slot into a register or another slot.
///
/// An identifier that cannot be resolved, or resolves to a symbol with no
/// assigned slot, is an analyzer-invariant violation: the input contract
/// guarantees a fully-built symbol table, so this is an ordering bug in the
/// analysis, not a user error.
fn gen_ident(cg: &mut Codegen, ident: &Ident, dst: &str) -> Result<(), InternalError> {
    let symbol = cg.scope().borrow().lookup(&ident.name);
    let Some(symbol) = symbol else {
        return Err(InternalError::UnresolvedIdent {
            name: ident.name.clone(),
        });
    };

    let offset = symbol
        .borrow()
        .offset
        .ok_or_else(|| InternalError::NoStackSlot {
            name: ident.name.clone(),
        })?;

    cg.emit(&format!("movl(ebp+{}, {});", offset, dst));
    Ok(())
}

/// Folds an operand list left to right through `eax`, with `edx` holding
/// each right-hand operand.
///
/// A non-trivial right operand is evaluated with `eax` spilled to the
/// stack, since the nested evaluation accumulates through `eax` itself.
/// Comparison operators leave their verdict in the runtime flag that
/// conditional branches test.
fn gen_binary(cg: &mut Codegen, binary: &BinaryExpr) -> Result<(), InternalError> {
    let Some((first, rest)) = binary.operands.split_first() else {
        return Ok(());
    };

    gen_node(cg, first)?;

    for operand in rest {
        match operand {
            Expr::Literal(literal) => gen_int(cg, literal, "edx"),
            Expr::Ident(ident) => gen_ident(cg, ident, "edx")?,
            operand => {
                cg.emit("pushl(eax);");
                gen_node(cg, operand)?;
                cg.emit("movl(eax, edx);");
                cg.emit("popl(eax);");
            }
        }

        cg.emit(match binary.op {
            BinOp::Add => "addl(edx, eax);",
            BinOp::Sub => "subl(edx, eax);",
            BinOp::Mul => "mull(edx, eax);",
            BinOp::Div => "divl(edx, eax);",
            BinOp::Rem => "reml(edx, eax);",
            BinOp::And => "andl(edx, eax);",
            BinOp::Or => "orl(edx, eax);",
            BinOp::Eq => "eql(eax, edx);",
            BinOp::Ne => "nel(eax, edx);",
            BinOp::Lt => "ltl(eax, edx);",
            BinOp::Le => "lel(eax, edx);",
            BinOp::Gt => "gtl(eax, edx);",
            BinOp::Ge => "gel(eax, edx);",
        });
    }

    Ok(())
}

/// Stores a value into the target's stack slot.
///
/// Literals load straight into the slot; everything else evaluates into
/// `eax` first. If the assignment could not be resolved the diagnostic has
/// already been recorded and nothing is emitted.
fn gen_assign(cg: &mut Codegen, assign: &AssignExpr) -> Result<(), InternalError> {
    let scope = cg.scope();
    let Some(symbol) = check_assign(assign, &scope, cg.diagnostics_mut()) else {
        return Ok(());
    };

    let offset = {
        let symbol = symbol.borrow();
        symbol.offset.ok_or_else(|| InternalError::NoStackSlot {
            name: symbol.name.clone(),
        })?
    };

    match &*assign.value {
        Expr::Literal(literal) => gen_int(cg, literal, &format!("ebp+{}", offset)),
        value => {
            gen_node(cg, value)?;
            cg.emit(&format!("movl(eax, ebp+{});", offset));
        }
    }

    Ok(())
}

/// Evaluates each argument into its outgoing stack slot and emits the call.
///
/// Structural problems (calling the entry point, an unknown or non-function
/// callee, an argument count mismatch) record at most one diagnostic, in
/// that priority order; argument types are then checked position by
/// position. Emission continues regardless, so one bad call cannot hide
/// errors further on.
fn gen_call(cg: &mut Codegen, call: &CallExpr) -> Result<(), InternalError> {
    let scope = cg.scope();
    let name = &call.name.name;
    let pos = call.name.span.start.clone();

    let symbol = scope.borrow().lookup(name);
    let decl = symbol.as_ref().and_then(|symbol| match &symbol.borrow().kind {
        SymbolKind::Function(decl) => Some(Rc::clone(decl)),
        SymbolKind::Variable => None,
    });

    if name == ENTRY_POINT {
        cg.diagnose(Error::new(ErrorImpl::IllegalMainCall, pos));
    } else if symbol.is_none() {
        cg.diagnose(Error::new(
            ErrorImpl::UndeclaredFunction { name: name.clone() },
            pos,
        ));
    } else if let Some(decl) = &decl {
        if decl.params.len() != call.args.len() {
            cg.diagnose(Error::new(
                ErrorImpl::ArgCountMismatch {
                    name: name.clone(),
                    expected: decl.params.len(),
                    got: call.args.len(),
                },
                pos,
            ));
        }
    } else {
        cg.diagnose(Error::new(
            ErrorImpl::NotCallable { name: name.clone() },
            pos,
        ));
    }

    if let Some(decl) = &decl {
        for (index, (arg, param)) in call.args.iter().zip(decl.params.iter()).enumerate() {
            let arg_type = match type_of(arg, &scope) {
                Ok(ty) => ty,
                Err(error) => {
                    cg.diagnose(error);
                    continue;
                }
            };

            let param_symbol = decl.scope.borrow().get(&param.name);
            let param_type = param_symbol.and_then(|symbol| symbol.borrow().ty.clone());

            if arg_type != param_type {
                cg.diagnose(Error::new(
                    ErrorImpl::ArgTypeMismatch {
                        name: name.clone(),
                        index,
                        expected: type_name(&param_type),
                        got: type_name(&arg_type),
                    },
                    call.name.span.start.clone(),
                ));
            }
        }
    }

    let mut offset = 4;
    for arg in &call.args {
        match arg {
            Expr::Literal(literal) => gen_int(cg, literal, &format!("esp+{}", offset)),
            arg => {
                gen_node(cg, arg)?;
                cg.emit(&format!("movl(eax, esp+{});", offset));
            }
        }
        offset += 4;
    }

    cg.emit(&format!("_{}();", name));
    Ok(())
}

/// Lowers a conditional to a branch on the runtime comparison flag.
///
/// A conditional carrying a type is the enclosing function's return value:
/// each branch unwinds the frame and returns explicitly after its own
/// instructions. An absent else branch emits no else block at all.
fn gen_if(cg: &mut Codegen, if_expr: &IfExpr) -> Result<(), InternalError> {
    gen_node(cg, &if_expr.cond)?;

    cg.emit("if (*(int32_t *)ecx == 1) {");

    let outer_scope = cg.scope();
    cg.set_scope(Rc::clone(&if_expr.scope));

    gen_node(cg, &if_expr.then)?;
    if if_expr.ty.is_some() {
        cg.emit("leave();");
        cg.emit("return;");
    }

    if let Some(els) = &if_expr.els {
        cg.emit("} else {");
        gen_node(cg, els)?;
        if if_expr.ty.is_some() {
            cg.emit("leave();");
            cg.emit("return;");
        }
    }

    cg.set_scope(outer_scope);
    cg.emit("}");
    Ok(())
}

/// Claims the variable's stack slot and generates its initializer, if any.
fn gen_var(cg: &mut Codegen, var: &VarExpr) -> Result<(), InternalError> {
    let symbol = cg.scope().borrow().lookup(&var.name.name);
    let Some(symbol) = symbol else {
        return Err(InternalError::UnresolvedIdent {
            name: var.name.name.clone(),
        });
    };

    let offset = cg.next_offset();
    symbol.borrow_mut().assign_offset(offset)?;

    if let Some(init) = &var.init {
        gen_assign(cg, init)?;
    }

    Ok(())
}
