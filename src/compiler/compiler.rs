use std::rc::Rc;

use crate::{
    ast::{
        ast::{DeclExpr, Expr, File, Package},
        scope::{ScopeRef, SymbolKind},
        types::Type,
    },
    errors::errors::{Diagnostics, Error, ErrorImpl, InternalError},
    Position,
};

use super::expr::gen_node;

/// The function every program must declare, returning int.
pub const ENTRY_POINT: &str = "main";

/// The result of one code generation pass.
///
/// `code` is syntactically well-formed even when diagnostics were recorded,
/// but a non-empty diagnostics list means the pass failed and the code is
/// not a valid program.
pub struct Output {
    pub code: String,
    pub diagnostics: Diagnostics,
}

/// The per-unit analysis context.
///
/// Holds the append-only output sink, the diagnostics collector, the current
/// frame-offset cursor and the current scope cursor. One instance exists per
/// compilation unit and is threaded through every generation call; nothing
/// is shared between units.
pub struct Codegen {
    out: String,
    diagnostics: Diagnostics,
    offset: i32,
    scope: ScopeRef,
}

/// Compiles a single parsed file.
pub fn compile_file(file: &File) -> Result<Output, InternalError> {
    compile_unit(&file.scope)
}

/// Compiles a package of files sharing one top-level scope.
pub fn compile_package(package: &Package) -> Result<Output, InternalError> {
    compile_unit(&package.scope)
}

fn compile_unit(scope: &ScopeRef) -> Result<Output, InternalError> {
    let mut codegen = Codegen::new(Rc::clone(scope));
    codegen.gen_top_scope()?;
    Ok(codegen.finish())
}

impl Codegen {
    fn new(scope: ScopeRef) -> Self {
        Codegen {
            out: String::new(),
            diagnostics: Diagnostics::new(),
            offset: 0,
            scope,
        }
    }

    fn finish(self) -> Output {
        Output {
            code: self.out,
            diagnostics: self.diagnostics,
        }
    }

    /// Appends one line to the output sink.
    pub(super) fn emit(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    /// Records a recoverable diagnostic; generation continues.
    pub(super) fn diagnose(&mut self, error: Error) {
        self.diagnostics.add(error);
    }

    pub(super) fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub(super) fn scope(&self) -> ScopeRef {
        Rc::clone(&self.scope)
    }

    pub(super) fn set_scope(&mut self, scope: ScopeRef) {
        self.scope = scope;
    }

    /// Returns the current frame offset and advances the cursor one slot.
    pub(super) fn next_offset(&mut self) -> i32 {
        let offset = self.offset;
        self.offset += 4;
        offset
    }

    /// Validates the entry point, then emits the preamble, every
    /// declaration in the top scope, and the runtime wrapper.
    fn gen_top_scope(&mut self) -> Result<(), InternalError> {
        self.check_entry_point();

        self.emit("#include <stdio.h>");
        self.emit("#include <runtime.h>");
        self.gen_scope_decls()?;
        self.emit("int main(void) {");
        self.emit("stack_init();");
        self.emit("_main();");
        self.emit("printf(\"%d\\n\", *(int32_t *)eax);");
        self.emit("stack_end();");
        self.emit("return *(int32_t*) eax;");
        self.emit("}");
        Ok(())
    }

    /// Checks that the entry point exists, is a function and returns int.
    /// At most one diagnostic is recorded, in that priority order.
    fn check_entry_point(&mut self) {
        let symbol = self.scope.borrow().lookup(ENTRY_POINT);
        match symbol {
            None => self.diagnose(Error::new(ErrorImpl::MissingEntryPoint, Position::null())),
            Some(symbol) => {
                let symbol = symbol.borrow();
                if !symbol.is_function() {
                    self.diagnose(Error::new(
                        ErrorImpl::EntryPointNotFunction,
                        symbol.pos.clone(),
                    ));
                } else {
                    match &symbol.ty {
                        None => self.diagnose(Error::new(
                            ErrorImpl::EntryPointNoType,
                            symbol.pos.clone(),
                        )),
                        Some(Type::Int) => {}
                        Some(ty) => self.diagnose(Error::new(
                            ErrorImpl::EntryPointWrongType { got: ty.to_string() },
                            symbol.pos.clone(),
                        )),
                    }
                }
            }
        }
    }

    /// Emits the current scope's declarations in two sequential scans:
    /// first a forward declaration for every function, then each body.
    ///
    /// Any function may therefore reference any sibling regardless of
    /// source order. Both scans follow declaration order, which keeps the
    /// output deterministic.
    pub(super) fn gen_scope_decls(&mut self) -> Result<(), InternalError> {
        let decls = self.scope.borrow().decls_in_order();

        for symbol in &decls {
            let symbol = symbol.borrow();
            if symbol.is_function() {
                self.emit(&format!("void _{}(void);", symbol.name));
            }
        }

        for symbol in &decls {
            let decl = match &symbol.borrow().kind {
                SymbolKind::Function(decl) => Some(Rc::clone(decl)),
                SymbolKind::Variable => None,
            };
            if let Some(decl) = decl {
                self.gen_decl(&decl)?;
            }
        }

        Ok(())
    }

    /// Emits one function: hoisted nested declarations, then the header,
    /// prologue (when the frame is non-empty), body and epilogue.
    ///
    /// Each function has an independent frame, so the offset cursor is
    /// saved around the body and parameters claim the first slots.
    pub(super) fn gen_decl(&mut self, decl: &DeclExpr) -> Result<(), InternalError> {
        let outer_scope = self.scope();
        self.set_scope(Rc::clone(&decl.scope));

        self.gen_scope_decls()?;

        let outer_offset = self.offset;
        self.offset = 0;

        for param in &decl.params {
            let symbol = self.scope.borrow().get(&param.name);
            let Some(symbol) = symbol else {
                return Err(InternalError::UnresolvedIdent {
                    name: param.name.clone(),
                });
            };

            let offset = self.next_offset();
            symbol.borrow_mut().assign_offset(offset)?;
        }

        let slots = count_vars(decl);

        self.emit(&format!("void _{}(void) {{", decl.name.name));

        if slots > 0 {
            self.emit(&format!("enter({});", round_up_16(slots * 4)));
            gen_node(self, &decl.body)?;
            self.emit("leave();");
        } else {
            gen_node(self, &decl.body)?;
        }

        self.emit("}");

        self.offset = outer_offset;
        self.set_scope(outer_scope);
        Ok(())
    }
}

/// Rounds a byte size up to the next multiple of 16.
pub fn round_up_16(n: i32) -> i32 {
    if n % 16 != 0 {
        n + (16 - n % 16)
    } else {
        n
    }
}

/// Counts the stack slots a declaration needs: one per parameter plus one
/// per variable declaration its generated body will claim.
///
/// The walk covers everything the generator walks - expression lists, both
/// branches of a conditional (both are generated, so both claim slots),
/// operand and argument lists - but never enters a nested declaration,
/// which has its own frame.
pub fn count_vars(decl: &DeclExpr) -> i32 {
    decl.params.len() as i32 + count_in(&decl.body)
}

fn count_in(expr: &Expr) -> i32 {
    match expr {
        Expr::Var(var) => {
            1 + var
                .init
                .as_ref()
                .map(|init| count_in(&init.value))
                .unwrap_or(0)
        }
        Expr::List(list) => list.list.iter().map(count_in).sum(),
        Expr::If(if_expr) => {
            count_in(&if_expr.cond)
                + count_in(&if_expr.then)
                + if_expr.els.as_deref().map(count_in).unwrap_or(0)
        }
        Expr::Binary(binary) => binary.operands.iter().map(count_in).sum(),
        Expr::Call(call) => call.args.iter().map(count_in).sum(),
        Expr::Assign(assign) => count_in(&assign.value),
        Expr::Decl(_) => 0,
        Expr::Literal(_) | Expr::Ident(_) => 0,
    }
}
