//! AST (Abstract Syntax Tree) module.
//!
//! Contains all definitions related to the AST structure consumed by the
//! analysis and code generation passes.
//!
//! Submodules:
//! - ast: the expression node types and compilation-unit roots
//! - scope: nested symbol tables built by the parser
//! - types: semantic type representations

pub mod ast;
pub mod scope;
pub mod types;
