//! Code generation module for the compiler.
//!
//! This module contains the code generator that lowers the scoped AST into
//! a linear stream of runtime-call instructions. It handles:
//!
//! - Syntax-directed translation of expressions onto two working registers
//!   with explicit stack spills around nested evaluations
//! - Stack frame layout for parameters and local variables
//! - Two-phase (forward-declare, then define) emission of declarations,
//!   which is what makes mutual recursion order-independent
//! - Entry-point validation and the runtime wrapper
//! - The per-unit diagnostics collector

pub mod compiler;
pub mod expr;

#[cfg(test)]
mod tests;
