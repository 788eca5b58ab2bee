use std::fmt::Display;

use thiserror::Error;

use crate::Position;

/// A positioned, user-facing compilation error.
#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::AlreadyDeclared { .. } => "AlreadyDeclared",
            ErrorImpl::UndeclaredVariable { .. } => "UndeclaredVariable",
            ErrorImpl::UndeclaredFunction { .. } => "UndeclaredFunction",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::ArgCountMismatch { .. } => "ArgCountMismatch",
            ErrorImpl::ArgTypeMismatch { .. } => "ArgTypeMismatch",
            ErrorImpl::AssignTypeMismatch { .. } => "AssignTypeMismatch",
            ErrorImpl::IllegalMainCall => "IllegalMainCall",
            ErrorImpl::MissingEntryPoint => "MissingEntryPoint",
            ErrorImpl::EntryPointNotFunction => "EntryPointNotFunction",
            ErrorImpl::EntryPointNoType => "EntryPointNoType",
            ErrorImpl::EntryPointWrongType { .. } => "EntryPointWrongType",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, is a parenthesis unbalanced?",
                token
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::AlreadyDeclared { name } => {
                ErrorTip::Suggestion(format!("`{}` is already declared in this scope", name))
            }
            ErrorImpl::UndeclaredVariable { name } => {
                ErrorTip::Suggestion(format!("Variable `{}` is not declared", name))
            }
            ErrorImpl::UndeclaredFunction { name } => {
                ErrorTip::Suggestion(format!("Function `{}` is not declared", name))
            }
            ErrorImpl::NotCallable { name } => {
                ErrorTip::Suggestion(format!("`{}` is not a function", name))
            }
            ErrorImpl::ArgCountMismatch { expected, got, .. } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, got
            )),
            ErrorImpl::ArgTypeMismatch {
                index,
                expected,
                got,
                ..
            } => ErrorTip::Suggestion(format!(
                "Argument {} has type `{}` but `{}` was expected",
                index, got, expected
            )),
            ErrorImpl::AssignTypeMismatch { expected, got, .. } => ErrorTip::Suggestion(format!(
                "Cannot assign a value of type `{}` to a variable of type `{}`",
                got, expected
            )),
            ErrorImpl::IllegalMainCall => {
                ErrorTip::Suggestion(String::from("The entry point may not be called directly"))
            }
            ErrorImpl::MissingEntryPoint => {
                ErrorTip::Suggestion(String::from("Declare a function named `main`"))
            }
            ErrorImpl::EntryPointNotFunction => {
                ErrorTip::Suggestion(String::from("`main` must be declared as a function"))
            }
            ErrorImpl::EntryPointNoType => ErrorTip::Suggestion(String::from(
                "`main` must declare an int return type",
            )),
            ErrorImpl::EntryPointWrongType { got } => ErrorTip::Suggestion(format!(
                "`main` must return int, not `{}`",
                got
            )),
        }
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("{name:?} is already declared in this scope")]
    AlreadyDeclared { name: String },
    #[error("can't assign value to undeclared variable {name:?}")]
    UndeclaredVariable { name: String },
    #[error("call to undeclared function {name:?}")]
    UndeclaredFunction { name: String },
    #[error("may not call {name:?}, which is not a function")]
    NotCallable { name: String },
    #[error("number of arguments in call to {name:?} does not match declaration: expected {expected}, got {got}")]
    ArgCountMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("type mismatch, argument {index} of {name:?} is of type {got} but expected {expected}")]
    ArgTypeMismatch {
        name: String,
        index: usize,
        expected: String,
        got: String,
    },
    #[error("type mismatch, can't assign a value of type {got} to a variable of type {expected}")]
    AssignTypeMismatch {
        name: String,
        expected: String,
        got: String,
    },
    #[error("illegal to call function 'main'")]
    IllegalMainCall,
    #[error("no entry point, function 'main' not found")]
    MissingEntryPoint,
    #[error("no entry point, 'main' is not a function")]
    EntryPointNotFunction,
    #[error("'main' must be of type int but was declared without a type")]
    EntryPointNoType,
    #[error("'main' must be of type int but was declared as {got}")]
    EntryPointWrongType { got: String },
}

/// The ordered collector for recoverable analysis diagnostics.
///
/// Diagnostics only accumulate; the analysis pass never stops on one. A
/// non-empty collector at the end of a pass means the pass failed, however
/// much output was emitted.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    errors: Vec<Error>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn add(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }
}

/// A fatal analyzer-invariant violation.
///
/// Unlike [`ErrorImpl`] these are not user errors: they mean the analysis
/// itself reached an inconsistent state. They abort the whole pass instead
/// of joining the diagnostics list.
#[derive(Error, Debug, Clone)]
pub enum InternalError {
    #[error("internal error: identifier {name:?} reached code generation without a symbol")]
    UnresolvedIdent { name: String },
    #[error("internal error: no stack slot assigned for identifier {name:?}")]
    NoStackSlot { name: String },
    #[error("internal error: stack slot for {name:?} assigned twice")]
    SlotReassigned { name: String },
}
