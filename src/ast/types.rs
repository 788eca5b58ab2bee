use std::fmt::Display;

/// A semantic type.
///
/// The language has a single value type, `int`. Unrecognised annotations are
/// carried as [`Type::Named`] so that mismatches can name what was written.
/// "Unknown" (a declaration whose type has not been inferred yet) is
/// represented as `Option::<Type>::None`, not as a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Named(String),
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Renders an optional type the way diagnostics spell it.
pub fn type_name(ty: &Option<Type>) -> String {
    match ty {
        Some(ty) => ty.to_string(),
        None => String::from("unknown"),
    }
}
