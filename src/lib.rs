#![allow(clippy::module_inception)]

use std::rc::Rc;

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod type_checker;

extern crate regex;

use crate::errors::errors::{Error, ErrorTip};

/// A byte offset into a named source file.
#[derive(Debug, Clone)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }
}

#[derive(Debug, Clone)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Finds the line containing `position` in `src`.
///
/// Returns the 1-based line number, the line's text, and the column of the
/// position within that line. Returns None when the position does not fall
/// inside the source (e.g. a null position on a file-level diagnostic).
pub fn get_line_at_position(src: &str, position: u32) -> Option<(usize, String, usize)> {
    let pos = position as usize;

    if pos >= src.len() {
        return None;
    }

    let mut start = 0;
    let mut line_number = 1;

    for line in src.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            let line_pos = pos - start;
            return Some((line_number, line.to_string(), line_pos));
        }

        start = end;
        line_number += 1;
    }

    None
}

pub fn display_error(error: &Error, src: &str) {
    /*
        Error: name (tip)
        -> final.ab
           |
        20 | (= a #)
           | ------^
    */

    if let ErrorTip::None = error.get_tip() {
        eprintln!("Error: {}", error.get_error_name());
    } else {
        eprintln!("Error: {} ({})", error.get_error_name(), error.get_tip());
    }

    let position = error.get_position();
    eprintln!("-> {}", position.1);

    let Some((line, line_text, line_pos)) = get_line_at_position(src, position.0) else {
        return;
    };

    let line_string = line.to_string();
    let padding = line_string.len() + 2;

    eprintln!("{:>padding$}", "|");

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    eprintln!("{} | {}", line_string, line_text_removed.trim());

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;

    eprintln!("{:>padding$} {:->arrows$}", "|", "^");
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let mut start = 0;
    for c in string.chars() {
        if c == ' ' {
            start += 1;
        } else {
            break;
        }
    }

    (String::from(&string[start..]), start)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_get_line_at_position() {
        let src = "(decl main int\n  (+ 1 2))\n";

        let (line_number, line, line_pos) = super::get_line_at_position(src, 6).unwrap();
        assert_eq!(line_number, 1);
        assert_eq!(line, "(decl main int\n");
        assert_eq!(line_pos, 6);

        let (line_number, line, line_pos) = super::get_line_at_position(src, 17).unwrap();
        assert_eq!(line_number, 2);
        assert_eq!(line, "  (+ 1 2))\n");
        assert_eq!(line_pos, 2);
    }

    #[test]
    fn test_get_line_at_position_out_of_range() {
        assert!(super::get_line_at_position("(+ 1 2)", 100).is_none());
    }
}
