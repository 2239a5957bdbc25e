//! Compiler front end for a Twig-like template language.
//!
//! A template goes through `Lexer -> TokenStream -> Parser -> Transformer -> CodeGenerator`.
//! Grammar is contributed by [`extension::Extension`]s which are validated
//! once when a [`compiler::Compiler`] is built and then shared read-only.

use std::ops::Range;

#[cfg(feature = "serde")]
use serde::Serialize;

pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod core_extension;
pub mod diagnostic;
pub mod error;
pub mod extension;
pub mod flags;
pub mod parser;
pub mod token_stream;
pub mod tokenizer;
pub mod transformer;
pub mod traverse;
pub mod util;

pub use crate::compiler::{CompileOption, Compiler};
pub use ast::{get_node_source, Node, NodeKind, NodeType};
pub use codegen::{to_string, Generated};
pub use error::{CompilationError, CompilationErrorKind, ErrorCategory};
pub use extension::Extension;
pub use parser::ParseOption;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Position {
    /// the 0-indexed byte offset in the source str
    pub offset: usize,
    /// the line number in the source code
    pub line: usize,
    /// the column number in the source code
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

#[derive(Default, PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start.offset <= end.offset);
        Self { start, end }
    }
    /// smallest location covering both self and other
    pub fn merge(&self, other: &SourceLocation) -> Self {
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

impl From<SourceLocation> for Range<usize> {
    fn from(location: SourceLocation) -> Self {
        location.start.offset..location.end.offset
    }
}
