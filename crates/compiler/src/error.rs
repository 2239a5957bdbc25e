use super::SourceLocation;
use std::fmt;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum CompilationErrorKind {
    // lex errors
    UnexpectedCharacter,
    UnterminatedString,
    UnterminatedComment,
    EofInElement,

    // parse errors
    UnexpectedToken,
    UnknownTag,
    UnexpectedEndTag,
    MismatchedEndTag,
    MissingEndTag,
    InvalidAssignmentTarget,

    // registration errors
    DuplicateTag,
    DuplicateBinaryOperator,
    DuplicateUnaryOperator,
    DuplicateFilter,
    DuplicateTest,

    // transform errors
    InvalidRemoval,
    InvalidReplacement,
    ContractViolation,

    // validation errors
    MissingBackend,
    UnknownFilter,
    UnknownTest,
    DynamicParentTemplate,

    // generator errors
    MissingPrinter,
    SourceMismatch,
}

/// Coarse grouping of error kinds. Every category is fatal.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorCategory {
    Lex,
    Parse,
    Registration,
    Transform,
    Validation,
    Generator,
}

impl CompilationErrorKind {
    pub fn category(&self) -> ErrorCategory {
        use CompilationErrorKind::*;
        match self {
            UnexpectedCharacter | UnterminatedString | UnterminatedComment | EofInElement => {
                ErrorCategory::Lex
            }
            UnexpectedToken | UnknownTag | UnexpectedEndTag | MismatchedEndTag | MissingEndTag
            | InvalidAssignmentTarget => ErrorCategory::Parse,
            DuplicateTag | DuplicateBinaryOperator | DuplicateUnaryOperator | DuplicateFilter
            | DuplicateTest => ErrorCategory::Registration,
            InvalidRemoval | InvalidReplacement | ContractViolation => ErrorCategory::Transform,
            MissingBackend | UnknownFilter | UnknownTest | DynamicParentTemplate => {
                ErrorCategory::Validation
            }
            MissingPrinter | SourceMismatch => ErrorCategory::Generator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationError {
    pub kind: CompilationErrorKind,
    pub additional_message: Option<String>,
    pub location: SourceLocation,
    /// known names offered for an unknown filter or test, sorted
    pub suggestions: Vec<String>,
}

impl CompilationError {
    pub fn new(kind: CompilationErrorKind) -> Self {
        Self {
            kind,
            additional_message: None,
            location: Default::default(),
            suggestions: vec![],
        }
    }
    pub fn with_location(mut self, loc: SourceLocation) -> Self {
        self.location = loc;
        self
    }
    pub fn with_additional_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.additional_message = Some(msg.into());
        self
    }
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    fn msg(&self) -> &'static str {
        msg(&self.kind)
    }
}

#[cold]
#[inline(never)]
fn msg(kind: &CompilationErrorKind) -> &'static str {
    use CompilationErrorKind::*;
    match *kind {
        UnexpectedCharacter => "Unexpected character",
        UnterminatedString => "Unterminated string literal.",
        UnterminatedComment => "Unterminated comment, `#}` was expected.",
        EofInElement => "Unexpected EOF in element.",

        UnexpectedToken => "Unexpected token",
        UnknownTag => "Unknown tag",
        UnexpectedEndTag => "Unexpected end tag",
        MismatchedEndTag => "End tag does not match the open element",
        MissingEndTag => "Unexpected EOF, the construct was not closed",
        InvalidAssignmentTarget => "Only names can be assigned to.",

        DuplicateTag => "Tag is registered by more than one extension",
        DuplicateBinaryOperator => "Binary operator is registered by more than one extension",
        DuplicateUnaryOperator => "Unary operator is registered by more than one extension",
        DuplicateFilter => "Filter is registered by more than one extension",
        DuplicateTest => "Test is registered by more than one extension",

        InvalidRemoval => "Cannot remove a required child node",
        InvalidReplacement => "Multiple nodes can only replace an item of a node list",
        ContractViolation => "Node should have been eliminated by an earlier pass",

        MissingBackend =>
            "Template-only node survived to validation. Is a backend extension (e.g. idom) missing?",
        UnknownFilter => "Unknown filter",
        UnknownTest => "Unknown test",
        DynamicParentTemplate => "The parent template of `extends` must be a string literal.",

        MissingPrinter => "No printer is defined for node type",
        SourceMismatch => "Node location lies outside of the source given to the generator.",
    }
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(additional) = &self.additional_message {
            write!(f, "{}{}", self.msg(), additional)?;
        } else {
            write!(f, "{}", self.msg())?;
        }
        if !self.suggestions.is_empty() {
            write!(
                f,
                " You might want to use one of: {}.",
                self.suggestions.join(", ")
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilationError {}

pub type CompileResult<T> = Result<T, CompilationError>;
