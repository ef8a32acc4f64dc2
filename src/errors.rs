// File: src/errors.rs
//
// Error handling and reporting for the hope language. Structured error
// types carry source location so fatal diagnostics (lexical, parse,
// compile, runtime) share one pretty-printed format.

use colored::Colorize;
use std::fmt;

/// Source location information for tracking where code appears in a file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub file: Option<String>,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column, file: None }
    }

    pub fn with_file(line: usize, column: usize, file: String) -> Self {
        Self { line, column, file: Some(file) }
    }

    pub fn unknown() -> Self {
        Self { line: 0, column: 0, file: None }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}:{}:{}", file, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Kinds of fatal error a run can produce (§7 of the spec: hope-assertion
/// failures are not represented here — those are diagnostic VM output,
/// not fatal errors).
#[derive(Debug, Clone, PartialEq)]
pub enum HopeErrorKind {
    Lexical,
    Parse,
    UndefinedIdentifier,
    IllegalOperator,
    TypeMismatch,
    IndexOutOfRange,
    StackOverflow,
    GlobalsOverflow,
}

impl fmt::Display for HopeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HopeErrorKind::Lexical => write!(f, "Lexical Error"),
            HopeErrorKind::Parse => write!(f, "Parse Error"),
            HopeErrorKind::UndefinedIdentifier => write!(f, "Undefined Identifier"),
            HopeErrorKind::IllegalOperator => write!(f, "Illegal Operator"),
            HopeErrorKind::TypeMismatch => write!(f, "Type Mismatch"),
            HopeErrorKind::IndexOutOfRange => write!(f, "Index Out Of Range"),
            HopeErrorKind::StackOverflow => write!(f, "Stack Overflow"),
            HopeErrorKind::GlobalsOverflow => write!(f, "Globals Overflow"),
        }
    }
}

/// A structured, fatal error with location information.
#[derive(Debug, Clone)]
pub struct HopeError {
    pub kind: HopeErrorKind,
    pub message: String,
    pub location: SourceLocation,
    pub help: Option<String>,
}

impl HopeError {
    pub fn new(kind: HopeErrorKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self { kind, message: message.into(), location, help: None }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn lexical(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(HopeErrorKind::Lexical, message, location)
    }

    pub fn parse(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(HopeErrorKind::Parse, message, location)
    }

    pub fn undefined_identifier(name: &str, location: SourceLocation) -> Self {
        Self::new(
            HopeErrorKind::UndefinedIdentifier,
            format!("identifier '{name}' is not defined"),
            location,
        )
    }

    pub fn closure_over_local(name: &str, location: SourceLocation) -> Self {
        Self::new(
            HopeErrorKind::UndefinedIdentifier,
            format!("'{name}' refers to a local variable of an enclosing function"),
            location,
        )
        .with_help(
            "only global names may be captured from an enclosing scope; \
             pass the value as a parameter instead",
        )
    }

    pub fn illegal_operator(op: &str, kind: &str) -> Self {
        Self::new(
            HopeErrorKind::IllegalOperator,
            format!("operator '{op}' is not defined for {kind}"),
            SourceLocation::unknown(),
        )
    }

    pub fn type_mismatch(left: &str, right: &str) -> Self {
        Self::new(
            HopeErrorKind::TypeMismatch,
            format!("mismatched operand types: {left} vs {right}"),
            SourceLocation::unknown(),
        )
    }

    pub fn index_out_of_range(index: i64, len: usize) -> Self {
        Self::new(
            HopeErrorKind::IndexOutOfRange,
            format!("index {index} out of range for length {len}"),
            SourceLocation::unknown(),
        )
    }

    pub fn stack_overflow() -> Self {
        Self::new(
            HopeErrorKind::StackOverflow,
            "value stack exceeded its capacity",
            SourceLocation::unknown(),
        )
    }

    pub fn globals_overflow() -> Self {
        Self::new(
            HopeErrorKind::GlobalsOverflow,
            "global slot table exceeded its capacity",
            SourceLocation::unknown(),
        )
    }
}

impl fmt::Display for HopeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind_str = format!("{}", self.kind);
        writeln!(f, "{}: {}", kind_str.red().bold(), self.message.bold())?;

        if self.location != SourceLocation::unknown() {
            writeln!(f, "{}", format!("  --> {}", self.location).bright_blue())?;
        }

        if let Some(ref help) = self.help {
            writeln!(f, "   {} {}", "=".bright_yellow(), format!("help: {help}").bright_yellow())?;
        }

        Ok(())
    }
}

impl std::error::Error for HopeError {}
