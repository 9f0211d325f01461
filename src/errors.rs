// File: src/errors.rs
//
// Error handling and reporting. Lexer, parser, and compiler accumulate
// structured errors into an `ErrorList`; a stage with errors at the end
// of its pass yields a trivially empty artifact (see bytecode.rs). The
// VM surfaces the first runtime error it hits and halts.

use colored::Colorize;
use std::fmt;

/// A (line, column) pair identifying where in the source an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        SourceLocation { line, column }
    }

    pub fn unknown() -> Self {
        SourceLocation { line: 0, column: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Which stage of the pipeline raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexical,
    Parse,
    Compile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Lexical => write!(f, "Lexical Error"),
            Stage::Parse => write!(f, "Parse Error"),
            Stage::Compile => write!(f, "Compile Error"),
        }
    }
}

/// One accumulated compile-time (lexer/parser/compiler) error.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub stage: Stage,
    pub message: String,
    pub location: SourceLocation,
    pub suggestion: Option<String>,
}

impl CompileError {
    pub fn new(stage: Stage, message: impl Into<String>, location: SourceLocation) -> Self {
        CompileError { stage, message: message.into(), location, suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}: {}", self.stage.to_string().red().bold(), self.message.bold())?;
        writeln!(f, "{}", format!("  --> {}", self.location).bright_blue())?;
        if let Some(ref suggestion) = self.suggestion {
            writeln!(
                f,
                "   {} {}",
                "=".bright_green(),
                format!("did you mean '{}'?", suggestion).bright_green()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Accumulates errors for one pipeline stage. A stage that has errors at
/// the end of its pass yields an empty artifact rather than a partial one.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<CompileError>,
}

impl ErrorList {
    pub fn new() -> Self {
        ErrorList { errors: Vec::new() }
    }

    pub fn push(&mut self, err: CompileError) {
        self.errors.push(err);
    }

    pub fn push_at(&mut self, stage: Stage, message: impl Into<String>, location: SourceLocation) {
        self.errors.push(CompileError::new(stage, message, location));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }
}

/// A runtime error aborts the VM's dispatch loop and is returned to the
/// driver; it never becomes a recoverable value (contrast with
/// `Value::Error`, which builtins/methods may produce deliberately).
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError { message: message.into() }
    }

    pub fn stack_overflow() -> Self {
        Self::new("stack overflow")
    }

    pub fn invalid_stack_index() -> Self {
        Self::new("invalid stack index")
    }

    pub fn division_by_zero() -> Self {
        Self::new("division by zero")
    }

    pub fn unsupported_types(op: &str, left: &str, right: &str) -> Self {
        Self::new(format!("unsupported types for {}: {} and {}", op, left, right))
    }

    pub fn index_out_of_range(index: i64) -> Self {
        Self::new(format!("index out of range: {}", index))
    }

    pub fn wrong_arg_count(want: usize, got: usize) -> Self {
        Self::new(format!("wrong number of arguments: want={}, got={}", want, got))
    }

    pub fn not_callable(type_name: &str) -> Self {
        Self::new(format!("calling non-function and non-builtin: {}", type_name))
    }

    pub fn unsupported_index_type(type_name: &str) -> Self {
        Self::new(format!("unsupported index type: {}", type_name))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", "Runtime Error".red().bold(), self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Computes the Levenshtein distance between two strings, used for
/// "did you mean?" suggestions on undefined identifiers and unknown
/// methods.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix = vec![vec![0usize; len2 + 1]; len1 + 1];
    for (i, row) in matrix.iter_mut().enumerate().take(len1 + 1) {
        row[0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = std::cmp::min(
                std::cmp::min(matrix[i - 1][j] + 1, matrix[i][j - 1] + 1),
                matrix[i - 1][j - 1] + cost,
            );
        }
    }

    matrix[len1][len2]
}

/// Finds the closest match for `target` among `candidates`, within a
/// distance of 3. Returns `None` if nothing is close enough.
pub fn find_closest_match<'a>(target: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = levenshtein_distance(target, candidate);
        if distance <= 3 && distance < best_distance {
            best_distance = distance;
            best_match = Some(*candidate);
        }
    }

    best_match
}
