//! Diagnostics for LDIF reading

use std::fmt;

/// Category of an LDIF failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing separator, invalid criticality, unknown changetype, misplaced line
    SyntaxError,
    /// Malformed base64 or a value that must be UTF-8 but is not
    EncodingError,
    /// A `:<` URL reference could not be resolved
    ResourceError,
    /// The stream itself cannot be trusted (I/O failure, dangling continuation)
    StructuralError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SyntaxError => "syntax error",
            ErrorKind::EncodingError => "encoding error",
            ErrorKind::ResourceError => "resource error",
            ErrorKind::StructuralError => "structural error",
        };
        f.write_str(name)
    }
}

/// An error raised while reading LDIF.
///
/// `may_continue` tells a caller reading many records whether the stream is
/// still usable: when true, only the current record was bad and reading can
/// resume at the next record boundary.
#[derive(Debug)]
pub struct LdifError {
    kind: ErrorKind,
    message: String,
    line_number: Option<usize>,
    may_continue: bool,
    lines: Option<Vec<String>>,
    cause: Option<anyhow::Error>,
}

impl LdifError {
    /// Create an error. Recoverability defaults from the kind: everything
    /// except [`ErrorKind::StructuralError`] only affects the current record.
    ///
    /// # Panics
    /// Panics if `message` is empty.
    pub fn new(kind: ErrorKind, message: impl Into<String>, line_number: Option<usize>) -> Self {
        let message = message.into();
        assert!(!message.is_empty(), "LdifError requires a message");
        Self {
            kind,
            message,
            line_number,
            may_continue: kind != ErrorKind::StructuralError,
            lines: None,
            cause: None,
        }
    }

    /// Recoverable error for a malformed line
    pub fn syntax(message: impl Into<String>, line_number: usize) -> Self {
        Self::new(ErrorKind::SyntaxError, message, Some(line_number))
    }

    /// Recoverable error for undecodable value data
    pub fn encoding(message: impl Into<String>, line_number: usize) -> Self {
        Self::new(ErrorKind::EncodingError, message, Some(line_number))
    }

    /// Recoverable error for a URL value that could not be fetched
    pub fn resource(message: impl Into<String>, line_number: usize) -> Self {
        Self::new(ErrorKind::ResourceError, message, Some(line_number))
    }

    /// Error after which the stream must not be read further
    pub fn structural(message: impl Into<String>, line_number: Option<usize>) -> Self {
        Self::new(ErrorKind::StructuralError, message, line_number)
    }

    /// Attach the underlying cause
    pub fn with_cause(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach the raw lines of the record that failed
    pub fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.lines = Some(lines);
        self
    }

    /// Get the error category
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the message without line information
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-based line number of the offending line, if known
    pub fn line_number(&self) -> Option<usize> {
        self.line_number
    }

    /// Whether reading may resume at the next record
    pub fn may_continue_reading(&self) -> bool {
        self.may_continue
    }

    /// Raw lines of the record that failed, if available
    pub fn data_lines(&self) -> Option<&[String]> {
        self.lines.as_deref()
    }

    /// Get the underlying cause, if any
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }
}

impl fmt::Display for LdifError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_number {
            Some(line) => write!(f, "{} at line {}: {}", self.kind, line, self.message)?,
            None => write!(f, "{}: {}", self.kind, self.message)?,
        }
        if let Some(cause) = &self.cause {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for LdifError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| &**cause as &(dyn std::error::Error + 'static))
    }
}
