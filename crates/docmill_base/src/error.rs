use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

/// Error variants that can occur in docmill operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration is invalid or incomplete
    Config { message: String },

    /// A source file could not be parsed (recoverable, per-file)
    Parse { path: PathBuf, message: String },

    /// The extraction model failed on a node (fatal)
    Extraction {
        path: PathBuf,
        node_type: String,
        message: String,
    },

    /// A package descriptor could not be handled
    Descriptor { path: PathBuf, message: String },

    /// A plugin publish-phase operation failed
    Publish { message: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

/// Comprehensive error type wrapping ErrorKind with optional context.
///
/// Two-layer design: ErrorKind carries the structural variant (paths, node
/// types), DocmillError adds runtime context strings attached during
/// propagation. Callers can pattern match on `kind()` for specific handling.
#[derive(Debug)]
pub struct DocmillError {
    kind: ErrorKind,
    context: Vec<String>,
}

impl DocmillError {
    /// Creates a new error from an ErrorKind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
        }
    }

    /// Creates a Message error from a string.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    /// Useful to avoid expensive string construction for successful paths.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    /// Allows pattern matching on specific error variants.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the innermost error in the chain.
    /// Traverses the error source chain to find the root cause.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

impl From<ErrorKind> for DocmillError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for DocmillError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::File { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for DocmillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display context first if present
        for (i, ctx) in self.context.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", ctx)?;
            } else {
                write!(f, ": {}", ctx)?;
            }
        }

        // Add a separator if we have context
        if !self.context.is_empty() {
            write!(f, ": ")?;
        }

        // Display the underlying error kind
        match &self.kind {
            ErrorKind::File { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Config { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            ErrorKind::Parse { path, message } => {
                write!(f, "Parse error in {}: {}", path.display(), message)
            }
            ErrorKind::Extraction {
                path,
                node_type,
                message,
            } => {
                write!(
                    f,
                    "Extraction error in {} at {} node: {}",
                    path.display(),
                    node_type,
                    message
                )
            }
            ErrorKind::Descriptor { path, message } => {
                write!(f, "Package descriptor error at {}: {}", path.display(), message)
            }
            ErrorKind::Publish { message } => {
                write!(f, "Publish error: {}", message)
            }
            ErrorKind::Message { message } => {
                write!(f, "{}", message)
            }
        }
    }
}

/// Standard result type for docmill operations.
///
/// The error is boxed to keep the Ok path small in the common case.
pub type DocmillResult<T> = std::result::Result<T, Box<DocmillError>>;

/// Extension trait for attaching context to Results.
/// Provides ergonomic error context attachment during error propagation.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    /// Eager evaluation: context is evaluated immediately.
    fn context(self, context: impl Into<String>) -> DocmillResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    /// Prefer this to avoid expensive string formatting in the success path.
    fn with_context<F>(self, f: F) -> DocmillResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for DocmillResult<T> {
    fn context(self, context: impl Into<String>) -> DocmillResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> DocmillResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}
