//! Error handling for tspec

use std::path::PathBuf;

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Resolver error
#[derive(Error, Debug, Clone)]
pub enum Error {
    // ==================== Parser Errors ====================

    #[error("unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("expected identifier")]
    ExpectedIdent { span: Span },

    #[error("expected type")]
    ExpectedType { span: Span },

    // ==================== Loader Errors ====================

    #[error("{}:{line}:{column}: {message}", path.display())]
    SourceSyntax {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("cannot find package {import_path:?} from {}", from.display())]
    UnitNotFound { import_path: String, from: PathBuf },

    #[error("package {name} not found in {} (found: {})", dir.display(), found.join(", "))]
    UnitAmbiguous {
        name: String,
        dir: PathBuf,
        found: Vec<String>,
    },

    #[error("io error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    // ==================== Resolution Errors ====================

    #[error("invalid type reference {reference:?}")]
    MalformedTypeReference { reference: String },

    #[error("{unit}.{name} not found")]
    TypeNotFound { unit: String, name: String },

    #[error("{name} is a {found} declaration, want a type")]
    NotATypeDeclaration { name: String, found: &'static str },

    #[error("unsupported map key type {key}")]
    UnsupportedKeyType { key: String },

    #[error("unknown basic type {name}")]
    UnknownBasicType { name: String },

    #[error("unsupported type expression: {kind}")]
    UnsupportedTypeExpression { kind: String },

    // ==================== Cause Chain ====================

    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. } => Some(*span),
            Self::ExpectedIdent { span } => Some(*span),
            Self::ExpectedType { span } => Some(*span),
            _ => None,
        }
    }

    /// The originating failure underneath any context layers.
    pub fn root_cause(&self) -> &Error {
        let mut err = self;
        while let Self::Context { source, .. } = err {
            err = source;
        }
        err
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Attach context to a failing result while keeping its cause.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| Error::Context {
            context: context.into(),
            source: Box::new(source),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| Error::Context {
            context: f().into(),
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_root_cause_unwraps_context() {
        let res: Result<()> = Err(Error::UnknownBasicType { name: "uint128".into() });
        let err = res
            .context("field Big")
            .with_context(|| "resolving samples.Wide")
            .unwrap_err();

        assert_eq!(err.to_string(), "resolving samples.Wide");
        assert!(matches!(err.root_cause(), Error::UnknownBasicType { name } if name == "uint128"));
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("field Big"));
    }
}
