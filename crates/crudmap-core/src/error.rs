//! Failure taxonomy of the analysis engine.
//!
//! None of these abort a run. Each is recovered where it happens and surfaces
//! as a [`Diagnostic`](crate::diagnostics::Diagnostic) row.

use crate::diagnostics::DiagnosticKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The front-end could not build a clean tree for a file or scope.
    #[error("syntax error in scope `{scope}`: {message}")]
    Syntax { scope: String, message: String },

    /// A candidate fragment is not lexable SQL.
    #[error("malformed SQL fragment `{fragment}`: {message}")]
    SqlParse { fragment: String, message: String },

    /// A variable, constant or include target could not be folded.
    #[error("unresolved reference `{name}`")]
    UnresolvedReference { name: String },

    /// A folded include path does not exist and no candidate matched.
    #[error("included file not found: {path}")]
    MissingFile { path: String },

    /// A file re-appears on its own include expansion path.
    #[error("circular include of {path}")]
    CircularInclude { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A second definition of an already bound constant was ignored.
    #[error("constant `{name}` already defined at {first}; later definition ignored")]
    ConstantRedefined { name: String, first: String },

    /// Analysis of one file aborted; the rest of the run continues.
    #[error("analysis aborted: {message}")]
    Aborted { message: String },
}

impl AnalysisError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::Syntax { .. } => DiagnosticKind::Syntax,
            Self::SqlParse { .. } => DiagnosticKind::SqlParse,
            Self::UnresolvedReference { .. } => DiagnosticKind::UnresolvedReference,
            Self::MissingFile { .. } => DiagnosticKind::MissingFile,
            Self::CircularInclude { .. } => DiagnosticKind::CircularInclude,
            Self::Io { .. } => DiagnosticKind::Io,
            Self::ConstantRedefined { .. } => DiagnosticKind::ConstantRedefined,
            Self::Aborted { .. } => DiagnosticKind::Aborted,
        }
    }
}
