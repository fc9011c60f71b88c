//! Build diagnostics
//!
//! Diagnostics are accumulated across every pipeline stage and surfaced in
//! the build report. The log is append-only: stages push their own entries
//! and nothing is ever removed, so concurrent tasks only need the short
//! critical section of a push.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A structured build message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub header: String,
    pub message: String,
    pub file: Option<String>,
}

impl Diagnostic {
    pub fn error(header: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            header: header.into(),
            message: message.into(),
            file: None,
        }
    }

    pub fn warning(header: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            header: header.into(),
            message: message.into(),
            file: None,
        }
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.header, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({file})")?;
        }
        Ok(())
    }
}

/// Append-only diagnostics log shared by every stage of a build
#[derive(Debug, Default)]
pub struct BuildDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl BuildDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.lock().extend(diagnostics);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.lock().iter().any(Diagnostic::is_error)
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    // A panic while holding the lock cannot leave a half-written Vec behind,
    // so a poisoned log is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
