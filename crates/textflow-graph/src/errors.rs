use crate::Diagnostic;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Every hard failure found in a candidate graph document.
///
/// The `Display` output lists one issue per line and is suitable for feeding
/// back to a generator as correction context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub diagnostics: Vec<Diagnostic>,
    pub errors_count: usize,
}

impl ValidationError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        let errors_count = diagnostics.iter().filter(|d| d.is_error()).count();
        Self {
            diagnostics,
            errors_count,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.errors().any(|d| d.path == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s) for Graph", self.errors_count)?;
        for diagnostic in self.errors() {
            write!(f, "\n  {diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
