//! Non-fatal findings collected while extracting module information.
//!
//! Structural problems abort loading with an [`crate::Error`]. Problems confined to a single
//! attribute (an unexpected argument type, an unresolvable constructor, a damaged blob) are
//! recorded here instead, and extraction continues with the affected field left unset.
//!
//! # Key Components
//!
//! - [`Diagnostics`] - Collector used during a single extraction
//! - [`Diagnostic`] - Individual entry with severity, category and the offending token
//! - [`DiagnosticSeverity`] - Severity level (Info, Warning, Error)
//! - [`DiagnosticCategory`] - Which part of the metadata the entry concerns
//!
//! # Examples
//!
//! ```rust
//! use dotinfo::metadata::diagnostics::{
//!     Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics,
//! };
//!
//! let mut diagnostics = Diagnostics::new();
//! diagnostics.push(Diagnostic::new(
//!     DiagnosticSeverity::Warning,
//!     DiagnosticCategory::CustomAttribute,
//!     "AssemblyTitleAttribute: expected a string argument",
//! ));
//!
//! assert!(!diagnostics.is_empty());
//! for entry in diagnostics.iter() {
//!     println!("{entry}");
//! }
//! ```

use std::fmt;

use crate::metadata::token::Token;

/// Severity level of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// Informational, not indicating a problem
    Info,

    /// Some data could not be decoded and was skipped
    Warning,

    /// Invalid or corrupt metadata
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Info => write!(f, "INFO"),
            DiagnosticSeverity::Warning => write!(f, "WARN"),
            DiagnosticSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// Category indicating the source of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    /// Metadata heaps (`#Strings`, `#Blob`)
    Heap,

    /// Metadata table structure or content
    Table,

    /// Custom attribute blobs and their decoded values
    CustomAttribute,

    /// Method signatures of attribute constructors
    Signature,

    /// Resolution of type names
    Type,

    /// Anything else
    General,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Heap => write!(f, "Heap"),
            DiagnosticCategory::Table => write!(f, "Table"),
            DiagnosticCategory::CustomAttribute => write!(f, "CustomAttribute"),
            DiagnosticCategory::Signature => write!(f, "Signature"),
            DiagnosticCategory::Type => write!(f, "Type"),
            DiagnosticCategory::General => write!(f, "General"),
        }
    }
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level of this diagnostic.
    pub severity: DiagnosticSeverity,

    /// Category indicating the source of this diagnostic.
    pub category: DiagnosticCategory,

    /// Human-readable description of the issue.
    pub message: String,

    /// Metadata token of the row the issue was found in, if any.
    pub token: Option<Token>,
}

impl Diagnostic {
    /// Creates a new diagnostic entry without location information.
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            token: None,
        }
    }

    /// Adds metadata token information to the diagnostic.
    #[must_use]
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;

        if let Some(token) = self.token {
            write!(f, " (token: {token})")?;
        }

        Ok(())
    }
}

/// Collector for the diagnostics of a single extraction.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates a new empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic entry directly, e.g. one carrying a token.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all diagnostics, in the order they were reported.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Consumes the collector, returning the entries.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
