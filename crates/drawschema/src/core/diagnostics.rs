//! Diagnostics collected during an inference run
//!
//! Problems in the source diagram never abort a run. Each stage pushes a
//! [`Diagnostic`] into the [`Diagnostics`] collector it is handed, in the
//! order the problem is discovered, and carries on with less output.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

/// Severity marker of a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// What went wrong (or what happened) for a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// A class or attribute has no schema identifier
    MissingIdentifier,
    /// Two classes, or two attributes of one class, share an identifier
    DuplicateIdentifier,
    /// An attribute's containment chain never reaches a class
    UnownedAttribute,
    /// Neither rule could pick the many side of a connector
    AmbiguousRelationDirection,
    /// A connector endpoint cannot be turned into a table/column pair
    UnresolvableRelationEndpoint,
    /// A connector endpoint names no known entity
    DanglingRelationEndpoint,
    /// A relation column is absent from the schema snapshot
    TargetFieldMissing,
    /// The relation is already present in the snapshot
    RelationAlreadyApplied,
    /// A class has no usable attributes
    EmptyTable,
    /// Objects with no recognized role remain after resolution
    UnclassifiedObjects,
    /// Backend columns that the diagram no longer mentions
    UnmappedColumns,
    /// A table, column or reference is going to be created
    PlannedChange,
}

impl DiagnosticKind {
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::RelationAlreadyApplied
            | DiagnosticKind::EmptyTable
            | DiagnosticKind::UnclassifiedObjects
            | DiagnosticKind::UnmappedColumns
            | DiagnosticKind::PlannedChange => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::MissingIdentifier => "missing-identifier",
            DiagnosticKind::DuplicateIdentifier => "duplicate-identifier",
            DiagnosticKind::UnownedAttribute => "unowned-attribute",
            DiagnosticKind::AmbiguousRelationDirection => "ambiguous-relation-direction",
            DiagnosticKind::UnresolvableRelationEndpoint => "unresolvable-relation-endpoint",
            DiagnosticKind::DanglingRelationEndpoint => "dangling-relation-endpoint",
            DiagnosticKind::TargetFieldMissing => "target-field-missing",
            DiagnosticKind::RelationAlreadyApplied => "relation-already-applied",
            DiagnosticKind::EmptyTable => "empty-table",
            DiagnosticKind::UnclassifiedObjects => "unclassified-objects",
            DiagnosticKind::UnmappedColumns => "unmapped-columns",
            DiagnosticKind::PlannedChange => "planned-change",
        };
        write!(f, "{}", name)
    }
}

/// One reported finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// `None` for section headers
    pub kind: Option<DiagnosticKind>,
    pub message: String,
    /// Extra lines printed verbatim, such as the labels of colliding entities
    pub details: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: kind.default_severity(),
            kind: Some(kind),
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Log-file lines for this diagnostic
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.details.len() + 1);
        match self.severity {
            Severity::Error => lines.push(format!("ERROR: {}", self.message)),
            Severity::Info => lines.push(self.message.clone()),
        }
        lines.extend(self.details.iter().cloned());
        lines
    }
}

/// Ordered collector handed to every pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match (diagnostic.severity, diagnostic.kind) {
            (Severity::Error, Some(kind)) => {
                warn!(kind = %kind, details = ?diagnostic.details, "{}", diagnostic.message)
            }
            (Severity::Info, Some(kind)) => info!(kind = %kind, "{}", diagnostic.message),
            (_, None) => info!("{}", diagnostic.message),
        }
        self.entries.push(diagnostic);
    }

    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Diagnostic::new(kind, message));
    }

    pub fn report_with_details(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        details: Vec<String>,
    ) {
        self.push(Diagnostic::new(kind, message).with_details(details));
    }

    /// Section header line, e.g. `======== Relations ========`
    pub fn section(&mut self, title: &str) {
        self.push(Diagnostic {
            severity: Severity::Info,
            kind: None,
            message: format!("======== {} ========", title),
            details: Vec::new(),
        });
    }

    /// Append another collector's entries, preserving their order
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == Some(kind)).count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == Some(kind))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All log-file lines in discovery order
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().flat_map(Diagnostic::lines).collect()
    }
}
