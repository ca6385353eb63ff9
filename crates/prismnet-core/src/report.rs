use crate::geom::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    ZeroLengthSegment,
    NonFiniteSegment,
    ChainedMerge,
    DanglingEdge,
    OpenFace,
    DegenerateFace,
    TooManySides,
    NestedFace,
    InvalidHeight,
    NetRejected,
    UnmatchedFill,
    UnknownColor,
    NarrowFlap,
}

/// One reportable event. `polygon` and `segment` point back at the offending
/// geometry so the source drawing can be fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<usize>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            polygon: None,
            segment: None,
        }
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn with_polygon(mut self, index: usize) -> Self {
        self.polygon = Some(index);
        self
    }

    pub fn with_segment(mut self, index: usize) -> Self {
        self.segment = Some(index);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub segments_in: usize,
    pub segments_rejected: usize,
    pub vertices: usize,
    pub atomic_edges: usize,
    pub faces_traced: usize,
    pub polygons: usize,
    pub nets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonReport {
    pub index: usize,
    pub sides: usize,
    pub area: f64,
    pub centroid: Vec2,
    pub fill: Option<u64>,
    pub color: Option<String>,
    pub height: Option<f64>,
    pub net_built: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub stats: RunStats,
    pub polygons: Vec<PolygonReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }
}
