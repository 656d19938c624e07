use log::warn;
use thiserror::Error;

/// Input that does not even have the right field types. This is the only
/// failure a caller can observe; everything else degrades.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("schema must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to parse generated SVG: {0}")]
    Parse(String),
    #[error("failed to allocate {width}x{height} surface")]
    Allocation { width: u32, height: u32 },
    #[error("failed to encode PNG output: {0}")]
    Encode(String),
    #[error("PNG support is not compiled in")]
    Unsupported,
}

/// A recoverable irregularity met while rendering. Each one is logged and the
/// render continues with a deterministic fallback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Degradation {
    #[error("unsupported figure type `{0}`, rendered a placeholder")]
    UnsupportedFigure(String),
    #[error("synthesized coordinates for {}", .0.join(", "))]
    SynthesizedPoints(Vec<String>),
    #[error("{figure} needs more vertices, added {count} unnamed")]
    PaddedVertices { figure: String, count: usize },
    #[error("ignored {0} points beyond the point limit")]
    TooManyPoints(usize),
    #[error("ignored {count} {kind} beyond the limit")]
    TooManyAnnotations { kind: &'static str, count: usize },
    #[error("duplicate point `{0}` ignored")]
    DuplicatePoint(String),
    #[error("ignored coordinate of `{0}`: not finite or out of range")]
    InvalidCoordinate(String),
    #[error("ignored measure on {0}: not a positive finite value in range")]
    InvalidMeasure(String),
    #[error("dropped measurement referencing unknown point `{0}`")]
    UnknownReference(String),
    #[error("measures on {0} are inconsistent, kept the legs")]
    InconsistentMeasure(String),
    #[error("raster export failed: {0}")]
    RasterFailed(String),
}

impl Degradation {
    pub(crate) fn report(self, sink: &mut Vec<Degradation>) {
        warn!(kind = self.kind(); "{self}");
        sink.push(self);
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Degradation::UnsupportedFigure(_) => "unsupported_figure",
            Degradation::SynthesizedPoints(_) => "synthesized_points",
            Degradation::PaddedVertices { .. } => "padded_vertices",
            Degradation::TooManyPoints(_) => "too_many_points",
            Degradation::TooManyAnnotations { .. } => "too_many_annotations",
            Degradation::DuplicatePoint(_) => "duplicate_point",
            Degradation::InvalidCoordinate(_) => "invalid_coordinate",
            Degradation::InvalidMeasure(_) => "invalid_measure",
            Degradation::UnknownReference(_) => "unknown_reference",
            Degradation::InconsistentMeasure(_) => "inconsistent_measure",
            Degradation::RasterFailed(_) => "raster_failed",
        }
    }
}
